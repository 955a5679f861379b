use clap::{Parser, Subcommand};

use crate::config::daemon::DaemonArgs;
use crate::version;

#[derive(Parser)]
#[command(about, long_about, version = &**version::VERSION_STRING)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run broker daemon
    Daemon(Box<DaemonArgs>),
}
