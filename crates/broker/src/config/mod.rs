mod cli;
mod daemon;

pub use cli::Cli;
pub use cli::Commands;
pub use daemon::DaemonArgs;
pub use daemon::SegmentEntry;
