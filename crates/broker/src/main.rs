use anyhow::Result;
use clap::Parser;

use broker::app::Application;
use broker::config::Cli;
use broker::config::Commands;
use broker::config::DaemonArgs;
use broker::logging;
use broker::version;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon(daemon_args) => run_daemon(*daemon_args).await,
    }
}

async fn run_daemon(daemon_args: DaemonArgs) -> Result<()> {
    let _guard = logging::init(daemon_args.log_file.clone());

    tracing::info!("Starting broker daemon {}", &**version::VERSION_STRING);

    let app = Application::build(daemon_args)?;
    app.run().await
}
