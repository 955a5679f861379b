//! Daemon assembly: builds the process manager with its production
//! collaborators and drives the background tasks until shutdown.

use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::DaemonArgs;
use crate::config::SegmentEntry;
use crate::liveliness::SignalProbe;
use crate::liveliness::UnixSignaler;
use crate::ports::PortStore;
use crate::process_management::DiscoverySink;
use crate::process_management::ProcessManager;
use crate::segment::SegmentConfig;
use crate::segment::StaticSegmentProvider;
use crate::version;

/// Discovery sink used until an introspection subsystem is attached:
/// records nothing, logs everything.
struct LoggingDiscoverySink;

impl DiscoverySink for LoggingDiscoverySink {
    fn discovery_changed(&self, generation: u64) {
        tracing::debug!(generation = generation, "discovery table changed");
    }

    fn message_not_supported(&self, name: &str) {
        tracing::warn!(name = %name, "notified runtime of unsupported message");
    }
}

pub struct Application {
    manager: Arc<ProcessManager>,
    daemon_args: DaemonArgs,
}

impl Application {
    pub fn build(daemon_args: DaemonArgs) -> Result<Self> {
        let segment_configs = load_segment_configs(&daemon_args)?;
        let segments = Arc::new(StaticSegmentProvider::new(segment_configs));
        let ports = Arc::new(PortStore::new());

        let manager = Arc::new(ProcessManager::new(
            Arc::new(SignalProbe),
            Arc::new(UnixSignaler),
            segments,
            ports,
            Arc::new(LoggingDiscoverySink),
            daemon_args.compatibility_check,
            version::VERSION.clone(),
            daemon_args.max_processes,
        ));

        Ok(Self {
            manager,
            daemon_args,
        })
    }

    /// The process manager, for the registration channel to call into.
    pub fn manager(&self) -> &Arc<ProcessManager> {
        &self.manager
    }

    /// Runs until SIGINT/SIGTERM, then drives the client shutdown
    /// escalation before returning.
    pub async fn run(&self) -> Result<()> {
        let cancellation_token = CancellationToken::new();

        let monitor_task = {
            let manager = self.manager.clone();
            let interval = self.daemon_args.monitor_interval();
            let token = cancellation_token.clone();
            tokio::spawn(async move {
                manager.run(interval, token).await;
            })
        };

        wait_for_termination_signal().await?;
        info!("shutdown requested, terminating registered processes");

        cancellation_token.cancel();
        monitor_task
            .await
            .context("liveliness monitor task panicked")?;

        self.manager
            .shutdown_all_processes(
                self.daemon_args.shutdown_grace(),
                self.daemon_args.shutdown_reprobe(),
            )
            .await;
        self.manager
            .print_warning_for_registered_processes_and_clear_process_list();

        info!("broker shutdown complete");
        Ok(())
    }
}

fn load_segment_configs(daemon_args: &DaemonArgs) -> Result<Vec<SegmentConfig>> {
    let entries: Vec<SegmentEntry> = match &daemon_args.segment_config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("read segment config {}", path.display()))?;
            serde_json::from_str(&raw).context("parse segment config")?
        }
        None => vec![SegmentEntry::default_for_current_user()],
    };

    Ok(entries
        .into_iter()
        .map(|entry| SegmentConfig {
            user: entry.user,
            chunk_count: entry.chunk_count,
            chunk_size: entry.chunk_size,
        })
        .collect())
}

async fn wait_for_termination_signal() -> Result<()> {
    use tokio::signal::unix::signal;
    use tokio::signal::unix::SignalKind;

    let mut sigterm = signal(SignalKind::terminate()).context("install SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("install SIGINT handler")?,
        _ = sigterm.recv() => {}
    }
    Ok(())
}
