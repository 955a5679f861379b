use std::path::PathBuf;
use std::time::Duration;

use api_types::CompatibilityCheckLevel;
use clap::Parser;
use serde::Deserialize;

/// Chunk pool defaults used when no segment config file is given.
pub const DEFAULT_CHUNK_COUNT: u32 = 512;
pub const DEFAULT_CHUNK_SIZE: u32 = 16384;

#[derive(Parser, Clone)]
pub struct DaemonArgs {
    #[arg(
        long,
        env = "BROKER_LOG_FILE",
        value_hint = clap::ValueHint::FilePath,
        help = "Path for daemon log output, e.g. /logs/broker.log; stderr only when unset"
    )]
    pub log_file: Option<PathBuf>,

    #[arg(
        long,
        env = "BROKER_SEGMENT_CONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to a JSON file listing per-user shared memory segments, e.g. /etc/broker/segments.json"
    )]
    pub segment_config: Option<PathBuf>,

    #[arg(
        long,
        env = "BROKER_MAX_PROCESSES",
        default_value = "512",
        help = "Maximum number of concurrently registered processes"
    )]
    pub max_processes: usize,

    #[arg(
        long,
        env = "BROKER_MONITOR_INTERVAL_MS",
        default_value = "1000",
        help = "Interval between liveliness sweeps, in milliseconds"
    )]
    pub monitor_interval_ms: u64,

    #[arg(
        long,
        env = "BROKER_SHUTDOWN_GRACE_MS",
        default_value = "2000",
        help = "How long to wait after the graceful termination signal before escalating, in milliseconds"
    )]
    pub shutdown_grace_ms: u64,

    #[arg(
        long,
        env = "BROKER_SHUTDOWN_REPROBE_MS",
        default_value = "100",
        help = "Interval between liveliness re-probes while waiting for clients to exit, in milliseconds"
    )]
    pub shutdown_reprobe_ms: u64,

    #[arg(
        long,
        env = "BROKER_COMPATIBILITY_CHECK",
        default_value = "major",
        value_parser = parse_compatibility_level,
        help = "Client version check enforced at registration: off, major, minor, build or strict"
    )]
    pub compatibility_check: CompatibilityCheckLevel,
}

impl DaemonArgs {
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn shutdown_reprobe(&self) -> Duration {
        Duration::from_millis(self.shutdown_reprobe_ms)
    }
}

fn parse_compatibility_level(raw: &str) -> Result<CompatibilityCheckLevel, String> {
    match raw {
        "off" => Ok(CompatibilityCheckLevel::Off),
        "major" => Ok(CompatibilityCheckLevel::Major),
        "minor" => Ok(CompatibilityCheckLevel::Minor),
        "build" => Ok(CompatibilityCheckLevel::Build),
        "strict" => Ok(CompatibilityCheckLevel::Strict),
        other => Err(format!(
            "unknown compatibility check level '{other}', expected off, major, minor, build or strict"
        )),
    }
}

/// One shared memory segment granted to an OS user, as listed in the
/// segment config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentEntry {
    pub user: String,
    #[serde(default = "default_chunk_count")]
    pub chunk_count: u32,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
}

impl SegmentEntry {
    /// Entry granting the invoking user a single default sized segment.
    pub fn default_for_current_user() -> Self {
        Self {
            user: std::env::var("USER").unwrap_or_else(|_| "root".to_string()),
            chunk_count: DEFAULT_CHUNK_COUNT,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

fn default_chunk_count() -> u32 {
    DEFAULT_CHUNK_COUNT
}

fn default_chunk_size() -> u32 {
    DEFAULT_CHUNK_SIZE
}
