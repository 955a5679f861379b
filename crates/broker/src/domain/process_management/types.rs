//! Core data types for process management.

use std::time::SystemTime;

use api_types::RegistrationRequest;
use api_types::VersionInfo;
use derive_more::Display;
use thiserror::Error;

use super::traits::ChunkPoolHandle;
use super::traits::PortId;

/// Upper bound on process name length, in bytes.
pub const MAX_PROCESS_NAME_LEN: usize = 100;

/// Unified error type for process management operations
#[derive(Debug, Error)]
pub enum ProcessManagementError {
    #[error("process already registered: {name}")]
    AlreadyRegistered { name: String },

    #[error("process registry is full ({capacity} entries)")]
    RegistryFull { capacity: usize },

    #[error("process not found: {name}")]
    ProcessNotFound { name: String },

    #[error("unsupported client version {client} (broker is {broker}, check level {level})")]
    UnsupportedVersion {
        client: String,
        broker: String,
        level: String,
    },

    #[error("no shared memory segment for user: {user}")]
    NoSegmentForUser { user: String },

    #[error("stale session id {received} for process {name} (current is {current})")]
    StaleSession {
        name: String,
        received: u64,
        current: u64,
    },

    #[error("invalid process name: {reason}")]
    InvalidName { reason: String },
}

/// Result type for process management operations
pub type Result<T> = std::result::Result<T, ProcessManagementError>;

/// Per-process shutdown escalation state. Entries leave `Running` only
/// while a global shutdown is in progress; removal from the registry is
/// the terminal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum ShutdownState {
    #[default]
    #[display("running")]
    Running,
    #[display("term-sent")]
    TermSent,
    #[display("kill-sent")]
    KillSent,
    #[display("confirmed-dead")]
    ConfirmedDead,
}

/// One admitted client process.
#[derive(Debug, Clone)]
pub struct Process {
    /// Unique process name; doubles as the registration channel endpoint name
    pub name: String,
    /// Host process id at time of registration
    pub pid: u32,
    /// OS user the process runs as
    pub user: String,
    /// Whether the liveliness sweep watches this entry
    pub is_monitored: bool,
    /// Latest session id observed for this entry
    pub session_id: u64,
    /// Client supplied timestamp from the registration message
    pub transmission_timestamp: i64,
    /// Time of admission
    pub registered_at: SystemTime,
    /// Last external liveliness signal
    pub last_seen: SystemTime,
    /// Client build identity accepted at registration
    pub version: VersionInfo,
    /// Chunk pool leased to this process
    pub chunk_pool: ChunkPoolHandle,
    /// Resources created on behalf of this process, for cascade teardown
    pub ports: Vec<PortId>,
    pub shutdown_state: ShutdownState,
}

impl Process {
    pub fn new(request: &RegistrationRequest, chunk_pool: ChunkPoolHandle) -> Self {
        let now = SystemTime::now();
        Self {
            name: request.name.clone(),
            pid: request.pid,
            user: request.user.clone(),
            is_monitored: request.is_monitored,
            session_id: request.session_id,
            transmission_timestamp: request.transmission_timestamp,
            registered_at: now,
            last_seen: now,
            version: request.version.clone(),
            chunk_pool,
            ports: Vec::new(),
            shutdown_state: ShutdownState::default(),
        }
    }

    pub fn add_port(&mut self, id: PortId) {
        self.ports.push(id);
    }
}

/// Point-in-time view of the registry for diagnostics.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    pub len: usize,
    pub capacity: usize,
    pub entries: Vec<ProcessSummary>,
}

#[derive(Debug, Clone)]
pub struct ProcessSummary {
    pub name: String,
    pub pid: u32,
    pub is_monitored: bool,
    pub shutdown_state: ShutdownState,
}

impl From<&Process> for ProcessSummary {
    fn from(process: &Process) -> Self {
        Self {
            name: process.name.clone(),
            pid: process.pid,
            is_monitored: process.is_monitored,
            shutdown_state: process.shutdown_state,
        }
    }
}
