//! Seams to the broker's OS-facing collaborators.
//!
//! The manager only ever talks to the liveliness prober, the signal
//! delivery path, the segment provider, the port registry and the
//! discovery sink through these traits, so the core logic runs unchanged
//! against fakes in tests.

use api_types::ServiceDescription;
use derive_more::Display;

/// Outcome of a non-destructive liveliness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ProbeOutcome {
    #[display("alive")]
    Alive,
    #[display("dead")]
    Dead,
    /// The probe was not permitted; the process state is unknown.
    #[display("indeterminate")]
    Indeterminate,
}

/// Signal kinds used by the shutdown escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShutdownSignal {
    /// Graceful termination, the process may clean up.
    Term,
    /// Forced termination.
    Kill,
}

/// Outcome of delivering a shutdown signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    Delivered,
    NoSuchProcess,
    PermissionDenied,
}

/// Checks whether a process id still belongs to a live process.
pub trait LivelinessProbe: Send + Sync {
    fn probe(&self, pid: u32) -> ProbeOutcome;
}

/// Delivers termination signals to client processes.
pub trait ProcessSignaler: Send + Sync {
    fn signal(&self, pid: u32, signal: ShutdownSignal) -> SignalOutcome;
}

/// Non-owning reference to a chunk pool leased to a process. The segment
/// provider owns the pool; entries only carry the identifiers needed to
/// hand memory to the client and to release the lease on teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkPoolHandle {
    pub segment_id: u64,
    pub pool_id: u64,
}

/// Owner of the shared memory segments and their chunk pool allocators.
pub trait SegmentProvider: Send + Sync {
    /// Looks up the segment for `user` and leases a chunk pool from it.
    fn chunk_pool_for_user(&self, user: &str) -> Option<ChunkPoolHandle>;

    /// Returns a previously leased chunk pool to its owner.
    fn release(&self, handle: ChunkPoolHandle);
}

/// Opaque id of a resource owned by the port registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortId(pub u64);

/// Resource kinds the broker creates on behalf of a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortKind {
    Publisher(ServiceDescription),
    Subscriber(ServiceDescription),
    ConditionVariable,
    Application,
    Node(String),
    Interface(String),
}

/// Owner of publisher/subscriber/condition variable objects and the
/// service discovery table.
pub trait PortRegistry: Send + Sync {
    /// Creates a resource for `owner` and returns its id.
    fn create(&self, owner: &str, kind: PortKind) -> PortId;

    /// Destroys a resource by id. Unknown ids are ignored.
    fn destroy(&self, id: PortId);
}

/// Sink for registry and discovery change events.
pub trait DiscoverySink: Send + Sync {
    /// Called after the discovery table changed; `generation` increases by
    /// one per change.
    fn discovery_changed(&self, generation: u64);

    /// Called when a client's registration was rejected as unsupported, so
    /// the runtime can report a meaningful error instead of timing out.
    fn message_not_supported(&self, name: &str);
}
