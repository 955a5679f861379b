//! Process admission, resource custody, liveliness monitoring and
//! shutdown escalation.

mod manager;
mod registry;
mod traits;
mod types;

pub use manager::ProcessManager;
pub use registry::ProcessRegistry;
pub use traits::ChunkPoolHandle;
pub use traits::DiscoverySink;
pub use traits::LivelinessProbe;
pub use traits::PortId;
pub use traits::PortKind;
pub use traits::PortRegistry;
pub use traits::ProbeOutcome;
pub use traits::ProcessSignaler;
pub use traits::SegmentProvider;
pub use traits::ShutdownSignal;
pub use traits::SignalOutcome;
pub use types::Process;
pub use types::ProcessManagementError;
pub use types::ProcessSummary;
pub use types::RegistrySnapshot;
pub use types::Result;
pub use types::ShutdownState;
pub use types::MAX_PROCESS_NAME_LEN;
