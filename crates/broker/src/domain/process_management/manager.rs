//! Process manager: the sole mutator of the process registry and the sole
//! initiator of resource allocation and reclamation.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::SystemTime;

use api_types::CompatibilityCheckLevel;
use api_types::RegistrationGrant;
use api_types::RegistrationRequest;
use api_types::ServiceDescription;
use api_types::VersionInfo;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::registry::ProcessRegistry;
use super::traits::DiscoverySink;
use super::traits::LivelinessProbe;
use super::traits::PortId;
use super::traits::PortKind;
use super::traits::PortRegistry;
use super::traits::ProbeOutcome;
use super::traits::ProcessSignaler;
use super::traits::SegmentProvider;
use super::traits::ShutdownSignal;
use super::traits::SignalOutcome;
use super::types::Process;
use super::types::ProcessManagementError;
use super::types::ProcessSummary;
use super::types::RegistrySnapshot;
use super::types::Result;
use super::types::ShutdownState;
use super::types::MAX_PROCESS_NAME_LEN;

struct ManagerState {
    registry: ProcessRegistry,
    discovery_generation: u64,
}

/// Orchestrates registration, unregistration, liveliness sweeps and
/// shutdown escalation.
///
/// All entry points serialize on one coarse lock, so no caller ever
/// observes a half-applied registration, unregistration or eviction.
pub struct ProcessManager {
    state: Mutex<ManagerState>,
    probe: Arc<dyn LivelinessProbe>,
    signaler: Arc<dyn ProcessSignaler>,
    segments: Arc<dyn SegmentProvider>,
    ports: Arc<dyn PortRegistry>,
    discovery: Arc<dyn DiscoverySink>,
    compatibility_check: CompatibilityCheckLevel,
    own_version: VersionInfo,
}

impl ProcessManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        probe: Arc<dyn LivelinessProbe>,
        signaler: Arc<dyn ProcessSignaler>,
        segments: Arc<dyn SegmentProvider>,
        ports: Arc<dyn PortRegistry>,
        discovery: Arc<dyn DiscoverySink>,
        compatibility_check: CompatibilityCheckLevel,
        own_version: VersionInfo,
        max_processes: usize,
    ) -> Self {
        Self {
            state: Mutex::new(ManagerState {
                registry: ProcessRegistry::new(max_processes),
                discovery_generation: 0,
            }),
            probe,
            signaler,
            segments,
            ports,
            discovery,
            compatibility_check,
            own_version,
        }
    }

    /// Admits a process: validates name uniqueness and client version,
    /// leases a chunk pool for the requesting user and inserts the entry.
    /// Every rejection path leaves registry and provider untouched.
    pub fn register_process(&self, request: &RegistrationRequest) -> Result<RegistrationGrant> {
        if request.name.is_empty() {
            return Err(ProcessManagementError::InvalidName {
                reason: "empty name".to_string(),
            });
        }
        if request.name.len() > MAX_PROCESS_NAME_LEN {
            return Err(ProcessManagementError::InvalidName {
                reason: format!("name exceeds {MAX_PROCESS_NAME_LEN} bytes"),
            });
        }

        let mut state = self.state.lock().expect("poisoned");

        if state.registry.contains(&request.name) {
            warn!(
                name = %request.name,
                pid = request.pid,
                "registration rejected, name already registered"
            );
            return Err(ProcessManagementError::AlreadyRegistered {
                name: request.name.clone(),
            });
        }

        if !request
            .version
            .is_compatible_with(&self.own_version, self.compatibility_check)
        {
            warn!(
                name = %request.name,
                client_version = %request.version,
                broker_version = %self.own_version,
                check_level = %self.compatibility_check,
                "registration rejected, incompatible client version"
            );
            self.discovery.message_not_supported(&request.name);
            return Err(ProcessManagementError::UnsupportedVersion {
                client: request.version.to_string(),
                broker: self.own_version.to_string(),
                level: self.compatibility_check.to_string(),
            });
        }

        let Some(chunk_pool) = self.segments.chunk_pool_for_user(&request.user) else {
            warn!(
                name = %request.name,
                user = %request.user,
                "registration rejected, no segment for user"
            );
            return Err(ProcessManagementError::NoSegmentForUser {
                user: request.user.clone(),
            });
        };

        if let Err(e) = state.registry.insert(Process::new(request, chunk_pool)) {
            // The lease taken above must not outlive the rejected entry.
            self.segments.release(chunk_pool);
            return Err(e);
        }

        info!(
            name = %request.name,
            pid = request.pid,
            user = %request.user,
            monitored = request.is_monitored,
            session_id = request.session_id,
            "process registered"
        );

        Ok(RegistrationGrant {
            segment_id: chunk_pool.segment_id,
            chunk_pool_id: chunk_pool.pool_id,
            session_id: request.session_id,
        })
    }

    /// Removes the entry and releases everything it references as one
    /// unit: ports first, then the chunk pool lease, then the discovery
    /// notification.
    pub fn unregister_process(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().expect("poisoned");
        if self.evict_locked(&mut state, name) {
            info!(name = %name, "process unregistered");
            Ok(())
        } else {
            warn!(name = %name, "unregistration for unknown process rejected");
            Err(ProcessManagementError::ProcessNotFound {
                name: name.to_string(),
            })
        }
    }

    /// Checks an incoming message's session id against the entry and
    /// advances the stored id when the message is newer. Stale messages
    /// are rejected so out-of-order channel transmissions cannot act on a
    /// re-registered name.
    pub fn validate_session(&self, name: &str, session_id: u64) -> Result<()> {
        let mut state = self.state.lock().expect("poisoned");
        let Some(process) = state.registry.get_mut(name) else {
            return Err(ProcessManagementError::ProcessNotFound {
                name: name.to_string(),
            });
        };
        if session_id < process.session_id {
            debug!(
                name = %name,
                received = session_id,
                current = process.session_id,
                "dropping message with stale session id"
            );
            return Err(ProcessManagementError::StaleSession {
                name: name.to_string(),
                received: session_id,
                current: process.session_id,
            });
        }
        process.session_id = session_id;
        Ok(())
    }

    /// Records an application-side heartbeat. Safe to call for unknown
    /// names and idempotent.
    pub fn update_liveliness_of_process(&self, name: &str) {
        let mut state = self.state.lock().expect("poisoned");
        match state.registry.get_mut(name) {
            Some(process) => process.last_seen = SystemTime::now(),
            None => debug!(name = %name, "liveliness update for unknown process ignored"),
        }
    }

    /// One liveliness sweep over all monitored entries. Confirmed-dead
    /// processes are evicted with full cascade teardown; a denied probe is
    /// conservatively treated as alive.
    pub fn monitor_processes(&self) {
        let mut state = self.state.lock().expect("poisoned");
        let monitored: Vec<(String, u32)> = state
            .registry
            .iter()
            .filter(|p| p.is_monitored)
            .map(|p| (p.name.clone(), p.pid))
            .collect();

        for (name, pid) in monitored {
            match self.probe.probe(pid) {
                ProbeOutcome::Alive => {}
                ProbeOutcome::Dead => {
                    info!(name = %name, pid = pid, "monitored process vanished, evicting");
                    self.evict_locked(&mut state, &name);
                }
                ProbeOutcome::Indeterminate => {
                    warn!(
                        name = %name,
                        pid = pid,
                        "liveliness probe not permitted, keeping process"
                    );
                }
            }
        }
    }

    /// Single-process probe with the same three-way semantics as the
    /// sweep.
    pub fn is_process_alive(&self, process: &Process) -> ProbeOutcome {
        self.probe.probe(process.pid)
    }

    /// Sends the graceful termination signal to every registered process.
    /// Initiates the escalation only; does not wait for anything.
    pub fn request_shutdown_of_all_processes(&self) {
        let mut state = self.state.lock().expect("poisoned");
        for process in state.registry.iter_mut() {
            if process.shutdown_state != ShutdownState::Running {
                continue;
            }
            match self.signaler.signal(process.pid, ShutdownSignal::Term) {
                SignalOutcome::Delivered => {
                    debug!(name = %process.name, pid = process.pid, "sent graceful termination");
                    process.shutdown_state = ShutdownState::TermSent;
                }
                SignalOutcome::NoSuchProcess | SignalOutcome::PermissionDenied => {
                    // Either way the process is out of our reach; treat as gone.
                    debug!(name = %process.name, pid = process.pid, "process already gone");
                    process.shutdown_state = ShutdownState::ConfirmedDead;
                }
            }
        }
    }

    /// Escalates to the forced termination signal for every entry still
    /// alive. Missing signal permission counts as dead, not as an error.
    pub fn kill_all_processes(&self) {
        let mut state = self.state.lock().expect("poisoned");
        for process in state.registry.iter_mut() {
            if process.shutdown_state == ShutdownState::ConfirmedDead {
                continue;
            }
            if self.probe.probe(process.pid) != ProbeOutcome::Alive {
                process.shutdown_state = ShutdownState::ConfirmedDead;
                continue;
            }
            match self.signaler.signal(process.pid, ShutdownSignal::Kill) {
                SignalOutcome::Delivered => {
                    warn!(name = %process.name, pid = process.pid, "sent forced termination");
                    process.shutdown_state = ShutdownState::KillSent;
                }
                SignalOutcome::NoSuchProcess | SignalOutcome::PermissionDenied => {
                    process.shutdown_state = ShutdownState::ConfirmedDead;
                }
            }
        }
    }

    /// Re-probes every entry without mutating state. Used to decide
    /// whether to keep waiting or escalate; an unprobeable process cannot
    /// be signaled either, so only a confirmed-alive one counts.
    pub fn is_any_registered_process_still_running(&self) -> bool {
        let state = self.state.lock().expect("poisoned");
        state
            .registry
            .iter()
            .any(|p| self.probe.probe(p.pid) == ProbeOutcome::Alive)
    }

    /// Drives the full escalation: graceful signal, bounded wait with
    /// re-probing, forced signal, then cascade teardown of every entry.
    /// Never blocks on client behavior beyond the grace period and never
    /// surfaces failures; anomalies are logged.
    pub async fn shutdown_all_processes(
        &self,
        grace_period: Duration,
        reprobe_interval: Duration,
    ) {
        if self.state.lock().expect("poisoned").registry.is_empty() {
            return;
        }

        self.request_shutdown_of_all_processes();

        let deadline = tokio::time::Instant::now() + grace_period;
        while tokio::time::Instant::now() < deadline {
            if !self.is_any_registered_process_still_running() {
                break;
            }
            tokio::time::sleep(reprobe_interval).await;
        }

        if self.is_any_registered_process_still_running() {
            self.kill_all_processes();
            // One more interval for killed processes to disappear from the
            // process table before the final probe.
            tokio::time::sleep(reprobe_interval).await;
        }

        self.remove_all_processes();
    }

    /// Logs every still-registered process, then clears the registry
    /// without signaling anyone. Used when the broker exits and signaling
    /// is known to be unnecessary.
    pub fn print_warning_for_registered_processes_and_clear_process_list(&self) {
        let mut state = self.state.lock().expect("poisoned");
        for name in state.registry.names() {
            if let Some(process) = state.registry.remove(&name) {
                warn!(
                    name = %process.name,
                    pid = process.pid,
                    "process still registered at broker shutdown"
                );
                self.release_resources(&process);
            }
        }
    }

    /// Periodic tick: sweeps monitored processes until cancelled.
    pub async fn run(&self, sweep_interval: Duration, cancellation_token: CancellationToken) {
        let mut interval = tokio::time::interval(sweep_interval);
        info!(
            interval_ms = sweep_interval.as_millis() as u64,
            "starting liveliness monitor"
        );

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("liveliness monitor shutdown requested");
                    break;
                }
                _ = interval.tick() => {}
            }

            self.monitor_processes();
        }

        info!("liveliness monitor stopped");
    }

    pub fn add_publisher_for_process(
        &self,
        name: &str,
        service: ServiceDescription,
    ) -> Result<PortId> {
        self.add_port(name, PortKind::Publisher(service))
    }

    pub fn add_subscriber_for_process(
        &self,
        name: &str,
        service: ServiceDescription,
    ) -> Result<PortId> {
        self.add_port(name, PortKind::Subscriber(service))
    }

    pub fn add_condition_variable_for_process(&self, name: &str) -> Result<PortId> {
        self.add_port(name, PortKind::ConditionVariable)
    }

    pub fn add_application_for_process(&self, name: &str) -> Result<PortId> {
        self.add_port(name, PortKind::Application)
    }

    pub fn add_node_for_process(&self, name: &str, node: &str) -> Result<PortId> {
        self.add_port(name, PortKind::Node(node.to_string()))
    }

    pub fn add_interface_for_process(&self, name: &str, interface: &str) -> Result<PortId> {
        self.add_port(name, PortKind::Interface(interface.to_string()))
    }

    /// Monotonically increasing discovery table generation.
    pub fn discovery_generation(&self) -> u64 {
        self.state.lock().expect("poisoned").discovery_generation
    }

    pub fn process_count(&self) -> usize {
        self.state.lock().expect("poisoned").registry.len()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let state = self.state.lock().expect("poisoned");
        RegistrySnapshot {
            len: state.registry.len(),
            capacity: state.registry.capacity(),
            entries: state.registry.iter().map(ProcessSummary::from).collect(),
        }
    }

    fn add_port(&self, name: &str, kind: PortKind) -> Result<PortId> {
        let mut state = self.state.lock().expect("poisoned");
        let Some(process) = state.registry.get_mut(name) else {
            // The process likely unregistered or was evicted concurrently;
            // the race is expected and must not disturb other entries.
            warn!(name = %name, kind = ?kind, "port request for unknown process ignored");
            return Err(ProcessManagementError::ProcessNotFound {
                name: name.to_string(),
            });
        };

        let id = self.ports.create(name, kind);
        process.add_port(id);
        self.notify_discovery_changed(&mut state);
        Ok(id)
    }

    /// Cascade-destroys every remaining entry. Entries that cannot be
    /// confirmed dead are logged and removed anyway; their resources are
    /// reclaimed and the OS process may linger as an orphan.
    fn remove_all_processes(&self) {
        let mut state = self.state.lock().expect("poisoned");
        for name in state.registry.names() {
            if let Some(process) = state.registry.remove(&name) {
                if self.probe.probe(process.pid) == ProbeOutcome::Alive {
                    warn!(
                        name = %process.name,
                        pid = process.pid,
                        "process survived forced termination, removing entry anyway"
                    );
                }
                self.release_resources(&process);
                self.notify_discovery_changed(&mut state);
            }
        }
    }

    /// Removes one entry with cascade teardown and a discovery
    /// notification. Returns false if the name is unknown.
    fn evict_locked(&self, state: &mut ManagerState, name: &str) -> bool {
        let Some(process) = state.registry.remove(name) else {
            return false;
        };
        self.release_resources(&process);
        self.notify_discovery_changed(state);
        true
    }

    /// Asks the owners to release everything the entry references. Called
    /// exactly once per entry, right after it leaves the registry.
    fn release_resources(&self, process: &Process) {
        for port in &process.ports {
            self.ports.destroy(*port);
        }
        self.segments.release(process.chunk_pool);
    }

    fn notify_discovery_changed(&self, state: &mut ManagerState) {
        state.discovery_generation += 1;
        self.discovery.discovery_changed(state.discovery_generation);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use test_log::test;

    use super::*;
    use crate::ports::PortStore;
    use crate::segment::SegmentConfig;
    use crate::segment::StaticSegmentProvider;

    struct FakeProbe {
        outcomes: Mutex<HashMap<u32, ProbeOutcome>>,
    }

    impl FakeProbe {
        fn new() -> Self {
            Self {
                outcomes: Mutex::new(HashMap::new()),
            }
        }

        fn set(&self, pid: u32, outcome: ProbeOutcome) {
            self.outcomes.lock().unwrap().insert(pid, outcome);
        }
    }

    impl LivelinessProbe for FakeProbe {
        fn probe(&self, pid: u32) -> ProbeOutcome {
            self.outcomes
                .lock()
                .unwrap()
                .get(&pid)
                .copied()
                .unwrap_or(ProbeOutcome::Alive)
        }
    }

    struct FakeSignaler {
        sent: Mutex<Vec<(u32, ShutdownSignal)>>,
        outcomes: Mutex<HashMap<u32, SignalOutcome>>,
    }

    impl FakeSignaler {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                outcomes: Mutex::new(HashMap::new()),
            }
        }

        fn set_outcome(&self, pid: u32, outcome: SignalOutcome) {
            self.outcomes.lock().unwrap().insert(pid, outcome);
        }

        fn sent(&self) -> Vec<(u32, ShutdownSignal)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl ProcessSignaler for FakeSignaler {
        fn signal(&self, pid: u32, signal: ShutdownSignal) -> SignalOutcome {
            self.sent.lock().unwrap().push((pid, signal));
            self.outcomes
                .lock()
                .unwrap()
                .get(&pid)
                .copied()
                .unwrap_or(SignalOutcome::Delivered)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        generations: Mutex<Vec<u64>>,
        unsupported: Mutex<Vec<String>>,
    }

    impl DiscoverySink for RecordingSink {
        fn discovery_changed(&self, generation: u64) {
            self.generations.lock().unwrap().push(generation);
        }

        fn message_not_supported(&self, name: &str) {
            self.unsupported.lock().unwrap().push(name.to_string());
        }
    }

    struct Fixture {
        manager: ProcessManager,
        probe: Arc<FakeProbe>,
        signaler: Arc<FakeSignaler>,
        segments: Arc<StaticSegmentProvider>,
        ports: Arc<PortStore>,
        sink: Arc<RecordingSink>,
    }

    fn broker_version() -> VersionInfo {
        VersionInfo {
            major: 2,
            minor: 1,
            patch: 0,
            build: "ci-7".to_string(),
            commit: "abc123".to_string(),
            build_date: "2024-06-01".to_string(),
        }
    }

    fn fixture(capacity: usize) -> Fixture {
        fixture_with_level(capacity, CompatibilityCheckLevel::Major)
    }

    fn fixture_with_level(capacity: usize, level: CompatibilityCheckLevel) -> Fixture {
        let probe = Arc::new(FakeProbe::new());
        let signaler = Arc::new(FakeSignaler::new());
        let segments = Arc::new(StaticSegmentProvider::new(vec![SegmentConfig {
            user: "app".to_string(),
            chunk_count: 64,
            chunk_size: 4096,
        }]));
        let ports = Arc::new(PortStore::new());
        let sink = Arc::new(RecordingSink::default());
        let manager = ProcessManager::new(
            probe.clone(),
            signaler.clone(),
            segments.clone(),
            ports.clone(),
            sink.clone(),
            level,
            broker_version(),
            capacity,
        );
        Fixture {
            manager,
            probe,
            signaler,
            segments,
            ports,
            sink,
        }
    }

    fn request(name: &str, pid: u32, session_id: u64) -> RegistrationRequest {
        RegistrationRequest {
            name: name.to_string(),
            pid,
            user: "app".to_string(),
            is_monitored: true,
            transmission_timestamp: 0,
            session_id,
            version: broker_version(),
        }
    }

    fn service(name: &str) -> ServiceDescription {
        ServiceDescription {
            service: name.to_string(),
            instance: "default".to_string(),
            event: "data".to_string(),
        }
    }

    #[test]
    fn registration_grants_segment_and_pool_identifiers() {
        let fx = fixture(4);
        let grant = fx.manager.register_process(&request("app-a", 100, 1)).unwrap();

        assert_eq!(grant.session_id, 1);
        assert_eq!(
            fx.segments.segment_id_for_user("app"),
            Some(grant.segment_id)
        );
        assert_eq!(fx.segments.live_leases(), 1);
        assert_eq!(fx.manager.process_count(), 1);
    }

    #[test]
    fn duplicate_registration_fails_without_mutating_state() {
        let fx = fixture(4);
        fx.manager.register_process(&request("app-a", 100, 1)).unwrap();

        let err = fx
            .manager
            .register_process(&request("app-a", 100, 2))
            .unwrap_err();
        assert!(matches!(
            err,
            ProcessManagementError::AlreadyRegistered { .. }
        ));
        assert_eq!(fx.manager.process_count(), 1);
        // The duplicate was rejected before any lease was taken.
        assert_eq!(fx.segments.live_leases(), 1);
    }

    #[test]
    fn capacity_overflow_releases_the_acquired_lease() {
        let fx = fixture(2);
        fx.manager.register_process(&request("app-a", 100, 1)).unwrap();
        fx.manager.register_process(&request("app-b", 101, 1)).unwrap();
        let leases_before = fx.segments.live_leases();

        let err = fx
            .manager
            .register_process(&request("app-c", 102, 1))
            .unwrap_err();
        assert!(matches!(err, ProcessManagementError::RegistryFull { .. }));
        assert_eq!(fx.manager.process_count(), 2);
        assert_eq!(fx.segments.live_leases(), leases_before);
    }

    #[test]
    fn incompatible_version_is_rejected_and_runtime_notified() {
        let fx = fixture(4);
        let mut req = request("app-a", 100, 1);
        req.version.major += 1;

        let err = fx.manager.register_process(&req).unwrap_err();
        assert!(matches!(
            err,
            ProcessManagementError::UnsupportedVersion { .. }
        ));
        assert_eq!(fx.segments.live_leases(), 0);
        assert_eq!(fx.sink.unsupported.lock().unwrap().as_slice(), ["app-a"]);
    }

    #[test]
    fn version_check_respects_configured_level() {
        let fx = fixture_with_level(4, CompatibilityCheckLevel::Off);
        let mut req = request("app-a", 100, 1);
        req.version.major += 3;

        assert!(fx.manager.register_process(&req).is_ok());
    }

    #[test]
    fn unknown_user_has_no_segment() {
        let fx = fixture(4);
        let mut req = request("app-a", 100, 1);
        req.user = "ghost".to_string();

        let err = fx.manager.register_process(&req).unwrap_err();
        assert!(matches!(
            err,
            ProcessManagementError::NoSegmentForUser { .. }
        ));
        assert_eq!(fx.manager.process_count(), 0);
    }

    #[test]
    fn oversized_name_is_rejected() {
        let fx = fixture(4);
        let name = "x".repeat(MAX_PROCESS_NAME_LEN + 1);

        let err = fx.manager.register_process(&request(&name, 100, 1)).unwrap_err();
        assert!(matches!(err, ProcessManagementError::InvalidName { .. }));
    }

    #[test]
    fn unregister_unknown_name_fails_and_changes_nothing() {
        let fx = fixture(4);
        fx.manager.register_process(&request("app-a", 100, 1)).unwrap();

        assert!(fx.manager.unregister_process("app-b").is_err());
        assert_eq!(fx.manager.process_count(), 1);
    }

    #[test]
    fn name_is_free_again_after_unregistration() {
        let fx = fixture(4);
        fx.manager.register_process(&request("app-a", 100, 1)).unwrap();
        assert!(fx
            .manager
            .register_process(&request("app-a", 100, 2))
            .is_err());

        fx.manager.unregister_process("app-a").unwrap();
        assert_eq!(fx.segments.live_leases(), 0);

        fx.manager.register_process(&request("app-a", 100, 2)).unwrap();
        assert_eq!(fx.manager.process_count(), 1);
        assert_eq!(fx.segments.live_leases(), 1);
    }

    #[test]
    fn unregistration_cascades_to_ports_and_lease() {
        let fx = fixture(4);
        fx.manager.register_process(&request("app-a", 100, 1)).unwrap();
        fx.manager
            .add_publisher_for_process("app-a", service("radar"))
            .unwrap();
        fx.manager
            .add_subscriber_for_process("app-a", service("lidar"))
            .unwrap();
        fx.manager
            .add_condition_variable_for_process("app-a")
            .unwrap();
        assert_eq!(fx.ports.len(), 3);

        fx.manager.unregister_process("app-a").unwrap();
        assert_eq!(fx.ports.len(), 0);
        assert_eq!(fx.segments.live_leases(), 0);
        assert_eq!(fx.manager.process_count(), 0);
    }

    #[test]
    fn sweep_evicts_confirmed_dead_monitored_process_once() {
        let fx = fixture(4);
        fx.manager.register_process(&request("app-a", 100, 1)).unwrap();
        fx.manager
            .add_publisher_for_process("app-a", service("radar"))
            .unwrap();
        fx.probe.set(100, ProbeOutcome::Dead);

        fx.manager.monitor_processes();
        assert_eq!(fx.manager.process_count(), 0);
        assert_eq!(fx.ports.len(), 0);
        assert_eq!(fx.segments.live_leases(), 0);

        // A second sweep finds nothing to release.
        let generations_after_evict = fx.sink.generations.lock().unwrap().len();
        fx.manager.monitor_processes();
        assert_eq!(
            fx.sink.generations.lock().unwrap().len(),
            generations_after_evict
        );
    }

    #[test]
    fn sweep_never_evicts_unmonitored_processes() {
        let fx = fixture(4);
        let mut req = request("app-a", 100, 1);
        req.is_monitored = false;
        fx.manager.register_process(&req).unwrap();
        fx.probe.set(100, ProbeOutcome::Dead);

        fx.manager.monitor_processes();
        assert_eq!(fx.manager.process_count(), 1);

        // Explicit unregistration is still the way out.
        fx.manager.unregister_process("app-a").unwrap();
        assert_eq!(fx.manager.process_count(), 0);
    }

    #[test]
    fn denied_probe_is_treated_as_alive() {
        let fx = fixture(4);
        fx.manager.register_process(&request("app-a", 100, 1)).unwrap();
        fx.probe.set(100, ProbeOutcome::Indeterminate);

        fx.manager.monitor_processes();
        assert_eq!(fx.manager.process_count(), 1);
    }

    #[test]
    fn liveliness_update_is_safe_for_unknown_names() {
        let fx = fixture(4);
        fx.manager.update_liveliness_of_process("nobody");
        fx.manager.update_liveliness_of_process("nobody");

        fx.manager.register_process(&request("app-a", 100, 1)).unwrap();
        fx.manager.update_liveliness_of_process("app-a");
        assert_eq!(fx.manager.process_count(), 1);
    }

    #[test]
    fn stale_session_ids_are_rejected() {
        let fx = fixture(4);
        fx.manager.register_process(&request("app-a", 100, 5)).unwrap();

        assert!(fx.manager.validate_session("app-a", 5).is_ok());
        assert!(fx.manager.validate_session("app-a", 7).is_ok());
        let err = fx.manager.validate_session("app-a", 6).unwrap_err();
        assert!(matches!(err, ProcessManagementError::StaleSession { .. }));
        assert!(fx.manager.validate_session("ghost", 1).is_err());
    }

    #[test]
    fn port_request_for_unknown_process_is_a_reported_noop() {
        let fx = fixture(4);
        fx.manager.register_process(&request("app-a", 100, 1)).unwrap();

        let err = fx
            .manager
            .add_publisher_for_process("ghost", service("radar"))
            .unwrap_err();
        assert!(matches!(err, ProcessManagementError::ProcessNotFound { .. }));
        assert_eq!(fx.ports.len(), 0);
        assert_eq!(fx.manager.process_count(), 1);
    }

    #[test]
    fn markers_are_recorded_for_cascade_teardown() {
        let fx = fixture(4);
        fx.manager.register_process(&request("app-a", 100, 1)).unwrap();
        fx.manager.add_application_for_process("app-a").unwrap();
        fx.manager.add_node_for_process("app-a", "node-1").unwrap();
        fx.manager
            .add_interface_for_process("app-a", "dds")
            .unwrap();
        assert_eq!(fx.ports.len(), 3);

        fx.manager.unregister_process("app-a").unwrap();
        assert_eq!(fx.ports.len(), 0);
    }

    #[test]
    fn discovery_generation_is_strictly_increasing() {
        let fx = fixture(4);
        fx.manager.register_process(&request("app-a", 100, 1)).unwrap();
        fx.manager
            .add_publisher_for_process("app-a", service("radar"))
            .unwrap();
        fx.manager.unregister_process("app-a").unwrap();

        let generations = fx.sink.generations.lock().unwrap().clone();
        assert!(!generations.is_empty());
        assert!(generations.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*generations.last().unwrap(), fx.manager.discovery_generation());
    }

    #[test]
    fn graceful_shutdown_request_marks_entries_term_sent() {
        let fx = fixture(4);
        fx.manager.register_process(&request("app-a", 100, 1)).unwrap();
        fx.manager.register_process(&request("app-b", 200, 1)).unwrap();

        fx.manager.request_shutdown_of_all_processes();

        let mut sent = fx.signaler.sent();
        sent.sort_unstable_by_key(|(pid, _)| *pid);
        assert_eq!(sent, vec![(100, ShutdownSignal::Term), (200, ShutdownSignal::Term)]);
        let snapshot = fx.manager.snapshot();
        assert!(snapshot
            .entries
            .iter()
            .all(|e| e.shutdown_state == ShutdownState::TermSent));
    }

    #[test]
    fn signal_permission_failure_counts_as_dead() {
        let fx = fixture(4);
        fx.manager.register_process(&request("app-a", 100, 1)).unwrap();
        fx.signaler.set_outcome(100, SignalOutcome::PermissionDenied);

        fx.manager.request_shutdown_of_all_processes();

        let snapshot = fx.manager.snapshot();
        assert_eq!(snapshot.entries[0].shutdown_state, ShutdownState::ConfirmedDead);
    }

    #[test]
    fn kill_escalation_skips_processes_that_died_in_the_grace_period() {
        let fx = fixture(4);
        fx.manager.register_process(&request("app-a", 100, 1)).unwrap();
        fx.manager.register_process(&request("app-b", 200, 1)).unwrap();
        fx.manager.request_shutdown_of_all_processes();

        fx.probe.set(100, ProbeOutcome::Dead);
        fx.manager.kill_all_processes();

        let kills: Vec<u32> = fx
            .signaler
            .sent()
            .into_iter()
            .filter(|(_, signal)| *signal == ShutdownSignal::Kill)
            .map(|(pid, _)| pid)
            .collect();
        assert_eq!(kills, vec![200]);
    }

    #[test]
    fn reprobing_observes_processes_dying() {
        let fx = fixture(4);
        fx.manager.register_process(&request("app-a", 100, 1)).unwrap();
        assert!(fx.manager.is_any_registered_process_still_running());

        fx.probe.set(100, ProbeOutcome::Dead);
        assert!(!fx.manager.is_any_registered_process_still_running());
        // Re-probing does not mutate the registry.
        assert_eq!(fx.manager.process_count(), 1);
    }

    #[tokio::test]
    async fn shutdown_converges_when_clients_exit_gracefully() {
        let fx = fixture(4);
        fx.manager.register_process(&request("app-a", 100, 1)).unwrap();
        fx.manager
            .add_publisher_for_process("app-a", service("radar"))
            .unwrap();
        fx.probe.set(100, ProbeOutcome::Dead);

        fx.manager
            .shutdown_all_processes(Duration::from_millis(50), Duration::from_millis(1))
            .await;

        assert_eq!(fx.manager.process_count(), 0);
        assert_eq!(fx.ports.len(), 0);
        assert_eq!(fx.segments.live_leases(), 0);
        // The graceful signal sufficed; no forced termination was sent.
        assert!(fx
            .signaler
            .sent()
            .iter()
            .all(|(_, signal)| *signal == ShutdownSignal::Term));
    }

    #[tokio::test]
    async fn shutdown_escalates_and_removes_immortal_clients() {
        let fx = fixture(4);
        fx.manager.register_process(&request("app-a", 100, 1)).unwrap();

        fx.manager
            .shutdown_all_processes(Duration::from_millis(20), Duration::from_millis(1))
            .await;

        let sent = fx.signaler.sent();
        assert!(sent.contains(&(100, ShutdownSignal::Term)));
        assert!(sent.contains(&(100, ShutdownSignal::Kill)));
        // The process never died, yet its entry and resources are gone.
        assert_eq!(fx.manager.process_count(), 0);
        assert_eq!(fx.segments.live_leases(), 0);
    }

    #[tokio::test]
    async fn shutdown_with_empty_registry_is_a_noop() {
        let fx = fixture(4);
        fx.manager
            .shutdown_all_processes(Duration::from_millis(10), Duration::from_millis(1))
            .await;
        assert!(fx.signaler.sent().is_empty());
    }

    #[test]
    fn clearing_the_process_list_reclaims_resources_without_signaling() {
        let fx = fixture(4);
        fx.manager.register_process(&request("app-a", 100, 1)).unwrap();
        fx.manager
            .add_publisher_for_process("app-a", service("radar"))
            .unwrap();

        fx.manager
            .print_warning_for_registered_processes_and_clear_process_list();

        assert_eq!(fx.manager.process_count(), 0);
        assert_eq!(fx.ports.len(), 0);
        assert_eq!(fx.segments.live_leases(), 0);
        assert!(fx.signaler.sent().is_empty());
    }
}
