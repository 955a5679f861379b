//! Signal-based liveliness probing and termination delivery.

use tracing::debug;

use crate::process_management::LivelinessProbe;
use crate::process_management::ProbeOutcome;
use crate::process_management::ProcessSignaler;
use crate::process_management::ShutdownSignal;
use crate::process_management::SignalOutcome;

/// Probes processes with the null signal; nothing is ever delivered, the
/// kernel only performs the existence and permission checks.
pub struct SignalProbe;

impl LivelinessProbe for SignalProbe {
    fn probe(&self, pid: u32) -> ProbeOutcome {
        let rc = unsafe { libc::kill(pid as libc::pid_t, 0) };
        if rc == 0 {
            return ProbeOutcome::Alive;
        }
        match std::io::Error::last_os_error().raw_os_error() {
            Some(libc::ESRCH) => ProbeOutcome::Dead,
            // EPERM means the pid exists but belongs to someone we may not
            // signal; existence is all the probe can claim.
            Some(libc::EPERM) => ProbeOutcome::Indeterminate,
            _ => ProbeOutcome::Indeterminate,
        }
    }
}

/// Delivers termination signals to client pids.
pub struct UnixSignaler;

impl ProcessSignaler for UnixSignaler {
    fn signal(&self, pid: u32, signal: ShutdownSignal) -> SignalOutcome {
        let signum = match signal {
            ShutdownSignal::Term => libc::SIGTERM,
            ShutdownSignal::Kill => libc::SIGKILL,
        };
        let rc = unsafe { libc::kill(pid as libc::pid_t, signum) };
        if rc == 0 {
            return SignalOutcome::Delivered;
        }
        match std::io::Error::last_os_error().raw_os_error() {
            Some(libc::EPERM) => SignalOutcome::PermissionDenied,
            Some(libc::ESRCH) => SignalOutcome::NoSuchProcess,
            errno => {
                debug!(pid = pid, errno = ?errno, "unexpected kill error, treating process as gone");
                SignalOutcome::NoSuchProcess
            }
        }
    }
}
