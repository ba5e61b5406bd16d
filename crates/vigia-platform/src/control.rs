//! Unix process termination via signals.

use std::time::SystemTime;

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use vigia_core::{ProcessControl, TerminateError};

/// Terminates processes by sending SIGTERM.
///
/// Graceful by design: targets get a chance to clean up. Callers observe
/// the process disappearing on a later snapshot publish; there is no
/// built-in retry or escalation to SIGKILL.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalControl;

impl SignalControl {
    /// Creates a signal-based process control.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ProcessControl for SignalControl {
    fn terminate(&self, pid: u32) -> Result<(), TerminateError> {
        match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) => {
                tracing::debug!(pid, "sent SIGTERM");
                Ok(())
            }
            Err(Errno::ESRCH) => Err(TerminateError::NotFound(pid)),
            Err(Errno::EPERM) => Err(TerminateError::PermissionDenied(pid)),
            Err(errno) => Err(TerminateError::failed(pid, errno.desc())),
        }
    }

    fn start_time(&self, pid: u32) -> Option<SystemTime> {
        #[cfg(target_os = "linux")]
        {
            crate::linux::process_start_time(pid)
        }
        #[cfg(not(target_os = "linux"))]
        {
            let _ = pid;
            None
        }
    }
}
