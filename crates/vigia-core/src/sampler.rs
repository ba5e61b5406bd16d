//! OS integration seams: sampling and process control.
//!
//! The engine core never talks to the operating system directly. Platform
//! crates implement these traits; tests substitute scripted mocks.

use std::time::SystemTime;

use crate::error::{Result, TerminateError};
use crate::types::ProcessSample;

/// Enumerates running processes and reads their resource counters.
///
/// `collect` is the only blocking operation in the engine; it runs inside
/// the collection loop task, off every reader's critical path.
///
/// # Contract
///
/// - A process that vanishes mid-enumeration is silently skipped; a single
///   unreadable process must not abort the rest of the call.
/// - Returns an error only when enumeration itself is impossible (the
///   whole-cycle failure case), in which case the loop keeps the previous
///   snapshot current and retries on the next tick.
pub trait Sampler: Send {
    /// Reads the current process table.
    ///
    /// # Errors
    /// Returns an error if process enumeration fails entirely.
    fn collect(&mut self) -> Result<Vec<ProcessSample>>;
}

/// OS process-control primitive used by the controller.
pub trait ProcessControl: Send + Sync {
    /// Requests OS-level termination of the given pid.
    ///
    /// Does not wait for the process to die; callers observe the process
    /// disappearing on a later publish.
    ///
    /// # Errors
    /// Returns `NotFound` when the pid no longer exists, `PermissionDenied`
    /// when the caller lacks rights, `Failed` for any other OS refusal.
    fn terminate(&self, pid: u32) -> std::result::Result<(), TerminateError>;

    /// Reads the creation timestamp of a live process, if the platform can
    /// provide it. Used to re-validate a pid against the snapshot before
    /// killing, so a reused pid is never terminated by mistake.
    fn start_time(&self, pid: u32) -> Option<SystemTime>;
}
