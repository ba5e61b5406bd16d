//! Stubs for platforms without a process-table implementation.

use std::time::SystemTime;

use vigia_core::{EngineError, ProcessControl, ProcessSample, Sampler, TerminateError};

/// Sampler for targets where no process-table backend exists.
///
/// Every collect fails, so the engine keeps reporting cycle errors instead
/// of silently publishing empty snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedSampler;

impl UnsupportedSampler {
    /// Creates the stub sampler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Sampler for UnsupportedSampler {
    fn collect(&mut self) -> vigia_core::Result<Vec<ProcessSample>> {
        Err(EngineError::sampler(
            "process-table sampling is not supported on this platform",
        ))
    }
}

/// Process control for targets without a termination primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedControl;

impl UnsupportedControl {
    /// Creates the stub control.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ProcessControl for UnsupportedControl {
    fn terminate(&self, pid: u32) -> Result<(), TerminateError> {
        Err(TerminateError::failed(
            pid,
            "process termination is not supported on this platform",
        ))
    }

    fn start_time(&self, _pid: u32) -> Option<SystemTime> {
        None
    }
}
