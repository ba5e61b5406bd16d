//! Imperative operations layered on the snapshot store.
//!
//! Termination re-validates the target against the last published
//! snapshot before touching the OS, so a reused pid is never killed by
//! mistake.

use std::sync::Arc;

use crate::error::TerminateError;
use crate::sampler::ProcessControl;
use crate::store::SnapshotStore;
use crate::types::InstanceDetail;

/// Tolerance when comparing a live process's start time against the one
/// recorded in the snapshot. Matches the builder's pid-reuse tolerance.
const START_TIME_TOLERANCE: std::time::Duration = std::time::Duration::from_secs(1);

/// Imperative surface for consumers: terminate a process, drill into a
/// name's instances.
///
/// Cheap to clone; all clones share the engine's store and control.
#[derive(Clone)]
pub struct Controller {
    store: Arc<SnapshotStore>,
    control: Arc<dyn ProcessControl>,
}

impl Controller {
    /// Creates a controller over the given store and OS control primitive.
    #[must_use]
    pub fn new(store: Arc<SnapshotStore>, control: Arc<dyn ProcessControl>) -> Self {
        Self { store, control }
    }

    /// Requests OS-level termination of `pid`.
    ///
    /// The pid must be present in the latest snapshot, and — where the
    /// platform can probe it — the live process's start time must match
    /// the snapshot's; otherwise the kill primitive is never invoked and
    /// `NotFound` is returned. Termination is not retried and does not
    /// wait for the next publish to confirm death.
    ///
    /// # Errors
    /// Returns `NotFound`, `PermissionDenied` or `Failed` per the error
    /// taxonomy.
    pub fn terminate(&self, pid: u32) -> Result<(), TerminateError> {
        let snapshot = self.store.read().ok_or(TerminateError::NotFound(pid))?;
        let known = snapshot
            .find_pid(pid)
            .ok_or(TerminateError::NotFound(pid))?;

        if let Some(live_start) = self.control.start_time(pid) {
            if !close_enough(live_start, known.start_time) {
                tracing::debug!(pid, "pid reused since last snapshot, refusing to terminate");
                return Err(TerminateError::NotFound(pid));
            }
        }

        tracing::info!(pid, "requesting termination");
        self.control.terminate(pid)
    }

    /// Per-pid detail for every instance of an executable name in the
    /// current snapshot, ordered by pid. Empty when the name is absent or
    /// nothing has been published yet.
    #[must_use]
    pub fn instances_of(&self, name: &str) -> Vec<InstanceDetail> {
        self.store
            .read()
            .map(|snapshot| snapshot.instances_of(name).to_vec())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller").finish_non_exhaustive()
    }
}

fn close_enough(a: std::time::SystemTime, b: std::time::SystemTime) -> bool {
    let diff = match a.duration_since(b) {
        Ok(d) => d,
        Err(e) => e.duration(),
    };
    diff <= START_TIME_TOLERANCE
}
