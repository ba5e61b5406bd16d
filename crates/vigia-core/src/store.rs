//! Snapshot store: the engine's only contended resource.
//!
//! Holds the current and immediately previous snapshot behind a short
//! critical section around the pointer swap. The sampling-and-build
//! pipeline runs unlocked and hands its finished product to `publish`;
//! readers clone an `Arc` and leave.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::types::Snapshot;

#[derive(Debug, Default)]
struct Slots {
    current: Option<Arc<Snapshot>>,
    previous: Option<Arc<Snapshot>>,
}

/// Thread-safe holder of the current/previous snapshot pair.
///
/// Any concurrent `read` sees either the fully-old or fully-new snapshot,
/// never a partially updated one. Older snapshots are discarded; bounded
/// history for graphing is the consumer's concern, fed by subscribing to
/// publishes.
#[derive(Debug)]
pub struct SnapshotStore {
    slots: RwLock<Slots>,
    publish_tx: broadcast::Sender<Arc<Snapshot>>,
}

impl SnapshotStore {
    /// Creates an empty store whose publish channel buffers `capacity`
    /// snapshots per observer.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (publish_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            slots: RwLock::new(Slots::default()),
            publish_tx,
        }
    }

    /// Atomically replaces the current snapshot, moving the old current
    /// into the previous slot, then notifies observers outside the lock.
    ///
    /// Publishes are serialized by the single-producer collection loop; a
    /// snapshot whose sequence does not advance past the current one is
    /// dropped with a warning rather than rolling readers backward.
    pub fn publish(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        {
            let mut slots = self.slots.write();
            if let Some(current) = &slots.current {
                if snapshot.sequence <= current.sequence {
                    tracing::warn!(
                        stale = snapshot.sequence,
                        current = current.sequence,
                        "dropping stale publish"
                    );
                    return;
                }
            }
            slots.previous = slots.current.replace(Arc::clone(&snapshot));
        }
        // A send error only means no observer is subscribed.
        let _ = self.publish_tx.send(snapshot);
    }

    /// Returns the current snapshot, or `None` before the first publish.
    ///
    /// Near-instantaneous: the lock is held only for the pointer clone.
    #[must_use]
    pub fn read(&self) -> Option<Arc<Snapshot>> {
        self.slots.read().current.clone()
    }

    /// Returns the snapshot preceding the current one, if any. Useful for
    /// consumers doing change detection against the last publish.
    #[must_use]
    pub fn read_previous(&self) -> Option<Arc<Snapshot>> {
        self.slots.read().previous.clone()
    }

    /// Sequence number of the current snapshot.
    #[must_use]
    pub fn latest_sequence(&self) -> Option<u64> {
        self.slots.read().current.as_ref().map(|s| s.sequence)
    }

    /// Registers a push-model observer notified on each publish.
    ///
    /// A lagging observer misses snapshots (the channel drops the oldest);
    /// it never blocks `publish`.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Snapshot>> {
        self.publish_tx.subscribe()
    }
}
