//! The collection loop and engine lifecycle.
//!
//! A background timer-driven task owns exactly one in-flight sample cycle
//! at a time: sample → build → publish. Ticks that fire while a cycle is
//! still running are dropped, never queued. One bad cycle is never fatal;
//! the previous snapshot stays current and the loop proceeds to the next
//! scheduled tick.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::builder::SnapshotBuilder;
use crate::config::MonitorConfig;
use crate::controller::Controller;
use crate::error::{EngineError, Result};
use crate::metrics::EngineMetrics;
use crate::sampler::{ProcessControl, Sampler};
use crate::store::SnapshotStore;
use crate::types::EngineId;

/// Predicate deciding which processes enter the snapshot, keyed by
/// executable name.
pub type NameFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Report of one failed collection cycle, delivered to error observers.
#[derive(Debug, Clone)]
pub struct CycleFailure {
    /// Human-readable failure description.
    pub message: String,
    /// When the cycle failed.
    pub timestamp: SystemTime,
}

/// A running monitor engine: the collection loop plus its read and control
/// surfaces.
///
/// There is no implicit global instance; construct one engine per monitored
/// host view and pass it (or its store/controller handles) to collaborators.
pub struct MonitorEngine {
    id: EngineId,
    store: Arc<SnapshotStore>,
    metrics: EngineMetrics,
    controller: Controller,
    error_tx: broadcast::Sender<CycleFailure>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl MonitorEngine {
    /// Validates the configuration and starts the collection loop.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn spawn(
        config: MonitorConfig,
        sampler: impl Sampler + 'static,
        control: Arc<dyn ProcessControl>,
    ) -> Result<Self> {
        Self::spawn_filtered(config, sampler, control, None)
    }

    /// Like [`MonitorEngine::spawn`], with a name-based filter deciding
    /// which processes are included in snapshots.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn spawn_filtered(
        config: MonitorConfig,
        sampler: impl Sampler + 'static,
        control: Arc<dyn ProcessControl>,
        filter: Option<NameFilter>,
    ) -> Result<Self> {
        config.validate()?;

        let id = EngineId::new();
        let store = Arc::new(SnapshotStore::new(config.observer_capacity));
        let metrics = EngineMetrics::new();
        let controller = Controller::new(Arc::clone(&store), control);
        let (error_tx, _) = broadcast::channel(config.observer_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let loop_task = CollectionLoop {
            id,
            interval: config.sample_interval,
            sampler,
            builder: SnapshotBuilder::new(config.resolved_cpu_clamp()),
            filter,
            store: Arc::clone(&store),
            metrics: metrics.clone(),
            error_tx: error_tx.clone(),
            shutdown_rx,
        };
        let task = tokio::spawn(loop_task.run());

        Ok(Self {
            id,
            store,
            metrics,
            controller,
            error_tx,
            shutdown_tx,
            task: Some(task),
        })
    }

    /// This engine instance's identifier.
    #[must_use]
    pub const fn id(&self) -> EngineId {
        self.id
    }

    /// The snapshot store: pull-model reads and publish subscriptions.
    #[must_use]
    pub fn store(&self) -> Arc<SnapshotStore> {
        Arc::clone(&self.store)
    }

    /// The imperative control surface (terminate, instance drill-down).
    #[must_use]
    pub fn controller(&self) -> Controller {
        self.controller.clone()
    }

    /// Engine counters.
    #[must_use]
    pub const fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Registers an observer for cycle-level failures.
    #[must_use]
    pub fn subscribe_errors(&self) -> broadcast::Receiver<CycleFailure> {
        self.error_tx.subscribe()
    }

    /// Gracefully stops the collection loop: the timer stops, any in-flight
    /// cycle finishes, then the loop task exits.
    ///
    /// # Errors
    /// Returns an error if the loop task panicked or was cancelled.
    pub async fn shutdown(mut self) -> Result<()> {
        tracing::info!(id = %self.id, "engine shutdown requested");
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| EngineError::shutdown(format!("loop task join failed: {e}")))?;
        }
        Ok(())
    }
}

impl Drop for MonitorEngine {
    fn drop(&mut self) {
        // An engine dropped without shutdown() still stops ticking.
        let _ = self.shutdown_tx.send(true);
    }
}

impl std::fmt::Debug for MonitorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorEngine")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// State owned exclusively by the loop task: the sampler, the builder with
/// its per-pid baseline cache, and the tick schedule.
struct CollectionLoop<S> {
    id: EngineId,
    interval: Duration,
    sampler: S,
    builder: SnapshotBuilder,
    filter: Option<NameFilter>,
    store: Arc<SnapshotStore>,
    metrics: EngineMetrics,
    error_tx: broadcast::Sender<CycleFailure>,
    shutdown_rx: watch::Receiver<bool>,
}

/// What woke the loop up.
enum Wake {
    Tick,
    Signal,
    Closed,
}

impl<S: Sampler> CollectionLoop<S> {
    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(id = %self.id, interval = ?self.interval, "collection loop started");

        loop {
            let wake = tokio::select! {
                changed = self.shutdown_rx.changed() => match changed {
                    Ok(()) => Wake::Signal,
                    Err(_) => Wake::Closed,
                },
                _ = ticker.tick() => Wake::Tick,
            };
            match wake {
                Wake::Tick => self.run_cycle(),
                Wake::Signal => {
                    if *self.shutdown_rx.borrow() {
                        break;
                    }
                }
                // Every engine handle is gone; nobody can read results.
                Wake::Closed => break,
            }
        }

        tracing::info!(
            id = %self.id,
            cycles = self.metrics.cycles_total(),
            failed = self.metrics.cycles_failed(),
            "collection loop stopped"
        );
    }

    /// One cycle: sample → build → publish.
    ///
    /// Runs unlocked; only the finished snapshot crosses into the store's
    /// critical section.
    fn run_cycle(&mut self) {
        let started = Instant::now();
        match self.sampler.collect() {
            Ok(mut samples) => {
                if let Some(filter) = &self.filter {
                    samples.retain(|s| filter(&s.name));
                }
                let count = samples.len();
                let snapshot = self.builder.build(samples);
                tracing::debug!(
                    id = %self.id,
                    sequence = snapshot.sequence,
                    processes = count,
                    "publishing snapshot"
                );
                self.store.publish(snapshot);

                let duration = started.elapsed();
                if duration > self.interval {
                    let dropped = (duration.as_nanos() / self.interval.as_nanos().max(1)) as u64;
                    self.metrics.record_dropped_ticks(dropped);
                    tracing::debug!(id = %self.id, dropped, "cycle overran the interval");
                }
                self.metrics.record_cycle(duration, count);
            }
            Err(e) => {
                self.metrics.record_failure();
                tracing::warn!(id = %self.id, error = %e, "cycle failed, keeping previous snapshot");
                let _ = self.error_tx.send(CycleFailure {
                    message: e.to_string(),
                    timestamp: SystemTime::now(),
                });
            }
        }
    }
}
