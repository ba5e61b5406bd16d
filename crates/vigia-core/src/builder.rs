//! Snapshot builder: normalization and aggregation.
//!
//! Converts raw per-process counters into normalized records (CPU %,
//! memory, uptime) and groups them by executable name into aggregated
//! rows. The builder owns the per-pid previous-sample cache used for CPU
//! delta computation; the cache is never exposed to readers, so it needs
//! no synchronization.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant, SystemTime};

use crate::config::logical_cores;
use crate::types::{AggregatedRow, InstanceDetail, ProcessSample, ProcessState, Snapshot};

/// Start-time difference beyond which two samples with the same pid are
/// considered different processes. Tick-derived start times jitter by up
/// to one clock tick plus boot-time rounding.
const START_TIME_TOLERANCE: Duration = Duration::from_secs(1);

/// Elapsed wall time below which CPU deltas are meaningless.
const MIN_ELAPSED: Duration = Duration::from_millis(1);

/// Previous raw counters for one pid, the delta basis for the next tick.
#[derive(Debug, Clone)]
struct PrevSample {
    cpu_time: Duration,
    start_time: SystemTime,
}

/// Builds aggregated snapshots from raw sample sets, one per tick.
///
/// Owned solely by the collection loop; `build` mutates the internal
/// baseline cache and must see every tick exactly once.
#[derive(Debug)]
pub struct SnapshotBuilder {
    cpu_clamp_percent: f64,
    cores: usize,
    prev: HashMap<u32, PrevSample>,
    last_tick: Option<Instant>,
    next_sequence: u64,
}

impl SnapshotBuilder {
    /// Creates a builder with the given per-process CPU clamp bound.
    #[must_use]
    pub fn new(cpu_clamp_percent: f64) -> Self {
        Self::with_cores(cpu_clamp_percent, logical_cores())
    }

    /// Creates a builder with an explicit logical core count.
    #[must_use]
    pub fn with_cores(cpu_clamp_percent: f64, cores: usize) -> Self {
        Self {
            cpu_clamp_percent,
            cores: cores.max(1),
            prev: HashMap::new(),
            last_tick: None,
            next_sequence: 0,
        }
    }

    /// Sequence number the next built snapshot will carry.
    #[must_use]
    pub const fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Builds a snapshot from the current tick's raw samples.
    ///
    /// Zero processes yield a snapshot with empty rows, never an error.
    #[must_use]
    pub fn build(&mut self, samples: Vec<ProcessSample>) -> Snapshot {
        self.build_at(samples, SystemTime::now(), Instant::now())
    }

    /// Builds a snapshot at an explicit time point. Exposed for tests that
    /// need deterministic elapsed-time control.
    #[must_use]
    pub fn build_at(
        &mut self,
        samples: Vec<ProcessSample>,
        now: SystemTime,
        tick: Instant,
    ) -> Snapshot {
        let elapsed = self
            .last_tick
            .map(|last| tick.saturating_duration_since(last));
        self.last_tick = Some(tick);

        let mut next_prev = HashMap::with_capacity(samples.len());
        let mut groups: BTreeMap<String, Vec<InstanceDetail>> = BTreeMap::new();
        let mut cpu_sum_all = 0.0_f64;

        for sample in samples {
            let cpu_percent = self.cpu_percent_for(&sample, elapsed);
            cpu_sum_all += cpu_percent;

            // Entries for pids absent this tick drop out of the cache here.
            next_prev.insert(
                sample.pid,
                PrevSample {
                    cpu_time: sample.cpu_time,
                    start_time: sample.start_time,
                },
            );

            let uptime = now
                .duration_since(sample.start_time)
                .unwrap_or(Duration::ZERO);

            groups.entry(sample.name).or_default().push(InstanceDetail {
                pid: sample.pid,
                cpu_percent,
                memory_bytes: sample.memory_bytes,
                uptime,
                start_time: sample.start_time,
                state: sample.state,
            });
        }
        self.prev = next_prev;

        let rows = groups
            .into_iter()
            .map(|(name, mut instances)| {
                instances.sort_unstable_by_key(|i| i.pid);
                let state = instances
                    .iter()
                    .fold(ProcessState::Unknown, |acc, i| acc.max_activity(i.state));
                AggregatedRow {
                    name,
                    instance_count: instances.len(),
                    total_memory_bytes: instances.iter().map(|i| i.memory_bytes).sum(),
                    cpu_percent: instances.iter().map(|i| i.cpu_percent).sum(),
                    max_uptime: instances
                        .iter()
                        .map(|i| i.uptime)
                        .max()
                        .unwrap_or(Duration::ZERO),
                    state,
                    member_pids: instances.iter().map(|i| i.pid).collect(),
                    instances,
                }
            })
            .collect();

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        Snapshot {
            sequence,
            timestamp: now,
            system_cpu_percent: (cpu_sum_all / self.cores as f64).clamp(0.0, 100.0),
            rows,
        }
    }

    /// Per-process CPU percentage from the cumulative-counter delta.
    ///
    /// First observation of a pid (or a pid reused since the previous tick)
    /// establishes a baseline only and reports 0. Negative deltas floor to
    /// 0; the result is clamped to the configured bound.
    fn cpu_percent_for(&self, sample: &ProcessSample, elapsed: Option<Duration>) -> f64 {
        let Some(elapsed) = elapsed else {
            return 0.0;
        };
        if elapsed < MIN_ELAPSED {
            return 0.0;
        }
        let Some(prev) = self.prev.get(&sample.pid) else {
            return 0.0;
        };
        if !same_process(prev.start_time, sample.start_time) {
            tracing::trace!(
                pid = sample.pid,
                name = %sample.name,
                "pid reuse detected, resetting CPU baseline"
            );
            return 0.0;
        }

        let delta = sample.cpu_time.saturating_sub(prev.cpu_time);
        let percent = delta.as_secs_f64() / elapsed.as_secs_f64() * 100.0;
        percent.clamp(0.0, self.cpu_clamp_percent)
    }
}

/// Whether two start times belong to the same process instance.
fn same_process(a: SystemTime, b: SystemTime) -> bool {
    let diff = match a.duration_since(b) {
        Ok(d) => d,
        Err(e) => e.duration(),
    };
    diff <= START_TIME_TOLERANCE
}
