//! Core data model: raw samples, aggregated rows and snapshots.
//!
//! Snapshots are immutable once built; the store hands out `Arc<Snapshot>`
//! so no consumer can mutate published data in place.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Unique identifier for an engine instance.
///
/// There is no process-wide singleton: every engine carries an explicit id
/// so log lines from multiple instances stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngineId(uuid::Uuid);

impl EngineId {
    /// Creates a new random engine ID.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for EngineId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EngineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheduler state of a process at sample time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    /// Running or runnable.
    Running,
    /// Interruptible sleep.
    Sleeping,
    /// Uninterruptible disk wait.
    DiskWait,
    /// Zombie (exited, not yet reaped).
    Zombie,
    /// Stopped or traced.
    Stopped,
    /// Unknown.
    Unknown,
}

impl ProcessState {
    /// Maps a `/proc/[pid]/stat` state character to a process state.
    #[must_use]
    pub const fn from_stat_char(c: char) -> Self {
        match c {
            'R' => Self::Running,
            'S' => Self::Sleeping,
            'D' => Self::DiskWait,
            'Z' => Self::Zombie,
            'T' | 't' => Self::Stopped,
            _ => Self::Unknown,
        }
    }

    /// Activity rank used when collapsing instance states into one row
    /// state. Higher means more active.
    const fn rank(self) -> u8 {
        match self {
            Self::Running => 5,
            Self::DiskWait => 4,
            Self::Sleeping => 3,
            Self::Stopped => 2,
            Self::Zombie => 1,
            Self::Unknown => 0,
        }
    }

    /// Returns the more active of two states.
    #[must_use]
    pub const fn max_activity(self, other: Self) -> Self {
        if self.rank() >= other.rank() { self } else { other }
    }
}

/// Raw per-process reading, one per OS process per tick.
///
/// `cpu_time` is the cumulative CPU time consumed since process start and
/// is monotonic per pid; `start_time` disambiguates pid reuse across ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSample {
    /// Process identifier. Unique at one instant, reused over time.
    pub pid: u32,
    /// Executable name; the aggregation key.
    pub name: String,
    /// Cumulative CPU time (user + system) since process start.
    pub cpu_time: Duration,
    /// Current resident memory.
    pub memory_bytes: u64,
    /// Process creation timestamp.
    pub start_time: SystemTime,
    /// Scheduler state at sample time.
    pub state: ProcessState,
}

/// Per-pid derived detail, retained alongside the aggregate so drill-down
/// views keep per-instance resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceDetail {
    /// Process identifier.
    pub pid: u32,
    /// Normalized CPU usage for this instance over the last tick.
    pub cpu_percent: f64,
    /// Resident memory.
    pub memory_bytes: u64,
    /// Time since process creation, measured at the snapshot timestamp.
    pub uptime: Duration,
    /// Process creation timestamp (used to detect pid reuse).
    pub start_time: SystemTime,
    /// Scheduler state at sample time.
    pub state: ProcessState,
}

/// One executable name's combined stats across all running instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    /// Executable name.
    pub name: String,
    /// Number of instances; always `member_pids.len()`.
    pub instance_count: usize,
    /// Sum of resident memory over all instances.
    pub total_memory_bytes: u64,
    /// Sum of per-instance CPU percentages.
    pub cpu_percent: f64,
    /// Uptime of the oldest instance.
    pub max_uptime: Duration,
    /// Most active state among the instances.
    pub state: ProcessState,
    /// Pids belonging to this row at aggregation time, sorted.
    pub member_pids: Vec<u32>,
    /// Per-instance detail, sorted by pid.
    pub instances: Vec<InstanceDetail>,
}

impl AggregatedRow {
    /// Checks the structural invariants of the row.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.instance_count == self.member_pids.len()
            && self.instance_count == self.instances.len()
            && self.total_memory_bytes == self.instances.iter().map(|i| i.memory_bytes).sum::<u64>()
    }
}

/// Immutable, versioned point-in-time view of aggregated process data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Monotonically increasing publish counter, starting at 0.
    pub sequence: u64,
    /// Wall-clock time the snapshot was built.
    pub timestamp: SystemTime,
    /// Whole-system CPU usage in `[0, 100]`, normalized by core count.
    pub system_cpu_percent: f64,
    /// Aggregated rows, one per distinct executable name. Insertion order
    /// carries no meaning; consumers re-sort as needed.
    pub rows: Vec<AggregatedRow>,
}

impl Snapshot {
    /// Returns the row for an executable name, if present.
    #[must_use]
    pub fn row(&self, name: &str) -> Option<&AggregatedRow> {
        self.rows.iter().find(|r| r.name == name)
    }

    /// Returns the per-instance detail for an executable name, ordered by
    /// pid. Empty when the name is absent.
    #[must_use]
    pub fn instances_of(&self, name: &str) -> &[InstanceDetail] {
        match self.row(name) {
            Some(row) => &row.instances,
            None => &[],
        }
    }

    /// Looks up the instance detail for a specific pid across all rows.
    #[must_use]
    pub fn find_pid(&self, pid: u32) -> Option<&InstanceDetail> {
        self.rows
            .iter()
            .flat_map(|r| r.instances.iter())
            .find(|i| i.pid == pid)
    }

    /// Total number of processes in this snapshot.
    #[must_use]
    pub fn pid_count(&self) -> usize {
        self.rows.iter().map(|r| r.member_pids.len()).sum()
    }

    /// Iterates over every pid present in the snapshot.
    pub fn pids(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows.iter().flat_map(|r| r.member_pids.iter().copied())
    }
}
