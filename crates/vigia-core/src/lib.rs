// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # vigia-core
//!
//! Process data collection and aggregation engine.
//!
//! A background collection loop samples the operating system's process
//! table at a fixed cadence, normalizes CPU-time deltas into percentages,
//! groups instances by executable name, and publishes immutable versioned
//! snapshots through a thread-safe store:
//!
//! - [`Sampler`] / [`ProcessControl`] — the seams to the OS, implemented
//!   by platform crates
//! - [`SnapshotBuilder`] — normalization, aggregation, pid-reuse handling
//! - [`SnapshotStore`] — current/previous snapshot pair behind a short
//!   critical section, plus publish subscriptions
//! - [`MonitorEngine`] — the timer-driven collection loop with graceful
//!   shutdown
//! - [`Controller`] — terminate-with-revalidation and per-name drill-down
//!
//! ## Example
//!
//! ```rust,ignore
//! use vigia_core::{MonitorConfig, MonitorEngine};
//!
//! let engine = MonitorEngine::spawn(MonitorConfig::default(), sampler, control)?;
//! let store = engine.store();
//! let mut publishes = store.subscribe();
//! while let Ok(snapshot) = publishes.recv().await {
//!     println!("{} processes", snapshot.pid_count());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Allow significant_drop_tightening - overly aggressive for async code with locks
#![allow(clippy::significant_drop_tightening)]

pub mod builder;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod sampler;
pub mod store;
#[cfg(test)]
pub mod tests;
pub mod types;

pub use builder::SnapshotBuilder;
pub use config::{MIN_SAMPLE_INTERVAL, MonitorConfig, logical_cores};
pub use controller::Controller;
pub use engine::{CycleFailure, MonitorEngine, NameFilter};
pub use error::{EngineError, Result, TerminateError};
pub use metrics::EngineMetrics;
pub use sampler::{ProcessControl, Sampler};
pub use store::SnapshotStore;
pub use types::{
    AggregatedRow, EngineId, InstanceDetail, ProcessSample, ProcessState, Snapshot,
};
