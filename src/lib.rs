// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! Vigia: process data collection and aggregation engine.
//!
//! A background collection loop samples the OS process table at a fixed
//! cadence, aggregates instances by executable name, and publishes
//! immutable versioned snapshots. Consumers pull the latest snapshot,
//! subscribe to publishes, drill into per-pid detail, or terminate a
//! selected process.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use vigia::prelude::*;
//!
//! # async fn run() -> vigia::core::Result<()> {
//! let engine = vigia::spawn_monitor(MonitorConfig::default())?;
//! let store = engine.store();
//! let mut publishes = store.subscribe();
//! while let Ok(snapshot) = publishes.recv().await {
//!     println!("seq {}: {} processes", snapshot.sequence, snapshot.pid_count());
//! }
//! engine.shutdown().await
//! # }
//! ```

pub use vigia_core as core;
pub use vigia_platform as platform;

/// Prelude module for common imports.
pub mod prelude {
    pub use vigia_core::{
        Controller, EngineError, EngineId, MonitorConfig, MonitorEngine, ProcessControl,
        ProcessState, Sampler, Snapshot, SnapshotStore, TerminateError,
    };
    #[cfg(target_os = "linux")]
    pub use vigia_platform::ProcSampler;
    #[cfg(unix)]
    pub use vigia_platform::SignalControl;
}

/// Spawns a monitor engine wired to this platform's process-table sampler
/// and signal-based control.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
/// Returns an error if the configuration is invalid.
#[cfg(target_os = "linux")]
pub fn spawn_monitor(
    config: vigia_core::MonitorConfig,
) -> vigia_core::Result<vigia_core::MonitorEngine> {
    vigia_core::MonitorEngine::spawn(
        config,
        vigia_platform::ProcSampler::new(),
        std::sync::Arc::new(vigia_platform::SignalControl::new()),
    )
}
