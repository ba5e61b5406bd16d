//! Test infrastructure for the engine.
//!
//! Loop-level scenarios run against scripted mock samplers, so every
//! timing and failure mode is reproducible without touching the OS.

pub mod cycle;

pub use mocks::{MockControl, MockSampler};
