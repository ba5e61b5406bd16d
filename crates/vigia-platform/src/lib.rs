// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # vigia-platform
//!
//! OS integration for the vigia engine: process-table sampling and
//! signal-based process control.
//!
//! On Linux the sampler reads the /proc filesystem directly; other unix
//! targets get signal-based control with the stub sampler, and everything
//! else gets stubs for both seams.

#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(unix)]
pub mod control;
pub mod error;
#[cfg(target_os = "linux")]
pub mod linux;
pub mod unsupported;

#[cfg(unix)]
pub use control::SignalControl;
pub use error::{PlatformError, Result};
#[cfg(target_os = "linux")]
pub use linux::ProcSampler;
pub use unsupported::{UnsupportedControl, UnsupportedSampler};
