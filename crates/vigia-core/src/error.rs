//! Error types for vigia-core.
//!
//! All errors are explicit; the engine never panics on a bad cycle.

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by the collection engine.
///
/// Per-process read failures never surface here: the sampler absorbs them
/// and returns a partial sample set. Only whole-cycle and lifecycle
/// failures are represented.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration error during engine construction.
    #[error("configuration error: {0}")]
    Config(String),

    /// The sampler failed for an entire cycle (OS API unavailable).
    #[error("sampler error: {0}")]
    Sampler(String),

    /// A whole collection cycle failed; the previous snapshot stays current.
    #[error("cycle error: {0}")]
    Cycle(String),

    /// Invalid state for the requested operation.
    #[error("invalid state: {0}")]
    State(String),

    /// Shutdown error (loop task panicked or was cancelled).
    #[error("shutdown error: {0}")]
    Shutdown(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (should not occur in production).
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a sampler error.
    #[must_use]
    pub fn sampler(msg: impl Into<String>) -> Self {
        Self::Sampler(msg.into())
    }

    /// Creates a cycle error.
    #[must_use]
    pub fn cycle(msg: impl Into<String>) -> Self {
        Self::Cycle(msg.into())
    }

    /// Creates a state error.
    #[must_use]
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Creates a shutdown error.
    #[must_use]
    pub fn shutdown(msg: impl Into<String>) -> Self {
        Self::Shutdown(msg.into())
    }

    /// Returns true if the collection loop can continue after this error.
    ///
    /// Cycle-level failures are recoverable: the loop logs them, keeps the
    /// last-known snapshot current, and proceeds to the next tick.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Sampler(_) | Self::Cycle(_) | Self::Io(_))
    }

    /// Returns true if this error requires tearing the engine down.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Internal(_))
    }
}

/// Errors surfaced synchronously to callers of `Controller::terminate`.
///
/// Termination is never retried by the engine; a failed attempt is reported
/// once and the caller may retry explicitly.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TerminateError {
    /// The pid is absent from the latest snapshot or already exited.
    #[error("process not found: pid {0}")]
    NotFound(u32),

    /// The caller lacks the rights to signal this process.
    #[error("permission denied: pid {0}")]
    PermissionDenied(u32),

    /// Any other OS-level refusal.
    #[error("termination failed: pid {pid}: {reason}")]
    Failed {
        /// The pid that could not be terminated.
        pid: u32,
        /// OS-reported reason.
        reason: String,
    },
}

impl TerminateError {
    /// Creates a termination failure with an OS-reported reason.
    #[must_use]
    pub fn failed(pid: u32, reason: impl Into<String>) -> Self {
        Self::Failed {
            pid,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::config("interval must be positive");
        assert_eq!(
            err.to_string(),
            "configuration error: interval must be positive"
        );
    }

    #[test]
    fn test_error_recoverable() {
        assert!(EngineError::cycle("proc unreadable").is_recoverable());
        assert!(EngineError::sampler("enumeration failed").is_recoverable());
        assert!(!EngineError::config("bad interval").is_recoverable());
    }

    #[test]
    fn test_error_fatal() {
        assert!(EngineError::config("bad interval").is_fatal());
        assert!(!EngineError::cycle("transient").is_fatal());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: EngineError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_terminate_error_display() {
        assert_eq!(
            TerminateError::NotFound(42).to_string(),
            "process not found: pid 42"
        );
        assert_eq!(
            TerminateError::PermissionDenied(1).to_string(),
            "permission denied: pid 1"
        );
        let err = TerminateError::failed(7, "EINVAL");
        assert!(err.to_string().contains("pid 7"));
        assert!(err.to_string().contains("EINVAL"));
    }

    #[test]
    fn test_terminate_error_eq() {
        assert_eq!(TerminateError::NotFound(1), TerminateError::NotFound(1));
        assert_ne!(
            TerminateError::NotFound(1),
            TerminateError::PermissionDenied(1)
        );
    }
}
