//! Worker error types
//!
//! Every failure inside the worker is resolved to a [`SyncOutcome`] before
//! it leaves the worker; nothing is propagated to the controller as an
//! error value.

use std::time::Duration;

use ntpsync_core::domain::SyncOutcome;
use thiserror::Error;

/// Errors that can occur while retrieving or applying network time
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The server name did not resolve to any address
    #[error("Failed to resolve time server {server}: {reason}")]
    Resolve {
        /// Server as configured
        server: String,
        /// Resolver message
        reason: String,
    },

    /// The server did not answer within the configured timeout
    #[error("Time server {server} did not answer within {after:?}")]
    Timeout {
        /// Server as configured
        server: String,
        /// Timeout that elapsed
        after: Duration,
    },

    /// The server answered with something that is not a usable time
    #[error("Invalid response from time server: {0}")]
    InvalidResponse(String),

    /// Socket or process I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The process may not set the system clock
    #[error("Not permitted to set the system clock: {0}")]
    NoPrivilege(String),

    /// The clock-setting utility is not installed
    #[error("Clock utility not found: {0}")]
    UtilityMissing(String),

    /// The clock-setting utility failed for another reason
    #[error("Failed to set the system clock: {0}")]
    ClockFailed(String),
}

impl From<&WorkerError> for SyncOutcome {
    fn from(err: &WorkerError) -> Self {
        match err {
            WorkerError::Timeout { .. } => SyncOutcome::ServerTimeout,
            WorkerError::NoPrivilege(_) => SyncOutcome::NoPrivilege,
            WorkerError::UtilityMissing(_) => SyncOutcome::UtilityMissing,
            WorkerError::Resolve { .. }
            | WorkerError::InvalidResponse(_)
            | WorkerError::Io(_)
            | WorkerError::ClockFailed(_) => SyncOutcome::Error,
        }
    }
}
