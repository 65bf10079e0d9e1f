//! Controller error types

use ntpsync_core::domain::DomainError;
use thiserror::Error;

/// Errors returned by controller operations
///
/// None of these leave the progress state stuck: a failed submission is
/// resolved through the normal outcome path before the error is returned.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The configured time server could not be read
    #[error("failed to read the configured time server: {0:#}")]
    Preferences(anyhow::Error),

    /// The worker refused the command
    #[error("time sync worker unavailable: {0:#}")]
    WorkerUnavailable(anyhow::Error),

    /// A progress transition was rejected
    #[error(transparent)]
    InvalidState(#[from] DomainError),
}
