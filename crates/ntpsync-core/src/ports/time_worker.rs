//! Time worker port (driven/secondary port)
//!
//! The worker runs in its own execution context. The controller only ever
//! hands it a [`SyncCommand`]; the outcome comes back through the reply
//! address embedded in the command.

use crate::domain::SyncCommand;

/// Port trait for submitting sync commands to the background worker
///
/// ## Implementation Notes
///
/// - `submit` must not block: it queues the command and returns.
/// - An error means the worker is no longer accepting commands. The
///   command (and with it the reply address) is dropped, which the
///   dispatcher observes as a dropped reply.
/// - Implementations must answer every accepted command exactly once.
pub trait ITimeWorker: Send + Sync {
    /// Queues a command for execution
    fn submit(&self, command: SyncCommand) -> anyhow::Result<()>;
}
