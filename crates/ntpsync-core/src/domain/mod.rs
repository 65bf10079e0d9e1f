//! Domain entities and business logic
//!
//! This module contains the core domain types for NTPSync:
//! - Newtypes for request identifiers and validated server addresses
//! - The command descriptor and its single-use reply channel
//! - The outcome taxonomy reported by the worker
//! - The controller-owned progress state
//! - Domain-specific error types

pub mod command;
pub mod errors;
pub mod newtypes;
pub mod outcome;
pub mod progress;

// Re-export commonly used types
pub use command::{reply_channel, PendingReply, ReplyAddress, ReplyDropped, SyncAction, SyncCommand};
pub use errors::DomainError;
pub use newtypes::*;
pub use outcome::{SyncOutcome, CLOCK_UTILITY};
pub use progress::ProgressState;
