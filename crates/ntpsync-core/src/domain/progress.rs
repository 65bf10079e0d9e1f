//! Controller progress state
//!
//! The progress state backs the visible "in progress" indicator. It is
//! serializable so that it can be retained outside any particular
//! controller instance and re-applied when a controller is recreated.
//!
//! ## State Machine
//!
//! ```text
//! Idle ──begin(id)──→ Active{id}
//!   ↑                     │
//!   └────finish(id)───────┘   (finish with another id is a no-op)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::RequestId;

/// Progress of the controller's single outstanding request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProgressState {
    /// No request outstanding
    #[default]
    Idle,
    /// A request has been dispatched and no outcome received yet
    Active {
        /// The outstanding request
        request_id: RequestId,
        /// When it was dispatched
        started_at: DateTime<Utc>,
    },
}

impl ProgressState {
    /// Returns true while a request is outstanding
    pub fn is_active(&self) -> bool {
        matches!(self, ProgressState::Active { .. })
    }

    /// The outstanding request, if any
    pub fn pending_request(&self) -> Option<RequestId> {
        match self {
            ProgressState::Active { request_id, .. } => Some(*request_id),
            ProgressState::Idle => None,
        }
    }

    /// Transition `Idle → Active`
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` if a request is already active.
    /// Callers that replace an outstanding request must [`reset`](Self::reset)
    /// first.
    pub fn begin(&mut self, request_id: RequestId, now: DateTime<Utc>) -> Result<(), DomainError> {
        if let ProgressState::Active { request_id: current, .. } = self {
            return Err(DomainError::InvalidState {
                from: format!("active({current})"),
                to: format!("active({request_id})"),
            });
        }
        *self = ProgressState::Active {
            request_id,
            started_at: now,
        };
        Ok(())
    }

    /// Transition `Active → Idle` for the matching request
    ///
    /// Returns true if the state changed. An outcome for any other request
    /// leaves the state untouched.
    pub fn finish(&mut self, request_id: RequestId) -> bool {
        match self {
            ProgressState::Active { request_id: current, .. } if *current == request_id => {
                *self = ProgressState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Unconditionally returns to `Idle`, yielding the abandoned request
    pub fn reset(&mut self) -> Option<RequestId> {
        let abandoned = self.pending_request();
        *self = ProgressState::Idle;
        abandoned
    }
}

impl std::fmt::Display for ProgressState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressState::Idle => write!(f, "idle"),
            ProgressState::Active { request_id, .. } => write!(f, "active ({})", request_id),
        }
    }
}
