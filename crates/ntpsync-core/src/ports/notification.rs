//! Notification sink port (driven/secondary port)
//!
//! This module defines the interface the controller uses to surface
//! outcomes and progress to the user. Implementations may print to a
//! terminal, post desktop notifications, or record calls in tests.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because delivery is adapter-specific.
//! - Notifications are fire-and-forget; the caller does not wait for
//!   user interaction.
//! - The elevation prompt is the one interactive call: it is distinct
//!   from a passive notification and returns the user's choice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Notification
// ============================================================================

/// Priority level for a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    /// Low priority, may not be shown immediately
    Low,
    /// Normal priority
    #[default]
    Normal,
    /// High priority, used for failures
    High,
}

impl std::fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Normal => "normal",
            NotificationPriority::High => "high",
        };
        write!(f, "{}", s)
    }
}

/// Structured classification of a passive notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationKind {
    /// The clock was set
    TimeSet {
        /// The new clock value, exactly as reported by the worker
        new_time: DateTime<Utc>,
    },
    /// Generic failure
    SyncFailed,
    /// The time server did not answer
    ServerTimeout,
    /// A required system facility is missing
    UtilityMissing {
        /// Name of the missing facility
        utility: String,
    },
}

/// A notification to display to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Structured kind, for sinks that render their own text
    pub kind: NotificationKind,
    /// Title of the notification (short, descriptive)
    pub title: String,
    /// Body text with details about the event
    pub body: String,
    /// Priority level affecting how the notification is displayed
    pub priority: NotificationPriority,
}

impl Notification {
    /// Creates a new notification with `Normal` priority
    pub fn new(kind: NotificationKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            body: body.into(),
            priority: NotificationPriority::Normal,
        }
    }

    /// Sets the priority level
    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }
}

// ============================================================================
// Elevation prompt
// ============================================================================

/// Interactive prompt offering to obtain the right to set the clock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElevationPrompt {
    /// Title of the prompt
    pub title: String,
    /// Explanation shown to the user
    pub message: String,
    /// Steps shown if the user accepts
    pub remediation: Vec<String>,
}

/// The user's answer to an [`ElevationPrompt`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElevationChoice {
    /// The user wants to grant privileges
    Accepted,
    /// The user dismissed the prompt
    Declined,
}

// ============================================================================
// INotificationSink
// ============================================================================

/// Port trait for user-visible feedback from the controller
///
/// ## Implementation Notes
///
/// - `notify` shows a one-shot passive notification.
/// - `prompt_elevation` presents an interactive prompt and returns the
///   user's choice. Non-interactive sinks return `Declined`.
/// - `show_progress` shows or hides the indeterminate progress indicator.
/// - Implementations should handle delivery failures without panicking;
///   the controller logs returned errors and carries on.
#[async_trait::async_trait]
pub trait INotificationSink: Send + Sync {
    /// Shows a passive notification
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()>;

    /// Presents the privilege elevation prompt
    async fn prompt_elevation(&self, prompt: &ElevationPrompt) -> anyhow::Result<ElevationChoice>;

    /// Shows (`true`) or hides (`false`) the progress indicator
    async fn show_progress(&self, visible: bool) -> anyhow::Result<()>;
}
