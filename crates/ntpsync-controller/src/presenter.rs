//! Outcome presentation
//!
//! Turns a [`SyncOutcome`] into what the user should see. The mapping is
//! pure and total: every outcome maps to exactly one [`Presentation`], and the
//! same outcome always maps to the same class of presentation.
//!
//! | Outcome          | Presentation                                  |
//! |------------------|-----------------------------------------------|
//! | `Okay(t)`        | notice containing `t` (RFC 3339)              |
//! | `Error`          | generic failure notice                        |
//! | `ServerTimeout`  | timeout notice                                |
//! | `NoPrivilege`    | interactive elevation prompt                  |
//! | `UtilityMissing` | notice naming the `date` utility              |

use ntpsync_core::domain::{SyncOutcome, CLOCK_UTILITY};
use ntpsync_core::ports::{
    ElevationPrompt, Notification, NotificationKind, NotificationPriority,
};
use serde::Serialize;

/// What the controller hands to the notification sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "presentation", rename_all = "snake_case")]
pub enum Presentation {
    /// A passive notification
    Notice(Notification),
    /// An interactive prompt offering to obtain privileges
    Elevation(ElevationPrompt),
}

impl Presentation {
    /// Returns true for [`Presentation::Elevation`]
    pub fn is_interactive(&self) -> bool {
        matches!(self, Presentation::Elevation(_))
    }
}

/// Maps an outcome to its presentation
pub fn present(outcome: &SyncOutcome) -> Presentation {
    match outcome {
        SyncOutcome::Okay { new_time } => Presentation::Notice(Notification::new(
            NotificationKind::TimeSet {
                new_time: *new_time,
            },
            "Time synchronized",
            format!("Time was set to {}", new_time.to_rfc3339()),
        )),
        SyncOutcome::Error => Presentation::Notice(
            Notification::new(
                NotificationKind::SyncFailed,
                "Time sync failed",
                "The time could not be retrieved or applied.",
            )
            .with_priority(NotificationPriority::High),
        ),
        SyncOutcome::ServerTimeout => Presentation::Notice(
            Notification::new(
                NotificationKind::ServerTimeout,
                "Server timeout",
                "The time server did not answer in time.",
            )
            .with_priority(NotificationPriority::High),
        ),
        SyncOutcome::NoPrivilege => Presentation::Elevation(elevation_prompt()),
        SyncOutcome::UtilityMissing => Presentation::Notice(
            Notification::new(
                NotificationKind::UtilityMissing {
                    utility: CLOCK_UTILITY.to_string(),
                },
                "Utility missing",
                format!(
                    "The '{CLOCK_UTILITY}' utility needed to set the system clock was not found."
                ),
            )
            .with_priority(NotificationPriority::High),
        ),
    }
}

fn elevation_prompt() -> ElevationPrompt {
    ElevationPrompt {
        title: "Root access required".to_string(),
        message: "Setting the system clock requires elevated privileges. Grant them now?"
            .to_string(),
        remediation: vec![
            "Run ntpsync with root privileges, e.g. `sudo ntpsync sync`".to_string(),
            format!("Or allow your user to run `{CLOCK_UTILITY}` through sudo"),
            "Or grant the CAP_SYS_TIME capability to the process setting the clock".to_string(),
        ],
    }
}
