//! Sync outcome taxonomy
//!
//! The worker reports exactly one [`SyncOutcome`] per dispatched command.
//! Every variant except [`SyncOutcome::Okay`] is a terminal failure; none of
//! them is retried automatically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// System utility the worker uses to set the clock, named in
/// [`SyncOutcome::UtilityMissing`] notifications.
pub const CLOCK_UTILITY: &str = "date";

/// Result of one time synchronization attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The system clock was set to `new_time`
    Okay {
        /// Time the clock was set to, as retrieved from the server
        new_time: DateTime<Utc>,
    },
    /// Generic failure (resolution, I/O, malformed server reply, ...)
    Error,
    /// The time server did not answer in time
    ServerTimeout,
    /// The caller lacks the right to set the system clock
    NoPrivilege,
    /// The system facility used to set the clock ([`CLOCK_UTILITY`]) was not found
    UtilityMissing,
}

impl SyncOutcome {
    /// Creates a successful outcome
    pub fn okay(new_time: DateTime<Utc>) -> Self {
        SyncOutcome::Okay { new_time }
    }

    /// Returns true for [`SyncOutcome::Okay`]
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Okay { .. })
    }

    /// The new clock value carried by a successful outcome
    pub fn new_time(&self) -> Option<DateTime<Utc>> {
        match self {
            SyncOutcome::Okay { new_time } => Some(*new_time),
            _ => None,
        }
    }

    /// Short, stable label used in logs and JSON output
    pub fn kind(&self) -> &'static str {
        match self {
            SyncOutcome::Okay { .. } => "okay",
            SyncOutcome::Error => "error",
            SyncOutcome::ServerTimeout => "server_timeout",
            SyncOutcome::NoPrivilege => "no_privilege",
            SyncOutcome::UtilityMissing => "utility_missing",
        }
    }
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncOutcome::Okay { new_time } => write!(f, "okay ({})", new_time.to_rfc3339()),
            other => write!(f, "{}", other.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn okay_carries_time() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let outcome = SyncOutcome::okay(t);
        assert!(outcome.is_success());
        assert_eq!(outcome.new_time(), Some(t));
        assert_eq!(outcome.kind(), "okay");
    }

    #[test]
    fn failures_carry_no_time() {
        for outcome in [
            SyncOutcome::Error,
            SyncOutcome::ServerTimeout,
            SyncOutcome::NoPrivilege,
            SyncOutcome::UtilityMissing,
        ] {
            assert!(!outcome.is_success());
            assert!(outcome.new_time().is_none());
        }
    }

    #[test]
    fn serializes_tagged() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let json = serde_json::to_value(SyncOutcome::okay(t)).unwrap();
        assert_eq!(json["outcome"], "okay");
        assert_eq!(json["new_time"], "2024-01-01T00:00:00Z");

        let json = serde_json::to_value(SyncOutcome::NoPrivilege).unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "no_privilege"}));
    }

    #[test]
    fn deserializes_tagged() {
        let outcome: SyncOutcome =
            serde_json::from_str(r#"{"outcome":"server_timeout"}"#).unwrap();
        assert_eq!(outcome, SyncOutcome::ServerTimeout);
    }
}
