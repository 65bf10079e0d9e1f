//! System clock adjustment
//!
//! [`IClockSetter`] is the worker's seam for applying a retrieved time.
//! [`DateUtilityClock`] delegates to the system `date` utility, the same
//! facility an administrator would use by hand:
//!
//! ```text
//! date -u -s @<unix-seconds>.<nanoseconds>
//! ```
//!
//! How the process obtains the right to do so (root, `CAP_SYS_TIME`, a
//! setuid helper) is deliberately left to the environment.

use std::ffi::OsString;
use std::io::ErrorKind;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ntpsync_core::domain::CLOCK_UTILITY;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::WorkerError;

/// Name of the utility invoked by default.
pub const DATE_UTILITY: &str = CLOCK_UTILITY;

/// Fragments of `date` diagnostics that indicate missing privileges.
const PERMISSION_MARKERS: &[&str] = &[
    "operation not permitted",
    "permission denied",
    "must be root",
    "not privileged",
];

/// Port trait for setting the system clock
#[async_trait]
pub trait IClockSetter: Send + Sync {
    /// Sets the system clock to `time`
    async fn set_time(&self, time: DateTime<Utc>) -> Result<(), WorkerError>;
}

/// Clock setter backed by the `date` command-line utility
#[derive(Debug, Clone)]
pub struct DateUtilityClock {
    program: OsString,
    leading_args: Vec<OsString>,
}

impl DateUtilityClock {
    /// Uses `date` from `PATH`
    pub fn new() -> Self {
        Self::with_program(DATE_UTILITY, Vec::<OsString>::new())
    }

    /// Uses `program`, invoked as `program <leading_args...> -u -s @<secs>`
    pub fn with_program<I, S>(program: impl Into<OsString>, leading_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            leading_args: leading_args.into_iter().map(Into::into).collect(),
        }
    }

    /// The program that will be executed
    pub fn program(&self) -> &OsString {
        &self.program
    }
}

impl Default for DateUtilityClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Classifies a failed `date` invocation from its exit code and stderr
fn classify_failure(code: Option<i32>, stderr: &str) -> WorkerError {
    let lowered = stderr.to_lowercase();
    let detail = match code {
        Some(c) => format!("exit status {c}: {}", stderr.trim()),
        None => format!("terminated by signal: {}", stderr.trim()),
    };
    if PERMISSION_MARKERS.iter().any(|m| lowered.contains(m)) {
        WorkerError::NoPrivilege(detail)
    } else {
        WorkerError::ClockFailed(detail)
    }
}

/// `date -s` argument for `time`, keeping the fraction of a second
fn date_stamp(time: DateTime<Utc>) -> String {
    format!("@{}.{:09}", time.timestamp(), time.timestamp_subsec_nanos())
}

#[async_trait]
impl IClockSetter for DateUtilityClock {
    async fn set_time(&self, time: DateTime<Utc>) -> Result<(), WorkerError> {
        let stamp = date_stamp(time);
        debug!(program = ?self.program, stamp = %stamp, "Invoking clock utility");

        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .args(["-u", "-s", stamp.as_str()])
            .kill_on_drop(true)
            .output()
            .await;

        let output = match output {
            Ok(o) => o,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(WorkerError::UtilityMissing(
                    self.program.to_string_lossy().into_owned(),
                ));
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(WorkerError::NoPrivilege(format!(
                    "cannot execute {}: {e}",
                    self.program.to_string_lossy()
                )));
            }
            Err(e) => return Err(WorkerError::Io(e)),
        };

        if output.status.success() {
            info!(new_time = %time.to_rfc3339(), "System clock set");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(classify_failure(output.status.code(), &stderr))
        }
    }
}
