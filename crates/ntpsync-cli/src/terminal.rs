//! Terminal adapters for the controller's output ports
//!
//! [`TerminalSink`] renders notifications, the progress line and the
//! elevation prompt; [`TerminalNavigator`] prints the informational pages.
//! Both honour `--json`.

use std::io::{self, IsTerminal, Write};

use anyhow::Context;
use async_trait::async_trait;
use ntpsync_core::ports::{
    Destination, ElevationChoice, ElevationPrompt, INavigator, INotificationSink, Notification,
    NotificationKind,
};
use tracing::{debug, warn};

use crate::output::{event_json, get_formatter, OutputFormat, OutputFormatter};

/// Project page opened by `donate` and listed by `about`.
pub const PROJECT_URL: &str = env!("CARGO_PKG_REPOSITORY");

// ============================================================================
// Notification sink
// ============================================================================

/// Notification sink writing to stdout/stderr
pub struct TerminalSink {
    format: OutputFormat,
    quiet: bool,
    interactive: bool,
}

impl TerminalSink {
    /// Creates a sink
    ///
    /// With `interactive`, the elevation prompt asks for an answer when stdin
    /// is a terminal and the output is human-readable. Otherwise it only
    /// prints what the user can do.
    pub fn new(format: OutputFormat, quiet: bool, interactive: bool) -> Self {
        Self {
            format,
            quiet,
            interactive: interactive && !format.is_json() && io::stdin().is_terminal(),
        }
    }

    fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format)
    }
}

#[async_trait]
impl INotificationSink for TerminalSink {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        let formatter = self.formatter();
        if self.format.is_json() {
            formatter.print_json(&event_json("notification", notification)?);
            return Ok(());
        }

        match notification.kind {
            NotificationKind::TimeSet { .. } => formatter.success(&notification.body),
            _ => formatter.error(&format!("{}: {}", notification.title, notification.body)),
        }
        Ok(())
    }

    async fn prompt_elevation(&self, prompt: &ElevationPrompt) -> anyhow::Result<ElevationChoice> {
        let formatter = self.formatter();
        if self.format.is_json() {
            let mut json = event_json("elevation_prompt", prompt)?;
            json["choice"] = serde_json::to_value(ElevationChoice::Declined)?;
            formatter.print_json(&json);
            return Ok(ElevationChoice::Declined);
        }

        formatter.warn(&format!("{}: {}", prompt.title, prompt.message));
        if !self.interactive {
            for step in &prompt.remediation {
                formatter.info(&format!("- {step}"));
            }
            return Ok(ElevationChoice::Declined);
        }

        let accepted = tokio::task::spawn_blocking(read_confirmation)
            .await
            .context("Prompt task failed")?
            .context("Failed to read answer from stdin")?;

        if accepted {
            formatter.info("To set the clock, do one of the following and sync again:");
            for step in &prompt.remediation {
                formatter.info(&format!("- {step}"));
            }
            Ok(ElevationChoice::Accepted)
        } else {
            debug!("Elevation declined");
            Ok(ElevationChoice::Declined)
        }
    }

    async fn show_progress(&self, visible: bool) -> anyhow::Result<()> {
        let formatter = self.formatter();
        if self.format.is_json() {
            formatter.print_json(&serde_json::json!({"event": "progress", "active": visible}));
        } else if visible && !self.quiet {
            formatter.info("Synchronizing time...");
        }
        Ok(())
    }
}

fn read_confirmation() -> io::Result<bool> {
    print!("Grant privileges? [y/N] ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(is_yes(&input))
}

fn is_yes(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

// ============================================================================
// Navigator
// ============================================================================

/// Navigator printing the informational pages
pub struct TerminalNavigator {
    format: OutputFormat,
}

impl TerminalNavigator {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl INavigator for TerminalNavigator {
    fn open(&self, destination: Destination) {
        let formatter = get_formatter(self.format);
        let lines = page(destination);

        if self.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "event": "navigate",
                "destination": destination,
                "lines": lines,
                "url": (destination != Destination::Help).then_some(PROJECT_URL),
            }));
            return;
        }

        for line in &lines {
            formatter.info(line);
        }

        if destination == Destination::Donations {
            if let Err(e) = webbrowser::open(PROJECT_URL) {
                warn!(error = %e, url = PROJECT_URL, "Could not open browser");
                formatter.info(&format!("Open {PROJECT_URL} in your browser"));
            }
        }
    }
}

/// Text of an informational page
fn page(destination: Destination) -> Vec<String> {
    match destination {
        Destination::Help => vec![
            "ntpsync sets the system clock from an NTP time server.".to_string(),
            String::new(),
            "sync     query the configured server and set the clock".to_string(),
            "shell    interactive menu (sync, help, about, donate, status)".to_string(),
            "config   show, validate or locate the configuration file".to_string(),
            String::new(),
            "Setting the clock needs root or CAP_SYS_TIME; without it you".to_string(),
            "will be told how to grant the privilege.".to_string(),
        ],
        Destination::About => vec![
            format!("NTPSync {}", env!("CARGO_PKG_VERSION")),
            format!("License: {}", env!("CARGO_PKG_LICENSE")),
            format!("Homepage: {PROJECT_URL}"),
        ],
        Destination::Donations => vec![
            "NTPSync is free software maintained by volunteers.".to_string(),
            format!("Support the project at {PROJECT_URL}"),
        ],
    }
}
