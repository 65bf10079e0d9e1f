//! Shell command - Interactive menu around a long-lived controller
//!
//! The controller runs on its own task while the shell reads stdin. The
//! `recreate` entry stops that controller and attaches a fresh one to the same
//! session; a sync in flight keeps its progress indicator and its outcome is
//! delivered to the new instance.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use ntpsync_controller::ControllerHandle;
use ntpsync_core::domain::{ProgressState, ServerAddress};
use ntpsync_core::ports::Destination;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::CliContext;
use crate::app::App;
use crate::output::{get_formatter, OutputFormatter};

/// Shell command options
#[derive(Debug, Args)]
pub struct ShellCommand {
    /// Time server to query instead of the configured one (host or host:port)
    #[arg(long, value_name = "HOST")]
    pub server: Option<String>,
}

/// One line of shell input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShellInput {
    Sync,
    Open(Destination),
    Recreate,
    Status,
    Menu,
    Quit,
    Empty,
}

impl ShellInput {
    fn parse(line: &str) -> Result<Self, String> {
        let input = match line.trim().to_ascii_lowercase().as_str() {
            "" => ShellInput::Empty,
            "s" | "sync" => ShellInput::Sync,
            "h" | "help" => ShellInput::Open(Destination::Help),
            "a" | "about" => ShellInput::Open(Destination::About),
            "d" | "donate" => ShellInput::Open(Destination::Donations),
            "r" | "recreate" => ShellInput::Recreate,
            "st" | "status" => ShellInput::Status,
            "?" | "m" | "menu" => ShellInput::Menu,
            "q" | "quit" | "exit" => ShellInput::Quit,
            other => return Err(other.to_string()),
        };
        Ok(input)
    }
}

const MENU: &[&str] = &[
    "sync      synchronize the clock now",
    "status    show whether a sync is in flight",
    "recreate  drop and re-attach the controller",
    "help      usage help",
    "about     version and license",
    "donate    support the project",
    "quit      leave the shell",
];

/// A controller instance running on its own task
struct RunningController {
    handle: ControllerHandle,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
    generation: u64,
}

impl RunningController {
    async fn start(app: &App) -> Self {
        let controller = app.attach().await;
        let handle = controller.handle();
        let generation = controller.generation();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(controller.run(shutdown.clone()));
        Self {
            handle,
            shutdown,
            task,
            generation,
        }
    }

    async fn stop(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Controller task ended abnormally");
        }
    }
}

impl ShellCommand {
    /// Execute the shell until `quit`, end of input or Ctrl-C
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let server = self
            .server
            .as_deref()
            .map(ServerAddress::new)
            .transpose()
            .context("Invalid --server value")?;

        let formatter = get_formatter(ctx.format);
        // stdin belongs to the menu, so the elevation prompt only prints hints
        let app = App::start(ctx, server, false)?;
        let mut controller = RunningController::start(&app).await;

        if !ctx.quiet {
            print_menu(formatter.as_ref());
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            if !ctx.format.is_json() {
                print!("ntpsync> ");
                std::io::stdout().flush().ok();
            }

            let line = tokio::select! {
                line = lines.next_line() => line.context("Failed to read from stdin")?,
                _ = tokio::signal::ctrl_c() => {
                    debug!("Interrupted");
                    None
                }
            };
            let Some(line) = line else {
                break;
            };

            match ShellInput::parse(&line) {
                Ok(ShellInput::Empty) => {}
                Ok(ShellInput::Sync) => {
                    controller.handle.request_sync();
                }
                Ok(ShellInput::Open(destination)) => {
                    controller.handle.navigate(destination);
                }
                Ok(ShellInput::Recreate) => {
                    let previous = controller.generation;
                    controller.stop().await;
                    controller = RunningController::start(&app).await;
                    formatter.success(&format!(
                        "Controller recreated (instance {} replaced {})",
                        controller.generation, previous
                    ));
                }
                Ok(ShellInput::Status) => {
                    print_status(formatter.as_ref(), ctx, app.session().progress());
                }
                Ok(ShellInput::Menu) => print_menu(formatter.as_ref()),
                Ok(ShellInput::Quit) => break,
                Err(unknown) => {
                    formatter.warn(&format!("Unknown command '{unknown}', type 'menu' for options"))
                }
            }
        }

        controller.stop().await;
        app.shutdown().await;
        Ok(())
    }
}

fn print_menu(formatter: &dyn OutputFormatter) {
    for entry in MENU {
        formatter.info(entry);
    }
}

fn print_status(formatter: &dyn OutputFormatter, ctx: &CliContext, progress: ProgressState) {
    if ctx.format.is_json() {
        formatter.print_json(&serde_json::json!({"event": "status", "progress": progress}));
        return;
    }
    match progress {
        ProgressState::Idle => formatter.info("Idle"),
        ProgressState::Active {
            request_id,
            started_at,
        } => formatter.info(&format!(
            "Synchronizing (request {request_id}, started {})",
            started_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
        )),
    }
}
