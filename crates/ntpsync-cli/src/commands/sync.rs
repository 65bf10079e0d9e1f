//! Sync command - Set the system clock once
//!
//! Provides the `ntpsync sync` CLI command which:
//! 1. Starts the worker and attaches a controller to the saved progress state
//! 2. Waits out a request left behind by an earlier run, if any
//! 3. Dispatches one time sync and handles events until it resolves
//!
//! The process exits with status 1 unless the clock was set.

use anyhow::{Context, Result};
use clap::Args;
use ntpsync_controller::{Controller, ControllerError};
use ntpsync_core::domain::ServerAddress;
use tracing::{info, warn};

use super::CliContext;
use crate::app::App;
use crate::output::get_formatter;

/// Sync command options
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Time server to query instead of the configured one (host or host:port)
    #[arg(long, value_name = "HOST")]
    pub server: Option<String>,
}

impl SyncCommand {
    /// Runs one sync; returns true if the clock was set
    pub async fn execute(&self, ctx: &CliContext) -> Result<bool> {
        let server = self
            .server
            .as_deref()
            .map(ServerAddress::new)
            .transpose()
            .context("Invalid --server value")?;

        let app = App::start(ctx, server, true)?;
        let mut controller = app.attach().await;
        let success = run_sync(&mut controller, ctx).await;

        drop(controller);
        app.shutdown().await;
        Ok(success)
    }
}

async fn run_sync(controller: &mut Controller, ctx: &CliContext) -> bool {
    if controller.progress().is_active() {
        get_formatter(ctx.format).info("Waiting for an earlier sync request to finish");
        drain(controller).await;
    }

    match controller.dispatch().await {
        Ok(result) => info!(request_id = %result.request_id(), "Sync dispatched"),
        // Already reported through the sink; nothing is in flight
        Err(ControllerError::Preferences(_)) => return false,
        // The request resolves as an error through the normal path
        Err(e) => warn!(error = %e, "Dispatch failed"),
    }

    drain(controller).await;
    controller
        .last_outcome()
        .map(|(_, outcome)| outcome.is_success())
        .unwrap_or(false)
}

/// Handles events until no request is in flight
async fn drain(controller: &mut Controller) {
    while controller.progress().is_active() {
        if !controller.step().await {
            break;
        }
    }
}
