//! Wiring of worker, session and adapters for one CLI invocation

use std::sync::Arc;

use anyhow::Result;
use ntpsync_controller::{Controller, ControllerDeps, ControllerSession, ControllerSettings};
use ntpsync_core::domain::ServerAddress;
use ntpsync_core::ports::FileProgressStore;
use ntpsync_worker::{TimeSyncWorker, WorkerHandle};
use tracing::{info, warn};

use crate::commands::CliContext;
use crate::preferences::ConfigPreferenceStore;
use crate::terminal::{TerminalNavigator, TerminalSink};

/// A running worker plus everything a controller needs to attach
pub struct App {
    session: Arc<ControllerSession>,
    deps: ControllerDeps,
    settings: ControllerSettings,
    worker: WorkerHandle,
}

impl App {
    /// Loads configuration, starts the worker and restores progress state
    ///
    /// `interactive` allows the elevation prompt to ask for an answer.
    pub fn start(
        ctx: &CliContext,
        server_override: Option<ServerAddress>,
        interactive: bool,
    ) -> Result<Self> {
        let config = ctx.config();
        for error in config.validate() {
            warn!(field = %error.field, message = %error.message, "Configuration problem");
        }

        let worker = TimeSyncWorker::from_config(&config).spawn()?;
        let progress_path = FileProgressStore::default_path();
        info!(path = %progress_path.display(), "Using progress state file");
        let session = ControllerSession::new(Arc::new(FileProgressStore::new(progress_path)));

        let deps = ControllerDeps {
            worker: Arc::new(worker.client()),
            preferences: Arc::new(ConfigPreferenceStore::new(
                ctx.config_path.clone(),
                server_override,
            )),
            sink: Arc::new(TerminalSink::new(ctx.format, ctx.quiet, interactive)),
            navigator: Arc::new(TerminalNavigator::new(ctx.format)),
        };

        Ok(Self {
            session,
            deps,
            settings: ControllerSettings::from_config(&config),
            worker,
        })
    }

    pub fn session(&self) -> &Arc<ControllerSession> {
        &self.session
    }

    /// Attaches a new controller instance to the shared session
    pub async fn attach(&self) -> Controller {
        Controller::attach(Arc::clone(&self.session), self.deps.clone(), self.settings).await
    }

    /// Stops the worker thread
    pub async fn shutdown(self) {
        self.worker.shutdown().await;
    }
}
