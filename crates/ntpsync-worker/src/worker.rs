//! Time sync worker
//!
//! The worker owns a dedicated OS thread running a current-thread tokio
//! runtime. Blocking network and process work happens there, never on the
//! controller's event loop. Commands arrive over an unbounded queue and are
//! processed one at a time.
//!
//! ## Flow
//!
//! ```text
//! WorkerClient::submit ──→ mpsc ──→ worker thread ──→ ITimeSource
//!                                        │              IClockSetter
//!                                        └──→ ReplyAddress::deliver (once)
//! ```
//!
//! Each command runs in its own task; if it panics, its reply address is
//! dropped with it and the dispatcher observes a dropped reply instead of
//! waiting forever.

use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::Context;
use ntpsync_core::config::Config;
use ntpsync_core::domain::{SyncCommand, SyncOutcome};
use ntpsync_core::ports::ITimeWorker;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::clock::{DateUtilityClock, IClockSetter};
use crate::sntp::{ITimeSource, SntpTimeSource};

/// Name given to the worker thread.
const WORKER_THREAD_NAME: &str = "ntpsync-worker";

/// Retrieves network time and applies it, producing exactly one outcome
pub struct TimeSyncWorker {
    source: Arc<dyn ITimeSource>,
    clock: Arc<dyn IClockSetter>,
}

impl TimeSyncWorker {
    /// Creates a worker from its two adapters
    pub fn new(source: Arc<dyn ITimeSource>, clock: Arc<dyn IClockSetter>) -> Self {
        Self { source, clock }
    }

    /// Creates a worker using SNTP and the system `date` utility
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(SntpTimeSource::new(config.sync_timeout())),
            Arc::new(DateUtilityClock::new()),
        )
    }

    /// Executes one command and returns its outcome
    pub async fn execute(&self, command: &SyncCommand) -> SyncOutcome {
        let server = command.server();
        let new_time = match self.source.fetch_time(server).await {
            Ok(t) => t,
            Err(e) => {
                warn!(request_id = %command.request_id(), server = %server, error = %e, "Time retrieval failed");
                return SyncOutcome::from(&e);
            }
        };

        match self.clock.set_time(new_time).await {
            Ok(()) => SyncOutcome::okay(new_time),
            Err(e) => {
                warn!(request_id = %command.request_id(), error = %e, "Setting the clock failed");
                SyncOutcome::from(&e)
            }
        }
    }

    /// Starts the worker on its own thread
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be created. A runtime that
    /// fails to start inside the thread is logged and leaves the worker
    /// disconnected, so every submission fails.
    pub fn spawn(self) -> anyhow::Result<WorkerHandle> {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let token = shutdown.clone();
        let worker = Arc::new(self);
        let thread = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime.block_on(run_loop(worker, rx, token)),
                    Err(e) => error!(error = %e, "Failed to build worker runtime"),
                }
            })
            .context("Failed to spawn worker thread")?;

        info!(thread = WORKER_THREAD_NAME, "Time sync worker started");

        Ok(WorkerHandle {
            client: WorkerClient { tx },
            shutdown,
            thread: Some(thread),
        })
    }
}

/// Worker main loop: one command at a time until cancelled or disconnected
async fn run_loop(
    worker: Arc<TimeSyncWorker>,
    mut rx: mpsc::UnboundedReceiver<SyncCommand>,
    shutdown: CancellationToken,
) {
    loop {
        let command = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                debug!("Worker shutdown requested");
                break;
            }
            next = rx.recv() => match next {
                Some(command) => command,
                None => {
                    debug!("All worker clients dropped");
                    break;
                }
            },
        };

        let request_id = command.request_id();
        info!(
            request_id = %request_id,
            action = %command.action(),
            server = %command.server(),
            "Processing time sync command"
        );

        let worker = Arc::clone(&worker);
        let task = tokio::spawn(async move {
            let outcome = worker.execute(&command).await;
            let (_, reply) = command.into_reply();
            let kind = outcome.kind();
            if reply.deliver(outcome) {
                info!(request_id = %request_id, outcome = kind, "Outcome delivered");
            } else {
                warn!(request_id = %request_id, outcome = kind, "Outcome had no receiver");
            }
        });

        if let Err(e) = task.await {
            error!(request_id = %request_id, error = %e, "Time sync task aborted before replying");
        }
    }

    // Queued commands are dropped here together with their reply addresses
    rx.close();
    while let Some(command) = rx.recv().await {
        debug!(request_id = %command.request_id(), "Dropping queued command on shutdown");
    }
    info!("Time sync worker stopped");
}

// ============================================================================
// Handles
// ============================================================================

/// Cloneable submission side of a running worker
#[derive(Debug, Clone)]
pub struct WorkerClient {
    tx: mpsc::UnboundedSender<SyncCommand>,
}

impl ITimeWorker for WorkerClient {
    fn submit(&self, command: SyncCommand) -> anyhow::Result<()> {
        let request_id = command.request_id();
        self.tx
            .send(command)
            .map_err(|_| anyhow::anyhow!("time sync worker has stopped"))?;
        debug!(request_id = %request_id, "Command queued for worker");
        Ok(())
    }
}

/// Owner of the worker thread
pub struct WorkerHandle {
    client: WorkerClient,
    shutdown: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// A client for submitting commands
    pub fn client(&self) -> WorkerClient {
        self.client.clone()
    }

    /// Stops the worker after the command in progress and joins its thread
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(thread) = self.thread.take() {
            match tokio::task::spawn_blocking(move || thread.join()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => error!("Worker thread panicked"),
                Err(e) => error!(error = %e, "Failed to join worker thread"),
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
