//! The controller event loop
//!
//! A [`Controller`] serializes every state transition on one task. User
//! requests and worker outcomes both arrive as [`ControllerEvent`]s on its
//! inbox; [`Controller::run`] handles them one at a time.
//!
//! ## State machine
//!
//! ```text
//!            dispatch (set Active, show indicator, submit)
//!   Idle ───────────────────────────────────────────────→ Active
//!    ▲                                                      │
//!    └──────── outcome for the pending request ─────────────┘
//!              (set Idle, hide indicator, present)
//! ```
//!
//! A recreated controller restores `Active` from the session and re-shows
//! the indicator. It neither re-dispatches nor invents an outcome; the reply
//! forwarder of the original dispatch routes the real outcome to it.
//!
//! ## Reply forwarder
//!
//! Each dispatch spawns a task that awaits the [`PendingReply`] under the
//! configured watchdog. A dropped reply address or an elapsed watchdog both
//! resolve the request as [`SyncOutcome::Error`], so the indicator never
//! stays up forever.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ntpsync_core::config::{Config, RedispatchPolicy};
use ntpsync_core::domain::{PendingReply, ProgressState, RequestId, SyncCommand, SyncOutcome};
use ntpsync_core::ports::{
    Destination, INavigator, INotificationSink, IPreferenceStore, ITimeWorker, Notification,
    NotificationKind, NotificationPriority,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::ControllerError;
use crate::presenter::{present, Presentation};
use crate::session::ControllerSession;

// ============================================================================
// Events and results
// ============================================================================

/// Input to the controller loop
#[derive(Debug)]
pub enum ControllerEvent {
    /// The user asked for a time sync
    SyncRequested,
    /// The user picked an informational menu entry
    Navigate(Destination),
    /// The worker answered (or the watchdog gave up on) a request
    Outcome {
        /// Request the outcome belongs to
        request_id: RequestId,
        /// The outcome
        outcome: SyncOutcome,
    },
}

/// What a dispatch attempt did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchResult {
    /// A new command was handed to the worker
    Dispatched(RequestId),
    /// A request was already in flight; nothing was sent
    Ignored(RequestId),
}

impl DispatchResult {
    /// The request this result refers to
    pub fn request_id(&self) -> RequestId {
        match self {
            DispatchResult::Dispatched(id) | DispatchResult::Ignored(id) => *id,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Adapters the controller drives
#[derive(Clone)]
pub struct ControllerDeps {
    pub worker: Arc<dyn ITimeWorker>,
    pub preferences: Arc<dyn IPreferenceStore>,
    pub sink: Arc<dyn INotificationSink>,
    pub navigator: Arc<dyn INavigator>,
}

/// Controller policy knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    /// What a dispatch does while a request is in flight
    pub redispatch: RedispatchPolicy,
    /// How long a reply may take before it is resolved as `Error`
    pub watchdog: Duration,
}

impl ControllerSettings {
    /// Reads the `controller` section of `config`
    pub fn from_config(config: &Config) -> Self {
        Self {
            redispatch: config.redispatch_policy(),
            watchdog: config.watchdog(),
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Cloneable input side of one controller instance
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl ControllerHandle {
    /// Asks the controller to start a sync; false if it no longer exists
    pub fn request_sync(&self) -> bool {
        self.tx.send(ControllerEvent::SyncRequested).is_ok()
    }

    /// Asks the controller to open `destination`; false if it no longer exists
    pub fn navigate(&self, destination: Destination) -> bool {
        self.tx.send(ControllerEvent::Navigate(destination)).is_ok()
    }

    /// Returns true once the controller has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ============================================================================
// Controller
// ============================================================================

/// One live controller instance attached to a [`ControllerSession`]
pub struct Controller {
    session: Arc<ControllerSession>,
    deps: ControllerDeps,
    settings: ControllerSettings,
    generation: u64,
    inbox_tx: mpsc::UnboundedSender<ControllerEvent>,
    inbox_rx: mpsc::UnboundedReceiver<ControllerEvent>,
    indicator_visible: bool,
    last_outcome: Option<(RequestId, SyncOutcome)>,
}

impl Controller {
    /// Creates an instance and registers it as the session's live receiver
    ///
    /// If the session's progress is `Active`, the indicator is shown right
    /// away. Outcomes that arrived while no instance was attached are then
    /// handled in arrival order.
    pub async fn attach(
        session: Arc<ControllerSession>,
        deps: ControllerDeps,
        settings: ControllerSettings,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (generation, parked) = session.attach(inbox_tx.clone());

        let mut controller = Self {
            session,
            deps,
            settings,
            generation,
            inbox_tx,
            inbox_rx,
            indicator_visible: false,
            last_outcome: None,
        };

        let progress = controller.session.progress();
        if let ProgressState::Active {
            request_id,
            started_at,
        } = progress
        {
            info!(request_id = %request_id, generation, "Sync in flight, restoring progress indicator");
            controller.set_indicator(true).await;

            if controller.session.claim_watch(request_id) {
                let elapsed = (Utc::now() - started_at).to_std().unwrap_or_default();
                let remaining = controller.settings.watchdog.saturating_sub(elapsed);
                spawn_orphan_watchdog(Arc::clone(&controller.session), request_id, remaining);
            }
        }

        for (request_id, outcome) in parked {
            controller.on_outcome(request_id, outcome).await;
        }

        controller
    }

    /// A handle for feeding events to this instance
    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle {
            tx: self.inbox_tx.clone(),
        }
    }

    /// The session this instance is attached to
    pub fn session(&self) -> &Arc<ControllerSession> {
        &self.session
    }

    /// This instance's registration generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The current progress state
    pub fn progress(&self) -> ProgressState {
        self.session.progress()
    }

    /// Returns true while this instance shows the progress indicator
    pub fn indicator_visible(&self) -> bool {
        self.indicator_visible
    }

    /// The most recent outcome this instance handled
    pub fn last_outcome(&self) -> Option<(RequestId, &SyncOutcome)> {
        self.last_outcome.as_ref().map(|(id, outcome)| (*id, outcome))
    }

    /// Number of events waiting in this instance's inbox
    pub fn queued_events(&self) -> usize {
        self.inbox_rx.len()
    }

    /// Handles events until `shutdown` is cancelled
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(generation = self.generation, "Controller loop started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!(generation = self.generation, "Controller shutdown requested");
                    break;
                }
                event = self.inbox_rx.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
            }
        }
        info!(generation = self.generation, "Controller loop stopped");
    }

    /// Waits for and handles a single event
    ///
    /// Returns false if the inbox is closed.
    pub async fn step(&mut self) -> bool {
        match self.inbox_rx.recv().await {
            Some(event) => {
                self.handle_event(event).await;
                true
            }
            None => false,
        }
    }

    /// Handles one event
    pub async fn handle_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::SyncRequested => {
                if let Err(e) = self.dispatch().await {
                    error!(error = %e, "Time sync dispatch failed");
                }
            }
            ControllerEvent::Navigate(destination) => self.navigate(destination),
            ControllerEvent::Outcome {
                request_id,
                outcome,
            } => self.on_outcome(request_id, outcome).await,
        }
    }

    /// Opens an informational destination
    pub fn navigate(&self, destination: Destination) {
        info!(destination = %destination, "Opening destination");
        self.deps.navigator.open(destination);
    }

    /// Starts a time sync
    ///
    /// The server is read from the preference store on every call. While a
    /// request is in flight the configured [`RedispatchPolicy`] applies:
    /// `Ignore` returns [`DispatchResult::Ignored`], `Replace` abandons the
    /// pending request so its late outcome is discarded.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::Preferences`] if the server cannot be read; the
    ///   progress state is left unchanged.
    /// - [`ControllerError::WorkerUnavailable`] if the worker refused the
    ///   command. The request is still resolved as `Error` through the
    ///   reply forwarder.
    pub async fn dispatch(&mut self) -> Result<DispatchResult, ControllerError> {
        let mut progress = self.session.progress();

        if let Some(pending) = progress.pending_request() {
            if self.settings.redispatch == RedispatchPolicy::Ignore {
                info!(pending = %pending, "Sync already in progress, request ignored");
                return Ok(DispatchResult::Ignored(pending));
            }
        }

        let server = match self.deps.preferences.ntp_server() {
            Ok(server) => server,
            Err(e) => {
                warn!(error = %e, "Cannot read the configured time server");
                let notice = Notification::new(
                    NotificationKind::SyncFailed,
                    "Invalid time server",
                    format!("The configured time server could not be read: {e:#}"),
                )
                .with_priority(NotificationPriority::High);
                self.notify(&notice).await;
                return Err(ControllerError::Preferences(e));
            }
        };

        if let Some(pending) = progress.reset() {
            info!(pending = %pending, "Replacing in-flight sync request");
            self.session.abandon(pending);
        }

        let request_id = RequestId::new();
        let (command, pending) = SyncCommand::sync_time(request_id, server);
        progress.begin(request_id, Utc::now())?;

        info!(
            request_id = %request_id,
            action = %command.action(),
            server = %command.server(),
            "Dispatching time sync"
        );

        self.session.begin_request(request_id, progress);
        self.set_indicator(true).await;
        spawn_reply_forwarder(Arc::clone(&self.session), pending, self.settings.watchdog);

        // On failure the command, and with it the reply address, is dropped;
        // the forwarder then resolves the request as `Error`.
        self.deps
            .worker
            .submit(command)
            .map_err(ControllerError::WorkerUnavailable)?;

        Ok(DispatchResult::Dispatched(request_id))
    }

    /// Handles the outcome of `request_id`
    ///
    /// Outcomes for requests that are no longer outstanding are dropped.
    /// Otherwise the progress returns to `Idle`, the indicator is hidden and
    /// the outcome is presented.
    pub async fn on_outcome(&mut self, request_id: RequestId, outcome: SyncOutcome) {
        if !self.session.complete(request_id) {
            debug!(request_id = %request_id, outcome = outcome.kind(), "Ignoring outcome for stale request");
            return;
        }

        info!(request_id = %request_id, outcome = outcome.kind(), "Time sync finished");

        let mut progress = self.session.progress();
        if progress.finish(request_id) {
            self.session.set_progress(progress);
        }
        if !progress.is_active() {
            self.set_indicator(false).await;
        }

        match present(&outcome) {
            Presentation::Notice(notice) => self.notify(&notice).await,
            Presentation::Elevation(prompt) => {
                match self.deps.sink.prompt_elevation(&prompt).await {
                    Ok(choice) => info!(request_id = %request_id, choice = ?choice, "Elevation prompt answered"),
                    Err(e) => warn!(request_id = %request_id, error = %e, "Failed to show elevation prompt"),
                }
            }
        }
        self.last_outcome = Some((request_id, outcome));
    }

    async fn notify(&self, notice: &Notification) {
        if let Err(e) = self.deps.sink.notify(notice).await {
            warn!(title = %notice.title, error = %e, "Failed to deliver notification");
        }
    }

    async fn set_indicator(&mut self, visible: bool) {
        if self.indicator_visible == visible {
            return;
        }
        self.indicator_visible = visible;
        if let Err(e) = self.deps.sink.show_progress(visible).await {
            warn!(visible, error = %e, "Failed to update progress indicator");
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.session.detach(self.generation);

        // Outcomes queued but not yet handled go back through the session,
        // which hands them to the next live instance or parks them.
        self.inbox_rx.close();
        while let Ok(event) = self.inbox_rx.try_recv() {
            if let ControllerEvent::Outcome {
                request_id,
                outcome,
            } = event
            {
                let routed = self.session.route(request_id, outcome);
                debug!(request_id = %request_id, generation = self.generation, routed = ?routed, "Rerouted unhandled outcome");
            }
        }
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("generation", &self.generation)
            .field("settings", &self.settings)
            .field("indicator_visible", &self.indicator_visible)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Reply forwarding
// ============================================================================

/// Awaits one reply under the watchdog and routes it through the session
fn spawn_reply_forwarder(
    session: Arc<ControllerSession>,
    pending: PendingReply,
    watchdog: Duration,
) {
    let request_id = pending.request_id();
    tokio::spawn(async move {
        let outcome = match tokio::time::timeout(watchdog, pending).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(dropped)) => {
                warn!(error = %dropped, "Worker dropped the reply address");
                SyncOutcome::Error
            }
            Err(_) => {
                warn!(
                    request_id = %request_id,
                    watchdog_secs = watchdog.as_secs(),
                    "No reply before the watchdog expired"
                );
                SyncOutcome::Error
            }
        };
        session.route(request_id, outcome);
    });
}

/// Resolves a restored request whose reply cannot reach this process
fn spawn_orphan_watchdog(
    session: Arc<ControllerSession>,
    request_id: RequestId,
    remaining: Duration,
) {
    debug!(request_id = %request_id, remaining_secs = remaining.as_secs(), "Watching restored request");
    tokio::spawn(async move {
        tokio::time::sleep(remaining).await;
        if session.is_outstanding(request_id) {
            warn!(request_id = %request_id, "Restored request never resolved");
            session.route(request_id, SyncOutcome::Error);
        }
    });
}
