//! Controller session - state retained across controller instances
//!
//! A [`Controller`](crate::Controller) may be dropped and recreated while a
//! request is in flight (a UI rebuilding its view, the shell's `recreate`
//! command). Anything that must survive that lives here rather than in the
//! controller itself:
//!
//! - the progress state, mirrored to an [`IProgressStore`] and published on a
//!   `tokio::sync::watch` channel
//! - the inbox of the currently live controller, tagged with a generation
//! - the set of outstanding request ids
//! - outcomes that arrived while no controller was attached
//!
//! ## Design Notes
//!
//! Reply forwarders never capture a controller instance. They call
//! [`ControllerSession::route`] with the request id, and the session decides
//! where the outcome goes: the live inbox, the parking list, or nowhere.
//!
//! The internal mutex is a `std::sync::Mutex`; no lock is held across an
//! `.await`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use ntpsync_core::domain::{ProgressState, RequestId, SyncOutcome};
use ntpsync_core::ports::IProgressStore;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::controller::ControllerEvent;

/// Where [`ControllerSession::route`] sent an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteResult {
    /// Queued on the live controller's inbox
    Delivered,
    /// Held until the next controller attaches
    Parked,
    /// The request was no longer outstanding
    Discarded,
}

/// A controller instance registered to receive outcomes
struct LiveInbox {
    generation: u64,
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

#[derive(Default)]
struct SessionInner {
    generation: u64,
    live: Option<LiveInbox>,
    outstanding: HashSet<RequestId>,
    /// Requests whose reply is covered by a forwarder in this process
    watched: HashSet<RequestId>,
    parked: Vec<(RequestId, SyncOutcome)>,
}

/// State shared by every controller instance of one process
pub struct ControllerSession {
    store: Arc<dyn IProgressStore>,
    inner: Mutex<SessionInner>,
    progress_tx: watch::Sender<ProgressState>,
}

impl ControllerSession {
    /// Creates a session, restoring progress from `store`
    ///
    /// A request restored as `Active` is treated as outstanding: its outcome
    /// can no longer arrive from a worker of this process, so the first
    /// controller to attach arms a watchdog for it.
    pub fn new(store: Arc<dyn IProgressStore>) -> Arc<Self> {
        let restored = match store.load() {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Failed to load progress state, starting idle");
                ProgressState::Idle
            }
        };

        let mut inner = SessionInner::default();
        if let Some(id) = restored.pending_request() {
            info!(request_id = %id, "Restored in-flight sync request");
            inner.outstanding.insert(id);
        }

        let (progress_tx, _) = watch::channel(restored);
        Arc::new(Self {
            store,
            inner: Mutex::new(inner),
            progress_tx,
        })
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        // The inner state stays consistent even if a holder panicked
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ------------------------------------------------------------------------
    // Progress
    // ------------------------------------------------------------------------

    /// The current progress state
    pub fn progress(&self) -> ProgressState {
        *self.progress_tx.borrow()
    }

    /// Subscribes to progress changes
    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.progress_tx.subscribe()
    }

    /// Publishes and persists a new progress state
    ///
    /// A persistence failure is logged; the in-process state still changes.
    pub fn set_progress(&self, state: ProgressState) {
        if let Err(e) = self.store.save(&state) {
            warn!(error = %e, state = %state, "Failed to persist progress state");
        }
        self.progress_tx.send_replace(state);
        debug!(state = %state, "Progress state updated");
    }

    // ------------------------------------------------------------------------
    // Controller registration
    // ------------------------------------------------------------------------

    /// Registers `tx` as the live inbox, replacing any previous one
    ///
    /// Returns the new instance's generation and the outcomes parked while
    /// no controller was attached.
    pub fn attach(
        &self,
        tx: mpsc::UnboundedSender<ControllerEvent>,
    ) -> (u64, Vec<(RequestId, SyncOutcome)>) {
        let mut inner = self.lock();
        inner.generation += 1;
        let generation = inner.generation;
        if let Some(previous) = inner.live.replace(LiveInbox { generation, tx }) {
            debug!(previous = previous.generation, generation, "Replacing live controller");
        }
        let parked = std::mem::take(&mut inner.parked);
        info!(generation, parked = parked.len(), "Controller attached");
        (generation, parked)
    }

    /// Unregisters the live inbox if it still belongs to `generation`
    pub fn detach(&self, generation: u64) -> bool {
        let mut inner = self.lock();
        match &inner.live {
            Some(live) if live.generation == generation => {
                inner.live = None;
                info!(generation, "Controller detached");
                true
            }
            _ => false,
        }
    }

    /// Returns true while some controller is attached
    pub fn is_attached(&self) -> bool {
        self.lock().live.is_some()
    }

    // ------------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------------

    /// Records a freshly dispatched request and publishes `progress`
    pub fn begin_request(&self, request_id: RequestId, progress: ProgressState) {
        {
            let mut inner = self.lock();
            inner.outstanding.insert(request_id);
            inner.watched.insert(request_id);
        }
        self.set_progress(progress);
    }

    /// Forgets a request so its eventual outcome is discarded
    pub fn abandon(&self, request_id: RequestId) -> bool {
        let mut inner = self.lock();
        inner.parked.retain(|(id, _)| *id != request_id);
        inner.watched.remove(&request_id);
        inner.outstanding.remove(&request_id)
    }

    /// Claims an outstanding request for handling
    ///
    /// Returns false if it was already completed or abandoned, in which case
    /// the caller must ignore the outcome.
    pub fn complete(&self, request_id: RequestId) -> bool {
        let mut inner = self.lock();
        inner.watched.remove(&request_id);
        inner.outstanding.remove(&request_id)
    }

    /// Returns true if `request_id` still expects an outcome
    pub fn is_outstanding(&self, request_id: RequestId) -> bool {
        self.lock().outstanding.contains(&request_id)
    }

    /// Marks an outstanding request as watched
    ///
    /// Returns true if it was outstanding and not watched before; the caller
    /// then owns arming a watchdog for it.
    pub fn claim_watch(&self, request_id: RequestId) -> bool {
        let mut inner = self.lock();
        inner.outstanding.contains(&request_id) && inner.watched.insert(request_id)
    }

    /// Delivers an outcome to the live controller
    ///
    /// Parks it when no controller is attached (or the registered inbox is
    /// already gone), and discards it when the request is not outstanding.
    pub fn route(&self, request_id: RequestId, outcome: SyncOutcome) -> RouteResult {
        let mut inner = self.lock();
        if !inner.outstanding.contains(&request_id) {
            debug!(request_id = %request_id, outcome = outcome.kind(), "Discarding outcome for stale request");
            return RouteResult::Discarded;
        }

        let outcome = match &inner.live {
            Some(live) => match live.tx.send(ControllerEvent::Outcome {
                request_id,
                outcome,
            }) {
                Ok(()) => {
                    debug!(request_id = %request_id, generation = live.generation, "Outcome routed to controller");
                    return RouteResult::Delivered;
                }
                Err(mpsc::error::SendError(event)) => match event {
                    ControllerEvent::Outcome { outcome, .. } => outcome,
                    _ => return RouteResult::Discarded,
                },
            },
            None => outcome,
        };

        info!(request_id = %request_id, outcome = outcome.kind(), "No controller attached, parking outcome");
        inner.parked.push((request_id, outcome));
        RouteResult::Parked
    }

    /// Number of outcomes waiting for a controller
    pub fn parked_len(&self) -> usize {
        self.lock().parked.len()
    }
}

impl std::fmt::Debug for ControllerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("ControllerSession")
            .field("progress", &self.progress())
            .field("generation", &inner.generation)
            .field("attached", &inner.live.is_some())
            .field("outstanding", &inner.outstanding.len())
            .field("parked", &inner.parked.len())
            .finish()
    }
}
