//! Shared fakes for controller integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use ntpsync_controller::{Controller, ControllerDeps, ControllerSession, ControllerSettings};
use ntpsync_core::config::RedispatchPolicy;
use ntpsync_core::domain::{RequestId, ServerAddress, SyncCommand, SyncOutcome};
use ntpsync_core::ports::{
    Destination, ElevationChoice, ElevationPrompt, INavigator, INotificationSink,
    IPreferenceStore, IProgressStore, ITimeWorker, InMemoryProgressStore, Notification,
};

/// 2024-01-01T00:00:00Z
pub fn new_year() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

// ============================================================================
// Worker
// ============================================================================

/// Worker that queues commands until the test answers them
#[derive(Default)]
pub struct ManualWorker {
    commands: Mutex<Vec<SyncCommand>>,
    submitted: Mutex<Vec<(RequestId, String)>>,
}

impl ManualWorker {
    /// Every command ever submitted, as (request id, server)
    pub fn submitted(&self) -> Vec<(RequestId, String)> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    /// Answers the queued command for `request_id`
    pub fn reply(&self, request_id: RequestId, outcome: SyncOutcome) -> bool {
        let command = self.take(request_id).expect("command was submitted");
        let (_, reply) = command.into_reply();
        reply.deliver(outcome)
    }

    /// Drops the queued command for `request_id` without answering
    pub fn drop_command(&self, request_id: RequestId) {
        drop(self.take(request_id).expect("command was submitted"));
    }

    fn take(&self, request_id: RequestId) -> Option<SyncCommand> {
        let mut commands = self.commands.lock().unwrap();
        let index = commands.iter().position(|c| c.request_id() == request_id)?;
        Some(commands.remove(index))
    }
}

impl ITimeWorker for ManualWorker {
    fn submit(&self, command: SyncCommand) -> anyhow::Result<()> {
        self.submitted
            .lock()
            .unwrap()
            .push((command.request_id(), command.server().as_str().to_string()));
        self.commands.lock().unwrap().push(command);
        Ok(())
    }
}

// ============================================================================
// Sink
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Notice(Notification),
    Prompt(ElevationPrompt),
    Progress(bool),
}

/// Sink that records every call
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
    choice: ElevationChoice,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            choice: ElevationChoice::Accepted,
        }
    }
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<Notification> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Notice(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn prompts(&self) -> Vec<ElevationPrompt> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Prompt(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[async_trait]
impl INotificationSink for RecordingSink {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Notice(notification.clone()));
        Ok(())
    }

    async fn prompt_elevation(&self, prompt: &ElevationPrompt) -> anyhow::Result<ElevationChoice> {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Prompt(prompt.clone()));
        Ok(self.choice)
    }

    async fn show_progress(&self, visible: bool) -> anyhow::Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Progress(visible));
        Ok(())
    }
}

// ============================================================================
// Navigator and preferences
// ============================================================================

#[derive(Default)]
pub struct RecordingNavigator {
    opened: Mutex<Vec<Destination>>,
}

impl RecordingNavigator {
    pub fn opened(&self) -> Vec<Destination> {
        self.opened.lock().unwrap().clone()
    }
}

impl INavigator for RecordingNavigator {
    fn open(&self, destination: Destination) {
        self.opened.lock().unwrap().push(destination);
    }
}

/// Preference store whose server can change between dispatches
pub struct MutablePreferences {
    server: Mutex<ServerAddress>,
}

impl MutablePreferences {
    pub fn new(server: &str) -> Self {
        Self {
            server: Mutex::new(ServerAddress::new(server).unwrap()),
        }
    }

    pub fn set(&self, server: &str) {
        *self.server.lock().unwrap() = ServerAddress::new(server).unwrap();
    }
}

impl IPreferenceStore for MutablePreferences {
    fn ntp_server(&self) -> anyhow::Result<ServerAddress> {
        Ok(self.server.lock().unwrap().clone())
    }
}

// ============================================================================
// Fixture
// ============================================================================

pub struct Fixture {
    pub session: Arc<ControllerSession>,
    pub worker: Arc<ManualWorker>,
    pub sink: Arc<RecordingSink>,
    pub navigator: Arc<RecordingNavigator>,
    pub preferences: Arc<MutablePreferences>,
    pub settings: ControllerSettings,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryProgressStore::new()))
    }

    pub fn with_store(store: Arc<dyn IProgressStore>) -> Self {
        Self {
            session: ControllerSession::new(store),
            worker: Arc::new(ManualWorker::default()),
            sink: Arc::new(RecordingSink::default()),
            navigator: Arc::new(RecordingNavigator::default()),
            preferences: Arc::new(MutablePreferences::new("time.example.org")),
            settings: ControllerSettings::default(),
        }
    }

    pub fn with_policy(mut self, policy: RedispatchPolicy) -> Self {
        self.settings.redispatch = policy;
        self
    }

    pub fn with_watchdog(mut self, watchdog: Duration) -> Self {
        self.settings.watchdog = watchdog;
        self
    }

    pub fn deps(&self) -> ControllerDeps {
        ControllerDeps {
            worker: self.worker.clone(),
            preferences: self.preferences.clone(),
            sink: self.sink.clone(),
            navigator: self.navigator.clone(),
        }
    }

    pub async fn attach(&self) -> Controller {
        Controller::attach(Arc::clone(&self.session), self.deps(), self.settings).await
    }

    /// Lets spawned forwarder tasks run until `done` holds
    pub async fn settle(&self, done: impl Fn(&ControllerSession) -> bool) {
        for _ in 0..1000 {
            if done(&self.session) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not reached: {:?}", self.session);
    }
}
