//! Controller driving a real worker thread with fake network and clock

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ntpsync_controller::{Controller, ControllerDeps, ControllerSession, ControllerSettings};
use ntpsync_core::domain::{ProgressState, ServerAddress};
use ntpsync_core::ports::{InMemoryProgressStore, NotificationKind, StaticPreferenceStore};
use ntpsync_worker::{IClockSetter, ITimeSource, TimeSyncWorker, WorkerError};
use tokio_util::sync::CancellationToken;

use crate::common::{new_year, RecordingNavigator, RecordingSink};

struct FixedSource;

#[async_trait]
impl ITimeSource for FixedSource {
    async fn fetch_time(&self, server: &ServerAddress) -> Result<DateTime<Utc>, WorkerError> {
        assert_eq!(server.host(), "time.example.org");
        Ok(new_year())
    }
}

#[derive(Default)]
struct CountingClock {
    calls: AtomicUsize,
    deny: bool,
}

#[async_trait]
impl IClockSetter for CountingClock {
    async fn set_time(&self, time: DateTime<Utc>) -> Result<(), WorkerError> {
        assert_eq!(time, new_year());
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.deny {
            Err(WorkerError::NoPrivilege("Operation not permitted".into()))
        } else {
            Ok(())
        }
    }
}

async fn run_once(clock: Arc<CountingClock>) -> Arc<RecordingSink> {
    let worker = TimeSyncWorker::new(Arc::new(FixedSource), clock).spawn().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let session = ControllerSession::new(Arc::new(InMemoryProgressStore::new()));
    let deps = ControllerDeps {
        worker: Arc::new(worker.client()),
        preferences: Arc::new(StaticPreferenceStore::new(
            ServerAddress::new("time.example.org").unwrap(),
        )),
        sink: sink.clone(),
        navigator: Arc::new(RecordingNavigator::default()),
    };

    let controller =
        Controller::attach(Arc::clone(&session), deps, ControllerSettings::default()).await;
    let handle = controller.handle();
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(controller.run(shutdown.clone()));

    assert!(handle.request_sync());
    tokio::time::timeout(Duration::from_secs(10), async {
        while sink.notices().is_empty() && sink.prompts().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("worker answered");
    assert_eq!(session.progress(), ProgressState::Idle);

    shutdown.cancel();
    task.await.unwrap();
    worker.shutdown().await;
    sink
}

#[tokio::test]
async fn worker_outcome_reaches_the_user() {
    let clock = Arc::new(CountingClock::default());
    let sink = run_once(clock.clone()).await;

    assert_eq!(clock.calls.load(Ordering::SeqCst), 1);
    let notices = sink.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(
        notices[0].kind,
        NotificationKind::TimeSet {
            new_time: new_year()
        }
    );
}

#[tokio::test]
async fn worker_privilege_failure_prompts() {
    let clock = Arc::new(CountingClock {
        calls: AtomicUsize::new(0),
        deny: true,
    });
    let sink = run_once(clock).await;

    assert!(sink.notices().is_empty());
    assert_eq!(sink.prompts().len(), 1);
}
