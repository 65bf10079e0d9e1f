//! Controller recreation while a request is in flight

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ntpsync_controller::{DispatchResult, RouteResult};
use ntpsync_core::domain::{ProgressState, RequestId, SyncOutcome};
use ntpsync_core::ports::{FileProgressStore, IProgressStore, NotificationKind};

use crate::common::{new_year, Fixture, SinkEvent};

#[tokio::test]
async fn recreated_controller_restores_active_without_redispatch() {
    let fx = Fixture::new();
    let mut first = fx.attach().await;
    let id = first.dispatch().await.unwrap().request_id();
    drop(first);
    fx.sink.clear();

    let second = fx.attach().await;

    assert!(second.indicator_visible());
    assert_eq!(second.progress().pending_request(), Some(id));
    assert_eq!(fx.sink.events(), vec![SinkEvent::Progress(true)]);
    assert_eq!(fx.worker.submitted_count(), 1);
    assert!(fx.sink.notices().is_empty());
}

#[tokio::test]
async fn outcome_reaches_the_recreated_controller() {
    let fx = Fixture::new();
    let mut first = fx.attach().await;
    let id = first.dispatch().await.unwrap().request_id();
    drop(first);

    let mut second = fx.attach().await;
    fx.worker.reply(id, SyncOutcome::okay(new_year()));
    assert!(second.step().await);

    assert_eq!(second.progress(), ProgressState::Idle);
    assert!(!second.indicator_visible());
    assert_eq!(
        fx.sink.notices()[0].kind,
        NotificationKind::TimeSet {
            new_time: new_year()
        }
    );
    assert_eq!(fx.worker.submitted_count(), 1);
}

#[tokio::test]
async fn outcome_arriving_while_detached_is_parked() {
    let fx = Fixture::new();
    let mut first = fx.attach().await;
    let id = first.dispatch().await.unwrap().request_id();
    drop(first);

    fx.worker.reply(id, SyncOutcome::ServerTimeout);
    fx.settle(|s| s.parked_len() == 1).await;
    assert!(fx.sink.notices().is_empty());

    let second = fx.attach().await;

    assert_eq!(second.progress(), ProgressState::Idle);
    assert_eq!(fx.session.parked_len(), 0);
    let notices = fx.sink.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NotificationKind::ServerTimeout);
}

#[tokio::test]
async fn outcome_queued_on_dropped_controller_reaches_the_next_one() {
    let fx = Fixture::new();
    let mut first = fx.attach().await;
    let id = first.dispatch().await.unwrap().request_id();

    // Routed to the first instance's inbox, never handled there
    fx.worker.reply(id, SyncOutcome::ServerTimeout);
    fx.settle(|_| first.queued_events() == 1).await;
    drop(first);
    assert_eq!(fx.session.parked_len(), 1);

    let mut second = fx.attach().await;

    assert_eq!(second.progress(), ProgressState::Idle);
    assert!(!second.indicator_visible());
    let notices = fx.sink.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NotificationKind::ServerTimeout);
    assert!(matches!(
        second.dispatch().await.unwrap(),
        DispatchResult::Dispatched(next) if next != id
    ));
}

#[tokio::test]
async fn outcome_queued_on_superseded_controller_moves_to_live_one() {
    let fx = Fixture::new();
    let mut first = fx.attach().await;
    let id = first.dispatch().await.unwrap().request_id();

    fx.worker.reply(id, SyncOutcome::NoPrivilege);
    fx.settle(|_| first.queued_events() == 1).await;

    let mut second = fx.attach().await;
    drop(first);
    assert!(second.step().await);

    assert_eq!(second.progress(), ProgressState::Idle);
    assert_eq!(fx.sink.prompts().len(), 1);
    assert_eq!(fx.session.parked_len(), 0);
}

#[tokio::test]
async fn superseded_instance_no_longer_receives() {
    let fx = Fixture::new();
    let mut first = fx.attach().await;
    let id = first.dispatch().await.unwrap().request_id();

    // Attaching a second instance takes over even before the first is dropped
    let mut second = fx.attach().await;
    fx.worker.reply(id, SyncOutcome::Error);
    assert!(second.step().await);
    assert_eq!(fx.sink.notices().len(), 1);

    // Dropping the stale instance leaves the live registration alone
    let first_handle = first.handle();
    drop(first);
    assert!(first_handle.is_closed());
    assert!(fx.session.is_attached());
    assert_eq!(second.progress(), ProgressState::Idle);
}

#[tokio::test]
async fn stale_route_is_discarded_after_completion() {
    let fx = Fixture::new();
    let mut c = fx.attach().await;
    let id = c.dispatch().await.unwrap().request_id();
    fx.worker.reply(id, SyncOutcome::Error);
    c.step().await;

    assert_eq!(
        fx.session.route(id, SyncOutcome::okay(new_year())),
        RouteResult::Discarded
    );
    assert_eq!(fx.sink.notices().len(), 1);
}

#[tokio::test]
async fn restart_resolves_request_left_in_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileProgressStore::new(dir.path().join("progress.json")));

    // A previous process crashed mid-request long ago
    let id = RequestId::new();
    let mut stale = ProgressState::Idle;
    stale
        .begin(id, Utc::now() - chrono::Duration::minutes(5))
        .unwrap();
    store.save(&stale).unwrap();

    let fx = Fixture::with_store(store.clone()).with_watchdog(Duration::from_secs(30));
    let mut c = fx.attach().await;
    assert!(c.indicator_visible());

    tokio::time::timeout(Duration::from_secs(5), c.step())
        .await
        .expect("orphaned request resolved");

    assert_eq!(c.progress(), ProgressState::Idle);
    assert_eq!(store.load().unwrap(), ProgressState::Idle);
    assert_eq!(fx.sink.notices()[0].kind, NotificationKind::SyncFailed);
    assert_eq!(fx.worker.submitted_count(), 0);
}
