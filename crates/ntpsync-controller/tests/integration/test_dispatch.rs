//! Dispatch and outcome handling on a single controller instance

use std::time::Duration;

use ntpsync_controller::DispatchResult;
use ntpsync_core::config::RedispatchPolicy;
use ntpsync_core::domain::{ProgressState, SyncOutcome};
use ntpsync_core::ports::{Destination, NotificationKind};
use tokio_util::sync::CancellationToken;

use crate::common::{new_year, Fixture, SinkEvent};

#[tokio::test]
async fn okay_shows_exact_time_and_returns_idle() {
    let fx = Fixture::new();
    let mut c = fx.attach().await;

    let DispatchResult::Dispatched(id) = c.dispatch().await.unwrap() else {
        panic!("expected a dispatch");
    };
    assert!(c.progress().is_active());
    assert_eq!(fx.worker.submitted(), vec![(id, "time.example.org".to_string())]);

    assert!(fx.worker.reply(id, SyncOutcome::okay(new_year())));
    assert!(c.step().await);

    assert_eq!(c.progress(), ProgressState::Idle);
    let events = fx.sink.events();
    assert_eq!(events[0], SinkEvent::Progress(true));
    assert_eq!(events[1], SinkEvent::Progress(false));
    let notices = fx.sink.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(
        notices[0].kind,
        NotificationKind::TimeSet {
            new_time: new_year()
        }
    );
    assert!(notices[0].body.contains("2024-01-01T00:00:00+00:00"));
}

#[tokio::test]
async fn server_timeout_shows_timeout_notice() {
    let fx = Fixture::new();
    let mut c = fx.attach().await;
    let id = c.dispatch().await.unwrap().request_id();

    fx.worker.reply(id, SyncOutcome::ServerTimeout);
    c.step().await;

    assert_eq!(c.progress(), ProgressState::Idle);
    let notices = fx.sink.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NotificationKind::ServerTimeout);
    assert!(fx.sink.prompts().is_empty());
}

#[tokio::test]
async fn no_privilege_prompts_instead_of_notifying() {
    let fx = Fixture::new();
    let mut c = fx.attach().await;
    let id = c.dispatch().await.unwrap().request_id();

    fx.worker.reply(id, SyncOutcome::NoPrivilege);
    c.step().await;

    assert_eq!(c.progress(), ProgressState::Idle);
    assert!(fx.sink.notices().is_empty());
    assert_eq!(fx.sink.prompts().len(), 1);
}

#[tokio::test]
async fn utility_missing_names_date() {
    let fx = Fixture::new();
    let mut c = fx.attach().await;
    let id = c.dispatch().await.unwrap().request_id();

    fx.worker.reply(id, SyncOutcome::UtilityMissing);
    c.step().await;

    let notices = fx.sink.notices();
    assert_eq!(
        notices[0].kind,
        NotificationKind::UtilityMissing {
            utility: "date".into()
        }
    );
    assert!(notices[0].body.contains("'date'"));
}

#[tokio::test]
async fn generic_error_shows_failure_notice() {
    let fx = Fixture::new();
    let mut c = fx.attach().await;
    let id = c.dispatch().await.unwrap().request_id();

    fx.worker.reply(id, SyncOutcome::Error);
    c.step().await;

    assert_eq!(c.progress(), ProgressState::Idle);
    assert_eq!(fx.sink.notices()[0].kind, NotificationKind::SyncFailed);
}

#[tokio::test]
async fn ignore_policy_keeps_single_request() {
    let fx = Fixture::new().with_policy(RedispatchPolicy::Ignore);
    let mut c = fx.attach().await;

    let first = c.dispatch().await.unwrap();
    let second = c.dispatch().await.unwrap();

    assert!(matches!(first, DispatchResult::Dispatched(_)));
    assert_eq!(second, DispatchResult::Ignored(first.request_id()));
    assert_eq!(fx.worker.submitted_count(), 1);
    // The indicator was shown once, not twice
    assert_eq!(fx.sink.events(), vec![SinkEvent::Progress(true)]);
}

#[tokio::test]
async fn replace_policy_discards_late_outcome() {
    let fx = Fixture::new().with_policy(RedispatchPolicy::Replace);
    let mut c = fx.attach().await;

    let first = c.dispatch().await.unwrap().request_id();
    let second = c.dispatch().await.unwrap().request_id();
    assert_ne!(first, second);
    assert_eq!(c.progress().pending_request(), Some(second));

    // The abandoned forwarder still receives, but the session drops it
    assert!(fx.worker.reply(first, SyncOutcome::Error));
    fx.worker.reply(second, SyncOutcome::okay(new_year()));
    c.step().await;

    assert_eq!(c.progress(), ProgressState::Idle);
    let notices = fx.sink.notices();
    assert_eq!(notices.len(), 1);
    assert!(matches!(notices[0].kind, NotificationKind::TimeSet { .. }));
}

#[tokio::test]
async fn reply_channels_are_never_shared() {
    let fx = Fixture::new();
    let mut c = fx.attach().await;

    let mut ids = Vec::new();
    for _ in 0..5 {
        let id = c.dispatch().await.unwrap().request_id();
        fx.worker.reply(id, SyncOutcome::ServerTimeout);
        c.step().await;
        ids.push(id);
    }

    let mut unique = ids.clone();
    unique.sort_by_key(|id| id.to_string());
    unique.dedup();
    assert_eq!(unique.len(), ids.len());
    assert_eq!(fx.sink.notices().len(), 5);
}

#[tokio::test]
async fn server_is_read_at_every_dispatch() {
    let fx = Fixture::new();
    let mut c = fx.attach().await;

    let a = c.dispatch().await.unwrap().request_id();
    fx.worker.reply(a, SyncOutcome::Error);
    c.step().await;

    fx.preferences.set("ntp.example.net:1123");
    let b = c.dispatch().await.unwrap().request_id();

    let servers: Vec<String> = fx.worker.submitted().into_iter().map(|(_, s)| s).collect();
    assert_eq!(servers, vec!["time.example.org", "ntp.example.net:1123"]);
    assert_eq!(c.progress().pending_request(), Some(b));
}

#[tokio::test]
async fn progress_watch_follows_dispatch_and_outcome() {
    let fx = Fixture::new();
    let mut rx = fx.session.subscribe();
    let mut c = fx.attach().await;

    let id = c.dispatch().await.unwrap().request_id();
    assert!(rx.borrow_and_update().is_active());

    fx.worker.reply(id, SyncOutcome::ServerTimeout);
    c.step().await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), ProgressState::Idle);
}

#[tokio::test]
async fn run_loop_serves_handle_requests() {
    let fx = Fixture::new();
    let c = fx.attach().await;
    let handle = c.handle();
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(c.run(shutdown.clone()));

    assert!(handle.navigate(Destination::Help));
    assert!(handle.navigate(Destination::Donations));
    assert!(handle.request_sync());

    let mut progress = fx.session.subscribe();
    progress.wait_for(|s| s.is_active()).await.unwrap();
    let (id, _) = fx.worker.submitted()[0].clone();
    fx.worker.reply(id, SyncOutcome::okay(new_year()));
    tokio::time::timeout(Duration::from_secs(5), progress.wait_for(|s| !s.is_active()))
        .await
        .expect("outcome handled")
        .unwrap();

    assert_eq!(
        fx.navigator.opened(),
        vec![Destination::Help, Destination::Donations]
    );

    shutdown.cancel();
    task.await.unwrap();
    assert!(!fx.session.is_attached());
    assert!(!handle.request_sync());
}
