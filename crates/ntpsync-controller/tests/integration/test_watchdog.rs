//! Controller-side watchdog for replies that never arrive
//!
//! These tests run on a paused clock; the runtime advances time whenever
//! every task is idle.

use std::time::Duration;

use ntpsync_core::domain::{ProgressState, SyncOutcome};
use ntpsync_core::ports::NotificationKind;
use tokio::time::Instant;

use crate::common::{new_year, Fixture};

const WATCHDOG: Duration = Duration::from_secs(30);

#[tokio::test(start_paused = true)]
async fn silent_worker_resolves_as_error_after_watchdog() {
    let fx = Fixture::new().with_watchdog(WATCHDOG);
    let mut c = fx.attach().await;
    let start = Instant::now();

    c.dispatch().await.unwrap();
    assert!(c.step().await);

    assert!(start.elapsed() >= WATCHDOG);
    assert_eq!(c.progress(), ProgressState::Idle);
    assert!(!c.indicator_visible());
    let notices = fx.sink.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NotificationKind::SyncFailed);
}

#[tokio::test(start_paused = true)]
async fn reply_before_watchdog_wins() {
    let fx = Fixture::new().with_watchdog(WATCHDOG);
    let mut c = fx.attach().await;
    let id = c.dispatch().await.unwrap().request_id();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(fx.worker.reply(id, SyncOutcome::okay(new_year())));
    c.step().await;

    // No synthetic outcome follows once the watchdog would have fired
    assert!(tokio::time::timeout(Duration::from_secs(60), c.step())
        .await
        .is_err());
    let notices = fx.sink.notices();
    assert_eq!(notices.len(), 1);
    assert!(matches!(notices[0].kind, NotificationKind::TimeSet { .. }));
}

#[tokio::test(start_paused = true)]
async fn dropped_reply_resolves_immediately() {
    let fx = Fixture::new().with_watchdog(WATCHDOG);
    let mut c = fx.attach().await;
    let start = Instant::now();
    let id = c.dispatch().await.unwrap().request_id();

    fx.worker.drop_command(id);
    c.step().await;

    assert!(start.elapsed() < WATCHDOG);
    assert_eq!(c.progress(), ProgressState::Idle);
    assert_eq!(fx.sink.notices()[0].kind, NotificationKind::SyncFailed);
}

#[tokio::test(start_paused = true)]
async fn late_reply_after_watchdog_is_discarded() {
    let fx = Fixture::new().with_watchdog(WATCHDOG);
    let mut c = fx.attach().await;
    let id = c.dispatch().await.unwrap().request_id();

    c.step().await;
    assert_eq!(c.progress(), ProgressState::Idle);

    // The forwarder gave up, so the worker finds nobody listening
    assert!(!fx.worker.reply(id, SyncOutcome::okay(new_year())));
    assert_eq!(fx.sink.notices().len(), 1);
}
