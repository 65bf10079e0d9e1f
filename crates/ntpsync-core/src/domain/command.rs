//! Command descriptor and single-use reply channel
//!
//! A [`SyncCommand`] is built once per request and handed to the worker.
//! It carries a [`ReplyAddress`], the sending half of a one-shot channel
//! whose receiving half ([`PendingReply`]) stays with the dispatcher.
//!
//! ## Design Notes
//!
//! - `ReplyAddress` is not `Clone` and `deliver` takes `self`, so an address
//!   can answer at most once.
//! - Delivering to a receiver that has gone away is not an error for the
//!   worker: `deliver` reports `false` and the outcome is dropped.
//! - Dropping a `ReplyAddress` without delivering (worker crash, panic) is
//!   observable by the dispatcher as [`ReplyDropped`].

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::newtypes::{RequestId, ServerAddress};
use super::outcome::SyncOutcome;

/// Action tag carried by a command descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncAction {
    /// Retrieve network time and apply it to the system clock
    #[serde(rename = "SYNC_TIME")]
    SyncTime,
}

impl SyncAction {
    /// Wire name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::SyncTime => "SYNC_TIME",
        }
    }
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Reply channel
// ============================================================================

/// Creates a fresh reply channel for `request_id`
///
/// Returns the address handed to the worker and the pending reply kept
/// by the dispatcher.
pub fn reply_channel(request_id: RequestId) -> (ReplyAddress, PendingReply) {
    let (tx, rx) = oneshot::channel();
    (
        ReplyAddress { request_id, tx },
        PendingReply { request_id, rx },
    )
}

/// Sending half of a single-use reply channel
#[derive(Debug)]
pub struct ReplyAddress {
    request_id: RequestId,
    tx: oneshot::Sender<SyncOutcome>,
}

impl ReplyAddress {
    /// Request this address answers
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns true if the receiving side has been dropped
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }

    /// Delivers the outcome, consuming the address
    ///
    /// Returns `false` if nobody is listening any more; the outcome is
    /// dropped in that case.
    pub fn deliver(self, outcome: SyncOutcome) -> bool {
        match self.tx.send(outcome) {
            Ok(()) => true,
            Err(dropped) => {
                tracing::debug!(
                    request_id = %self.request_id,
                    outcome = dropped.kind(),
                    "Reply receiver gone, outcome dropped"
                );
                false
            }
        }
    }
}

/// The worker dropped the reply address without answering
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("reply address for request {0} was dropped without an outcome")]
pub struct ReplyDropped(pub RequestId);

/// Receiving half of a single-use reply channel
///
/// Resolves once, to the outcome or to [`ReplyDropped`].
#[derive(Debug)]
pub struct PendingReply {
    request_id: RequestId,
    rx: oneshot::Receiver<SyncOutcome>,
}

impl PendingReply {
    /// Request this reply belongs to
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }
}

impl Future for PendingReply {
    type Output = Result<SyncOutcome, ReplyDropped>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let request_id = self.request_id;
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.map_err(|_| ReplyDropped(request_id)))
    }
}

// ============================================================================
// Command descriptor
// ============================================================================

/// Immutable description of one sync request
///
/// Fields are private; the worker reads them through accessors and takes
/// ownership of the reply address with [`SyncCommand::into_reply`].
#[derive(Debug)]
pub struct SyncCommand {
    action: SyncAction,
    server: ServerAddress,
    reply: ReplyAddress,
}

impl SyncCommand {
    /// Builds a command together with its pending reply
    pub fn sync_time(request_id: RequestId, server: ServerAddress) -> (Self, PendingReply) {
        let (reply, pending) = reply_channel(request_id);
        (
            Self {
                action: SyncAction::SyncTime,
                server,
                reply,
            },
            pending,
        )
    }

    /// The action tag
    pub fn action(&self) -> SyncAction {
        self.action
    }

    /// Server to query, as configured at dispatch time
    pub fn server(&self) -> &ServerAddress {
        &self.server
    }

    /// Request this command belongs to
    pub fn request_id(&self) -> RequestId {
        self.reply.request_id()
    }

    /// Splits the command into its server and reply address
    pub fn into_reply(self) -> (ServerAddress, ReplyAddress) {
        (self.server, self.reply)
    }
}
