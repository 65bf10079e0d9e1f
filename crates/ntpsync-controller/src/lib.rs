//! NTPSync Controller - Foreground side of the time sync exchange
//!
//! This crate owns everything the user-facing process does between "the user
//! asked for a sync" and "the user saw the result":
//! - **Dispatch** - builds a [`SyncCommand`](ntpsync_core::domain::SyncCommand)
//!   with a fresh reply channel and hands it to the worker without waiting
//! - **Routing** - delivers the single outcome to whichever controller
//!   instance is live when it arrives, even after recreation
//! - **Presentation** - maps each outcome to a notification or an
//!   elevation prompt
//!
//! # Architecture
//!
//! ```text
//!   ControllerHandle ──→ inbox ──→ Controller::run (single task)
//!                                     │      ▲
//!                        dispatch ────┘      │ ControllerEvent::Outcome
//!                           │                │
//!                           ▼                │
//!                     ITimeWorker    reply forwarder ──→ ControllerSession::route
//! ```
//!
//! [`ControllerSession`] is the state that outlives controller instances; a
//! [`Controller`] attaches to it, restores the progress indicator, and detaches
//! when dropped.

pub mod controller;
pub mod error;
pub mod presenter;
pub mod session;

pub use controller::{
    Controller, ControllerDeps, ControllerEvent, ControllerHandle, ControllerSettings,
    DispatchResult,
};
pub use error::ControllerError;
pub use presenter::{present, Presentation};
pub use session::{ControllerSession, RouteResult};
