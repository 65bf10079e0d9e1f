//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the controller
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ITimeWorker`] - Hand-off of command descriptors to the background worker
//! - [`IPreferenceStore`] - Configured time server, read at dispatch time
//! - [`INotificationSink`] - User-visible notifications, prompts and progress
//! - [`INavigator`] - Fire-and-forget navigation to auxiliary screens
//! - [`IProgressStore`] - Progress state retained across controller instances

pub mod navigation;
pub mod notification;
pub mod preferences;
pub mod progress_store;
pub mod time_worker;

pub use navigation::{Destination, INavigator};
pub use notification::{
    ElevationChoice, ElevationPrompt, INotificationSink, Notification, NotificationKind,
    NotificationPriority,
};
pub use preferences::{IPreferenceStore, StaticPreferenceStore};
pub use progress_store::{FileProgressStore, IProgressStore, InMemoryProgressStore};
pub use time_worker::ITimeWorker;
