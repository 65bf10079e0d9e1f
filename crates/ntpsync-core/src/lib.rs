//! NTPSync Core - Domain types and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `SyncCommand`, `ReplyAddress`, `SyncOutcome`, `ProgressState`
//! - **Port definitions** - Traits for adapters: `ITimeWorker`, `IPreferenceStore`,
//!   `INotificationSink`, `INavigator`, `IProgressStore`
//! - **Configuration** - YAML-backed settings shared by the controller, worker and CLI
//!
//! # Architecture
//!
//! The domain module contains the request/outcome exchange between a foreground
//! controller and a background time-sync worker. Ports define the trait
//! interfaces that adapter crates implement.

pub mod config;
pub mod domain;
pub mod ports;
