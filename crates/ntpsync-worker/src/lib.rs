//! NTPSync Worker - Background time synchronization
//!
//! Provides:
//! - A worker running on its own OS thread and runtime, isolated from the
//!   controller's event loop
//! - Network time retrieval over SNTP
//! - Clock adjustment through the system `date` utility
//! - Classification of failures into the outcome taxonomy
//!
//! ## Modules
//!
//! - [`worker`] - Command queue, thread lifecycle, exactly-once replies
//! - [`sntp`] - Time source port and SNTP adapter
//! - [`clock`] - Clock setter port and `date` utility adapter
//! - [`error`] - Worker error type and its mapping to outcomes

pub mod clock;
pub mod error;
pub mod sntp;
pub mod worker;

pub use clock::{DateUtilityClock, IClockSetter};
pub use error::WorkerError;
pub use sntp::{ITimeSource, SntpTimeSource};
pub use worker::{TimeSyncWorker, WorkerClient, WorkerHandle};
