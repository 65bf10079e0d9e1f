//! Integration tests for ntpsync-controller
//!
//! Drive real `Controller` instances against in-memory fakes for the worker,
//! notification sink, navigator and preference store, and one end-to-end run
//! against a spawned `TimeSyncWorker`.

mod common;

mod test_dispatch;
mod test_end_to_end;
mod test_recreation;
mod test_watchdog;
