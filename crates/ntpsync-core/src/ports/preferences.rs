//! Preference store port (driven/secondary port)
//!
//! Supplies the configured time server. The controller reads it on every
//! dispatch and never caches the value, so a changed preference applies to
//! the next request.

use crate::domain::ServerAddress;

/// Port trait for reading the configured time server
pub trait IPreferenceStore: Send + Sync {
    /// Returns the currently configured server address
    fn ntp_server(&self) -> anyhow::Result<ServerAddress>;
}

/// Preference store that always returns the same server
///
/// Used for command-line overrides and tests.
#[derive(Debug, Clone)]
pub struct StaticPreferenceStore {
    server: ServerAddress,
}

impl StaticPreferenceStore {
    /// Creates a store returning `server`
    pub fn new(server: ServerAddress) -> Self {
        Self { server }
    }
}

impl IPreferenceStore for StaticPreferenceStore {
    fn ntp_server(&self) -> anyhow::Result<ServerAddress> {
        Ok(self.server.clone())
    }
}
