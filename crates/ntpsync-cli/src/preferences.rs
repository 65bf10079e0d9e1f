//! Preference store backed by the YAML configuration file

use std::path::PathBuf;

use anyhow::Context;
use ntpsync_core::config::Config;
use ntpsync_core::domain::ServerAddress;
use ntpsync_core::ports::IPreferenceStore;
use tracing::debug;

/// Reads `sync.server` from the config file on every call
///
/// A server given on the command line takes precedence. A missing file
/// yields the default server; an unreadable or malformed one is an error.
#[derive(Debug, Clone)]
pub struct ConfigPreferenceStore {
    path: PathBuf,
    server_override: Option<ServerAddress>,
}

impl ConfigPreferenceStore {
    pub fn new(path: PathBuf, server_override: Option<ServerAddress>) -> Self {
        Self {
            path,
            server_override,
        }
    }
}

impl IPreferenceStore for ConfigPreferenceStore {
    fn ntp_server(&self) -> anyhow::Result<ServerAddress> {
        if let Some(server) = &self.server_override {
            debug!(server = %server, "Using time server from command line");
            return Ok(server.clone());
        }

        let config = if self.path.exists() {
            Config::load(&self.path)
                .with_context(|| format!("Failed to load {}", self.path.display()))?
        } else {
            Config::default()
        };
        let server = config
            .server_address()
            .context("Invalid sync.server in configuration")?;
        debug!(server = %server, path = %self.path.display(), "Read time server from configuration");
        Ok(server)
    }
}
