//! Progress store port (driven/secondary port)
//!
//! Keeps the controller's [`ProgressState`] outside any single controller
//! instance, so a recreated controller can re-show the indicator of a
//! request that is still in flight.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;

use crate::domain::ProgressState;

/// Port trait for retaining progress state across controller instances
pub trait IProgressStore: Send + Sync {
    /// Returns the retained state (`Idle` if nothing was stored)
    fn load(&self) -> anyhow::Result<ProgressState>;

    /// Replaces the retained state
    fn save(&self, state: &ProgressState) -> anyhow::Result<()>;
}

// ============================================================================
// In-memory adapter
// ============================================================================

/// Process-local progress store
///
/// Share it through an `Arc` between successive controller instances.
#[derive(Debug, Default)]
pub struct InMemoryProgressStore {
    state: Mutex<ProgressState>,
}

impl InMemoryProgressStore {
    /// Creates a store holding `Idle`
    pub fn new() -> Self {
        Self::default()
    }
}

impl IProgressStore for InMemoryProgressStore {
    fn load(&self) -> anyhow::Result<ProgressState> {
        let guard = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("progress store lock poisoned"))?;
        Ok(*guard)
    }

    fn save(&self, state: &ProgressState) -> anyhow::Result<()> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("progress store lock poisoned"))?;
        *guard = *state;
        Ok(())
    }
}

// ============================================================================
// JSON file adapter
// ============================================================================

/// Progress store persisted as a small JSON document
///
/// Writes go to a sibling temporary file that is renamed over the target,
/// so readers never observe a half-written document.
#[derive(Debug, Clone)]
pub struct FileProgressStore {
    path: PathBuf,
}

impl FileProgressStore {
    /// Creates a store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Platform-appropriate default location
    ///
    /// Typically `$XDG_STATE_HOME/ntpsync/progress.json` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("~/.local/state"))
            .join("ntpsync")
            .join("progress.json")
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IProgressStore for FileProgressStore {
    fn load(&self) -> anyhow::Result<ProgressState> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).with_context(|| {
                format!("Failed to parse progress state {}", self.path.display())
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ProgressState::Idle),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to read progress state {}", self.path.display())
            }),
        }
    }

    fn save(&self, state: &ProgressState) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(state)?;
        std::fs::write(&tmp, content)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}
