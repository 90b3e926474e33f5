//! Backing-store boundary.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::GraphSnapshot;
use crate::error::PersistenceError;

/// Where snapshots are written and read.
///
/// Implementations must make `save` all-or-nothing: a failed save leaves the
/// previous snapshot loadable.
pub trait SnapshotStore: Send + Sync + fmt::Debug {
    fn save(&self, snapshot: &GraphSnapshot) -> Result<(), PersistenceError>;

    fn load(&self) -> Result<GraphSnapshot, PersistenceError>;

    /// Human-readable location, used in logs.
    fn describe(&self) -> String;
}

/// Single JSON file, replaced atomically through a temp file and rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for JsonFileStore {
    fn save(&self, snapshot: &GraphSnapshot) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = snapshot.to_json()?;
        let temp = self.temp_path();
        {
            let mut file = fs::File::create(&temp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp, &self.path)?;
        debug!(
            path = %self.path.display(),
            bytes = json.len(),
            tick = snapshot.tick,
            "Snapshot written"
        );
        Ok(())
    }

    fn load(&self) -> Result<GraphSnapshot, PersistenceError> {
        if !self.path.exists() {
            return Err(PersistenceError::Missing(self.describe()));
        }
        let json = fs::read_to_string(&self.path)?;
        GraphSnapshot::from_json(&json)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    latest: Mutex<Option<GraphSnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_snapshot(&self) -> bool {
        self.latest.lock().is_some()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, snapshot: &GraphSnapshot) -> Result<(), PersistenceError> {
        *self.latest.lock() = Some(snapshot.clone());
        Ok(())
    }

    fn load(&self) -> Result<GraphSnapshot, PersistenceError> {
        self.latest
            .lock()
            .clone()
            .ok_or_else(|| PersistenceError::Missing(self.describe()))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Durability of the in-memory graph relative to its backing store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DurabilityStatus {
    /// No store attached; the graph lives in memory only.
    #[default]
    Unattached,
    /// Last save succeeded.
    Healthy { last_saved_tick: u64 },
    /// Saves are failing; the engine keeps running on its last good state.
    Degraded {
        since_tick: u64,
        failures: u32,
        error: String,
    },
}

impl DurabilityStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Fold a save result into the status.
    pub fn record(&mut self, tick: u64, result: &Result<(), PersistenceError>) {
        let next = match (result, &*self) {
            (Ok(()), _) => Self::Healthy { last_saved_tick: tick },
            (Err(e), Self::Degraded { since_tick, failures, .. }) => Self::Degraded {
                since_tick: *since_tick,
                failures: failures.saturating_add(1),
                error: e.to_string(),
            },
            (Err(e), _) => Self::Degraded {
                since_tick: tick,
                failures: 1,
                error: e.to_string(),
            },
        };
        *self = next;
    }
}
