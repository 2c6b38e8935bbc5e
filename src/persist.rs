//! Snapshot schema and the built-in snapshot stores.
//!
//! The snapshot mirrors the three stores: `session`, `teams`, `players`
//! (with pagination). Every level defaults missing fields, so a snapshot
//! written by an older or newer build still loads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;

use crate::config::StorageConfig;
use crate::ports::{PersistError, SnapshotStore};
use crate::state::{Cursor, FetchStatus, Player, Session, Team};

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything that survives a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: Option<DateTime<Utc>>,
    pub session: Session,
    pub teams: TeamsSnapshot,
    pub players: PlayersSnapshot,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: None,
            session: Session::default(),
            teams: TeamsSnapshot::default(),
            players: PlayersSnapshot::default(),
        }
    }
}

impl Snapshot {
    /// Parse a stored snapshot, filling in anything missing.
    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        let snapshot: Self = serde_json::from_str(json)?;
        if snapshot.version > SNAPSHOT_VERSION {
            tracing::warn!(
                version = snapshot.version,
                supported = SNAPSHOT_VERSION,
                "Loading snapshot from a newer schema"
            );
        }
        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamsSnapshot {
    #[serde(deserialize_with = "skip_unreadable")]
    pub teams: Vec<Team>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayersSnapshot {
    #[serde(deserialize_with = "skip_unreadable")]
    pub players: Vec<Player>,
    pub status: FetchStatus,
    pub error: Option<String>,
    pub next_cursor: Cursor,
    pub has_more: bool,
}

impl Default for PlayersSnapshot {
    fn default() -> Self {
        Self {
            players: Vec::new(),
            status: FetchStatus::Idle,
            error: None,
            next_cursor: 0,
            has_more: true,
        }
    }
}

/// Decode a list entry by entry. Entries that do not parse (no usable id,
/// wrong shape) are dropped with a warning; `null` reads as empty.
fn skip_unreadable<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    let items = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(
                    index,
                    kind = std::any::type_name::<T>(),
                    "Dropping unreadable snapshot entry: {}",
                    e
                );
                None
            }
        })
        .collect();
    Ok(items)
}

/// Keeps the serialized snapshot in memory. Nothing outlives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with raw stored JSON, as a previous run might have left it.
    pub fn with_json(json: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(json.into())),
        }
    }

    /// Raw stored JSON, if any.
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load(&self) -> Result<Option<Snapshot>, PersistError> {
        let slot = self.slot.lock().map_err(|_| PersistError::Poisoned)?;
        slot.as_deref().map(Snapshot::from_json).transpose()
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        let json = snapshot.to_json()?;
        *self.slot.lock().map_err(|_| PersistError::Poisoned)? = Some(json);
        Ok(())
    }

    async fn clear(&self) -> Result<(), PersistError> {
        *self.slot.lock().map_err(|_| PersistError::Poisoned)? = None;
        Ok(())
    }
}

/// Stores the snapshot as a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.path.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn load(&self) -> Result<Option<Snapshot>, PersistError> {
        let data = match fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Snapshot::from_json(&data).map(Some)
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let data = snapshot.to_json()?;

        // Write beside the target, then swap, so a crash never leaves half a file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), PersistError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
