//! Capabilities the engine is handed from outside.
//!
//! The engine never talks to the network or the disk directly. It pulls
//! pages through a [`PageFetcher`] and saves/restores its state through a
//! [`SnapshotStore`], so tests can swap either for a fake.

use async_trait::async_trait;

use crate::persist::Snapshot;
use crate::state::{Cursor, Page};

/// Page fetch errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Request never produced a response.
    #[error("A network error occurred while fetching players: {0}")]
    Transport(String),

    /// Response with a non-success status.
    #[error("Failed to fetch players: HTTP {0}")]
    Status(u16),

    /// Response body was not a valid page.
    #[error("Invalid player page: {0}")]
    Decode(String),
}

/// Source of player pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the page starting at `cursor` (`0` = first page).
    async fn fetch_page(&self, cursor: Cursor) -> Result<Page, FetchError>;
}

/// Persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Durable home for the combined roster snapshot.
///
/// The engine calls `save` and `clear` from a single background task, one
/// call at a time and in command order.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the last saved snapshot, `None` if nothing was saved yet.
    async fn load(&self) -> Result<Option<Snapshot>, PersistError>;

    async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistError>;

    /// Forget the saved snapshot. Used on logout.
    async fn clear(&self) -> Result<(), PersistError>;
}
