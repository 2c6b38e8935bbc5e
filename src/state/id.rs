//! Identifier generation for locally created entities.
//!
//! Players carry ids issued by the remote source; teams are created locally
//! and need ids that will not collide with any team already stored, including
//! teams rehydrated from a previous session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote-issued player id.
pub type PlayerId = i64;

/// Locally generated team id. Immutable once a team exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(String);

impl TeamId {
    /// Wrap an existing id (for restoring state or tests).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TeamId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Source of fresh team ids.
pub trait IdGenerator: fmt::Debug + Send + Sync {
    fn next_id(&self) -> TeamId;
}

/// Random v4 UUIDs, rendered without hyphens.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> TeamId {
        TeamId(uuid::Uuid::new_v4().simple().to_string())
    }
}
