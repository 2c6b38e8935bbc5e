//! Roster State Library
//!
//! This crate provides the state engine behind a basketball roster manager:
//! players pulled page by page from a remote API, teams built locally from
//! those players, and a session that is restored across restarts.
//!
//! # Overview
//!
//! - **Player Store** - Accumulates fetched players without duplicates and
//!   tracks the pagination cursor, fetch status and last error.
//!
//! - **Team Store** - User-defined teams with a roster and a cached player count.
//!
//! - **Roster State** - Runs the commands that touch both stores (assign,
//!   remove, delete-with-cascade) so a player's team and that team's roster
//!   never disagree.
//!
//! - **Engine** - The async command surface: single-flight page loading,
//!   validated team commands, rehydration and save-after-every-command.
//!
//! # Design Principles
//!
//! 1. **Guards, not errors** - Commands that make no sense (assigning an
//!    assigned player, touching an unknown id) are no-ops reported as `false`.
//!
//! 2. **Injected edges** - Network and storage sit behind [`PageFetcher`] and
//!    [`SnapshotStore`]; the state itself does no I/O.
//!
//! 3. **Tolerant persistence** - Snapshots with missing fields load with
//!    initial values; broken links are repaired on load.
//!
//! # Example
//!
//! ```rust
//! use roster_state::{Page, RawPlayer, RosterState};
//!
//! let mut state = RosterState::new();
//! let lakers = state.create_team("Lakers".into(), "West".into(), "USA".into());
//!
//! let ticket = state.begin_fetch().unwrap();
//! state.apply_page(ticket, Page {
//!     records: vec![RawPlayer::new(7, "A", "B")],
//!     next_cursor: None,
//!     page_size: 10,
//! });
//!
//! assert!(state.assign_player_to_team(7, &lakers));
//! assert_eq!(state.teams().get(&lakers).unwrap().player_count(), 1);
//!
//! state.delete_team_cascade(&lakers);
//! assert_eq!(state.players().get(7).unwrap().team_id, None);
//! ```

pub mod config;
pub mod engine;
#[cfg(feature = "http")]
pub mod http;
pub mod persist;
pub mod ports;
pub mod state;

pub use config::{FetcherConfig, StorageConfig};
pub use engine::{FetchOutcome, Roster, RosterView, View};
#[cfg(feature = "http")]
pub use http::BallDontLieFetcher;
pub use persist::{JsonFileStore, MemoryStore, Snapshot, SNAPSHOT_VERSION};
pub use ports::{FetchError, PageFetcher, PersistError, SnapshotStore};

// Re-export everything from state module at crate root
pub use state::*;
