//! Player store.
//!
//! Holds every player fetched so far, in first-seen order, together with the
//! pagination cursor used to pull the next page from the remote source.
//!
//! # Fetch Lifecycle
//!
//! ```text
//! ┌──────┐ begin_fetch ┌─────────┐ apply_page ┌───────────┐
//! │ Idle │────────────▶│ Loading │───────────▶│ Succeeded │──┐
//! └──────┘             └────┬────┘            └───────────┘  │
//!    ▲                      │ fail_fetch            ▲        │ begin_fetch
//!    │ reset                ▼                       │        │ (while has_more)
//!    │                 ┌────────┐                   │        │
//!    └─────────────────│ Failed │───────────────────┴────────┘
//!                      └────────┘   begin_fetch (retry, same cursor)
//! ```
//!
//! `Loading` doubles as the single-flight guard: `begin_fetch` refuses to
//! start a second request while one is outstanding.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::id::{PlayerId, TeamId};

/// Opaque pagination pointer. `0` is the start of the sequence.
pub type Cursor = u64;

/// The NBA franchise a player belongs to, as reported by the remote source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NbaTeam {
    pub id: i64,
    pub conference: String,
    pub division: String,
    pub city: String,
    pub name: String,
    pub full_name: String,
    pub abbreviation: String,
}

/// A player record exactly as delivered by the page fetcher.
///
/// Only `id` drives engine logic. The rest is carried through untouched,
/// including any fields not named here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPlayer {
    pub id: PlayerId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub height: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub jersey_number: Option<String>,
    #[serde(default)]
    pub college: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub draft_year: Option<i32>,
    #[serde(default)]
    pub draft_round: Option<i32>,
    #[serde(default)]
    pub draft_number: Option<i32>,
    #[serde(default)]
    pub team: Option<NbaTeam>,
    /// Remote fields this crate does not model.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RawPlayer {
    /// Minimal record, mostly for tests and fixtures.
    pub fn new(id: PlayerId, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            position: String::new(),
            height: None,
            weight: None,
            jersey_number: None,
            college: None,
            country: None,
            draft_year: None,
            draft_round: None,
            draft_number: None,
            team: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A known player plus its local team assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub info: RawPlayer,
    /// Team this player is assigned to. Must name an existing team.
    #[serde(default)]
    pub team_id: Option<TeamId>,
}

impl Player {
    pub fn id(&self) -> PlayerId {
        self.info.id
    }

    pub fn is_assigned(&self) -> bool {
        self.team_id.is_some()
    }
}

/// One page returned by the fetcher.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub records: Vec<RawPlayer>,
    /// `None` marks the end of the sequence.
    pub next_cursor: Option<Cursor>,
    pub page_size: u32,
}

/// Fetch status of the player collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

impl FetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handed out by `begin_fetch`; must be presented when the result arrives.
///
/// A reset between the two calls invalidates the ticket so that a page
/// requested before the reset is not merged into the fresh store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub cursor: Cursor,
    generation: u64,
}

/// Pagination read model for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub loading: bool,
    pub has_more: bool,
    pub error: Option<String>,
}

/// Canonical collection of known players.
#[derive(Debug, Clone)]
pub struct PlayerStore {
    /// Players in first-seen order
    players: Vec<Player>,

    /// Player ID to position in `players`
    index: HashMap<PlayerId, usize>,

    status: FetchStatus,
    last_error: Option<String>,
    next_cursor: Cursor,
    has_more: bool,

    /// Bumped on reset to invalidate outstanding fetch tickets
    generation: u64,
}

impl Default for PlayerStore {
    fn default() -> Self {
        Self {
            players: Vec::new(),
            index: HashMap::new(),
            status: FetchStatus::Idle,
            last_error: None,
            next_cursor: 0,
            has_more: true,
            generation: 0,
        }
    }
}

impl PlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted parts.
    ///
    /// Duplicate ids keep their first occurrence. A persisted `Loading`
    /// status cannot be resumed (the request died with the old process), so
    /// it comes back as `Idle`.
    pub fn restore(
        players: Vec<Player>,
        status: FetchStatus,
        last_error: Option<String>,
        next_cursor: Cursor,
        has_more: bool,
    ) -> Self {
        let mut store = Self {
            status: match status {
                FetchStatus::Loading => FetchStatus::Idle,
                other => other,
            },
            last_error: if status == FetchStatus::Failed {
                last_error
            } else {
                None
            },
            next_cursor,
            has_more,
            ..Self::default()
        };
        for player in players {
            if store.index.contains_key(&player.id()) {
                continue;
            }
            store.index.insert(player.id(), store.players.len());
            store.players.push(player);
        }
        store
    }

    /// Start a page request.
    ///
    /// Returns `None` (and changes nothing) when the sequence is exhausted
    /// or a request is already in flight.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if !self.has_more || self.status == FetchStatus::Loading {
            tracing::debug!(
                has_more = self.has_more,
                status = %self.status,
                "Skipping page request"
            );
            return None;
        }

        self.status = FetchStatus::Loading;
        self.last_error = None;
        Some(FetchTicket {
            cursor: self.next_cursor,
            generation: self.generation,
        })
    }

    /// Merge a fetched page. Returns how many players were appended, or
    /// `None` if the ticket predates a reset and the page was discarded.
    pub fn apply_page(&mut self, ticket: FetchTicket, page: Page) -> Option<usize> {
        if ticket.generation != self.generation {
            tracing::debug!(cursor = ticket.cursor, "Discarding page from before reset");
            return None;
        }

        let mut added = 0;
        for raw in page.records {
            // First-seen wins; the existing record keeps its data and team.
            if self.index.contains_key(&raw.id) {
                continue;
            }
            self.index.insert(raw.id, self.players.len());
            self.players.push(Player {
                info: raw,
                team_id: None,
            });
            added += 1;
        }

        self.next_cursor = page.next_cursor.unwrap_or(0);
        self.has_more = page.next_cursor.is_some();
        self.status = FetchStatus::Succeeded;
        Some(added)
    }

    /// Record a failed request. Cursor and `has_more` stay put so the next
    /// request retries the same page.
    pub fn fail_fetch(&mut self, ticket: FetchTicket, message: impl Into<String>) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        self.status = FetchStatus::Failed;
        self.last_error = Some(message.into());
        true
    }

    /// Assign an unassigned player. Already-assigned or unknown players are
    /// left untouched and `false` is returned.
    pub fn assign(&mut self, player_id: PlayerId, team_id: &TeamId) -> bool {
        let Some(player) = self.get_mut(player_id) else {
            tracing::debug!(player_id, "Assign ignored: unknown player");
            return false;
        };
        if let Some(current) = &player.team_id {
            tracing::debug!(player_id, team_id = %current, "Assign ignored: already assigned");
            return false;
        }
        player.team_id = Some(team_id.clone());
        true
    }

    /// Clear a player's team. Returns `false` if the player is unknown.
    pub fn unassign(&mut self, player_id: PlayerId) -> bool {
        match self.get_mut(player_id) {
            Some(player) => {
                player.team_id = None;
                true
            }
            None => false,
        }
    }

    /// Clear the team of every player pointing at `team_id`.
    /// Returns the affected player IDs.
    pub fn unassign_all_for_team(&mut self, team_id: &TeamId) -> Vec<PlayerId> {
        let mut cleared = Vec::new();
        for player in &mut self.players {
            if player.team_id.as_ref() == Some(team_id) {
                player.team_id = None;
                cleared.push(player.info.id);
            }
        }
        cleared
    }

    /// Return to the initial empty state, invalidating any in-flight fetch.
    pub fn reset(&mut self) {
        let generation = self.generation + 1;
        *self = Self {
            generation,
            ..Self::default()
        };
    }

    pub fn get(&self, player_id: PlayerId) -> Option<&Player> {
        self.index.get(&player_id).map(|&i| &self.players[i])
    }

    fn get_mut(&mut self, player_id: PlayerId) -> Option<&mut Player> {
        let i = *self.index.get(&player_id)?;
        self.players.get_mut(i)
    }

    pub(crate) fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.index.contains_key(&player_id)
    }

    /// All players in first-seen order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Players not on any team.
    pub fn unassigned(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.team_id.is_none())
    }

    /// Players whose `team_id` is `team_id`.
    pub fn on_team<'a>(&'a self, team_id: &'a TeamId) -> impl Iterator<Item = &'a Player> + 'a {
        self.players
            .iter()
            .filter(move |p| p.team_id.as_ref() == Some(team_id))
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn status(&self) -> FetchStatus {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn next_cursor(&self) -> Cursor {
        self.next_cursor
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn pagination(&self) -> Pagination {
        Pagination {
            loading: self.is_loading(),
            has_more: self.has_more,
            error: self.last_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page(ids: &[PlayerId], next_cursor: Option<Cursor>) -> Page {
        Page {
            records: ids
                .iter()
                .map(|&id| RawPlayer::new(id, format!("First{}", id), format!("Last{}", id)))
                .collect(),
            next_cursor,
            page_size: 10,
        }
    }

    fn load(store: &mut PlayerStore, ids: &[PlayerId], next_cursor: Option<Cursor>) -> usize {
        let ticket = store.begin_fetch().unwrap();
        store.apply_page(ticket, page(ids, next_cursor)).unwrap()
    }

    fn ids(store: &PlayerStore) -> Vec<PlayerId> {
        store.players().iter().map(Player::id).collect()
    }

    #[test]
    fn test_initial_state() {
        let store = PlayerStore::new();
        assert!(store.is_empty());
        assert_eq!(store.status(), FetchStatus::Idle);
        assert_eq!(store.next_cursor(), 0);
        assert!(store.has_more());
        assert_eq!(store.last_error(), None);
    }

    #[test]
    fn test_begin_fetch_sets_loading_and_guards() {
        let mut store = PlayerStore::new();

        let ticket = store.begin_fetch().unwrap();
        assert_eq!(ticket.cursor, 0);
        assert!(store.is_loading());

        // Second request while loading is refused
        assert!(store.begin_fetch().is_none());
        assert!(store.is_loading());
    }

    #[test]
    fn test_apply_page_advances_cursor() {
        let mut store = PlayerStore::new();

        assert_eq!(load(&mut store, &[1, 2, 3], Some(3)), 3);
        assert_eq!(store.status(), FetchStatus::Succeeded);
        assert_eq!(store.next_cursor(), 3);
        assert!(store.has_more());

        let ticket = store.begin_fetch().unwrap();
        assert_eq!(ticket.cursor, 3);
        store.apply_page(ticket, page(&[4], None)).unwrap();

        assert_eq!(ids(&store), vec![1, 2, 3, 4]);
        assert_eq!(store.next_cursor(), 0);
        assert!(!store.has_more());

        // Exhausted: no further requests
        assert!(store.begin_fetch().is_none());
        assert_eq!(store.status(), FetchStatus::Succeeded);
    }

    #[test]
    fn test_refetch_does_not_duplicate_or_clear_assignment() {
        let mut store = PlayerStore::new();
        load(&mut store, &[1, 2], Some(2));

        let team = TeamId::new("team-a");
        assert!(store.assign(1, &team));

        // Same records again, plus one new id and an in-page duplicate
        assert_eq!(load(&mut store, &[1, 2, 5, 5], Some(4)), 1);

        assert_eq!(ids(&store), vec![1, 2, 5]);
        assert_eq!(store.get(1).unwrap().team_id, Some(team));
        assert_eq!(store.get(2).unwrap().team_id, None);
        assert_eq!(store.get(5).unwrap().team_id, None);
    }

    #[test]
    fn test_first_seen_wins_for_data() {
        let mut store = PlayerStore::new();
        load(&mut store, &[9], Some(1));

        let ticket = store.begin_fetch().unwrap();
        let mut renamed = RawPlayer::new(9, "Other", "Name");
        renamed.position = "C".to_string();
        store
            .apply_page(
                ticket,
                Page {
                    records: vec![renamed],
                    next_cursor: None,
                    page_size: 10,
                },
            )
            .unwrap();

        assert_eq!(store.get(9).unwrap().info.first_name, "First9");
    }

    #[test]
    fn test_failure_keeps_cursor_for_retry() {
        let mut store = PlayerStore::new();
        load(&mut store, &[1], Some(10));

        let ticket = store.begin_fetch().unwrap();
        assert!(store.fail_fetch(ticket, "Failed to fetch players: HTTP 500"));

        assert_eq!(store.status(), FetchStatus::Failed);
        assert_eq!(store.last_error(), Some("Failed to fetch players: HTTP 500"));
        assert_eq!(store.next_cursor(), 10);
        assert!(store.has_more());

        // Retry resumes from the same cursor and clears the error
        let retry = store.begin_fetch().unwrap();
        assert_eq!(retry.cursor, 10);
        assert_eq!(store.last_error(), None);
    }

    #[test]
    fn test_reset_invalidates_outstanding_ticket() {
        let mut store = PlayerStore::new();
        let ticket = store.begin_fetch().unwrap();

        store.reset();
        assert!(store.apply_page(ticket, page(&[1, 2], None)).is_none());
        assert!(!store.fail_fetch(ticket, "late"));

        assert!(store.is_empty());
        assert_eq!(store.status(), FetchStatus::Idle);
        assert!(store.has_more());
    }

    #[test]
    fn test_assign_guards() {
        let mut store = PlayerStore::new();
        load(&mut store, &[1], None);

        let a = TeamId::new("a");
        let b = TeamId::new("b");

        assert!(!store.assign(99, &a));
        assert!(store.assign(1, &a));
        assert!(!store.assign(1, &b));
        assert_eq!(store.get(1).unwrap().team_id, Some(a));

        assert!(store.unassign(1));
        assert!(!store.unassign(99));
        assert!(!store.get(1).unwrap().is_assigned());
    }

    #[test]
    fn test_unassign_all_for_team() {
        let mut store = PlayerStore::new();
        load(&mut store, &[1, 2, 3, 4], None);

        let a = TeamId::new("a");
        let b = TeamId::new("b");
        store.assign(1, &a);
        store.assign(2, &b);
        store.assign(3, &a);

        assert_eq!(store.unassign_all_for_team(&a), vec![1, 3]);
        assert_eq!(store.on_team(&a).count(), 0);
        assert_eq!(store.on_team(&b).count(), 1);
        assert_eq!(store.unassigned().count(), 3);
    }

    #[test]
    fn test_restore_normalizes_loading_and_duplicates() {
        let player = |id| Player {
            info: RawPlayer::new(id, "A", "B"),
            team_id: None,
        };
        let mut store = PlayerStore::restore(
            vec![player(1), player(2), player(1)],
            FetchStatus::Loading,
            Some("stale".to_string()),
            20,
            true,
        );

        assert_eq!(ids(&store), vec![1, 2]);
        assert_eq!(store.status(), FetchStatus::Idle);
        assert_eq!(store.last_error(), None);
        assert_eq!(store.begin_fetch().map(|t| t.cursor), Some(20));
    }

    #[test]
    fn test_raw_player_keeps_unknown_fields() {
        let json = serde_json::json!({
            "id": 7,
            "first_name": "A",
            "last_name": "B",
            "position": "G",
            "jersey_number": "23",
            "team": {"id": 14, "abbreviation": "LAL", "full_name": "Los Angeles Lakers"},
            "nickname": "The Seventh"
        });

        let raw: RawPlayer = serde_json::from_value(json).unwrap();
        assert_eq!(raw.full_name(), "A B");
        assert_eq!(raw.team.as_ref().unwrap().abbreviation, "LAL");
        assert_eq!(raw.extra.get("nickname").unwrap(), "The Seventh");

        let back = serde_json::to_value(&raw).unwrap();
        assert_eq!(back["nickname"], "The Seventh");
    }
}
