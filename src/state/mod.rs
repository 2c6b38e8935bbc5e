//! State management module for the roster manager.
//!
//! This module provides the core state types and stores:
//!
//! - `id` - Team id generation
//! - `player` - Fetched players, pagination and assignment
//! - `team` - User-defined teams and their rosters
//! - `session` - Local "logged in as" state
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                          RosterState                              │
//! │                                                                   │
//! │  ┌──────────────┐   ┌──────────────────┐   ┌──────────────────┐  │
//! │  │   Session    │   │    TeamStore     │   │   PlayerStore    │  │
//! │  │              │   │                  │   │                  │  │
//! │  │ display name │   │ team_id →        │   │ player_id →      │  │
//! │  │              │   │   Team           │   │   Player         │  │
//! │  │              │   │   (player_ids,   │◀─▶│   (team_id)      │  │
//! │  │              │   │    player_count) │   │ cursor, has_more │  │
//! │  └──────────────┘   └──────────────────┘   └──────────────────┘  │
//! │                                                                   │
//! │  Cross-store commands (assign, remove, delete cascade) only run   │
//! │  through RosterState so that roster membership and                │
//! │  Player::team_id never disagree.                                  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```

pub mod id;
pub mod player;
pub mod session;
pub mod team;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

pub use id::{IdGenerator, PlayerId, TeamId, UuidGenerator};
pub use player::{
    Cursor, FetchStatus, FetchTicket, NbaTeam, Page, Pagination, Player, PlayerStore, RawPlayer,
};
pub use session::Session;
pub use team::{Team, TeamDraft, TeamError, TeamStore, TeamUpdate};

use crate::persist::{PlayersSnapshot, Snapshot, TeamsSnapshot, SNAPSHOT_VERSION};

/// Combined application state.
///
/// Owns the three stores and runs every command that must touch more than
/// one of them. The single-store mutators that could break the
/// player/team link are not reachable from here except through these
/// composed commands.
#[derive(Debug, Clone, Default)]
pub struct RosterState {
    session: Session,
    teams: TeamStore,
    players: PlayerStore,
}

impl RosterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_generator(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            session: Session::default(),
            teams: TeamStore::with_id_generator(ids),
            players: PlayerStore::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn teams(&self) -> &TeamStore {
        &self.teams
    }

    pub fn players(&self) -> &PlayerStore {
        &self.players
    }

    // Session

    pub fn login(&mut self, display_name: &str) -> bool {
        self.session.login(display_name)
    }

    /// Clear the session and return teams and players to their initial
    /// state. An in-flight fetch started before this is discarded.
    pub fn logout(&mut self) {
        self.session.logout();
        self.reset();
    }

    /// Empty teams and players, pagination back to the start.
    pub fn reset(&mut self) {
        self.teams.reset();
        self.players.reset();
    }

    // Pagination

    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        self.players.begin_fetch()
    }

    pub fn apply_page(&mut self, ticket: FetchTicket, page: Page) -> Option<usize> {
        self.players.apply_page(ticket, page)
    }

    pub fn fail_fetch(&mut self, ticket: FetchTicket, message: impl Into<String>) -> bool {
        self.players.fail_fetch(ticket, message)
    }

    // Teams

    /// Create a team. Does not validate; see [`RosterState::create_validated_team`].
    pub fn create_team(&mut self, name: String, region: String, country: String) -> TeamId {
        self.teams.create(name, region, country)
    }

    /// Trim, require non-empty fields and a unique name, then create.
    pub fn create_validated_team(&mut self, draft: TeamDraft) -> Result<TeamId, TeamError> {
        let draft = draft.validate(&self.teams, None)?;
        Ok(self.teams.create(draft.name, draft.region, draft.country))
    }

    pub fn update_team(&mut self, team_id: &TeamId, updates: TeamUpdate) -> bool {
        self.teams.update(team_id, updates)
    }

    /// Validate the resulting name/region/country, then update.
    pub fn update_validated_team(
        &mut self,
        team_id: &TeamId,
        updates: TeamUpdate,
    ) -> Result<(), TeamError> {
        let team = self
            .teams
            .get(team_id)
            .ok_or_else(|| TeamError::NotFound(team_id.clone()))?;

        let merge = |update: &Option<String>, current: &str| match update {
            Some(v) if !v.trim().is_empty() => v.clone(),
            _ => current.to_string(),
        };
        let draft = TeamDraft::new(
            merge(&updates.name, &team.name),
            merge(&updates.region, &team.region),
            merge(&updates.country, &team.country),
        )
        .validate(&self.teams, Some(team_id))?;

        self.teams.update(
            team_id,
            TeamUpdate {
                name: Some(draft.name),
                region: Some(draft.region),
                country: Some(draft.country),
            },
        );
        Ok(())
    }

    // Cross-store commands

    /// Put an unassigned player on a team.
    ///
    /// The roster is only touched if the player-side assignment went
    /// through, so a rejected assignment leaves both stores unchanged.
    pub fn assign_player_to_team(&mut self, player_id: PlayerId, team_id: &TeamId) -> bool {
        if !self.teams.contains(team_id) {
            tracing::debug!(player_id, %team_id, "Assign ignored: unknown team");
            return false;
        }
        if !self.players.assign(player_id, team_id) {
            return false;
        }
        self.teams.add_player(team_id, player_id);
        true
    }

    /// Take a player off a team.
    ///
    /// The player is only unassigned if it actually belongs to `team_id`;
    /// a stale roster entry on `team_id` is removed either way.
    pub fn remove_player_from_team(&mut self, player_id: PlayerId, team_id: &TeamId) -> bool {
        let removed = self.teams.remove_player(team_id, player_id);
        let on_team = self
            .players
            .get(player_id)
            .is_some_and(|p| p.team_id.as_ref() == Some(team_id));
        if on_team {
            self.players.unassign(player_id);
        }
        removed || on_team
    }

    /// Delete a team and unassign every player on it.
    pub fn delete_team_cascade(&mut self, team_id: &TeamId) -> Option<Team> {
        let team = self.teams.delete(team_id)?;
        let cleared = self.players.unassign_all_for_team(team_id);
        tracing::debug!(%team_id, unassigned = cleared.len(), "Team deleted");
        Some(team)
    }

    // Read helpers

    /// The team `player_id` is assigned to.
    pub fn team_of(&self, player_id: PlayerId) -> Option<&Team> {
        let team_id = self.players.get(player_id)?.team_id.as_ref()?;
        self.teams.get(team_id)
    }

    /// Players on a team's roster, in roster order.
    pub fn roster(&self, team_id: &TeamId) -> Vec<&Player> {
        self.teams
            .get(team_id)
            .map(|team| {
                team.player_ids()
                    .iter()
                    .filter_map(|&id| self.players.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    // Consistency

    /// Every way the player/team link is currently broken. Empty when the
    /// state is consistent.
    pub fn inconsistencies(&self) -> Vec<Inconsistency> {
        let mut found = Vec::new();

        for player in self.players.players() {
            let Some(team_id) = &player.team_id else {
                continue;
            };
            match self.teams.get(team_id) {
                None => found.push(Inconsistency::DanglingTeam {
                    player_id: player.id(),
                    team_id: team_id.clone(),
                }),
                Some(team) if !team.has_player(player.id()) => {
                    found.push(Inconsistency::MissingFromRoster {
                        player_id: player.id(),
                        team_id: team_id.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        for team in self.teams.teams() {
            let mut seen = HashSet::new();
            for &player_id in team.player_ids() {
                if !seen.insert(player_id) {
                    found.push(Inconsistency::DuplicateRosterEntry {
                        player_id,
                        team_id: team.id.clone(),
                    });
                    continue;
                }
                let owner = self.players.get(player_id).and_then(|p| p.team_id.as_ref());
                if owner != Some(&team.id) {
                    found.push(Inconsistency::StrayRosterEntry {
                        player_id,
                        team_id: team.id.clone(),
                    });
                }
            }
            if team.player_count() != team.player_ids().len() {
                found.push(Inconsistency::CountMismatch {
                    team_id: team.id.clone(),
                    count: team.player_count(),
                    actual: team.player_ids().len(),
                });
            }
        }

        found
    }

    pub fn is_consistent(&self) -> bool {
        self.inconsistencies().is_empty()
    }

    /// Make the player/team link consistent again.
    ///
    /// Player assignments are authoritative: dangling `team_id`s are
    /// cleared, rosters are rebuilt to hold exactly their assigned players
    /// (existing order first).
    fn repair(&mut self) {
        let team_ids: HashSet<TeamId> = self.teams.teams().iter().map(|t| t.id.clone()).collect();
        for player in self.players.players_mut() {
            if let Some(team_id) = &player.team_id {
                if !team_ids.contains(team_id) {
                    tracing::warn!(player_id = player.info.id, %team_id, "Clearing dangling team assignment");
                    player.team_id = None;
                }
            }
        }

        let players = &self.players;
        for team in self.teams.teams_mut() {
            let team_id = team.id.clone();
            team.retain_players(|id| {
                players.get(id).and_then(|p| p.team_id.as_ref()) == Some(&team_id)
            });
            for player in players.on_team(&team_id) {
                team.ensure_player(player.id());
            }
        }
    }

    // Snapshots

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Some(chrono::Utc::now()),
            session: self.session.clone(),
            teams: TeamsSnapshot {
                teams: self.teams.teams().to_vec(),
            },
            players: PlayersSnapshot {
                players: self.players.players().to_vec(),
                status: self.players.status(),
                error: self.players.last_error().map(str::to_string),
                next_cursor: self.players.next_cursor(),
                has_more: self.players.has_more(),
            },
        }
    }

    /// Rebuild state from a persisted snapshot, repairing anything that
    /// would break the player/team link.
    pub fn from_snapshot(snapshot: Snapshot, ids: Arc<dyn IdGenerator>) -> Self {
        let Snapshot {
            session,
            teams,
            players,
            ..
        } = snapshot;

        let mut state = Self {
            session,
            teams: TeamStore::restore(teams.teams, ids),
            players: PlayerStore::restore(
                players.players,
                players.status,
                players.error,
                players.next_cursor,
                players.has_more,
            ),
        };
        state.repair();
        state
    }
}

/// A broken link between players and teams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    /// Player points at a team that does not exist
    DanglingTeam { player_id: PlayerId, team_id: TeamId },
    /// Player points at a team whose roster lacks it
    MissingFromRoster { player_id: PlayerId, team_id: TeamId },
    /// Roster lists a player that does not point back
    StrayRosterEntry { player_id: PlayerId, team_id: TeamId },
    DuplicateRosterEntry { player_id: PlayerId, team_id: TeamId },
    CountMismatch {
        team_id: TeamId,
        count: usize,
        actual: usize,
    },
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingTeam { player_id, team_id } => {
                write!(f, "player {} assigned to missing team {}", player_id, team_id)
            }
            Self::MissingFromRoster { player_id, team_id } => {
                write!(f, "player {} not on roster of team {}", player_id, team_id)
            }
            Self::StrayRosterEntry { player_id, team_id } => {
                write!(f, "team {} lists unassigned player {}", team_id, player_id)
            }
            Self::DuplicateRosterEntry { player_id, team_id } => {
                write!(f, "team {} lists player {} twice", team_id, player_id)
            }
            Self::CountMismatch {
                team_id,
                count,
                actual,
            } => write!(
                f,
                "team {} has player_count {} but {} roster entries",
                team_id, count, actual
            ),
        }
    }
}
