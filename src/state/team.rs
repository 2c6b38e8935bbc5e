//! Team store.
//!
//! Teams are created by the user. Each team keeps an ordered roster of
//! player IDs and a cached `player_count` that always equals the roster
//! length. The store never looks at players; keeping `Player::team_id` in
//! step with rosters is the job of [`RosterState`](super::RosterState).

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::id::{IdGenerator, PlayerId, TeamId, UuidGenerator};

/// A user-defined team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Unique team ID
    pub id: TeamId,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub country: String,

    /// Roster in insertion order, no duplicates
    #[serde(default)]
    player_ids: Vec<PlayerId>,

    /// Always `player_ids.len()`
    #[serde(default)]
    player_count: usize,
}

impl Team {
    /// Create a team with an empty roster.
    pub fn new(id: TeamId, name: String, region: String, country: String) -> Self {
        Self {
            id,
            name,
            region,
            country,
            player_ids: Vec::new(),
            player_count: 0,
        }
    }

    pub fn player_ids(&self) -> &[PlayerId] {
        &self.player_ids
    }

    pub fn player_count(&self) -> usize {
        self.player_count
    }

    pub fn has_player(&self, player_id: PlayerId) -> bool {
        self.player_ids.contains(&player_id)
    }

    /// Case-insensitive name comparison.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.trim().to_lowercase() == name.trim().to_lowercase()
    }

    fn add_player(&mut self, player_id: PlayerId) -> bool {
        if self.has_player(player_id) {
            return false;
        }
        self.player_ids.push(player_id);
        self.player_count = self.player_ids.len();
        true
    }

    fn remove_player(&mut self, player_id: PlayerId) -> bool {
        let before = self.player_ids.len();
        self.player_ids.retain(|&id| id != player_id);
        self.player_count = self.player_ids.len();
        self.player_ids.len() != before
    }

    /// Keep only roster entries accepted by `keep`, dropping duplicates and
    /// recomputing the count. Used when loading persisted teams.
    pub(crate) fn retain_players(&mut self, mut keep: impl FnMut(PlayerId) -> bool) {
        let mut seen = std::collections::HashSet::new();
        self.player_ids.retain(|&id| seen.insert(id) && keep(id));
        self.player_count = self.player_ids.len();
    }

    pub(crate) fn ensure_player(&mut self, player_id: PlayerId) {
        self.add_player(player_id);
    }
}

/// Partial update of a team's descriptive fields.
///
/// Fields that are `None`, or empty after trimming, are left unchanged.
/// The roster can never be changed through an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamUpdate {
    pub name: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

impl TeamUpdate {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }
}

/// Input for creating a team, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamDraft {
    pub name: String,
    pub region: String,
    pub country: String,
}

impl TeamDraft {
    pub fn new(
        name: impl Into<String>,
        region: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            country: country.into(),
        }
    }

    /// Trim every field, require it non-empty, and require the name to be
    /// unique (case-insensitively) among `teams`, ignoring `editing`.
    pub fn validate(self, teams: &TeamStore, editing: Option<&TeamId>) -> Result<Self, TeamError> {
        let draft = Self {
            name: self.name.trim().to_string(),
            region: self.region.trim().to_string(),
            country: self.country.trim().to_string(),
        };

        for (field, value) in [
            ("name", &draft.name),
            ("region", &draft.region),
            ("country", &draft.country),
        ] {
            if value.is_empty() {
                return Err(TeamError::EmptyField(field));
            }
        }

        let taken = teams
            .teams()
            .iter()
            .any(|t| t.is_named(&draft.name) && Some(&t.id) != editing);
        if taken {
            return Err(TeamError::DuplicateName(draft.name));
        }

        Ok(draft)
    }
}

/// Team validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TeamError {
    #[error("Team {0} is required")]
    EmptyField(&'static str),

    #[error("The team name \"{0}\" is already taken and must be unique")]
    DuplicateName(String),

    #[error("Team not found: {0}")]
    NotFound(TeamId),
}

/// Canonical collection of teams.
#[derive(Debug, Clone)]
pub struct TeamStore {
    /// Teams in creation order
    teams: Vec<Team>,

    ids: Arc<dyn IdGenerator>,
}

impl Default for TeamStore {
    fn default() -> Self {
        Self::with_id_generator(Arc::new(UuidGenerator))
    }
}

impl TeamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_generator(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            teams: Vec::new(),
            ids,
        }
    }

    /// Rebuild from persisted teams. Later teams reusing an earlier id are
    /// dropped; rosters are deduplicated and counts recomputed.
    pub fn restore(teams: Vec<Team>, ids: Arc<dyn IdGenerator>) -> Self {
        let mut store = Self::with_id_generator(ids);
        for mut team in teams {
            if store.contains(&team.id) {
                tracing::warn!(team_id = %team.id, "Dropping persisted team with duplicate id");
                continue;
            }
            team.retain_players(|_| true);
            store.teams.push(team);
        }
        store
    }

    /// Create a team with a fresh id and an empty roster.
    ///
    /// No validation happens here; see [`TeamDraft::validate`].
    pub fn create(&mut self, name: String, region: String, country: String) -> TeamId {
        let id = self.ids.next_id();
        self.teams
            .push(Team::new(id.clone(), name, region, country));
        id
    }

    /// Apply an update to name/region/country. Returns `false` if the team
    /// does not exist.
    pub fn update(&mut self, team_id: &TeamId, updates: TeamUpdate) -> bool {
        let Some(team) = self.get_mut(team_id) else {
            tracing::debug!(%team_id, "Update ignored: unknown team");
            return false;
        };

        let pick = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        if let Some(name) = pick(updates.name) {
            team.name = name;
        }
        if let Some(region) = pick(updates.region) {
            team.region = region;
        }
        if let Some(country) = pick(updates.country) {
            team.country = country;
        }
        true
    }

    /// Append a player to a roster. Returns `false` if the team does not
    /// exist or the player is already on it.
    pub fn add_player(&mut self, team_id: &TeamId, player_id: PlayerId) -> bool {
        self.get_mut(team_id)
            .map(|team| team.add_player(player_id))
            .unwrap_or(false)
    }

    /// Remove a player from a roster. Returns `true` if the player was on it.
    pub fn remove_player(&mut self, team_id: &TeamId, player_id: PlayerId) -> bool {
        self.get_mut(team_id)
            .map(|team| team.remove_player(player_id))
            .unwrap_or(false)
    }

    /// Remove a team. Players are not touched.
    pub fn delete(&mut self, team_id: &TeamId) -> Option<Team> {
        let pos = self.teams.iter().position(|t| &t.id == team_id)?;
        Some(self.teams.remove(pos))
    }

    pub fn get(&self, team_id: &TeamId) -> Option<&Team> {
        self.teams.iter().find(|t| &t.id == team_id)
    }

    pub(crate) fn get_mut(&mut self, team_id: &TeamId) -> Option<&mut Team> {
        self.teams.iter_mut().find(|t| &t.id == team_id)
    }

    pub(crate) fn teams_mut(&mut self) -> impl Iterator<Item = &mut Team> {
        self.teams.iter_mut()
    }

    /// Find a team by name, case-insensitively.
    pub fn find_by_name(&self, name: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.is_named(name))
    }

    /// The team whose roster holds `player_id`, if any.
    pub fn team_of(&self, player_id: PlayerId) -> Option<&Team> {
        self.teams.iter().find(|t| t.has_player(player_id))
    }

    pub fn contains(&self, team_id: &TeamId) -> bool {
        self.get(team_id).is_some()
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Drop every team.
    pub fn reset(&mut self) {
        self.teams.clear();
    }
}
