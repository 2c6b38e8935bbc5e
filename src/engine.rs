//! The command surface the UI talks to.
//!
//! [`Roster`] wraps a [`RosterState`] behind an async mutex together with
//! the injected [`PageFetcher`] and [`SnapshotStore`]. Every command locks,
//! mutates, hands a snapshot to the background writer and returns; the lock
//! is never held across the fetcher call or a store write, so other commands
//! keep working while a page is loading or the disk is slow.
//!
//! # Lifecycle
//!
//! ```text
//! Roster::new ──▶ View::Mounting ── hydrate() ──▶ View::Ready(RosterView)
//!                     (nothing is saved or fetched until hydrate() has run)
//! ```
//!
//! # Saving
//!
//! ```text
//! command ──▶ Writer::submit ──watch──▶ writer task ──▶ SnapshotStore::save
//!                (latest wins)            (one at a time, in order)
//! ```

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use crate::persist::Snapshot;
use crate::ports::{PageFetcher, SnapshotStore};
use crate::state::{
    IdGenerator, Pagination, Player, PlayerId, RosterState, Session, Team, TeamDraft, TeamError,
    TeamId, TeamUpdate, UuidGenerator,
};

/// Result of a `request_next_page` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// No request was made: not hydrated yet, already loading or nothing left.
    Skipped,
    /// Page merged; `added` new players were appended.
    Loaded { added: usize, has_more: bool },
    /// Request failed; state now carries the message.
    Failed(String),
    /// A reset happened while the request was in flight; result dropped.
    Discarded,
}

/// Everything the UI renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterView {
    pub session: Session,
    pub teams: Vec<Team>,
    pub players: Vec<Player>,
    pub pagination: Pagination,
}

/// What the UI should show right now.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    /// Persisted state not loaded yet; do not present placeholder data.
    Mounting,
    Ready(RosterView),
}

#[derive(Debug, Clone)]
enum Write {
    Save(Snapshot),
    Clear,
}

#[derive(Debug, Clone)]
struct Pending {
    seq: u64,
    write: Option<Write>,
}

/// Handle to the background task that owns all store writes.
struct Writer {
    seq: u64,
    pending: watch::Sender<Pending>,
    written: watch::Receiver<u64>,
}

impl Writer {
    fn spawn(store: Arc<dyn SnapshotStore>) -> Self {
        let (pending, rx) = watch::channel(Pending { seq: 0, write: None });
        let (done, written) = watch::channel(0);
        tokio::spawn(write_loop(store, rx, done));
        Self {
            seq: 0,
            pending,
            written,
        }
    }

    /// Queue a write without waiting for it. A write still queued when the
    /// next one arrives is replaced.
    fn submit(&mut self, write: Write) {
        self.seq += 1;
        self.pending.send_replace(Pending {
            seq: self.seq,
            write: Some(write),
        });
    }
}

/// Apply queued writes until the engine is dropped. Failures are logged;
/// the in-memory state stays authoritative.
async fn write_loop(
    store: Arc<dyn SnapshotStore>,
    mut pending: watch::Receiver<Pending>,
    done: watch::Sender<u64>,
) {
    while pending.changed().await.is_ok() {
        let Pending { seq, write } = pending.borrow_and_update().clone();
        match write {
            Some(Write::Save(snapshot)) => {
                if let Err(e) = store.save(&snapshot).await {
                    tracing::warn!("Failed to save roster: {}", e);
                }
            }
            Some(Write::Clear) => {
                if let Err(e) = store.clear().await {
                    tracing::warn!("Failed to clear saved roster: {}", e);
                }
            }
            None => {}
        }
        done.send_replace(seq);
    }
    tracing::debug!("Roster writer stopped");
}

struct Inner {
    state: RosterState,
    /// Present once hydrated
    writer: Option<Writer>,
}

impl Inner {
    /// Apply `command`, then queue a snapshot if hydrated.
    fn apply<T>(&mut self, command: impl FnOnce(&mut RosterState) -> T) -> T {
        let out = command(&mut self.state);
        if let Some(writer) = &mut self.writer {
            writer.submit(Write::Save(self.state.to_snapshot()));
        }
        out
    }
}

/// Roster engine.
pub struct Roster {
    inner: Mutex<Inner>,
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn SnapshotStore>,
    ids: Arc<dyn IdGenerator>,
}

impl Roster {
    pub fn new(fetcher: Arc<dyn PageFetcher>, store: Arc<dyn SnapshotStore>) -> Self {
        Self::with_id_generator(fetcher, store, Arc::new(UuidGenerator))
    }

    pub fn with_id_generator(
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn SnapshotStore>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: RosterState::with_id_generator(ids.clone()),
                writer: None,
            }),
            fetcher,
            store,
            ids,
        }
    }

    /// Create and hydrate in one step.
    pub async fn open(fetcher: Arc<dyn PageFetcher>, store: Arc<dyn SnapshotStore>) -> Self {
        let roster = Self::new(fetcher, store);
        roster.hydrate().await;
        roster
    }

    /// Load persisted state, replacing whatever is in memory, and start
    /// saving. Must run inside a tokio runtime.
    ///
    /// A missing or unreadable snapshot leaves the initial state in place.
    /// Only the first call does anything. Returns `true` if a snapshot was
    /// restored.
    pub async fn hydrate(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.writer.is_some() {
            tracing::debug!("Roster already hydrated");
            return false;
        }

        let restored = match self.store.load().await {
            Ok(Some(snapshot)) => {
                inner.state = RosterState::from_snapshot(snapshot, self.ids.clone());
                tracing::info!(
                    teams = inner.state.teams().len(),
                    players = inner.state.players().len(),
                    "Roster rehydrated"
                );
                true
            }
            Ok(None) => {
                tracing::debug!("No saved roster, starting fresh");
                false
            }
            Err(e) => {
                tracing::warn!("Failed to load saved roster, starting fresh: {}", e);
                false
            }
        };
        inner.writer = Some(Writer::spawn(self.store.clone()));
        restored
    }

    pub async fn is_hydrated(&self) -> bool {
        self.inner.lock().await.writer.is_some()
    }

    /// Wait until every change made so far has reached the store.
    pub async fn flush(&self) {
        let (seq, mut written) = {
            let inner = self.inner.lock().await;
            match &inner.writer {
                Some(writer) => (writer.seq, writer.written.clone()),
                None => return,
            }
        };
        // Err only if the writer task is gone
        let _ = written.wait_for(|&done| done >= seq).await;
    }

    pub async fn view(&self) -> View {
        let inner = self.inner.lock().await;
        if inner.writer.is_none() {
            return View::Mounting;
        }
        View::Ready(RosterView {
            session: inner.state.session().clone(),
            teams: inner.state.teams().teams().to_vec(),
            players: inner.state.players().players().to_vec(),
            pagination: inner.state.players().pagination(),
        })
    }

    /// Run `read` against the current state.
    pub async fn read<T>(&self, read: impl FnOnce(&RosterState) -> T) -> T {
        read(&self.inner.lock().await.state)
    }

    pub async fn session(&self) -> Session {
        self.read(|s| s.session().clone()).await
    }

    pub async fn teams(&self) -> Vec<Team> {
        self.read(|s| s.teams().teams().to_vec()).await
    }

    pub async fn players(&self) -> Vec<Player> {
        self.read(|s| s.players().players().to_vec()).await
    }

    pub async fn pagination(&self) -> Pagination {
        self.read(|s| s.players().pagination()).await
    }

    // Commands

    pub async fn login(&self, display_name: &str) -> bool {
        self.commit(|state| state.login(display_name)).await
    }

    /// Clear the session, reset teams and players, and forget the saved
    /// snapshot.
    pub async fn logout(&self) {
        let mut inner = self.inner.lock().await;
        inner.state.logout();
        if let Some(writer) = &mut inner.writer {
            writer.submit(Write::Clear);
        }
        tracing::info!("Logged out, roster reset");
    }

    /// Fetch and merge the next page.
    ///
    /// Only one request runs at a time: while one is outstanding, or before
    /// [`hydrate`](Self::hydrate) has supplied the saved cursor, calls return
    /// [`FetchOutcome::Skipped`] without touching the fetcher.
    pub async fn request_next_page(&self) -> FetchOutcome {
        let ticket = {
            let mut inner = self.inner.lock().await;
            if inner.writer.is_none() {
                tracing::debug!("Page request before hydrate, skipping");
                return FetchOutcome::Skipped;
            }
            inner.apply(RosterState::begin_fetch)
        };
        let Some(ticket) = ticket else {
            return FetchOutcome::Skipped;
        };

        let result = self.fetcher.fetch_page(ticket.cursor).await;

        self.commit(|state| match result {
            Ok(page) => match state.apply_page(ticket, page) {
                Some(added) => FetchOutcome::Loaded {
                    added,
                    has_more: state.players().has_more(),
                },
                None => FetchOutcome::Discarded,
            },
            Err(e) => {
                tracing::warn!(cursor = ticket.cursor, "Player page fetch failed: {}", e);
                let message = e.to_string();
                if state.fail_fetch(ticket, message.clone()) {
                    FetchOutcome::Failed(message)
                } else {
                    FetchOutcome::Discarded
                }
            }
        })
        .await
    }

    pub async fn assign_player_to_team(&self, player_id: PlayerId, team_id: &TeamId) -> bool {
        self.commit(|state| state.assign_player_to_team(player_id, team_id))
            .await
    }

    pub async fn remove_player_from_team(&self, player_id: PlayerId, team_id: &TeamId) -> bool {
        self.commit(|state| state.remove_player_from_team(player_id, team_id))
            .await
    }

    /// Create a team after trimming fields and checking the name is free.
    pub async fn create_team(
        &self,
        name: &str,
        region: &str,
        country: &str,
    ) -> Result<TeamId, TeamError> {
        let draft = TeamDraft::new(name, region, country);
        let id = self
            .commit(|state| state.create_validated_team(draft))
            .await?;
        tracing::info!(team_id = %id, "Team created");
        Ok(id)
    }

    pub async fn update_team(&self, team_id: &TeamId, updates: TeamUpdate) -> Result<(), TeamError> {
        self.commit(|state| state.update_validated_team(team_id, updates))
            .await
    }

    /// Delete a team; its players become unassigned in the same step.
    pub async fn delete_team_cascade(&self, team_id: &TeamId) -> bool {
        let deleted = self
            .commit(|state| state.delete_team_cascade(team_id))
            .await;
        if let Some(team) = &deleted {
            tracing::info!(team_id = %team.id, players = team.player_count(), "Team deleted");
        }
        deleted.is_some()
    }

    async fn commit<T>(&self, command: impl FnOnce(&mut RosterState) -> T) -> T {
        self.inner.lock().await.apply(command)
    }
}
