//! End-to-end flows through the public command surface.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use roster_state::{
    Cursor, FetchError, FetchOutcome, JsonFileStore, MemoryStore, Page, PageFetcher, PlayerId,
    RawPlayer, Roster, SnapshotStore, View,
};
use std::collections::HashMap;
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Serves fixed pages keyed by cursor, like a read-only remote API.
struct PagedApi {
    pages: HashMap<Cursor, Page>,
}

impl PagedApi {
    /// `chunks` of ids become consecutive pages; cursors are the id offsets.
    fn new(chunks: &[&[PlayerId]]) -> Self {
        let mut pages = HashMap::new();
        let mut cursor = 0;
        for (i, chunk) in chunks.iter().enumerate() {
            let next = cursor + chunk.len() as Cursor;
            pages.insert(
                cursor,
                Page {
                    records: chunk
                        .iter()
                        .map(|&id| RawPlayer::new(id, format!("F{}", id), format!("L{}", id)))
                        .collect(),
                    next_cursor: (i + 1 < chunks.len()).then_some(next),
                    page_size: 10,
                },
            );
            cursor = next;
        }
        Self { pages }
    }
}

#[async_trait]
impl PageFetcher for PagedApi {
    async fn fetch_page(&self, cursor: Cursor) -> Result<Page, FetchError> {
        self.pages.get(&cursor).cloned().ok_or(FetchError::Status(404))
    }
}

async fn open(api: PagedApi, store: Arc<dyn SnapshotStore>) -> Roster {
    init_tracing();
    Roster::open(Arc::new(api), store).await
}

#[tokio::test]
async fn test_lakers_scenario() {
    let roster = open(PagedApi::new(&[&[7]]), Arc::new(MemoryStore::new())).await;

    let lakers = roster.create_team("Lakers", "West", "USA").await.unwrap();
    let teams = roster.teams().await;
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].player_count(), 0);

    assert_eq!(
        roster.request_next_page().await,
        FetchOutcome::Loaded {
            added: 1,
            has_more: false
        }
    );
    let players = roster.players().await;
    assert_eq!(players.len(), 1);
    assert_eq!(players[0].info.first_name, "F7");
    assert_eq!(players[0].team_id, None);
    assert!(!roster.pagination().await.has_more);

    assert!(roster.assign_player_to_team(7, &lakers).await);
    assert_eq!(roster.players().await[0].team_id, Some(lakers.clone()));
    assert_eq!(roster.teams().await[0].player_count(), 1);

    assert!(roster.delete_team_cascade(&lakers).await);
    assert!(roster.teams().await.is_empty());
    assert_eq!(roster.players().await[0].team_id, None);
}

#[tokio::test]
async fn test_invariants_hold_across_interleaved_commands() {
    let roster = open(
        PagedApi::new(&[&[1, 2, 3], &[4, 5, 6], &[7, 8]]),
        Arc::new(MemoryStore::new()),
    )
    .await;

    while roster.request_next_page().await != FetchOutcome::Skipped {}
    assert_eq!(roster.players().await.len(), 8);

    let a = roster.create_team("A", "West", "USA").await.unwrap();
    let b = roster.create_team("B", "East", "USA").await.unwrap();

    for id in [1, 2, 3] {
        assert!(roster.assign_player_to_team(id, &a).await);
    }
    for id in [4, 5] {
        assert!(roster.assign_player_to_team(id, &b).await);
    }
    assert!(roster.read(|s| s.is_consistent()).await);

    // Rejected: already on A
    assert!(!roster.assign_player_to_team(2, &b).await);
    assert!(roster.remove_player_from_team(2, &a).await);
    assert!(roster.assign_player_to_team(2, &b).await);
    assert!(roster.read(|s| s.is_consistent()).await);

    assert!(roster.delete_team_cascade(&a).await);
    let c = roster.create_team("a", "North", "CAN").await.unwrap();
    assert!(roster.assign_player_to_team(1, &c).await);
    assert!(roster.assign_player_to_team(3, &c).await);
    assert!(roster.read(|s| s.is_consistent()).await);

    let (on_b, on_c) = roster
        .read(|s| {
            (
                s.roster(&b).iter().map(|p| p.id()).collect::<Vec<_>>(),
                s.roster(&c).iter().map(|p| p.id()).collect::<Vec<_>>(),
            )
        })
        .await;
    assert_eq!(on_b, vec![4, 5, 2]);
    assert_eq!(on_c, vec![1, 3]);

    for team in roster.teams().await {
        assert_eq!(team.player_count(), team.player_ids().len());
    }
}

#[tokio::test]
async fn test_state_survives_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.json");

    let lakers = {
        let roster = open(
            PagedApi::new(&[&[1, 2], &[3]]),
            Arc::new(JsonFileStore::new(&path)),
        )
        .await;
        roster.login("Ada").await;
        roster.request_next_page().await;
        let lakers = roster.create_team("Lakers", "West", "USA").await.unwrap();
        roster.assign_player_to_team(2, &lakers).await;
        roster.flush().await;
        lakers
    };

    let roster = open(
        PagedApi::new(&[&[1, 2], &[3]]),
        Arc::new(JsonFileStore::new(&path)),
    )
    .await;

    let view = match roster.view().await {
        View::Ready(view) => view,
        View::Mounting => panic!("not hydrated"),
    };
    assert_eq!(view.session.display_name.as_deref(), Some("Ada"));
    assert_eq!(view.players.len(), 2);
    assert_eq!(view.teams[0].player_ids(), &[2]);
    assert!(view.pagination.has_more);

    // Pagination resumes where the previous run stopped
    assert_eq!(
        roster.request_next_page().await,
        FetchOutcome::Loaded {
            added: 1,
            has_more: false
        }
    );

    // Loading more players keeps earlier assignments
    assert_eq!(
        roster.read(|s| s.players().get(2).and_then(|p| p.team_id.clone())).await,
        Some(lakers)
    );

    roster.logout().await;
    roster.flush().await;
    assert!(!path.exists());

    let reopened = open(PagedApi::new(&[&[1]]), Arc::new(JsonFileStore::new(&path))).await;
    assert!(reopened.teams().await.is_empty());
    assert!(reopened.players().await.is_empty());
    assert!(!reopened.session().await.is_authenticated);
}
