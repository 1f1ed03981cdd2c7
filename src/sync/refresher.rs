//! Listing refresher: keeps the merged community view fresh without a
//! server push channel.
//!
//! A single background task loops over interval ticks and bus events, so
//! fetches can never overlap; a tick that lands mid-fetch is simply the next
//! iteration. A failed fetch keeps the last good merge (stale-but-available)
//! and retries on the next tick or event.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::models::{seed_communities, ApprovedCommunity, RemoteState, SubmissionStatus};
use crate::sync::{dedupe_by_id, BroadcastStore, CommunityEvent, DurableCache, EventBus, SubmissionStore};

/// Refresher lifecycle, reported alongside the listing for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefresherState {
    Idle,
    Fetching,
    Merged,
    Error,
}

/// The render-ready view: last good merge plus the state that produced it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingView {
    pub state: RefresherState,
    pub communities: Vec<ApprovedCommunity>,
}

pub struct ListingRefresher {
    store: Arc<dyn SubmissionStore>,
    cache: Arc<DurableCache>,
    broadcast: Arc<BroadcastStore>,
    view: Mutex<ListingView>,
    fetch_timeout: Duration,
}

impl ListingRefresher {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        cache: Arc<DurableCache>,
        broadcast: Arc<BroadcastStore>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            broadcast,
            view: Mutex::new(ListingView {
                state: RefresherState::Idle,
                communities: seed_communities(),
            }),
            fetch_timeout,
        }
    }

    /// Current view. Always renderable: before the first fetch it holds the
    /// seed list, after a failed fetch it holds the last good merge.
    pub fn view(&self) -> ListingView {
        self.view.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// One full fetch-and-merge pass.
    pub async fn refresh_once(&self) {
        self.set_state(RefresherState::Fetching);

        let fetched = tokio::time::timeout(
            self.fetch_timeout,
            self.store.list_by_status(SubmissionStatus::Approved),
        )
        .await;

        match fetched {
            Ok(Ok(rows)) => {
                let remote: Vec<ApprovedCommunity> = rows
                    .iter()
                    .filter_map(|s| {
                        ApprovedCommunity::from_submission(s, RemoteState::Confirmed).ok()
                    })
                    .collect();

                let merged = merge_listing(
                    remote,
                    self.cache.load(),
                    self.broadcast.snapshot(),
                    seed_communities(),
                );

                let mut view = self.view.lock().unwrap_or_else(|p| p.into_inner());
                view.communities = merged;
                view.state = RefresherState::Merged;
            }
            Ok(Err(err)) => {
                tracing::warn!("Listing fetch failed, keeping last merge: {}", err);
                self.set_state(RefresherState::Error);
            }
            Err(_) => {
                tracing::warn!("Listing fetch timed out, keeping last merge");
                self.set_state(RefresherState::Error);
            }
        }
    }

    /// Apply a pushed record directly, without a round-trip.
    fn apply_record(&self, record: ApprovedCommunity) {
        let mut view = self.view.lock().unwrap_or_else(|p| p.into_inner());
        view.communities.retain(|c| c.id != record.id);
        view.communities.insert(0, record);
    }

    fn set_state(&self, state: RefresherState) {
        self.view.lock().unwrap_or_else(|p| p.into_inner()).state = state;
    }
}

/// Union of remote, durable-cache, and memory-store entries, deduplicated by
/// id, followed by the seed list.
///
/// Remote is authoritative for content: when an id appears both remotely and
/// locally the remote fields win. Local entries are authoritative only for
/// presence, covering the window where the store lags or denied the write.
/// Seed ids live in their own namespace and can never collide with the rest;
/// that property must be preserved if the id scheme ever changes.
pub fn merge_listing(
    remote: Vec<ApprovedCommunity>,
    cached: Vec<ApprovedCommunity>,
    memory: Vec<ApprovedCommunity>,
    seeds: Vec<ApprovedCommunity>,
) -> Vec<ApprovedCommunity> {
    let mut merged = remote;
    merged.extend(memory);
    merged.extend(cached);
    merged.extend(seeds);
    dedupe_by_id(&mut merged);
    merged
}

/// Handle to a running refresher task. Dropping it aborts the task; the
/// interval and event subscription never outlive the handle.
pub struct RefresherHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl RefresherHandle {
    /// Graceful stop: signal the loop and wait for it to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for RefresherHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Spawn the background loop: an immediate pass, then a pass per interval
/// tick or bus event.
pub fn spawn_refresher(
    refresher: Arc<ListingRefresher>,
    events: EventBus,
    interval: Duration,
) -> RefresherHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let mut event_rx = events.subscribe();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        refresher.refresh_once().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    refresher.refresh_once().await;
                }
                event = event_rx.recv() => {
                    match event {
                        Ok(CommunityEvent::Record(record)) => {
                            refresher.apply_record(record);
                        }
                        Ok(_) => {
                            refresher.refresh_once().await;
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!("Refresher lagged {} events, refetching", skipped);
                            refresher.refresh_once().await;
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            // Bus gone; keep polling on the timer alone.
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    break;
                }
            }
        }
    });

    RefresherHandle {
        shutdown: shutdown_tx,
        task: Some(task),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::models::{JoinType, Platform, Submission};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    /// Store double whose fetches can be switched to fail.
    struct FlakyStore {
        approved: Mutex<Vec<Submission>>,
        failing: AtomicBool,
    }

    impl FlakyStore {
        fn with(approved: Vec<Submission>) -> Arc<Self> {
            Arc::new(Self {
                approved: Mutex::new(approved),
                failing: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl SubmissionStore for FlakyStore {
        async fn get_submission(&self, id: &str) -> Result<Option<Submission>, AppError> {
            Ok(self
                .approved
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.id == id)
                .cloned())
        }

        async fn list_by_status(
            &self,
            status: SubmissionStatus,
        ) -> Result<Vec<Submission>, AppError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(AppError::Database("connection reset".to_string()));
            }
            Ok(self
                .approved
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.status == status)
                .cloned()
                .collect())
        }

        async fn update_status(
            &self,
            _id: &str,
            _status: SubmissionStatus,
            _reviewed_at: &str,
            _notes: Option<&str>,
        ) -> Result<(), AppError> {
            Ok(())
        }
    }

    fn approved_submission(id: &str, name: &str) -> Submission {
        Submission {
            id: id.to_string(),
            name: name.to_string(),
            platform: Platform::Discord,
            category: "Programming".to_string(),
            description: "desc".to_string(),
            full_description: None,
            join_link: Some("https://discord.gg/x".to_string()),
            join_type: JoinType::Free,
            price: None,
            founder_name: "Kim".to_string(),
            founder_bio: None,
            logo_url: None,
            status: SubmissionStatus::Approved,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            reviewed_at: Some("2026-01-02T00:00:00Z".to_string()),
            review_notes: None,
        }
    }

    fn local_record(id: &str, name: &str) -> ApprovedCommunity {
        ApprovedCommunity {
            id: id.to_string(),
            name: name.to_string(),
            description: "local".to_string(),
            full_description: "local".to_string(),
            category: "Programming".to_string(),
            platform: Platform::Discord,
            members: 0,
            verified: true,
            join_link: String::new(),
            join_type: JoinType::Free,
            price: None,
            logo_url: "/assets/community-placeholder.svg".to_string(),
            location: "Global".to_string(),
            tags: vec![],
            admin_name: "Kim".to_string(),
            admin_bio: None,
            remote_state: RemoteState::LocalOnly,
        }
    }

    fn refresher_with(
        store: Arc<FlakyStore>,
        dir: &TempDir,
    ) -> (Arc<ListingRefresher>, Arc<DurableCache>, Arc<BroadcastStore>) {
        let cache = Arc::new(DurableCache::open(dir.path()).unwrap());
        let broadcast = Arc::new(BroadcastStore::new());
        let refresher = Arc::new(ListingRefresher::new(
            store,
            cache.clone(),
            broadcast.clone(),
            Duration::from_secs(5),
        ));
        (refresher, cache, broadcast)
    }

    #[test]
    fn test_merge_remote_wins_content_local_wins_presence() {
        let remote = vec![{
            let mut c = local_record("1", "remote name");
            c.remote_state = RemoteState::Confirmed;
            c
        }];
        let cached = vec![local_record("1", "stale local name"), local_record("2", "local only")];
        let merged = merge_listing(remote, cached, vec![], vec![]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, "1");
        assert_eq!(merged[0].name, "remote name");
        assert_eq!(merged[0].remote_state, RemoteState::Confirmed);
        assert_eq!(merged[1].id, "2");
    }

    #[test]
    fn test_merge_appends_seeds_after_union() {
        let merged = merge_listing(
            vec![local_record("1", "remote")],
            vec![],
            vec![],
            seed_communities(),
        );
        assert_eq!(merged[0].id, "1");
        assert!(merged[1].id.starts_with("seed-"));
    }

    #[tokio::test]
    async fn test_refresh_merges_remote_and_local() {
        let dir = TempDir::new().unwrap();
        let store = FlakyStore::with(vec![approved_submission("r1", "Remote Circle")]);
        let (refresher, cache, _) = refresher_with(store, &dir);

        cache.add(&local_record("l1", "Local Circle"));
        refresher.refresh_once().await;

        let view = refresher.view();
        assert_eq!(view.state, RefresherState::Merged);
        let ids: Vec<&str> = view.communities.iter().map(|c| c.id.as_str()).collect();
        assert!(ids.contains(&"r1"));
        assert!(ids.contains(&"l1"));
        assert!(ids.contains(&"seed-1"));
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_last_good_merge() {
        let dir = TempDir::new().unwrap();
        let store = FlakyStore::with(vec![approved_submission("r1", "Remote Circle")]);
        let (refresher, _, _) = refresher_with(store.clone(), &dir);

        refresher.refresh_once().await;
        let before = refresher.view();
        assert_eq!(before.state, RefresherState::Merged);

        store.failing.store(true, Ordering::SeqCst);
        refresher.refresh_once().await;

        let after = refresher.view();
        assert_eq!(after.state, RefresherState::Error);
        let before_ids: Vec<_> = before.communities.iter().map(|c| &c.id).collect();
        let after_ids: Vec<_> = after.communities.iter().map(|c| &c.id).collect();
        assert_eq!(before_ids, after_ids);
    }

    #[tokio::test]
    async fn test_view_is_renderable_before_first_fetch() {
        let dir = TempDir::new().unwrap();
        let store = FlakyStore::with(vec![]);
        let (refresher, _, _) = refresher_with(store, &dir);

        let view = refresher.view();
        assert_eq!(view.state, RefresherState::Idle);
        assert!(!view.communities.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_event_applies_without_fetch() {
        let dir = TempDir::new().unwrap();
        let store = FlakyStore::with(vec![]);
        // Store fails all fetches so the record can only arrive via the event
        store.failing.store(true, Ordering::SeqCst);
        let (refresher, _, _) = refresher_with(store, &dir);

        let events = EventBus::new();
        let handle = spawn_refresher(refresher.clone(), events.clone(), Duration::from_secs(30));
        tokio::task::yield_now().await;

        events.publish(CommunityEvent::Record(local_record("p1", "Pushed Circle")));
        // Let the loop process the event
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        let view = refresher.view();
        assert_eq!(view.communities[0].id, "p1");

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_the_loop() {
        let dir = TempDir::new().unwrap();
        let store = FlakyStore::with(vec![]);
        let (refresher, _, _) = refresher_with(store, &dir);

        let events = EventBus::new();
        let handle = spawn_refresher(refresher, events, Duration::from_millis(10));
        handle.shutdown().await;
    }
}
