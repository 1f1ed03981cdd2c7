//! Approval orchestrator: applies an admin review decision everywhere.
//!
//! The remote status update is best-effort: a denied or timed-out write is
//! logged and the approval still lands in every local channel, so the admin
//! workflow never blocks on backend policy problems. The resulting
//! divergence is surfaced, not hidden: records carry a `remote_state` of
//! `local_only` until the store confirms them.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{ApprovedCommunity, RemoteState, Submission, SubmissionStatus};
use crate::sync::{BroadcastStore, CommunityEvent, DurableCache, EventBus, SubmissionStore};

/// Delay before the follow-up refresh nudge, the last-resort backstop for
/// listeners that missed the immediate events.
const REFRESH_NUDGE_DELAY: Duration = Duration::from_secs(2);

/// Result of a review operation, reported back to the admin UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub submission: Submission,
    /// Present only when the decision was approval.
    pub community: Option<ApprovedCommunity>,
    /// Whether the submission store acknowledged the status write.
    pub remote_state: RemoteState,
}

pub struct ApprovalOrchestrator {
    store: Arc<dyn SubmissionStore>,
    cache: Arc<DurableCache>,
    broadcast: Arc<BroadcastStore>,
    events: EventBus,
    fetch_timeout: Duration,
}

impl ApprovalOrchestrator {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        cache: Arc<DurableCache>,
        broadcast: Arc<BroadcastStore>,
        events: EventBus,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            broadcast,
            events,
            fetch_timeout,
        }
    }

    /// Apply a review decision to a submission.
    ///
    /// An unknown id fails with NotFound before any local write or event.
    /// After a successful return the local state reflects the decision even
    /// if the remote write was denied; `remote_state` says which happened.
    pub async fn review(
        &self,
        id: &str,
        decision: SubmissionStatus,
        notes: Option<String>,
    ) -> Result<ReviewOutcome, AppError> {
        if decision == SubmissionStatus::Pending {
            return Err(AppError::Validation(
                "Review decision must be approved or rejected".to_string(),
            ));
        }

        // Existence check first. A missing submission short-circuits the
        // whole operation.
        let submission = tokio::time::timeout(self.fetch_timeout, self.store.get_submission(id))
            .await
            .map_err(|_| AppError::FetchTimeout(format!("Submission {} lookup timed out", id)))??
            .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", id)))?;

        let reviewed_at = Utc::now().to_rfc3339();

        // Best-effort remote write. Failure is absorbed: the listing must
        // not get stuck on a store-side permission or policy problem.
        let remote_state = match tokio::time::timeout(
            self.fetch_timeout,
            self.store
                .update_status(id, decision, &reviewed_at, notes.as_deref()),
        )
        .await
        {
            Ok(Ok(())) => RemoteState::Confirmed,
            Ok(Err(err)) => {
                tracing::warn!(
                    "Remote status update for submission {} denied, continuing locally: {}",
                    id,
                    err
                );
                RemoteState::LocalOnly
            }
            Err(_) => {
                tracing::warn!(
                    "Remote status update for submission {} timed out, continuing locally",
                    id
                );
                RemoteState::LocalOnly
            }
        };

        let reviewed = Submission {
            status: decision,
            reviewed_at: Some(reviewed_at.clone()),
            review_notes: notes,
            ..submission
        };

        if decision != SubmissionStatus::Approved {
            // Rejection touches no listing state.
            return Ok(ReviewOutcome {
                submission: reviewed,
                community: None,
                remote_state,
            });
        }

        let community = ApprovedCommunity::from_submission(&reviewed, remote_state)?;

        // Local fan-out, sequenced before any event so listeners reacting to
        // an event always observe the updated cache and store.
        self.cache.add(&community);
        self.broadcast.add(community.clone());

        self.events.publish(CommunityEvent::Approved {
            id: community.id.clone(),
        });
        self.events.publish(CommunityEvent::Record(community.clone()));
        self.events.publish(CommunityEvent::RefreshRequested {
            timestamp: reviewed_at,
        });

        // Delayed nudge for listeners that subscribed after the burst above.
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(REFRESH_NUDGE_DELAY).await;
            events.publish(CommunityEvent::RefreshRequested {
                timestamp: Utc::now().to_rfc3339(),
            });
        });

        Ok(ReviewOutcome {
            submission: reviewed,
            community: Some(community),
            remote_state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JoinType, Platform};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Submission-store double with switchable write denial.
    struct MockStore {
        submissions: Mutex<HashMap<String, Submission>>,
        deny_updates: bool,
        update_calls: AtomicUsize,
    }

    impl MockStore {
        fn with(submissions: Vec<Submission>, deny_updates: bool) -> Arc<Self> {
            Arc::new(Self {
                submissions: Mutex::new(
                    submissions.into_iter().map(|s| (s.id.clone(), s)).collect(),
                ),
                deny_updates,
                update_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SubmissionStore for MockStore {
        async fn get_submission(&self, id: &str) -> Result<Option<Submission>, AppError> {
            Ok(self.submissions.lock().unwrap().get(id).cloned())
        }

        async fn list_by_status(
            &self,
            status: SubmissionStatus,
        ) -> Result<Vec<Submission>, AppError> {
            Ok(self
                .submissions
                .lock()
                .unwrap()
                .values()
                .filter(|s| s.status == status)
                .cloned()
                .collect())
        }

        async fn update_status(
            &self,
            id: &str,
            status: SubmissionStatus,
            reviewed_at: &str,
            notes: Option<&str>,
        ) -> Result<(), AppError> {
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            if self.deny_updates {
                return Err(AppError::RemoteWriteDenied(
                    "row-level security policy rejected the update".to_string(),
                ));
            }
            let mut submissions = self.submissions.lock().unwrap();
            let submission = submissions
                .get_mut(id)
                .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", id)))?;
            submission.status = status;
            submission.reviewed_at = Some(reviewed_at.to_string());
            submission.review_notes = notes.map(|n| n.to_string());
            Ok(())
        }
    }

    fn pending_submission(id: &str, name: &str, join_type: JoinType) -> Submission {
        Submission {
            id: id.to_string(),
            name: name.to_string(),
            platform: Platform::WhatsApp,
            category: "Startups".to_string(),
            description: "desc".to_string(),
            full_description: None,
            join_link: Some("https://chat.example/abc".to_string()),
            join_type,
            price: match join_type {
                JoinType::Paid => Some(99),
                JoinType::Free => None,
            },
            founder_name: "Asha".to_string(),
            founder_bio: None,
            logo_url: None,
            status: SubmissionStatus::Pending,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            reviewed_at: None,
            review_notes: None,
        }
    }

    struct Harness {
        orchestrator: ApprovalOrchestrator,
        store: Arc<MockStore>,
        cache: Arc<DurableCache>,
        broadcast: Arc<BroadcastStore>,
        events: EventBus,
        _dir: TempDir,
    }

    fn harness(submissions: Vec<Submission>, deny_updates: bool) -> Harness {
        let dir = TempDir::new().unwrap();
        let store = MockStore::with(submissions, deny_updates);
        let cache = Arc::new(DurableCache::open(dir.path()).unwrap());
        let broadcast = Arc::new(BroadcastStore::new());
        let events = EventBus::new();
        let orchestrator = ApprovalOrchestrator::new(
            store.clone(),
            cache.clone(),
            broadcast.clone(),
            events.clone(),
            Duration::from_secs(5),
        );
        Harness {
            orchestrator,
            store,
            cache,
            broadcast,
            events,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_happy_path_approval() {
        let h = harness(
            vec![pending_submission("42", "Test Circle", JoinType::Free)],
            false,
        );
        let mut rx = h.events.subscribe();

        let outcome = h
            .orchestrator
            .review("42", SubmissionStatus::Approved, None)
            .await
            .unwrap();

        assert_eq!(outcome.remote_state, RemoteState::Confirmed);
        let community = outcome.community.unwrap();
        assert_eq!(community.id, "42");
        assert_eq!(community.name, "Test Circle");
        assert!(community.verified);
        assert_eq!(community.join_type, JoinType::Free);

        // Cache and memory store hold the record at the front
        assert_eq!(h.cache.load()[0].id, "42");
        assert_eq!(h.broadcast.snapshot()[0].id, "42");

        // Events arrive in order: approved, record, refresh
        assert!(matches!(
            rx.recv().await.unwrap(),
            CommunityEvent::Approved { id } if id == "42"
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            CommunityEvent::Record(c) if c.id == "42"
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            CommunityEvent::RefreshRequested { .. }
        ));
    }

    #[tokio::test]
    async fn test_remote_denied_approval_still_lands_locally() {
        let h = harness(
            vec![pending_submission("42", "Test Circle", JoinType::Free)],
            true,
        );

        let outcome = h
            .orchestrator
            .review("42", SubmissionStatus::Approved, None)
            .await
            .unwrap();

        assert_eq!(outcome.remote_state, RemoteState::LocalOnly);
        assert_eq!(h.cache.load()[0].id, "42");
        assert_eq!(h.broadcast.snapshot()[0].id, "42");
        assert_eq!(h.cache.load()[0].remote_state, RemoteState::LocalOnly);

        // The store never recorded the approval: the divergence is real
        let remote_approved = h
            .store
            .list_by_status(SubmissionStatus::Approved)
            .await
            .unwrap();
        assert!(remote_approved.iter().all(|s| s.id != "42"));
    }

    #[tokio::test]
    async fn test_not_found_short_circuits() {
        let h = harness(vec![], false);
        let mut rx = h.events.subscribe();

        let err = h
            .orchestrator
            .review("missing", SubmissionStatus::Approved, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        // Zero writes, zero remote update attempts, zero events
        assert!(h.cache.load().is_empty());
        assert!(h.broadcast.snapshot().is_empty());
        assert_eq!(h.store.update_calls.load(Ordering::SeqCst), 0);
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_idempotent_approval_replaces_entry() {
        let h = harness(
            vec![pending_submission("42", "Test Circle", JoinType::Free)],
            false,
        );

        h.orchestrator
            .review("42", SubmissionStatus::Approved, None)
            .await
            .unwrap();
        h.orchestrator
            .review("42", SubmissionStatus::Approved, Some("second pass".to_string()))
            .await
            .unwrap();

        let cached = h.cache.load();
        assert_eq!(cached.iter().filter(|c| c.id == "42").count(), 1);
        let snapshot = h.broadcast.snapshot();
        assert_eq!(snapshot.iter().filter(|c| c.id == "42").count(), 1);
    }

    #[tokio::test]
    async fn test_rejection_creates_no_community() {
        let h = harness(
            vec![pending_submission("42", "Test Circle", JoinType::Free)],
            false,
        );
        let mut rx = h.events.subscribe();

        let outcome = h
            .orchestrator
            .review("42", SubmissionStatus::Rejected, Some("spam".to_string()))
            .await
            .unwrap();

        assert!(outcome.community.is_none());
        assert_eq!(outcome.submission.status, SubmissionStatus::Rejected);
        assert!(h.cache.load().is_empty());
        assert!(h.broadcast.snapshot().is_empty());
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_paid_approval_suppresses_join_link() {
        let h = harness(
            vec![pending_submission("7", "Premium Traders", JoinType::Paid)],
            false,
        );

        let outcome = h
            .orchestrator
            .review("7", SubmissionStatus::Approved, None)
            .await
            .unwrap();

        let community = outcome.community.unwrap();
        assert_eq!(community.join_link, "");
        assert_eq!(community.price, Some(99));
    }

    #[tokio::test]
    async fn test_pending_is_not_a_review_decision() {
        let h = harness(
            vec![pending_submission("42", "Test Circle", JoinType::Free)],
            false,
        );

        let err = h
            .orchestrator
            .review("42", SubmissionStatus::Pending, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
