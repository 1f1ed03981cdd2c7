//! In-memory broadcast store: the fastest update path for listing views.
//!
//! One instance per process, shared behind an `Arc`. No I/O: adds mutate a
//! capped in-memory list and notify subscribers synchronously with a full
//! snapshot. Cross-process durability is the durable cache's job, not this
//! store's.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use crate::models::ApprovedCommunity;

/// Maximum number of records held in memory.
pub const BROADCAST_STORE_CAP: usize = 100;

type Subscriber = Arc<dyn Fn(&[ApprovedCommunity]) + Send + Sync>;

struct Inner {
    records: Vec<ApprovedCommunity>,
    subscribers: Vec<(u64, Subscriber)>,
    next_token: u64,
}

/// Capped, deduplicated in-memory collection with subscriber notification.
pub struct BroadcastStore {
    inner: Mutex<Inner>,
}

/// Handle returned by `subscribe`; calling `unsubscribe` removes the
/// callback. Safe to call more than once.
pub struct Subscription {
    token: u64,
}

impl BroadcastStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                records: Vec::new(),
                subscribers: Vec::new(),
                next_token: 0,
            }),
        }
    }

    /// Insert or replace a record at the front, truncate to the cap, and
    /// notify every subscriber with the full current list. A panicking
    /// subscriber does not stop notification of the rest.
    ///
    /// The lock is released before any callback runs, so subscribers may
    /// call back into the store (`snapshot`, `unsubscribe`, even `add`)
    /// without deadlocking. A subscriber removed mid-notification may still
    /// receive the notification already in flight.
    pub fn add(&self, record: ApprovedCommunity) {
        let (snapshot, subscribers) = {
            let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());

            inner.records.retain(|c| c.id != record.id);
            inner.records.insert(0, record);
            inner.records.truncate(BROADCAST_STORE_CAP);

            let subscribers: Vec<Subscriber> = inner
                .subscribers
                .iter()
                .map(|(_, subscriber)| subscriber.clone())
                .collect();
            (inner.records.clone(), subscribers)
        };

        for subscriber in subscribers {
            if catch_unwind(AssertUnwindSafe(|| subscriber(&snapshot))).is_err() {
                tracing::warn!("Broadcast store subscriber panicked");
            }
        }
    }

    /// Register a callback invoked on every `add` with the current list.
    pub fn subscribe(
        &self,
        callback: impl Fn(&[ApprovedCommunity]) + Send + Sync + 'static,
    ) -> Subscription {
        let subscriber: Subscriber = Arc::new(callback);
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let token = inner.next_token;
        inner.next_token += 1;
        inner.subscribers.push((token, subscriber));
        Subscription { token }
    }

    /// Remove a subscription. Idempotent: removing an already-removed
    /// subscription is a no-op.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.subscribers.retain(|(token, _)| *token != subscription.token);
    }

    /// Snapshot of the current list. A copy, never a live reference.
    pub fn snapshot(&self) -> Vec<ApprovedCommunity> {
        let inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.records.clone()
    }
}

impl Default for BroadcastStore {
    fn default() -> Self {
        Self::new()
    }
}
