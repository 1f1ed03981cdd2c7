//! Durable listing cache: two JSON file tiers with different lifetimes.
//!
//! The session tier is truncated every time the cache is opened, so it only
//! survives within one process session. The persistent tier survives
//! restarts. Both hold the same shape of data: a most-recent-first,
//! deduplicated, length-capped array of approved communities.
//!
//! Writes are read-merge-write against the latest on-disk snapshot, taken
//! under an in-process lock immediately before the write, so concurrent
//! adds from different tasks cannot clobber each other with stale copies.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::errors::AppError;
use crate::models::ApprovedCommunity;

/// Cap for the session-scoped tier.
pub const SESSION_TIER_CAP: usize = 100;
/// Cap for the persistent tier.
pub const PERSISTENT_TIER_CAP: usize = 500;
/// Slice retried after a quota failure: the newest entries only.
const QUOTA_RETRY_SLICE: usize = 20;

/// One storage tier: a JSON file with a length cap and an optional byte
/// budget standing in for the platform's storage quota.
struct Tier {
    path: PathBuf,
    cap: usize,
    max_bytes: Option<usize>,
}

impl Tier {
    /// Read the tier's list. Missing files and parse failures both yield an
    /// empty list; a corrupt tier must never poison the listing.
    fn read(&self) -> Vec<ApprovedCommunity> {
        let Ok(raw) = fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(list) => list,
            Err(err) => {
                tracing::warn!("Discarding corrupt cache tier {:?}: {}", self.path, err);
                Vec::new()
            }
        }
    }

    /// Serialize and write the list, enforcing the byte budget.
    fn write(&self, records: &[ApprovedCommunity]) -> Result<(), AppError> {
        let json = serde_json::to_string(records)
            .map_err(|e| AppError::Internal(format!("Cache serialization failed: {}", e)))?;

        if let Some(max) = self.max_bytes {
            if json.len() > max {
                return Err(AppError::StorageQuota(format!(
                    "Tier {:?} over budget: {} > {} bytes",
                    self.path,
                    json.len(),
                    max
                )));
            }
        }

        fs::write(&self.path, json)
            .map_err(|e| AppError::StorageQuota(format!("Tier write failed: {}", e)))
    }

    fn clear(&self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to clear cache tier {:?}: {}", self.path, err);
            }
        }
    }
}

/// Two-tier durable cache of approved communities.
pub struct DurableCache {
    session: Tier,
    persistent: Tier,
    /// Serializes read-merge-write cycles within this process.
    lock: Mutex<()>,
}

impl DurableCache {
    /// Open the cache under `dir`, creating it if needed. The session tier
    /// starts empty; the persistent tier keeps whatever survived the last
    /// run.
    pub fn open(dir: &Path) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;

        let cache = Self {
            session: Tier {
                path: dir.join("approved-session.json"),
                cap: SESSION_TIER_CAP,
                max_bytes: None,
            },
            persistent: Tier {
                path: dir.join("approved-persistent.json"),
                cap: PERSISTENT_TIER_CAP,
                max_bytes: None,
            },
            lock: Mutex::new(()),
        };

        cache.session.clear();
        Ok(cache)
    }

    #[cfg(test)]
    fn with_budgets(dir: &Path, session_bytes: Option<usize>, persistent_bytes: Option<usize>) -> Self {
        fs::create_dir_all(dir).unwrap();
        Self {
            session: Tier {
                path: dir.join("approved-session.json"),
                cap: SESSION_TIER_CAP,
                max_bytes: session_bytes,
            },
            persistent: Tier {
                path: dir.join("approved-persistent.json"),
                cap: PERSISTENT_TIER_CAP,
                max_bytes: persistent_bytes,
            },
            lock: Mutex::new(()),
        }
    }

    /// Merge both tiers into one ordered list, deduplicated by id with the
    /// first occurrence winning.
    pub fn load(&self) -> Vec<ApprovedCommunity> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());

        let mut merged = self.session.read();
        merged.extend(self.persistent.read());
        dedupe_by_id(&mut merged);
        merged
    }

    /// Write `record` into both tiers: remove any existing entry with the
    /// same id, prepend, truncate to the tier cap. A quota failure on a tier
    /// clears that tier and retries with the newest entries rather than
    /// losing the write entirely.
    pub fn add(&self, record: &ApprovedCommunity) {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());

        for tier in [&self.session, &self.persistent] {
            let mut list = tier.read();
            list.retain(|c| c.id != record.id);
            list.insert(0, record.clone());
            list.truncate(tier.cap);

            if let Err(err) = tier.write(&list) {
                tracing::warn!("Cache tier write failed, retrying reduced: {}", err);
                tier.clear();
                list.truncate(QUOTA_RETRY_SLICE);
                if let Err(err) = tier.write(&list) {
                    tracing::warn!("Reduced cache tier write also failed: {}", err);
                }
            }
        }
    }

    /// Remove both tiers entirely.
    pub fn clear(&self) {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        self.session.clear();
        self.persistent.clear();
    }
}

/// Deduplicate in place by id, keeping the first occurrence.
pub fn dedupe_by_id(list: &mut Vec<ApprovedCommunity>) {
    let mut seen = std::collections::HashSet::new();
    list.retain(|c| seen.insert(c.id.clone()));
}
