//! Submission-lifecycle synchronization engine.
//!
//! The submission store owns ground truth for review status. Everything in
//! this module is the advisory machinery that keeps the public listing live
//! when the store is slow, denies a write, or has not been re-fetched yet:
//! a two-tier durable cache, an in-memory broadcast store, the approval
//! orchestrator that fans records out through all of them, and the listing
//! refresher that folds every source back into one merged view.

mod broadcast;
mod cache;
mod events;
mod orchestrator;
mod refresher;

pub use broadcast::*;
pub use cache::*;
pub use events::*;
pub use orchestrator::*;
pub use refresher::*;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{Submission, SubmissionStatus};

/// Table-like interface to the authoritative submission store.
///
/// The production implementation is the SQLite repository; tests substitute
/// doubles that deny writes or fail fetches to exercise the degraded paths.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Fetch a single submission. `Ok(None)` is a distinct non-error
    /// condition used for existence checks.
    async fn get_submission(&self, id: &str) -> Result<Option<Submission>, AppError>;

    /// Fetch all submissions with the given status, newest first.
    async fn list_by_status(&self, status: SubmissionStatus)
        -> Result<Vec<Submission>, AppError>;

    /// Partial update of status, reviewed_at, and review_notes.
    async fn update_status(
        &self,
        id: &str,
        status: SubmissionStatus,
        reviewed_at: &str,
        notes: Option<&str>,
    ) -> Result<(), AppError>;
}
