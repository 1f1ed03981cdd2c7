//! Community listing endpoints, served from the refresher's merged view.

use axum::extract::State;
use chrono::Utc;

use super::{success, ApiResult};
use crate::sync::{CommunityEvent, ListingView};
use crate::AppState;

/// GET /api/communities - The merged, de-duplicated listing.
///
/// Serves the refresher's last good merge, so a flaky store never blanks the
/// page. The view's `state` field tells callers whether the merge is fresh.
pub async fn list_communities(State(state): State<AppState>) -> ApiResult<ListingView> {
    success(state.refresher.view())
}

/// POST /api/communities/refresh - Request an out-of-band merge pass. Admin.
pub async fn request_refresh(State(state): State<AppState>) -> ApiResult<()> {
    state.events.publish(CommunityEvent::RefreshRequested {
        timestamp: Utc::now().to_rfc3339(),
    });
    success(())
}
