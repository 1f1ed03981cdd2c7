//! Paid-access endpoints: joining a community and the payment gateway
//! webhook that activates the membership.
//!
//! The gateway itself (checkout widget, order creation against the gateway
//! API) stays external; this module only hands out order ids and reacts to
//! the gateway's success callback.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;

use super::{success, ApiResult};
use crate::auth::constant_time_compare;
use crate::errors::AppError;
use crate::models::{ConfirmPaymentRequest, JoinRequest, JoinType, Membership};
use crate::sync::SubmissionStore;
use crate::AppState;

/// Header carrying the gateway's shared webhook secret.
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Response to a join request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    /// Set immediately for free communities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_link: Option<String>,
    /// Set for paid communities: pending until the gateway confirms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub membership: Option<Membership>,
}

/// Response to a confirmed payment: the activated membership plus the
/// previously suppressed join link.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResponse {
    pub membership: Membership,
    pub join_link: String,
}

/// POST /api/communities/:id/join - Join a community.
///
/// Free communities return their link directly. Paid communities get a
/// pending membership whose order id the frontend hands to the checkout
/// widget; the link is released by the confirm webhook.
pub async fn join_community(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<JoinRequest>,
) -> ApiResult<JoinResponse> {
    if request.member_email.trim().is_empty() {
        return Err(AppError::Validation("Member email is required".to_string()));
    }

    let view = state.refresher.view();
    let community = view
        .communities
        .iter()
        .find(|c| c.id == id)
        .ok_or_else(|| AppError::NotFound(format!("Community {} not found", id)))?;

    match community.join_type {
        JoinType::Free => success(JoinResponse {
            join_link: Some(community.join_link.clone()),
            membership: None,
        }),
        JoinType::Paid => {
            let amount = community.price.ok_or_else(|| {
                AppError::Internal(format!("Paid community {} has no price", id))
            })?;
            let membership = state
                .repo
                .create_membership(&id, &request.member_email, amount)
                .await?;
            success(JoinResponse {
                join_link: None,
                membership: Some(membership),
            })
        }
    }
}

/// POST /api/payments/confirm - Gateway success webhook.
pub async fn confirm_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ConfirmPaymentRequest>,
) -> ApiResult<ConfirmResponse> {
    // If a secret is configured, the webhook must present it.
    if let Some(expected) = &state.config.payment_webhook_secret {
        let provided = headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !constant_time_compare(provided, expected) {
            return Err(AppError::Unauthorized(
                "Invalid webhook secret".to_string(),
            ));
        }
    }

    if request.payment_id.trim().is_empty() {
        return Err(AppError::Validation("Payment id is required".to_string()));
    }

    let membership = state.repo.activate_membership(&request.order_id).await?;

    // Release the join link that the public projection suppresses.
    let join_link = state
        .repo
        .get_submission(&membership.community_id)
        .await?
        .and_then(|s| s.join_link)
        .unwrap_or_default();

    tracing::info!(
        "Membership {} activated for community {} (payment {})",
        membership.id,
        membership.community_id,
        request.payment_id
    );

    success(ConfirmResponse {
        membership,
        join_link,
    })
}
