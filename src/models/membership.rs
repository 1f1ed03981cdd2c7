//! Membership model for paid-access communities.

use serde::{Deserialize, Serialize};

/// Payment state of a membership.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Pending,
    Active,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Pending => "pending",
            MembershipStatus::Active => "active",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MembershipStatus::Pending),
            "active" => Some(MembershipStatus::Active),
            _ => None,
        }
    }
}

/// A membership row tying a member email to a community and a gateway order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: String,
    pub community_id: String,
    pub member_email: String,
    /// Order id handed to the payment gateway's checkout widget.
    pub order_id: String,
    /// Amount in minor currency units.
    pub amount: i64,
    pub status: MembershipStatus,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<String>,
}

/// Request body for joining a community.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub member_email: String,
}

/// Webhook body confirming a successful gateway payment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub order_id: String,
    pub payment_id: String,
}
