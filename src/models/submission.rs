//! Submission model: the authoritative record of a community awaiting review.

use serde::{Deserialize, Serialize};

/// Messaging platform the community lives on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Platform {
    WhatsApp,
    Telegram,
    Slack,
    Discord,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::WhatsApp => "WhatsApp",
            Platform::Telegram => "Telegram",
            Platform::Slack => "Slack",
            Platform::Discord => "Discord",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "WhatsApp" => Some(Platform::WhatsApp),
            "Telegram" => Some(Platform::Telegram),
            "Slack" => Some(Platform::Slack),
            "Discord" => Some(Platform::Discord),
            _ => None,
        }
    }
}

/// Whether joining is free or gated behind a payment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    Free,
    Paid,
}

impl JoinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::Free => "free",
            JoinType::Paid => "paid",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "free" => Some(JoinType::Free),
            "paid" => Some(JoinType::Paid),
            _ => None,
        }
    }
}

/// Review status of a submission.
///
/// Transitions are pending -> {approved, rejected}. Re-transition back to
/// pending exists only as a manual admin override, not a modeled workflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SubmissionStatus::Pending),
            "approved" => Some(SubmissionStatus::Approved),
            "rejected" => Some(SubmissionStatus::Rejected),
            _ => None,
        }
    }
}

/// A community submission as stored in the submission store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub name: String,
    pub platform: Platform,
    pub category: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_description: Option<String>,
    /// Nullable for paid communities; the link is released after payment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_link: Option<String>,
    pub join_type: JoinType,
    /// Price in minor currency units when paid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    pub founder_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub founder_bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    pub status: SubmissionStatus,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_notes: Option<String>,
}

/// Request body for the public submission form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubmissionRequest {
    pub name: String,
    pub platform: Platform,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub full_description: Option<String>,
    #[serde(default)]
    pub join_link: Option<String>,
    #[serde(default = "default_join_type")]
    pub join_type: JoinType,
    #[serde(default)]
    pub price: Option<i64>,
    pub founder_name: String,
    #[serde(default)]
    pub founder_bio: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

fn default_join_type() -> JoinType {
    JoinType::Free
}

/// Request body for the admin approve/reject actions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[serde(default)]
    pub notes: Option<String>,
}
