//! Approved community: the denormalized listing projection of an approved
//! submission.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{JoinType, Platform, Submission, SubmissionStatus};

/// Placeholder asset used when a submission has no logo.
pub const PLACEHOLDER_LOGO: &str = "/assets/community-placeholder.svg";

/// Whether the approval that produced this record was confirmed by the
/// submission store or only applied locally.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RemoteState {
    /// The store acknowledged the status update.
    Confirmed,
    /// The store rejected or never received the update; the record exists
    /// only in local caches until an admin re-applies it.
    LocalOnly,
}

/// A live community listing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedCommunity {
    pub id: String,
    pub name: String,
    pub description: String,
    pub full_description: String,
    pub category: String,
    pub platform: Platform,
    pub members: i64,
    /// Approval implies verification in this model.
    pub verified: bool,
    /// Empty for paid communities; the real link is released after payment.
    pub join_link: String,
    pub join_type: JoinType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    pub logo_url: String,
    pub location: String,
    pub tags: Vec<String>,
    pub admin_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_bio: Option<String>,
    pub remote_state: RemoteState,
}

impl ApprovedCommunity {
    /// Denormalize an approved submission into a listing entry.
    ///
    /// Fails with a validation error if the submission is not approved; a
    /// listing entry must never be built from a pending or rejected record.
    pub fn from_submission(
        submission: &Submission,
        remote_state: RemoteState,
    ) -> Result<Self, AppError> {
        if submission.status != SubmissionStatus::Approved {
            return Err(AppError::Validation(format!(
                "Submission {} is {}, not approved",
                submission.id,
                submission.status.as_str()
            )));
        }

        // Paid access is gated by payment verification, so the join link is
        // suppressed in the public projection.
        let join_link = match submission.join_type {
            JoinType::Paid => String::new(),
            JoinType::Free => submission.join_link.clone().unwrap_or_default(),
        };

        Ok(Self {
            id: submission.id.clone(),
            name: submission.name.clone(),
            description: submission.description.clone(),
            full_description: submission
                .full_description
                .clone()
                .unwrap_or_else(|| submission.description.clone()),
            category: submission.category.clone(),
            platform: submission.platform,
            members: 0,
            verified: true,
            join_link,
            join_type: submission.join_type,
            price: submission.price,
            logo_url: submission
                .logo_url
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_LOGO.to_string()),
            location: "Global".to_string(),
            tags: vec![
                submission.category.clone(),
                submission.platform.as_str().to_string(),
            ],
            admin_name: submission.founder_name.clone(),
            admin_bio: submission.founder_bio.clone(),
            remote_state,
        })
    }
}

/// Built-in seed listings shown before any submission is approved.
///
/// Seed ids use the `seed-` namespace, disjoint from uuid submission ids, so
/// the listing merge never has to reconcile a seed against a remote row.
pub fn seed_communities() -> Vec<ApprovedCommunity> {
    let seeds = [
        (
            "seed-1",
            "Indie Makers Lounge",
            "Builders sharing launches, growth tactics and honest numbers.",
            "Startups",
            Platform::Telegram,
            "https://t.me/indiemakerslounge",
        ),
        (
            "seed-2",
            "Design Crit Circle",
            "Weekly portfolio critiques and hiring leads for product designers.",
            "Design",
            Platform::Slack,
            "https://join.slack.com/t/designcritcircle/shared_invite",
        ),
        (
            "seed-3",
            "Rust Study Hall",
            "Beginner-friendly systems programming study group.",
            "Programming",
            Platform::Discord,
            "https://discord.gg/ruststudyhall",
        ),
    ];

    seeds
        .into_iter()
        .map(|(id, name, description, category, platform, link)| ApprovedCommunity {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            full_description: description.to_string(),
            category: category.to_string(),
            platform,
            members: 0,
            verified: true,
            join_link: link.to_string(),
            join_type: JoinType::Free,
            price: None,
            logo_url: PLACEHOLDER_LOGO.to_string(),
            location: "Global".to_string(),
            tags: vec![category.to_string(), platform.as_str().to_string()],
            admin_name: "Community Hub".to_string(),
            admin_bio: None,
            remote_state: RemoteState::Confirmed,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(status: SubmissionStatus, join_type: JoinType) -> Submission {
        Submission {
            id: "42".to_string(),
            name: "Test Circle".to_string(),
            platform: Platform::WhatsApp,
            category: "Startups".to_string(),
            description: "A test community".to_string(),
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
            status,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            reviewed_at: None,
            review_notes: None,
        }
    }

    #[test]
    fn test_from_submission_requires_approved() {
        let pending = submission(SubmissionStatus::Pending, JoinType::Free);
        assert!(ApprovedCommunity::from_submission(&pending, RemoteState::Confirmed).is_err());

        let rejected = submission(SubmissionStatus::Rejected, JoinType::Free);
        assert!(ApprovedCommunity::from_submission(&rejected, RemoteState::Confirmed).is_err());
    }

    #[test]
    fn test_free_denormalization() {
        let sub = submission(SubmissionStatus::Approved, JoinType::Free);
        let community = ApprovedCommunity::from_submission(&sub, RemoteState::Confirmed).unwrap();

        assert_eq!(community.id, "42");
        assert!(community.verified);
        assert_eq!(community.join_link, "https://chat.example/abc");
        assert_eq!(community.logo_url, PLACEHOLDER_LOGO);
        assert_eq!(community.location, "Global");
        assert_eq!(community.tags, vec!["Startups", "WhatsApp"]);
        assert_eq!(community.full_description, "A test community");
    }

    #[test]
    fn test_paid_denormalization_suppresses_link() {
        let sub = submission(SubmissionStatus::Approved, JoinType::Paid);
        let community = ApprovedCommunity::from_submission(&sub, RemoteState::Confirmed).unwrap();

        assert_eq!(community.join_link, "");
        assert_eq!(community.price, Some(99));
    }

    #[test]
    fn test_seed_ids_are_namespaced() {
        for seed in seed_communities() {
            assert!(seed.id.starts_with("seed-"));
        }
    }
}
