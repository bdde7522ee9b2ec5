//! Product review types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{ProductId, Rating, ReviewId, UserId};

/// A stored review. At most one exists per (product, user) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub title: String,
    pub comment: String,
    pub rating: Rating,
    pub is_verified_purchase: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A review together with its author's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDetails {
    #[serde(flatten)]
    pub review: Review,
    pub user_name: Option<String>,
}

impl ReviewDetails {
    /// Name shown on the review card.
    #[must_use]
    pub fn author(&self) -> &str {
        self.user_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or("Anonymous User")
    }

    /// Rating as five filled or empty stars.
    #[must_use]
    pub fn stars(&self) -> String {
        let filled = usize::from(self.review.rating.get());
        format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
    }

    /// Creation date as shown on the review card.
    #[must_use]
    pub fn posted_on(&self) -> String {
        self.review.created_at.format("%b %-d, %Y").to_string()
    }
}

/// A validated review, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewInput {
    pub product_id: ProductId,
    pub title: String,
    pub comment: String,
    pub rating: Rating,
    pub is_verified_purchase: bool,
}

/// Whether an upsert inserted a new review or replaced the user's previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

impl UpsertOutcome {
    /// Message shown to the reviewer.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Created => "Review created successfully",
            Self::Updated => "Review updated successfully",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn details(user_name: Option<&str>) -> ReviewDetails {
        let created_at = Utc.with_ymd_and_hms(2026, 3, 7, 12, 0, 0).unwrap();
        ReviewDetails {
            review: Review {
                id: ReviewId::new(1),
                product_id: ProductId::new(1),
                user_id: UserId::new(1),
                title: "Solid".to_string(),
                comment: "Does the job".to_string(),
                rating: Rating::new(4).unwrap(),
                is_verified_purchase: true,
                created_at,
                updated_at: created_at,
            },
            user_name: user_name.map(str::to_owned),
        }
    }

    #[test]
    fn test_author_falls_back_to_anonymous() {
        assert_eq!(details(Some("Ada")).author(), "Ada");
        assert_eq!(details(None).author(), "Anonymous User");
        assert_eq!(details(Some("")).author(), "Anonymous User");
    }

    #[test]
    fn test_card_formatting() {
        let review = details(None);
        assert_eq!(review.stars(), "★★★★☆");
        assert_eq!(review.posted_on(), "Mar 7, 2026");
    }

    #[test]
    fn test_serializes_flat_camel_case() {
        let json = serde_json::to_value(details(Some("Ada"))).unwrap();
        assert_eq!(json["userName"], "Ada");
        assert_eq!(json["isVerifiedPurchase"], true);
        assert_eq!(json["rating"], 4);
    }
}
