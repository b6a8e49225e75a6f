use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{TrainerProfile, User};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub reviewer_id: i64,
    pub trainer_id: i64,
    pub rating: i64,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: Review,
    pub reviewer: Option<User>,
    pub trainer: Option<User>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub trainer_id: Option<i64>,
    pub comment: Option<String>,
    pub rating: Option<i64>,
}

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// Count, mean and per-star histogram over a set of ratings.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RatingStats {
    pub total_reviews: i64,
    pub average_rating: f64,
    pub rating_counts: BTreeMap<i64, i64>,
}

impl RatingStats {
    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        let mut rating_counts: BTreeMap<i64, i64> =
            (MIN_RATING..=MAX_RATING).map(|star| (star, 0)).collect();
        let mut total = 0i64;
        let mut sum = 0i64;

        for rating in ratings {
            *rating_counts.entry(rating).or_insert(0) += 1;
            total += 1;
            sum += rating;
        }

        let average_rating = if total == 0 {
            0.0
        } else {
            // One decimal place, as displayed by the frontend.
            ((sum as f64 / total as f64) * 10.0).round() / 10.0
        };

        Self {
            total_reviews: total,
            average_rating,
            rating_counts,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainerReviews {
    pub trainer: TrainerProfile,
    #[serde(flatten)]
    pub stats: RatingStats,
    pub reviews: Vec<ReviewView>,
}
