use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{validate_not_blank, Privacy};

pub const MAX_UPPERBOUND: i32 = 10;

/// One user's score for one movie in one rating category.
///
/// `rating_category_id` and `upperbound` are shared by every rating with the
/// same `rating_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub rating_category_id: String,
    pub rating_name: String,
    pub upperbound: i32,
    pub user_name: String,
    pub movie_id: ObjectId,
    pub movie_title: String,
    pub user_rating: i32,
    #[serde(default)]
    pub privacy: Privacy,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date_time_created: DateTime<Utc>,
}

/// The per-user mirror stored in `userAssociatedRatings`.
///
/// Same shape as [`Rating`]; kept in a separate collection so a user's
/// ratings can be listed without scanning every category.
pub type UserAssociatedRating = Rating;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRatingRequest {
    #[validate(
        length(min = 1, max = 100, message = "Rating name must be 1-100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub rating_name: String,
    #[validate(range(min = 0, max = 10))]
    pub user_rating: i32,
    #[validate(range(min = 1, max = 10, message = "Upperbound must be between 1 and 10"))]
    pub upperbound: i32,
    #[serde(default)]
    pub privacy: Privacy,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRatingRequest {
    #[validate(range(min = 0, max = 10))]
    pub user_rating: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RenameCategoryRequest {
    #[validate(
        length(min = 1, max = 100, message = "Rating name must be 1-100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub rating_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingResponse {
    pub id: String,
    pub rating_category_id: String,
    pub rating_name: String,
    pub upperbound: i32,
    pub user_name: String,
    pub movie_id: String,
    pub movie_title: String,
    pub user_rating: i32,
    pub privacy: Privacy,
    pub date_time_created: DateTime<Utc>,
}

impl From<Rating> for RatingResponse {
    fn from(r: Rating) -> Self {
        Self {
            id: r.id.map(|id| id.to_hex()).unwrap_or_default(),
            rating_category_id: r.rating_category_id,
            rating_name: r.rating_name,
            upperbound: r.upperbound,
            user_name: r.user_name,
            movie_id: r.movie_id.to_hex(),
            movie_title: r.movie_title,
            user_rating: r.user_rating,
            privacy: r.privacy,
            date_time_created: r.date_time_created,
        }
    }
}

/// Statistics for one rating category on one movie.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRatingSummary {
    pub rating_name: String,
    pub upperbound: i32,
    pub count: u64,
    pub average: f64,
    pub min: i32,
    pub max: i32,
    /// `average / upperbound`, in `0..=1`.
    pub normalized_average: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieRatingSummary {
    pub movie_id: String,
    pub movie_title: String,
    pub total_ratings: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_popular: Option<CategoryRatingSummary>,
    pub categories: Vec<CategoryRatingSummary>,
}
