use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Privacy;

/// Free-form text a user wrote about a movie. A user may review a movie
/// more than once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub movie_id: ObjectId,
    pub movie_title: String,
    pub user_name: String,
    #[serde(default)]
    pub review_title: String,
    pub review_description: String,
    #[serde(default)]
    pub privacy: Privacy,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date_time_created: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    #[validate(length(max = 200))]
    #[serde(default)]
    pub review_title: String,
    #[validate(length(min = 1, message = "Review description cannot be empty"))]
    pub review_description: String,
    #[serde(default)]
    pub privacy: Privacy,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewRequest {
    #[validate(length(max = 200))]
    pub review_title: Option<String>,
    #[validate(length(min = 1, message = "Review description cannot be empty"))]
    pub review_description: Option<String>,
    pub privacy: Option<Privacy>,
}

impl UpdateReviewRequest {
    pub fn is_empty(&self) -> bool {
        self.review_title.is_none() && self.review_description.is_none() && self.privacy.is_none()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: String,
    pub movie_id: String,
    pub movie_title: String,
    pub user_name: String,
    pub review_title: String,
    pub review_description: String,
    pub privacy: Privacy,
    pub date_time_created: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(r: Review) -> Self {
        Self {
            id: r.id.map(|id| id.to_hex()).unwrap_or_default(),
            movie_id: r.movie_id.to_hex(),
            movie_title: r.movie_title,
            user_name: r.user_name,
            review_title: r.review_title,
            review_description: r.review_description,
            privacy: r.privacy,
            date_time_created: r.date_time_created,
        }
    }
}
