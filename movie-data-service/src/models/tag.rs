use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate_not_blank;

/// A tag document; `movie_titles` mirrors `movies.tagNames`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub tag_name: String,
    #[serde(default)]
    pub movie_titles: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TagMovieRequest {
    #[validate(
        length(min = 1, max = 100, message = "Tag name must be 1-100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub tag_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagResponse {
    pub tag_name: String,
    pub movie_titles: Vec<String>,
}

impl From<Tag> for TagResponse {
    fn from(t: Tag) -> Self {
        Self {
            tag_name: t.tag_name,
            movie_titles: t.movie_titles,
        }
    }
}
