use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{validate_iso_date, validate_not_blank};

/// An actor document; `movies` holds titles and mirrors `movies.actorNames`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(default)]
    pub movies: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateActorRequest {
    #[validate(
        length(min = 1, max = 200, message = "Name must be 1-200 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,
    #[validate(custom(function = "validate_iso_date"))]
    pub dob: Option<String>,
    /// Hex ids of the movies the actor appears in. More can be added later.
    #[serde(default)]
    pub movie_ids: Vec<String>,
}

/// Partial update. `movie_ids`, when present, replaces the filmography.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateActorRequest {
    #[validate(
        length(min = 1, max = 200, message = "Name must be 1-200 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: Option<String>,
    #[validate(custom(function = "validate_iso_date"))]
    pub dob: Option<String>,
    pub movie_ids: Option<Vec<String>>,
}

impl UpdateActorRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.dob.is_none() && self.movie_ids.is_none()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ActorQuery {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    pub movies: Vec<String>,
}

impl From<Actor> for ActorResponse {
    fn from(a: Actor) -> Self {
        Self {
            id: a.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: a.name,
            dob: a.dob,
            movies: a.movies,
        }
    }
}
