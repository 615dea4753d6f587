use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{validate_iso_date, validate_not_blank};

/// A movie document in the `movies` collection.
///
/// `tag_names`, `actor_names` and `rating_category_names` mirror the
/// `tags`, `actors` and `ratings` collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub director: String,
    pub release_date: String,
    pub runtime: i32,
    #[serde(default)]
    pub writers: String,
    #[serde(default)]
    pub plot_summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie_image_id: Option<String>,
    #[serde(default)]
    pub tag_names: Vec<String>,
    #[serde(default)]
    pub actor_names: Vec<String>,
    #[serde(default)]
    pub rating_category_names: Vec<String>,
}

impl Movie {
    pub fn new(request: CreateMovieRequest, movie_image_id: Option<String>) -> Self {
        Self {
            id: None,
            title: request.title.trim().to_string(),
            director: request.director,
            release_date: request.release_date,
            runtime: request.runtime,
            writers: request.writers,
            plot_summary: request.plot_summary,
            movie_image_id,
            tag_names: Vec::new(),
            actor_names: Vec::new(),
            rating_category_names: Vec::new(),
        }
    }

    pub fn hex_id(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMovieRequest {
    #[validate(
        length(min = 1, max = 300, message = "Title must be 1-300 characters"),
        custom(function = "validate_not_blank")
    )]
    pub title: String,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub director: String,
    #[validate(custom(function = "validate_iso_date"))]
    pub release_date: String,
    #[validate(range(min = 1, max = 1000, message = "Runtime must be 1-1000 minutes"))]
    pub runtime: i32,
    #[serde(default)]
    pub writers: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub plot_summary: String,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMovieRequest {
    #[validate(
        length(min = 1, max = 300, message = "Title must be 1-300 characters"),
        custom(function = "validate_not_blank")
    )]
    pub title: Option<String>,
    #[validate(length(max = 200))]
    pub director: Option<String>,
    #[validate(custom(function = "validate_iso_date"))]
    pub release_date: Option<String>,
    #[validate(range(min = 1, max = 1000, message = "Runtime must be 1-1000 minutes"))]
    pub runtime: Option<i32>,
    pub writers: Option<String>,
    #[validate(length(max = 5000))]
    pub plot_summary: Option<String>,
}

impl UpdateMovieRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.director.is_none()
            && self.release_date.is_none()
            && self.runtime.is_none()
            && self.writers.is_none()
            && self.plot_summary.is_none()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieQuery {
    pub title: Option<String>,
    pub tag: Option<String>,
    pub actor: Option<String>,
    pub rating_category: Option<String>,
    pub upperbound: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct TopMoviesQuery {
    #[serde(default = "default_top_limit")]
    pub limit: i64,
}

pub const DEFAULT_TOP_LIMIT: i64 = 12;

fn default_top_limit() -> i64 {
    DEFAULT_TOP_LIMIT
}

impl TopMoviesQuery {
    pub fn clamped_limit(&self) -> i64 {
        self.limit.clamp(1, 50)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieResponse {
    pub id: String,
    pub title: String,
    pub director: String,
    pub release_date: String,
    pub runtime: i32,
    pub writers: String,
    pub plot_summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movie_image_id: Option<String>,
    pub tag_names: Vec<String>,
    pub actor_names: Vec<String>,
    pub rating_category_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_popular_rating_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_pop_rating_upper_bound: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_pop_rating_avg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached_tags: Option<Vec<String>>,
}

impl From<Movie> for MovieResponse {
    fn from(m: Movie) -> Self {
        Self {
            id: m.hex_id(),
            title: m.title,
            director: m.director,
            release_date: m.release_date,
            runtime: m.runtime,
            writers: m.writers,
            plot_summary: m.plot_summary,
            movie_image_id: m.movie_image_id,
            tag_names: m.tag_names,
            actor_names: m.actor_names,
            rating_category_names: m.rating_category_names,
            most_popular_rating_category: None,
            most_pop_rating_upper_bound: None,
            most_pop_rating_avg: None,
            attached_tags: None,
        }
    }
}
