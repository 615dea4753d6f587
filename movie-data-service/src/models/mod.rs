//! Persisted records and their API shapes.
//!
//! Records are flat documents with camelCase field names. Cross references
//! between collections are denormalized names/titles kept in sync by the
//! cascade plans in `services::cascade`.

pub mod actor;
pub mod movie;
pub mod rating;
pub mod review;
pub mod tag;

pub use actor::{Actor, ActorQuery, ActorResponse, CreateActorRequest, UpdateActorRequest};
pub use movie::{
    CreateMovieRequest, Movie, MovieQuery, MovieResponse, TopMoviesQuery, UpdateMovieRequest,
};
pub use rating::{
    CategoryRatingSummary, CreateRatingRequest, MovieRatingSummary, Rating, RatingResponse,
    RenameCategoryRequest, UpdateRatingRequest, UserAssociatedRating,
};
pub use review::{CreateReviewRequest, Review, ReviewResponse, UpdateReviewRequest};
pub use tag::{Tag, TagMovieRequest, TagResponse};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::ValidationError;

/// Visibility of user-generated ratings and reviews.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Public,
    Private,
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Public => "public",
            Privacy::Private => "private",
        }
    }
}

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn validate_iso_date(value: &str) -> Result<(), ValidationError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(|_| ())
        .map_err(|_| {
            let mut err = ValidationError::new("iso_date");
            err.message = Some("must be a date formatted as YYYY-MM-DD".into());
            err
        })
}

pub(crate) fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}
