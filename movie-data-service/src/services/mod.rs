pub mod actors;
pub mod aggregation;
pub mod auth;
pub mod cascade;
pub mod database;
pub mod images;
pub mod metrics;
pub mod movies;
pub mod ratings;
pub mod reviews;
pub mod tags;

pub use auth::{AuthClient, MockSessionResolver, SessionResolver};
pub use cascade::{CascadePlan, CascadeReport};
pub use database::{parse_object_id, MovieDb};
