pub mod actors;
pub mod health;
pub mod images;
pub mod movies;
pub mod ratings;
pub mod reviews;
pub mod tags;

pub use health::{health_check, metrics_endpoint, readiness_check};
