//! Per-movie rating statistics.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::models::{CategoryRatingSummary, Movie, MovieRatingSummary, MovieResponse, Rating};

/// Number of tag names attached to an enriched movie listing.
pub const ATTACHED_TAG_LIMIT: usize = 3;

#[derive(Default)]
struct Accumulator {
    upperbound: i32,
    count: u64,
    sum: i64,
    min: i32,
    max: i32,
}

/// Groups ratings by category and orders the result by popularity.
pub fn summarize_categories(ratings: &[Rating]) -> Vec<CategoryRatingSummary> {
    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();

    for rating in ratings {
        let acc = groups.entry(rating.rating_name.as_str()).or_default();
        if acc.count == 0 {
            acc.upperbound = rating.upperbound;
            acc.min = rating.user_rating;
            acc.max = rating.user_rating;
        }
        acc.count += 1;
        acc.sum += i64::from(rating.user_rating);
        acc.min = acc.min.min(rating.user_rating);
        acc.max = acc.max.max(rating.user_rating);
    }

    let mut summaries: Vec<CategoryRatingSummary> = groups
        .into_iter()
        .map(|(name, acc)| {
            let average = acc.sum as f64 / acc.count as f64;
            let normalized_average = if acc.upperbound > 0 {
                (average / f64::from(acc.upperbound)).clamp(0.0, 1.0)
            } else {
                0.0
            };
            CategoryRatingSummary {
                rating_name: name.to_string(),
                upperbound: acc.upperbound,
                count: acc.count,
                average,
                min: acc.min,
                max: acc.max,
                normalized_average,
            }
        })
        .collect();

    summaries.sort_by(popularity);
    summaries
}

/// Most ratings first, then the higher average, then name.
fn popularity(a: &CategoryRatingSummary, b: &CategoryRatingSummary) -> Ordering {
    b.count
        .cmp(&a.count)
        .then_with(|| b.average.partial_cmp(&a.average).unwrap_or(Ordering::Equal))
        .then_with(|| a.rating_name.cmp(&b.rating_name))
}

pub fn summarize_movie(movie: &Movie, ratings: &[Rating]) -> MovieRatingSummary {
    let categories = summarize_categories(ratings);
    MovieRatingSummary {
        movie_id: movie.hex_id(),
        movie_title: movie.title.clone(),
        total_ratings: ratings.len() as u64,
        most_popular: categories.first().cloned(),
        categories,
    }
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Builds a listing entry with the most popular category and a few tags.
pub fn enrich(movie: Movie, summary: &MovieRatingSummary) -> MovieResponse {
    let attached: Vec<String> = movie
        .tag_names
        .iter()
        .take(ATTACHED_TAG_LIMIT)
        .cloned()
        .collect();

    let mut response = MovieResponse::from(movie);
    if let Some(top) = &summary.most_popular {
        response.most_popular_rating_category = Some(top.rating_name.clone());
        response.most_pop_rating_upper_bound = Some(top.upperbound);
        response.most_pop_rating_avg = Some(round_one_decimal(top.average));
    }
    response.attached_tags = Some(attached);
    response
}
