use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::FindOptions,
};
use service_core::error::AppError;

use super::aggregation;
use super::cascade::{self, TitleLinks};
use super::database::MovieDb;
use super::ratings::visible_to;
use crate::models::{
    CreateMovieRequest, Movie, MovieQuery, MovieRatingSummary, MovieResponse, UpdateMovieRequest,
};

impl MovieDb {
    pub async fn create_movie(&self, request: CreateMovieRequest) -> Result<Movie, AppError> {
        let image_id = self.random_stock_image_id().await?;
        let mut movie = Movie::new(request, image_id);

        let result = self.movies().insert_one(&movie, None).await.map_err(|e| {
            tracing::error!("Failed to insert movie: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        movie.id = result.inserted_id.as_object_id();

        tracing::info!(movie_id = %movie.hex_id(), title = %movie.title, "Movie created");
        Ok(movie)
    }

    pub async fn find_movie(&self, id: ObjectId) -> Result<Option<Movie>, AppError> {
        self.movies()
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to find movie: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })
    }

    pub async fn get_movie(&self, id: ObjectId) -> Result<Movie, AppError> {
        self.find_movie(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Movie {} not found", id)))
    }

    /// Fetches movies by id, failing on the first id with no movie.
    pub async fn get_movies(&self, ids: &[ObjectId]) -> Result<Vec<Movie>, AppError> {
        let found = self
            .find_all(&self.movies(), doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await?;

        ids.iter()
            .map(|id| {
                found
                    .iter()
                    .find(|m| m.id == Some(*id))
                    .cloned()
                    .ok_or_else(|| AppError::not_found(format!("Movie {} not found", id)))
            })
            .collect()
    }

    pub async fn search_movies(&self, query: &MovieQuery) -> Result<Vec<Movie>, AppError> {
        let category_ids = match (&query.rating_category, query.upperbound) {
            (Some(category), Some(upperbound)) => {
                Some(self.movie_ids_rated_in(category, upperbound).await?)
            }
            _ => None,
        };
        let filter = movie_search_filter(query, category_ids)?;
        let options = FindOptions::builder().sort(doc! { "title": 1 }).build();
        self.find_all(&self.movies(), filter, options).await
    }

    async fn movie_ids_rated_in(
        &self,
        rating_name: &str,
        upperbound: i32,
    ) -> Result<Vec<ObjectId>, AppError> {
        let values = self
            .ratings()
            .distinct(
                "movieId",
                doc! { "ratingName": rating_name, "upperbound": upperbound },
                None,
            )
            .await
            .map_err(|e| {
                tracing::error!("Failed to list rated movies: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(values.iter().filter_map(|v| v.as_object_id()).collect())
    }

    pub async fn recent_releases(&self, limit: i64) -> Result<Vec<Movie>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "releaseDate": -1, "title": 1 })
            .limit(limit)
            .build();
        self.find_all(&self.movies(), doc! {}, options).await
    }

    /// Movies ordered by number of reviews, most reviewed first.
    pub async fn most_reviewed(&self, limit: i64) -> Result<Vec<Movie>, AppError> {
        let pipeline = vec![
            doc! { "$group": { "_id": "$movieId", "reviewCount": { "$sum": 1 } } },
            doc! { "$sort": { "reviewCount": -1, "_id": 1 } },
            doc! { "$limit": limit },
        ];

        let cursor = self.reviews().aggregate(pipeline, None).await.map_err(|e| {
            tracing::error!("Failed to aggregate reviews: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let groups: Vec<Document> = cursor.try_collect().await.map_err(|e| {
            tracing::error!("Failed to collect review counts: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let ids: Vec<ObjectId> = groups
            .iter()
            .filter_map(|g| g.get_object_id("_id").ok())
            .collect();

        let movies = self
            .find_all(&self.movies(), doc! { "_id": { "$in": ids.clone() } }, None)
            .await?;

        // Keep the review-count order; skip reviews of deleted movies.
        Ok(ids
            .iter()
            .filter_map(|id| movies.iter().find(|m| m.id == Some(*id)).cloned())
            .collect())
    }

    /// Tags and actors linked to other movies titled `title`.
    pub(crate) async fn sibling_links(
        &self,
        id: ObjectId,
        title: &str,
    ) -> Result<TitleLinks, AppError> {
        let siblings = self
            .find_all(
                &self.movies(),
                doc! { "title": title, "_id": { "$ne": id } },
                None,
            )
            .await?;
        Ok(TitleLinks::from_movies(&siblings))
    }

    pub async fn update_movie(
        &self,
        id: ObjectId,
        request: UpdateMovieRequest,
    ) -> Result<Movie, AppError> {
        let movie = self.get_movie(id).await?;

        let mut fields = Document::new();
        if let Some(director) = request.director {
            fields.insert("director", director);
        }
        if let Some(release_date) = request.release_date {
            fields.insert("releaseDate", release_date);
        }
        if let Some(runtime) = request.runtime {
            fields.insert("runtime", runtime);
        }
        if let Some(writers) = request.writers {
            fields.insert("writers", writers);
        }
        if let Some(plot_summary) = request.plot_summary {
            fields.insert("plotSummary", plot_summary);
        }
        let new_title = request.title.as_deref().map(str::trim);

        let siblings = match new_title {
            Some(title) if title != movie.title => self.sibling_links(id, &movie.title).await?,
            _ => TitleLinks::default(),
        };
        let plan = cascade::update_movie(
            id,
            &movie.title,
            fields,
            new_title,
            &TitleLinks::of(&movie),
            &siblings,
        );
        self.apply(&plan).await?;

        self.get_movie(id).await
    }

    pub async fn delete_movie(&self, id: ObjectId) -> Result<(), AppError> {
        let movie = self.get_movie(id).await?;
        let siblings = self.sibling_links(id, &movie.title).await?;
        self.apply(&cascade::delete_movie(id, &movie.title, &siblings))
            .await?;
        tracing::info!(movie_id = %id, title = %movie.title, "Movie deleted");
        Ok(())
    }

    /// Aggregated statistics over the movie's ratings visible to `viewer`.
    pub async fn rating_summary(
        &self,
        movie: &Movie,
        viewer: &str,
    ) -> Result<MovieRatingSummary, AppError> {
        let ratings = match movie.id {
            Some(id) => {
                self.find_all(&self.ratings(), summary_filter(id, viewer), None)
                    .await?
            }
            None => Vec::new(),
        };
        Ok(aggregation::summarize_movie(movie, &ratings))
    }

    /// Adds the most popular rating category and a few tags to each movie.
    pub async fn enrich_movies(
        &self,
        movies: Vec<Movie>,
        viewer: &str,
    ) -> Result<Vec<MovieResponse>, AppError> {
        let mut responses = Vec::with_capacity(movies.len());
        for movie in movies {
            let summary = self.rating_summary(&movie, viewer).await?;
            responses.push(aggregation::enrich(movie, &summary));
        }
        Ok(responses)
    }
}

/// Ratings of `movie_id` that `viewer` may see.
fn summary_filter(movie_id: ObjectId, viewer: &str) -> Document {
    let mut filter = visible_to(viewer);
    filter.insert("movieId", movie_id);
    filter
}

/// Combines search criteria into one conjunctive filter.
///
/// `category_ids` holds the movies rated in the requested category with the
/// requested upperbound, when an upperbound was given.
pub fn movie_search_filter(
    query: &MovieQuery,
    category_ids: Option<Vec<ObjectId>>,
) -> Result<Document, AppError> {
    if query.upperbound.is_some() && query.rating_category.is_none() {
        return Err(AppError::bad_request(
            "upperbound can only be used together with ratingCategory",
        ));
    }

    let mut filter = Document::new();
    if let Some(title) = &query.title {
        filter.insert("title", title.as_str());
    }
    if let Some(tag) = &query.tag {
        filter.insert("tagNames", tag.as_str());
    }
    if let Some(actor) = &query.actor {
        filter.insert("actorNames", actor.as_str());
    }
    if let Some(category) = &query.rating_category {
        filter.insert("ratingCategoryNames", category.as_str());
    }
    if let Some(ids) = category_ids {
        filter.insert("_id", doc! { "$in": ids });
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_matches_everything() {
        let filter = movie_search_filter(&MovieQuery::default(), None).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn criteria_are_combined() {
        let query = MovieQuery {
            tag: Some("Horror".to_string()),
            actor: Some("Zach Galligan".to_string()),
            ..Default::default()
        };
        let filter = movie_search_filter(&query, None).unwrap();
        assert_eq!(
            filter,
            doc! { "tagNames": "Horror", "actorNames": "Zach Galligan" }
        );
    }

    #[test]
    fn upperbound_restricts_to_rated_movies() {
        let id = ObjectId::new();
        let query = MovieQuery {
            rating_category: Some("Stickiness".to_string()),
            upperbound: Some(5),
            ..Default::default()
        };
        let filter = movie_search_filter(&query, Some(vec![id])).unwrap();
        assert_eq!(
            filter,
            doc! { "ratingCategoryNames": "Stickiness", "_id": { "$in": [id] } }
        );
    }

    #[test]
    fn summary_only_counts_ratings_visible_to_viewer() {
        let id = ObjectId::new();
        assert_eq!(
            summary_filter(id, "ana"),
            doc! {
                "$or": [ { "privacy": "public" }, { "userName": "ana" } ],
                "movieId": id,
            }
        );
    }

    #[test]
    fn upperbound_without_category_is_rejected() {
        let query = MovieQuery {
            upperbound: Some(5),
            ..Default::default()
        };
        assert!(matches!(
            movie_search_filter(&query, None),
            Err(AppError::BadRequest(_))
        ));
    }
}
