use chrono::Utc;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::FindOptions,
};
use service_core::error::AppError;

use super::database::MovieDb;
use super::ratings::visible_to;
use crate::models::{CreateReviewRequest, Review, UpdateReviewRequest};

impl MovieDb {
    pub async fn create_review(
        &self,
        movie_id: ObjectId,
        user_name: &str,
        request: CreateReviewRequest,
    ) -> Result<Review, AppError> {
        let movie = self.get_movie(movie_id).await?;

        let mut review = Review {
            id: None,
            movie_id,
            movie_title: movie.title,
            user_name: user_name.to_string(),
            review_title: request.review_title,
            review_description: request.review_description,
            privacy: request.privacy,
            date_time_created: Utc::now(),
        };

        let result = self.reviews().insert_one(&review, None).await.map_err(|e| {
            tracing::error!("Failed to insert review: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        review.id = result.inserted_id.as_object_id();

        tracing::info!(movie_id = %movie_id, "Review created");
        Ok(review)
    }

    pub async fn reviews_for_movie(
        &self,
        movie_id: ObjectId,
        viewer: &str,
    ) -> Result<Vec<Review>, AppError> {
        self.get_movie(movie_id).await?;
        let mut filter = visible_to(viewer);
        filter.insert("movieId", movie_id);
        let options = FindOptions::builder()
            .sort(doc! { "dateTimeCreated": -1 })
            .build();
        self.find_all(&self.reviews(), filter, options).await
    }

    pub async fn reviews_by_user(&self, user_name: &str) -> Result<Vec<Review>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "dateTimeCreated": -1 })
            .build();
        self.find_all(&self.reviews(), doc! { "userName": user_name }, options)
            .await
    }

    /// Loads a review for modification by `user_name`.
    async fn owned_review(&self, id: ObjectId, user_name: &str) -> Result<Review, AppError> {
        let review = self
            .reviews()
            .find_one(doc! { "_id": id }, None)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Review {} not found", id)))?;

        if review.user_name != user_name {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Only the author can modify this review"
            )));
        }
        Ok(review)
    }

    pub async fn update_review(
        &self,
        id: ObjectId,
        user_name: &str,
        request: UpdateReviewRequest,
    ) -> Result<Review, AppError> {
        let mut review = self.owned_review(id, user_name).await?;

        let mut fields = Document::new();
        if let Some(title) = request.review_title {
            fields.insert("reviewTitle", title.as_str());
            review.review_title = title;
        }
        if let Some(description) = request.review_description {
            fields.insert("reviewDescription", description.as_str());
            review.review_description = description;
        }
        if let Some(privacy) = request.privacy {
            fields.insert("privacy", privacy.as_str());
            review.privacy = privacy;
        }
        if fields.is_empty() {
            return Ok(review);
        }

        self.reviews()
            .update_one(doc! { "_id": id }, doc! { "$set": fields }, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update review: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(review)
    }

    pub async fn delete_review(&self, id: ObjectId, user_name: &str) -> Result<(), AppError> {
        self.owned_review(id, user_name).await?;
        self.reviews()
            .delete_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete review: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;
        tracing::info!(review_id = %id, "Review deleted");
        Ok(())
    }
}
