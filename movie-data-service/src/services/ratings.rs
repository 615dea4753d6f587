use chrono::Utc;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::FindOptions,
};
use service_core::error::AppError;
use uuid::Uuid;

use super::cascade;
use super::database::MovieDb;
use crate::models::{CreateRatingRequest, Privacy, Rating, UserAssociatedRating};

/// Matches records that are public or owned by `viewer`.
pub fn visible_to(viewer: &str) -> Document {
    doc! {
        "$or": [
            { "privacy": Privacy::Public.as_str() },
            { "userName": viewer },
        ]
    }
}

fn check_bound(user_rating: i32, upperbound: i32) -> Result<(), AppError> {
    if !(0..=upperbound).contains(&user_rating) {
        return Err(AppError::bad_request(format!(
            "Rating {} is outside the category range 0..={}",
            user_rating, upperbound
        )));
    }
    Ok(())
}

impl MovieDb {
    async fn find_category_sample(&self, rating_name: &str) -> Result<Option<Rating>, AppError> {
        self.ratings()
            .find_one(doc! { "ratingName": rating_name }, None)
            .await
            .map_err(AppError::from)
    }

    async fn find_own_rating(
        &self,
        user_name: &str,
        movie_id: ObjectId,
        rating_name: &str,
    ) -> Result<Option<UserAssociatedRating>, AppError> {
        self.user_associated_ratings()
            .find_one(
                doc! { "userName": user_name, "movieId": movie_id, "ratingName": rating_name },
                None,
            )
            .await
            .map_err(AppError::from)
    }

    /// Rates a movie in a category, creating the category on first use.
    pub async fn create_rating(
        &self,
        movie_id: ObjectId,
        user_name: &str,
        request: CreateRatingRequest,
    ) -> Result<Rating, AppError> {
        let rating_name = request.rating_name.trim().to_string();
        check_bound(request.user_rating, request.upperbound)?;

        let movie = self.get_movie(movie_id).await?;

        let category_id = match self.find_category_sample(&rating_name).await? {
            Some(existing) if existing.upperbound != request.upperbound => {
                return Err(AppError::bad_request(format!(
                    "Category '{}' uses upperbound {}, not {}",
                    rating_name, existing.upperbound, request.upperbound
                )));
            }
            Some(existing) => existing.rating_category_id,
            None => Uuid::new_v4().to_string(),
        };

        if self
            .find_own_rating(user_name, movie_id, &rating_name)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "'{}' already rated '{}' in category '{}'",
                user_name, movie.title, rating_name
            )));
        }

        let rating = Rating {
            id: Some(ObjectId::new()),
            rating_category_id: category_id,
            rating_name: rating_name.clone(),
            upperbound: request.upperbound,
            user_name: user_name.to_string(),
            movie_id,
            movie_title: movie.title,
            user_rating: request.user_rating,
            privacy: request.privacy,
            date_time_created: Utc::now(),
        };
        let document = mongodb::bson::to_document(&rating)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;

        self.apply(&cascade::create_rating(document, movie_id, &rating_name))
            .await?;

        tracing::info!(movie_id = %movie_id, category = %rating_name, "Rating created");
        Ok(rating)
    }

    pub async fn update_rating(
        &self,
        movie_id: ObjectId,
        user_name: &str,
        rating_name: &str,
        user_rating: i32,
    ) -> Result<Rating, AppError> {
        let mut rating = self
            .find_own_rating(user_name, movie_id, rating_name)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No '{}' rating to update", rating_name)))?;
        check_bound(user_rating, rating.upperbound)?;

        self.apply(&cascade::update_user_rating(
            user_name,
            movie_id,
            rating_name,
            user_rating,
        ))
        .await?;

        rating.user_rating = user_rating;
        Ok(rating)
    }

    pub async fn delete_rating(
        &self,
        movie_id: ObjectId,
        user_name: &str,
        rating_name: &str,
    ) -> Result<(), AppError> {
        self.find_own_rating(user_name, movie_id, rating_name)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No '{}' rating to delete", rating_name)))?;

        let others = self
            .ratings()
            .count_documents(
                doc! {
                    "movieId": movie_id,
                    "ratingName": rating_name,
                    "userName": { "$ne": user_name },
                },
                None,
            )
            .await?;

        self.apply(&cascade::delete_user_rating(
            user_name,
            movie_id,
            rating_name,
            others > 0,
        ))
        .await?;
        Ok(())
    }

    pub async fn ratings_by_user(&self, user_name: &str) -> Result<Vec<UserAssociatedRating>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "dateTimeCreated": -1 })
            .build();
        self.find_all(
            &self.user_associated_ratings(),
            doc! { "userName": user_name },
            options,
        )
        .await
    }

    pub async fn ratings_in_category(
        &self,
        rating_name: &str,
        viewer: &str,
    ) -> Result<Vec<Rating>, AppError> {
        let mut filter = visible_to(viewer);
        filter.insert("ratingName", rating_name);
        let options = FindOptions::builder()
            .sort(doc! { "dateTimeCreated": -1 })
            .build();
        self.find_all(&self.ratings(), filter, options).await
    }

    /// Renames a category everywhere; the new name must not be in use.
    pub async fn rename_category(&self, old_name: &str, new_name: &str) -> Result<(), AppError> {
        let new_name = new_name.trim();
        if self.find_category_sample(old_name).await?.is_none() {
            return Err(AppError::not_found(format!(
                "Rating category '{}' not found",
                old_name
            )));
        }
        if old_name == new_name {
            return Ok(());
        }
        if self.find_category_sample(new_name).await?.is_some() {
            return Err(AppError::conflict(format!(
                "Rating category '{}' already exists",
                new_name
            )));
        }

        self.apply(&cascade::rename_rating_category(old_name, new_name))
            .await?;
        tracing::info!(from = %old_name, to = %new_name, "Rating category renamed");
        Ok(())
    }
}
