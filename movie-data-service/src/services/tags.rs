use mongodb::bson::{doc, oid::ObjectId};
use service_core::error::AppError;

use super::cascade;
use super::database::MovieDb;
use crate::models::Tag;

impl MovieDb {
    pub async fn find_tag(&self, tag_name: &str) -> Result<Option<Tag>, AppError> {
        self.tags()
            .find_one(doc! { "tagName": tag_name }, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to find tag: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })
    }

    pub async fn get_tag(&self, tag_name: &str) -> Result<Tag, AppError> {
        self.find_tag(tag_name)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Tag '{}' not found", tag_name)))
    }

    /// Attaches a tag to a movie; tagging twice is harmless.
    pub async fn tag_movie(&self, movie_id: ObjectId, tag_name: &str) -> Result<Tag, AppError> {
        let movie = self.get_movie(movie_id).await?;
        let tag_name = tag_name.trim();

        self.apply(&cascade::tag_movie(movie_id, &movie.title, tag_name))
            .await?;

        tracing::info!(movie_id = %movie_id, tag = %tag_name, "Movie tagged");
        self.get_tag(tag_name).await
    }

    pub async fn untag_movie(&self, movie_id: ObjectId, tag_name: &str) -> Result<(), AppError> {
        let movie = self.get_movie(movie_id).await?;
        if !movie.tag_names.iter().any(|t| t == tag_name) {
            return Err(AppError::not_found(format!(
                "Movie '{}' is not tagged '{}'",
                movie.title, tag_name
            )));
        }

        let siblings = self.sibling_links(movie_id, &movie.title).await?;
        self.apply(&cascade::untag_movie(
            movie_id,
            &movie.title,
            tag_name,
            &siblings,
        ))
        .await?;
        tracing::info!(movie_id = %movie_id, tag = %tag_name, "Movie untagged");
        Ok(())
    }

    /// Removes a tag from every movie and deletes it.
    pub async fn delete_tag(&self, tag_name: &str) -> Result<(), AppError> {
        self.get_tag(tag_name).await?;
        self.apply(&cascade::delete_tag(tag_name)).await?;
        tracing::info!(tag = %tag_name, "Tag deleted");
        Ok(())
    }
}
