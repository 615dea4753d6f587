use std::path::Path;

use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson},
    gridfs::{FilesCollectionDocument, GridFsBucket},
    options::GridFsBucketOptions,
};
use rand::seq::SliceRandom;
use service_core::error::AppError;

use super::database::{collections::STOCK_IMAGE_BUCKET, parse_object_id, MovieDb};

pub const STOCK_IMAGE_PREFIX: &str = "stockImage";

/// `stockImage1.jpg`, `stockImage2.jpg`, ...
pub fn stock_image_name(index: u32) -> String {
    format!("{}{}.jpg", STOCK_IMAGE_PREFIX, index)
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockImageLoad {
    pub loaded: Vec<String>,
    pub skipped: Vec<String>,
    pub missing: Vec<String>,
}

impl MovieDb {
    fn stock_images(&self) -> GridFsBucket {
        self.database().gridfs_bucket(
            GridFsBucketOptions::builder()
                .bucket_name(STOCK_IMAGE_BUCKET.to_string())
                .build(),
        )
    }

    async fn stock_image_files(
        &self,
        filter: mongodb::bson::Document,
    ) -> Result<Vec<FilesCollectionDocument>, AppError> {
        let cursor = self.stock_images().find(filter, None).await?;
        cursor.try_collect().await.map_err(AppError::from)
    }

    /// Uploads `stockImage1.jpg..=stockImage{count}.jpg` from `dir`, skipping
    /// files already in the bucket.
    pub async fn load_stock_images(&self, dir: &Path, count: u32) -> Result<StockImageLoad, AppError> {
        let bucket = self.stock_images();
        let mut outcome = StockImageLoad::default();

        for index in 1..=count {
            let name = stock_image_name(index);
            if !self
                .stock_image_files(doc! { "filename": name.as_str() })
                .await?
                .is_empty()
            {
                outcome.skipped.push(name);
                continue;
            }

            let path = dir.join(&name);
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!(path = %path.display(), "Stock image not found");
                    outcome.missing.push(name);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let id = bucket
                .upload_from_futures_0_3_reader(name.as_str(), bytes.as_slice(), None)
                .await?;
            tracing::info!(file = %name, id = %id, size = bytes.len(), "Stock image uploaded");
            outcome.loaded.push(name);
        }

        Ok(outcome)
    }

    /// Hex id of a uniformly chosen stock image, if any are loaded.
    pub async fn random_stock_image_id(&self) -> Result<Option<String>, AppError> {
        let files = self
            .stock_image_files(doc! { "filename": { "$regex": format!("^{}", STOCK_IMAGE_PREFIX) } })
            .await?;
        let ids: Vec<ObjectId> = files.iter().filter_map(|f| f.id.as_object_id()).collect();
        Ok(ids.choose(&mut rand::thread_rng()).map(|id| id.to_hex()))
    }

    /// Image bytes for a movie.
    pub async fn movie_image(&self, movie_id: ObjectId) -> Result<Vec<u8>, AppError> {
        let movie = self.get_movie(movie_id).await?;
        let image_id = movie
            .movie_image_id
            .as_deref()
            .ok_or_else(|| AppError::not_found(format!("Movie {} has no image", movie_id)))?;
        let image_id = parse_object_id(image_id)?;

        if self
            .stock_image_files(doc! { "_id": image_id })
            .await?
            .is_empty()
        {
            return Err(AppError::not_found(format!("Image {} not found", image_id)));
        }

        let mut bytes = Vec::new();
        self.stock_images()
            .download_to_futures_0_3_writer(Bson::ObjectId(image_id), &mut bytes)
            .await?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_image_names_are_one_based() {
        assert_eq!(stock_image_name(1), "stockImage1.jpg");
        assert_eq!(stock_image_name(12), "stockImage12.jpg");
    }
}
