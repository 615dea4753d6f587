use std::path::Path as FsPath;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};

use crate::middleware::CurrentUser;
use crate::services::{images::StockImageLoad, parse_object_id};
use crate::startup::AppState;
use service_core::error::AppError;

/// Stock image bytes for a movie. Not session-protected so `<img>` tags work.
#[tracing::instrument(skip(state))]
pub async fn movie_image(
    State(state): State<AppState>,
    Path(movie_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = state.db.movie_image(parse_object_id(&movie_id)?).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        bytes,
    ))
}

#[tracing::instrument(skip(state))]
pub async fn load_stock_images(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<StockImageLoad>, AppError> {
    let images = &state.config.images;
    let outcome = state
        .db
        .load_stock_images(FsPath::new(&images.stock_image_dir), images.stock_image_count)
        .await?;
    tracing::info!(
        loaded = outcome.loaded.len(),
        skipped = outcome.skipped.len(),
        missing = outcome.missing.len(),
        "Stock images processed"
    );
    Ok(Json(outcome))
}
