use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::middleware::CurrentUser;
use crate::models::{TagMovieRequest, TagResponse};
use crate::services::parse_object_id;
use crate::startup::AppState;
use service_core::error::AppError;

#[tracing::instrument(skip(state, request))]
pub async fn tag_movie(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(movie_id): Path<String>,
    Json(request): Json<TagMovieRequest>,
) -> Result<Json<TagResponse>, AppError> {
    let movie_id = parse_object_id(&movie_id)?;
    request.validate()?;
    let tag = state.db.tag_movie(movie_id, &request.tag_name).await?;
    Ok(Json(tag.into()))
}

#[tracing::instrument(skip(state))]
pub async fn untag_movie(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path((movie_id, tag_name)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    state
        .db
        .untag_movie(parse_object_id(&movie_id)?, &tag_name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state))]
pub async fn get_tag(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(tag_name): Path<String>,
) -> Result<Json<TagResponse>, AppError> {
    Ok(Json(state.db.get_tag(&tag_name).await?.into()))
}

#[tracing::instrument(skip(state))]
pub async fn delete_tag(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(tag_name): Path<String>,
) -> Result<StatusCode, AppError> {
    state.db.delete_tag(&tag_name).await?;
    Ok(StatusCode::NO_CONTENT)
}
