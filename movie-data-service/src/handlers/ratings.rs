use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::middleware::CurrentUser;
use crate::models::{CreateRatingRequest, RatingResponse, RenameCategoryRequest, UpdateRatingRequest};
use crate::services::parse_object_id;
use crate::startup::AppState;
use service_core::error::AppError;

#[tracing::instrument(skip(state, request))]
pub async fn create_rating(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(movie_id): Path<String>,
    Json(request): Json<CreateRatingRequest>,
) -> Result<(StatusCode, Json<RatingResponse>), AppError> {
    let movie_id = parse_object_id(&movie_id)?;
    request.validate()?;
    let rating = state
        .db
        .create_rating(movie_id, &user.user_name, request)
        .await?;
    Ok((StatusCode::CREATED, Json(rating.into())))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_rating(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((movie_id, rating_name)): Path<(String, String)>,
    Json(request): Json<UpdateRatingRequest>,
) -> Result<Json<RatingResponse>, AppError> {
    let movie_id = parse_object_id(&movie_id)?;
    request.validate()?;
    let rating = state
        .db
        .update_rating(movie_id, &user.user_name, &rating_name, request.user_rating)
        .await?;
    Ok(Json(rating.into()))
}

#[tracing::instrument(skip(state))]
pub async fn delete_rating(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((movie_id, rating_name)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    state
        .db
        .delete_rating(parse_object_id(&movie_id)?, &user.user_name, &rating_name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state))]
pub async fn my_ratings(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<RatingResponse>>, AppError> {
    let ratings = state.db.ratings_by_user(&user.user_name).await?;
    Ok(Json(ratings.into_iter().map(RatingResponse::from).collect()))
}

#[tracing::instrument(skip(state))]
pub async fn category_ratings(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(rating_name): Path<String>,
) -> Result<Json<Vec<RatingResponse>>, AppError> {
    let ratings = state
        .db
        .ratings_in_category(&rating_name, &user.user_name)
        .await?;
    Ok(Json(ratings.into_iter().map(RatingResponse::from).collect()))
}

#[tracing::instrument(skip(state, request))]
pub async fn rename_category(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(rating_name): Path<String>,
    Json(request): Json<RenameCategoryRequest>,
) -> Result<StatusCode, AppError> {
    request.validate()?;
    state
        .db
        .rename_category(&rating_name, &request.rating_name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
