use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::middleware::CurrentUser;
use crate::models::{CreateReviewRequest, ReviewResponse, UpdateReviewRequest};
use crate::services::parse_object_id;
use crate::startup::AppState;
use service_core::error::AppError;

#[tracing::instrument(skip(state, request))]
pub async fn create_review(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(movie_id): Path<String>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>), AppError> {
    let movie_id = parse_object_id(&movie_id)?;
    request.validate()?;
    let review = state
        .db
        .create_review(movie_id, &user.user_name, request)
        .await?;
    Ok((StatusCode::CREATED, Json(review.into())))
}

#[tracing::instrument(skip(state))]
pub async fn movie_reviews(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(movie_id): Path<String>,
) -> Result<Json<Vec<ReviewResponse>>, AppError> {
    let reviews = state
        .db
        .reviews_for_movie(parse_object_id(&movie_id)?, &user.user_name)
        .await?;
    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}

#[tracing::instrument(skip(state))]
pub async fn my_reviews(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ReviewResponse>>, AppError> {
    let reviews = state.db.reviews_by_user(&user.user_name).await?;
    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_review(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<Json<ReviewResponse>, AppError> {
    let id = parse_object_id(&id)?;
    request.validate()?;
    if request.is_empty() {
        return Err(AppError::bad_request("No fields to update"));
    }
    let review = state.db.update_review(id, &user.user_name, request).await?;
    Ok(Json(review.into()))
}

#[tracing::instrument(skip(state))]
pub async fn delete_review(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .db
        .delete_review(parse_object_id(&id)?, &user.user_name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
