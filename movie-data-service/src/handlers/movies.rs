use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::middleware::CurrentUser;
use crate::models::{
    CreateMovieRequest, MovieQuery, MovieRatingSummary, MovieResponse, TopMoviesQuery,
    UpdateMovieRequest,
};
use crate::services::parse_object_id;
use crate::startup::AppState;
use service_core::error::AppError;

#[tracing::instrument(skip(state, request))]
pub async fn create_movie(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(request): Json<CreateMovieRequest>,
) -> Result<(StatusCode, Json<MovieResponse>), AppError> {
    request.validate()?;
    let movie = state.db.create_movie(request).await?;
    Ok((StatusCode::CREATED, Json(movie.into())))
}

#[tracing::instrument(skip(state))]
pub async fn search_movies(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<MovieQuery>,
) -> Result<Json<Vec<MovieResponse>>, AppError> {
    let movies = state.db.search_movies(&query).await?;
    Ok(Json(movies.into_iter().map(MovieResponse::from).collect()))
}

#[tracing::instrument(skip(state))]
pub async fn recent_movies(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<TopMoviesQuery>,
) -> Result<Json<Vec<MovieResponse>>, AppError> {
    let movies = state.db.recent_releases(query.clamped_limit()).await?;
    Ok(Json(state.db.enrich_movies(movies, &user.user_name).await?))
}

#[tracing::instrument(skip(state))]
pub async fn most_reviewed_movies(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<TopMoviesQuery>,
) -> Result<Json<Vec<MovieResponse>>, AppError> {
    let movies = state.db.most_reviewed(query.clamped_limit()).await?;
    Ok(Json(state.db.enrich_movies(movies, &user.user_name).await?))
}

#[tracing::instrument(skip(state))]
pub async fn get_movie(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<MovieResponse>, AppError> {
    let movie = state.db.get_movie(parse_object_id(&id)?).await?;
    Ok(Json(movie.into()))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_movie(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateMovieRequest>,
) -> Result<Json<MovieResponse>, AppError> {
    let id = parse_object_id(&id)?;
    request.validate()?;
    if request.is_empty() {
        return Err(AppError::bad_request("No fields to update"));
    }
    let movie = state.db.update_movie(id, request).await?;
    Ok(Json(movie.into()))
}

#[tracing::instrument(skip(state))]
pub async fn delete_movie(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.db.delete_movie(parse_object_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state))]
pub async fn rating_summary(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<MovieRatingSummary>, AppError> {
    let movie = state.db.get_movie(parse_object_id(&id)?).await?;
    Ok(Json(state.db.rating_summary(&movie, &user.user_name).await?))
}
