use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::middleware::CurrentUser;
use crate::models::{ActorQuery, ActorResponse, CreateActorRequest, UpdateActorRequest};
use crate::services::parse_object_id;
use crate::startup::AppState;
use service_core::error::AppError;

#[tracing::instrument(skip(state, request))]
pub async fn create_actor(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(request): Json<CreateActorRequest>,
) -> Result<(StatusCode, Json<ActorResponse>), AppError> {
    request.validate()?;
    let actor = state.db.create_actor(request).await?;
    Ok((StatusCode::CREATED, Json(actor.into())))
}

#[tracing::instrument(skip(state))]
pub async fn find_actors(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<ActorQuery>,
) -> Result<Json<Vec<ActorResponse>>, AppError> {
    let actors = state.db.find_actors(query.name.as_deref()).await?;
    Ok(Json(actors.into_iter().map(ActorResponse::from).collect()))
}

#[tracing::instrument(skip(state))]
pub async fn get_actor(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ActorResponse>, AppError> {
    Ok(Json(state.db.get_actor(parse_object_id(&id)?).await?.into()))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_actor(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateActorRequest>,
) -> Result<Json<ActorResponse>, AppError> {
    let id = parse_object_id(&id)?;
    request.validate()?;
    if request.is_empty() {
        return Err(AppError::bad_request("No fields to update"));
    }
    let actor = state.db.update_actor(id, request).await?;
    Ok(Json(actor.into()))
}

#[tracing::instrument(skip(state))]
pub async fn delete_actor(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.db.delete_actor(parse_object_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
