use mongodb::{
    bson::{doc, oid::ObjectId},
    options::FindOptions,
};
use service_core::error::AppError;

use super::cascade::{self, CascadePlan};
use super::database::{collections::ACTORS, parse_object_id, MovieDb};
use crate::models::{Actor, CreateActorRequest, UpdateActorRequest};

const ACTOR_LIST_LIMIT: i64 = 100;

/// Parses hex movie ids, dropping duplicates.
fn parse_movie_ids(ids: &[String]) -> Result<Vec<ObjectId>, AppError> {
    let mut parsed: Vec<ObjectId> = Vec::with_capacity(ids.len());
    for id in ids {
        let oid = parse_object_id(id)?;
        if !parsed.contains(&oid) {
            parsed.push(oid);
        }
    }
    Ok(parsed)
}

impl MovieDb {
    pub async fn create_actor(&self, request: CreateActorRequest) -> Result<Actor, AppError> {
        let movie_ids = parse_movie_ids(&request.movie_ids)?;
        let movies = self.get_movies(&movie_ids).await?;
        let name = request.name.trim().to_string();

        let duplicate = self
            .actors()
            .find_one(doc! { "name": name.as_str(), "dob": request.dob.as_deref() }, None)
            .await?;
        if duplicate.is_some() {
            return Err(AppError::conflict(format!(
                "Actor '{}' with the same date of birth already exists",
                name
            )));
        }

        let actor = Actor {
            id: Some(ObjectId::new()),
            name: name.clone(),
            dob: request.dob,
            movies: movies.into_iter().map(|m| m.title).collect(),
        };
        let document = mongodb::bson::to_document(&actor)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;

        self.apply(&cascade::create_actor(document, &name, &movie_ids))
            .await?;

        tracing::info!(actor = %name, movies = actor.movies.len(), "Actor created");
        Ok(actor)
    }

    pub async fn get_actor(&self, id: ObjectId) -> Result<Actor, AppError> {
        self.actors()
            .find_one(doc! { "_id": id }, None)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Actor {} not found", id)))
    }

    pub async fn find_actors(&self, name: Option<&str>) -> Result<Vec<Actor>, AppError> {
        let filter = match name {
            Some(name) => doc! { "name": name },
            None => doc! {},
        };
        let options = FindOptions::builder()
            .sort(doc! { "name": 1 })
            .limit(ACTOR_LIST_LIMIT)
            .build();
        self.find_all(&self.actors(), filter, options).await
    }

    /// Applies name, date of birth and filmography changes in one plan.
    pub async fn update_actor(
        &self,
        id: ObjectId,
        request: UpdateActorRequest,
    ) -> Result<Actor, AppError> {
        let actor = self.get_actor(id).await?;

        let desired = match &request.movie_ids {
            Some(ids) => {
                let movie_ids = parse_movie_ids(ids)?;
                let movies = self.get_movies(&movie_ids).await?;
                Some(
                    movie_ids
                        .into_iter()
                        .zip(movies.into_iter().map(|m| m.title))
                        .collect::<Vec<_>>(),
                )
            }
            None => None,
        };

        let new_name = request
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(&actor.name)
            .to_string();

        let mut plan = CascadePlan::new("update_actor");
        if new_name != actor.name {
            plan = plan.then(cascade::rename_actor(
                id,
                &actor.name,
                &new_name,
                &actor.movies,
            ));
        }
        if let Some(dob) = &request.dob {
            plan = plan.update_one(
                ACTORS,
                doc! { "_id": id },
                doc! { "$set": { "dob": dob.as_str() } },
            );
        }
        if let Some(desired) = &desired {
            plan = plan.then(cascade::replace_actor_movies(
                id,
                &new_name,
                &actor.movies,
                desired,
            ));
        }

        self.apply(&plan).await?;
        self.get_actor(id).await
    }

    pub async fn delete_actor(&self, id: ObjectId) -> Result<(), AppError> {
        let actor = self.get_actor(id).await?;
        self.apply(&cascade::delete_actor(id, &actor.name, &actor.movies))
            .await?;
        tracing::info!(actor = %actor.name, "Actor deleted");
        Ok(())
    }
}
