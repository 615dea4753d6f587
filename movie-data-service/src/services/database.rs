use crate::models::{Actor, Movie, Rating, Review, Tag, UserAssociatedRating};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    error::TRANSIENT_TRANSACTION_ERROR,
    options::{FindOptions, IndexOptions, UpdateOptions},
    Client as MongoClient, ClientSession, Collection, Database, IndexModel,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;

use super::cascade::{CascadePlan, CascadeReport, CascadeStep, WriteOp};
use super::metrics::record_cascade;

pub mod collections {
    pub const MOVIES: &str = "movies";
    pub const ACTORS: &str = "actors";
    pub const TAGS: &str = "tags";
    pub const RATINGS: &str = "ratings";
    pub const USER_ASSOCIATED_RATINGS: &str = "userAssociatedRatings";
    pub const REVIEWS: &str = "reviews";
    pub const STOCK_IMAGE_BUCKET: &str = "stockMovieImages";
}

use collections::*;

const MAX_TRANSACTION_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct MovieDb {
    client: MongoClient,
    db: Database,
    transactions: bool,
}

impl MovieDb {
    pub async fn connect(uri: &str, database: &str, transactions: bool) -> Result<Self, AppError> {
        tracing::info!(database = %database, transactions, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self {
            client,
            db,
            transactions,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn transactions_enabled(&self) -> bool {
        self.transactions
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for movie-data-service");

        let indexes: [(&str, Document, &str, bool); 9] = [
            (TAGS, doc! { "tagName": 1 }, "tag_name_idx", true),
            (MOVIES, doc! { "title": 1 }, "title_idx", false),
            (MOVIES, doc! { "releaseDate": -1 }, "release_date_idx", false),
            (ACTORS, doc! { "name": 1 }, "actor_name_idx", false),
            (RATINGS, doc! { "movieId": 1, "ratingName": 1 }, "movie_category_idx", false),
            (RATINGS, doc! { "ratingName": 1 }, "rating_name_idx", false),
            (
                USER_ASSOCIATED_RATINGS,
                doc! { "userName": 1, "movieId": 1, "ratingName": 1 },
                "user_movie_category_idx",
                true,
            ),
            (REVIEWS, doc! { "movieId": 1 }, "review_movie_idx", false),
            (REVIEWS, doc! { "userName": 1 }, "review_user_idx", false),
        ];

        for (collection, keys, name, unique) in indexes {
            let index = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(name.to_string())
                        .unique(unique)
                        .build(),
                )
                .build();

            self.db
                .collection::<Document>(collection)
                .create_index(index, None)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create {} index on {}: {}", name, collection, e);
                    AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
                })?;
        }

        tracing::info!("Successfully created all MongoDB indexes");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(())
    }

    pub fn movies(&self) -> Collection<Movie> {
        self.db.collection(MOVIES)
    }

    pub fn actors(&self) -> Collection<Actor> {
        self.db.collection(ACTORS)
    }

    pub fn tags(&self) -> Collection<Tag> {
        self.db.collection(TAGS)
    }

    pub fn ratings(&self) -> Collection<Rating> {
        self.db.collection(RATINGS)
    }

    pub fn user_associated_ratings(&self) -> Collection<UserAssociatedRating> {
        self.db.collection(USER_ASSOCIATED_RATINGS)
    }

    pub fn reviews(&self) -> Collection<Review> {
        self.db.collection(REVIEWS)
    }

    /// Runs `find` and collects every matching document.
    pub(crate) async fn find_all<T>(
        &self,
        collection: &Collection<T>,
        filter: Document,
        options: impl Into<Option<FindOptions>>,
    ) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let cursor = collection.find(filter, options).await.map_err(|e| {
            tracing::error!("Failed to query {}: {}", collection.name(), e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;

        cursor.try_collect().await.map_err(|e| {
            tracing::error!("Failed to collect {}: {}", collection.name(), e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })
    }

    /// Executes a cascade plan.
    ///
    /// With transactions enabled every step runs in one multi-document
    /// transaction, retried on transient errors. Otherwise steps run in
    /// order and execution stops at the first failure; the error carries the
    /// failing step and how many steps were already applied.
    pub async fn apply(&self, plan: &CascadePlan) -> Result<CascadeReport, AppError> {
        if plan.is_empty() {
            return Ok(CascadeReport::default());
        }

        tracing::debug!(
            plan = plan.name(),
            steps = plan.len(),
            collections = ?plan.collections(),
            "Applying cascade plan"
        );

        let result = if self.transactions {
            self.apply_in_transaction(plan).await
        } else {
            self.apply_sequentially(plan).await
        };

        match &result {
            Ok(report) => {
                record_cascade(plan.name(), "ok");
                tracing::info!(
                    plan = plan.name(),
                    matched = report.matched,
                    modified = report.modified,
                    inserted = report.inserted,
                    upserted = report.upserted,
                    deleted = report.deleted,
                    "Cascade plan applied"
                );
            }
            Err(e) => {
                record_cascade(plan.name(), "failed");
                tracing::error!(plan = plan.name(), error = %e, "Cascade plan failed");
            }
        }

        result
    }

    async fn apply_sequentially(&self, plan: &CascadePlan) -> Result<CascadeReport, AppError> {
        let mut report = CascadeReport::default();
        for (index, step) in plan.steps().iter().enumerate() {
            let step_report = self
                .run_step(step, None)
                .await
                .map_err(|e| cascade_failed(plan, index, index, false, e))?;
            report.merge(step_report);
        }
        Ok(report)
    }

    async fn apply_in_transaction(&self, plan: &CascadePlan) -> Result<CascadeReport, AppError> {
        let mut session = self.client.start_session(None).await?;
        let mut attempt = 1;

        loop {
            session.start_transaction(None).await?;

            let mut report = CascadeReport::default();
            let mut failure = None;
            for (index, step) in plan.steps().iter().enumerate() {
                match self.run_step(step, Some(&mut session)).await {
                    Ok(step_report) => report.merge(step_report),
                    Err(e) => {
                        failure = Some((index, e));
                        break;
                    }
                }
            }

            let (index, error) = match failure {
                None => match session.commit_transaction().await {
                    Ok(()) => return Ok(report),
                    Err(e) => (plan.len(), e),
                },
                Some((index, error)) => {
                    if let Err(abort) = session.abort_transaction().await {
                        tracing::warn!(plan = plan.name(), "Failed to abort transaction: {}", abort);
                    }
                    (index, error)
                }
            };

            if error.contains_label(TRANSIENT_TRANSACTION_ERROR) && attempt < MAX_TRANSACTION_ATTEMPTS {
                tracing::warn!(
                    plan = plan.name(),
                    attempt,
                    "Transient transaction error, retrying: {}",
                    error
                );
                attempt += 1;
                continue;
            }

            return Err(cascade_failed(plan, index, 0, true, error));
        }
    }

    async fn run_step(
        &self,
        step: &CascadeStep,
        session: Option<&mut ClientSession>,
    ) -> mongodb::error::Result<CascadeReport> {
        let collection = self.db.collection::<Document>(step.collection);
        let mut report = CascadeReport {
            steps: 1,
            ..Default::default()
        };

        match &step.op {
            WriteOp::InsertOne { document } => {
                match session {
                    Some(s) => collection.insert_one_with_session(document, None, s).await?,
                    None => collection.insert_one(document, None).await?,
                };
                report.inserted = 1;
            }
            WriteOp::UpdateOne {
                filter,
                update,
                upsert,
            } => {
                let options = UpdateOptions::builder().upsert(*upsert).build();
                let result = match session {
                    Some(s) => {
                        collection
                            .update_one_with_session(filter.clone(), update.clone(), options, s)
                            .await?
                    }
                    None => {
                        collection
                            .update_one(filter.clone(), update.clone(), options)
                            .await?
                    }
                };
                report.matched = result.matched_count;
                report.modified = result.modified_count;
                report.upserted = u64::from(result.upserted_id.is_some());
            }
            WriteOp::UpdateMany { filter, update } => {
                let result = match session {
                    Some(s) => {
                        collection
                            .update_many_with_session(filter.clone(), update.clone(), None, s)
                            .await?
                    }
                    None => {
                        collection
                            .update_many(filter.clone(), update.clone(), None)
                            .await?
                    }
                };
                report.matched = result.matched_count;
                report.modified = result.modified_count;
            }
            WriteOp::DeleteOne { filter } => {
                let result = match session {
                    Some(s) => {
                        collection
                            .delete_one_with_session(filter.clone(), None, s)
                            .await?
                    }
                    None => collection.delete_one(filter.clone(), None).await?,
                };
                report.deleted = result.deleted_count;
            }
            WriteOp::DeleteMany { filter } => {
                let result = match session {
                    Some(s) => {
                        collection
                            .delete_many_with_session(filter.clone(), None, s)
                            .await?
                    }
                    None => collection.delete_many(filter.clone(), None).await?,
                };
                report.deleted = result.deleted_count;
            }
        }

        Ok(report)
    }
}

fn cascade_failed(
    plan: &CascadePlan,
    step: usize,
    applied: usize,
    transactional: bool,
    error: mongodb::error::Error,
) -> AppError {
    let collection = plan
        .steps()
        .get(step)
        .map(|s| format!("{} {}", s.op.kind(), s.collection))
        .unwrap_or_else(|| "commit".to_string());
    AppError::CascadeFailed {
        plan: plan.name().to_string(),
        step,
        applied,
        transactional,
        source: anyhow::anyhow!("{}: {}", collection, error),
    }
}

/// Parses a 24-character hex id.
pub fn parse_object_id(id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id).map_err(AppError::from)
}
