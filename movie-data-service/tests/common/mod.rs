#![allow(dead_code)]

use movie_data_service::config::{AuthConfig, ImageConfig, MongoConfig, MovieDataConfig};
use movie_data_service::services::{MockSessionResolver, MovieDb, SessionResolver};
use movie_data_service::startup::{build_router, AppState, Application};
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use uuid::Uuid;

pub const ANA_SESSION: &str = "session-ana";
pub const BO_SESSION: &str = "session-bo";
pub const ANA: &str = "ana";
pub const BO: &str = "bo";

pub fn sessions() -> Arc<dyn SessionResolver> {
    Arc::new(
        MockSessionResolver::new()
            .with_session(ANA_SESSION, ANA)
            .with_session(BO_SESSION, BO),
    )
}

pub fn test_config(mongo_uri: &str, db_name: &str) -> MovieDataConfig {
    MovieDataConfig {
        common: CoreConfig {
            port: 0,
            environment: "test".to_string(),
        },
        mongodb: MongoConfig {
            uri: mongo_uri.to_string(),
            database: db_name.to_string(),
            transactions: false,
        },
        auth: AuthConfig {
            auth_service_url: "http://127.0.0.1:9".to_string(),
            jwt_verification_key: None,
            request_timeout_secs: 1,
        },
        images: ImageConfig {
            stock_image_dir: "images".to_string(),
            stock_image_count: 0,
        },
        otlp_endpoint: None,
    }
}

/// Router over a client that never reaches a server. Only requests that
/// are answered before any database access succeed.
pub async fn offline_router() -> axum::Router {
    let config = test_config(
        "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=100",
        "movie_offline",
    );
    let db = MovieDb::connect(&config.mongodb.uri, &config.mongodb.database, false)
        .await
        .expect("Failed to create MongoDB client");
    build_router(AppState {
        config,
        db,
        sessions: sessions(),
    })
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db: MovieDb,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(false).await
    }

    /// Runs cascade plans in transactions; needs a replica set at
    /// `MONGODB_URI`.
    pub async fn spawn_transactional() -> Self {
        Self::spawn_with(true).await
    }

    async fn spawn_with(transactions: bool) -> Self {
        let uri = std::env::var("MONGODB_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let db_name = format!("movie_test_{}", Uuid::new_v4().simple());
        let mut config = test_config(&uri, &db_name);
        config.mongodb.transactions = transactions;

        let app = Application::build_with_sessions(config, sessions())
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let db = app.db().clone();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        for _ in 0..50 {
            if client.get(format!("{}/health", address)).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            db,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn get(&self, path: &str, session: &str) -> reqwest::RequestBuilder {
        self.client.get(self.url(path)).header("x-session-id", session)
    }

    pub fn post(&self, path: &str, session: &str) -> reqwest::RequestBuilder {
        self.client.post(self.url(path)).header("x-session-id", session)
    }

    pub fn put(&self, path: &str, session: &str) -> reqwest::RequestBuilder {
        self.client.put(self.url(path)).header("x-session-id", session)
    }

    pub fn patch(&self, path: &str, session: &str) -> reqwest::RequestBuilder {
        self.client.patch(self.url(path)).header("x-session-id", session)
    }

    pub fn delete(&self, path: &str, session: &str) -> reqwest::RequestBuilder {
        self.client.delete(self.url(path)).header("x-session-id", session)
    }

    /// Creates a movie and returns its hex id.
    pub async fn create_movie(&self, title: &str) -> String {
        self.create_movie_released(title, "1984-06-08").await
    }

    pub async fn create_movie_released(&self, title: &str, release_date: &str) -> String {
        let response = self
            .post("/movies", ANA_SESSION)
            .json(&serde_json::json!({
                "title": title,
                "director": "Joe Dante",
                "releaseDate": release_date,
                "runtime": 106,
                "writers": "Chris Columbus",
                "plotSummary": "Do not feed them after midnight."
            }))
            .send()
            .await
            .expect("Failed to create movie");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let body: serde_json::Value = response.json().await.expect("Invalid movie body");
        body["id"].as_str().expect("Movie id missing").to_string()
    }

    pub async fn cleanup(&self) {
        let _ = self.db.database().drop(None).await;
    }
}
