use crate::config::MovieDataConfig;
use crate::handlers::{self, actors, images, movies, ratings, reviews, tags};
use crate::services::{AuthClient, MovieDb, SessionResolver};
use axum::{
    middleware::from_fn,
    routing::{get, patch, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics::metrics_middleware, tracing::request_id_middleware};
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: MovieDataConfig,
    pub db: MovieDb,
    pub sessions: Arc<dyn SessionResolver>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/movies", post(movies::create_movie).get(movies::search_movies))
        .route("/movies/recent", get(movies::recent_movies))
        .route("/movies/most-reviewed", get(movies::most_reviewed_movies))
        .route(
            "/movies/:id",
            get(movies::get_movie)
                .patch(movies::update_movie)
                .delete(movies::delete_movie),
        )
        .route("/movies/:id/image", get(images::movie_image))
        .route("/movies/:id/tags", post(tags::tag_movie))
        .route(
            "/movies/:id/tags/:tag_name",
            axum::routing::delete(tags::untag_movie),
        )
        .route("/movies/:id/ratings", post(ratings::create_rating))
        .route("/movies/:id/ratings/summary", get(movies::rating_summary))
        .route(
            "/movies/:id/ratings/:rating_name",
            put(ratings::update_rating).delete(ratings::delete_rating),
        )
        .route(
            "/movies/:id/reviews",
            post(reviews::create_review).get(reviews::movie_reviews),
        )
        .route("/tags/:tag_name", get(tags::get_tag).delete(tags::delete_tag))
        .route("/actors", post(actors::create_actor).get(actors::find_actors))
        .route(
            "/actors/:id",
            get(actors::get_actor)
                .patch(actors::update_actor)
                .delete(actors::delete_actor),
        )
        .route("/ratings/me", get(ratings::my_ratings))
        .route(
            "/ratings/categories/:rating_name",
            get(ratings::category_ratings).patch(ratings::rename_category),
        )
        .route("/reviews/me", get(reviews::my_reviews))
        .route(
            "/reviews/:id",
            patch(reviews::update_review).delete(reviews::delete_review),
        )
        .route("/admin/stock-images", post(images::load_stock_images))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

pub struct Application {
    port: u16,
    server: Box<dyn Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    /// Connects to MongoDB and the auth service described by `config`.
    pub async fn build(config: MovieDataConfig) -> Result<Self, AppError> {
        let sessions: Arc<dyn SessionResolver> = Arc::new(AuthClient::new(&config.auth)?);
        Self::build_with_sessions(config, sessions).await
    }

    /// Like [`Application::build`] with a caller-supplied session resolver.
    pub async fn build_with_sessions(
        config: MovieDataConfig,
        sessions: Arc<dyn SessionResolver>,
    ) -> Result<Self, AppError> {
        let db = MovieDb::connect(
            &config.mongodb.uri,
            &config.mongodb.database,
            config.mongodb.transactions,
        )
        .await?;
        db.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let state = AppState {
            config: config.clone(),
            db,
            sessions,
        };
        let app = build_router(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn db(&self) -> &MovieDb {
        &self.state.db
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
