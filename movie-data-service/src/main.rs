use movie_data_service::config::MovieDataConfig;
use movie_data_service::services::metrics::init_metrics;
use movie_data_service::startup::Application;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_metrics();

    let config = MovieDataConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing("movie-data-service", "info", config.otlp_endpoint.as_deref());

    let application = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to start movie-data-service: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    application.run_until_stopped().await
}
