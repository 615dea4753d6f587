use secrecy::Secret;
use service_core::config::{self as core_config, get_bool, get_env};
use service_core::error::AppError;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MovieDataConfig {
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub auth: AuthConfig,
    pub images: ImageConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    /// Run cascade plans inside multi-document transactions (replica set only).
    pub transactions: bool,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Base URL of the auth service that exchanges session ids for JWTs.
    pub auth_service_url: String,
    /// HS256 secret or RS256 public key PEM. Unset means tokens from the auth
    /// service are trusted without signature verification.
    pub jwt_verification_key: Option<Secret<String>>,
    pub request_timeout_secs: u64,
}

impl AuthConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub stock_image_dir: String,
    pub stock_image_count: u32,
}

impl MovieDataConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = common.is_prod();

        let request_timeout_secs = parse_number(
            "AUTH_REQUEST_TIMEOUT_SECS",
            &get_env(&["AUTH_REQUEST_TIMEOUT_SECS"], Some("5"), false)?,
        )?;
        let stock_image_count = parse_number(
            "STOCK_IMAGE_COUNT",
            &get_env(&["STOCK_IMAGE_COUNT"], Some("3"), false)?,
        )?;

        Ok(MovieDataConfig {
            common,
            mongodb: MongoConfig {
                uri: get_env(&["MONGODB_URI", "MONGO_MOVIE_URL"], None, is_prod)?,
                database: get_env(
                    &["MONGODB_DATABASE", "MONGO_MOVIE_DATABASE_NAME"],
                    Some("movie_db"),
                    is_prod,
                )?,
                transactions: get_bool("MONGODB_TRANSACTIONS", false)?,
            },
            auth: AuthConfig {
                auth_service_url: get_env(
                    &["AUTH_SERVICE_URL"],
                    Some("http://localhost:9080"),
                    is_prod,
                )?
                .trim_end_matches('/')
                .to_string(),
                jwt_verification_key: env::var("AUTH_JWT_VERIFICATION_KEY")
                    .ok()
                    .filter(|k| !k.is_empty())
                    .map(Secret::new),
                request_timeout_secs,
            },
            images: ImageConfig {
                stock_image_dir: get_env(&["STOCK_IMAGE_DIR"], Some("images"), false)?,
                stock_image_count,
            },
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|e| !e.is_empty()),
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, AppError> {
    raw.trim().parse().map_err(|_| {
        AppError::ConfigError(anyhow::anyhow!("{} must be a number, got '{}'", key, raw))
    })
}
