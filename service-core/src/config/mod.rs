use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::env;

/// Settings shared by every service: the HTTP port and deployment flavour.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_port() -> u16 {
    8080
}

fn default_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string())
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn is_prod(&self) -> bool {
        self.environment == "prod"
    }
}

/// Reads a service variable, trying each name in `keys` in order.
///
/// In production every variable must be set explicitly; elsewhere `default`
/// is used when present.
pub fn get_env(keys: &[&str], default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    if let Some(val) = keys.iter().find_map(|k| env::var(k).ok()) {
        return Ok(val);
    }

    let key = keys.first().copied().unwrap_or("<unnamed>");
    if is_prod {
        Err(AppError::ConfigError(anyhow::anyhow!(
            "{} is required in production but not set",
            key
        )))
    } else if let Some(def) = default {
        Ok(def.to_string())
    } else {
        Err(AppError::ConfigError(anyhow::anyhow!(
            "{} is required but not set",
            key
        )))
    }
}

/// Parses a boolean-ish variable (`true`/`false`/`1`/`0`), defaulting on absence.
pub fn get_bool(key: &str, default: bool) -> Result<bool, AppError> {
    match env::var(key) {
        Ok(val) => parse_bool(&val).ok_or_else(|| {
            AppError::ConfigError(anyhow::anyhow!("{} must be a boolean, got '{}'", key, val))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
