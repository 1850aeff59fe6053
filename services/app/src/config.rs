//! services/app/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The
//! `.env` file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Base URL of the hosted realtime database, without a trailing slash.
    pub database_url: String,
    /// Base URL of the hosted blob storage bucket, without a trailing slash.
    pub storage_bucket_url: String,
    pub log_level: Level,
    /// Origin allowed by the CORS layer (the browser front end).
    pub allowed_origin: String,
    // Identity provider endpoints. Overridable so tests can point the
    // adapter at a local stub server.
    pub google_userinfo_url: String,
    pub google_revoke_url: String,
    pub facebook_userinfo_url: String,
    pub facebook_revoke_url: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for
    /// development, but this is skipped in test environments to ensure tests
    /// are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let storage_bucket_url = std::env::var("STORAGE_BUCKET_URL")
            .map_err(|_| ConfigError::MissingVar("STORAGE_BUCKET_URL".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let allowed_origin = std::env::var("ALLOWED_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());

        let google_userinfo_url = std::env::var("GOOGLE_USERINFO_URL")
            .unwrap_or_else(|_| "https://openidconnect.googleapis.com/v1/userinfo".to_string());
        let google_revoke_url = std::env::var("GOOGLE_REVOKE_URL")
            .unwrap_or_else(|_| "https://oauth2.googleapis.com/revoke".to_string());
        let facebook_userinfo_url = std::env::var("FACEBOOK_USERINFO_URL")
            .unwrap_or_else(|_| "https://graph.facebook.com/me".to_string());
        let facebook_revoke_url = std::env::var("FACEBOOK_REVOKE_URL")
            .unwrap_or_else(|_| "https://graph.facebook.com/me/permissions".to_string());

        Ok(Self {
            bind_address,
            database_url,
            storage_bucket_url,
            log_level,
            allowed_origin,
            google_userinfo_url,
            google_revoke_url,
            facebook_userinfo_url,
            facebook_revoke_url,
        })
    }
}
