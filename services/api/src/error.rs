//! services/api/src/error.rs
//!
//! Failures that stop the server from starting or keep it from serving.
//! Request-level failures never reach this type; handlers map them to
//! JSON error bodies in `web::errors`.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Connecting to Postgres failed.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Schema migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// `CORS_ORIGIN` is not a valid header value.
    #[error("Invalid CORS origin '{origin}': {reason}")]
    CorsOrigin { origin: String, reason: String },

    /// Binding the listener or serving connections failed.
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
