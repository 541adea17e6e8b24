use sqlx::migrate::MigrateError;
use thiserror::Error;

/// Failures while wiring up infrastructure at startup.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database unavailable: {0}")]
    Database(#[from] sqlx::Error),
    #[error("schema migration failed: {0}")]
    Migration(#[from] MigrateError),
    #[error("identity client could not be built: {0}")]
    IdentityClient(#[from] reqwest::Error),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("`{key}` is misconfigured: {reason}")]
    Configuration { key: &'static str, reason: String },
}

impl InfraError {
    pub fn configuration(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            key,
            reason: reason.into(),
        }
    }

    pub fn missing(key: &'static str) -> Self {
        Self::configuration(key, "required but not set")
    }
}
