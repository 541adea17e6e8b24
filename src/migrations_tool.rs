use sqlx::Row;

use chirp::application::error::AppError;
use chirp::config::DatabaseSettings;
use chirp::infra::{db::PostgresRepositories, error::InfraError};
use tracing::info;

/// Apply pending migrations and report the resulting schema version.
pub async fn run(database: &DatabaseSettings) -> Result<(), AppError> {
    let database_url = database.url.as_deref().ok_or_else(|| {
        AppError::validation(
            "database url is required (provide --database-url or set CHIRP__DATABASE__URL)",
        )
    })?;

    let pool = PostgresRepositories::connect(database_url, 1)
        .await
        .map_err(InfraError::from)?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;

    let latest: Option<i64> = sqlx::query("SELECT MAX(version) AS version FROM _sqlx_migrations")
        .fetch_one(&pool)
        .await
        .and_then(|row| row.try_get("version"))
        .map_err(InfraError::from)?;

    info!(
        target = "chirp::migrate",
        version = latest.unwrap_or_default(),
        "Migrations applied"
    );

    pool.close().await;
    Ok(())
}
