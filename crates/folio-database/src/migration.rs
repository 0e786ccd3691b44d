//! Registry schema migrations.

use sqlx::PgPool;
use tracing::info;

use folio_core::error::{AppError, ErrorKind};
use folio_core::result::AppResult;

/// Apply every migration under `migrations/` that has not run yet.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Registry migration failed: {e}"),
                e,
            )
        })?;

    info!("Registry schema is up to date");
    Ok(())
}
