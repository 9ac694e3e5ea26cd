use sqlx::PgPool;

/// Re-used for every unit test as well as `migrate`. `sqlx::migrate!` must
/// not be called anywhere else, or migrations get embedded twice.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

#[tracing::instrument(skip(pool))]
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
