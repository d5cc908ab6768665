//! Database migrations.
//!
//! Reads `ORDER_DESK_DATABASE_URL`, falling back to `DATABASE_URL`, and
//! applies `crates/api/migrations/` through the API's embedded migrator.

use secrecy::{ExposeSecret, SecretString};

use super::CommandError;

/// Apply pending migrations.
pub async fn run() -> Result<(), CommandError> {
    dotenvy::dotenv().ok();

    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = sqlx::PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running migrations...");
    order_desk_api::db::MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete");
    Ok(())
}

fn database_url() -> Result<SecretString, CommandError> {
    ["ORDER_DESK_DATABASE_URL", "DATABASE_URL"]
        .into_iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
        .map(SecretString::from)
        .ok_or(CommandError::MissingEnvVar("ORDER_DESK_DATABASE_URL"))
}
