use color_eyre::{eyre::WrapErr, Result};
use sqlx::postgres::PgPoolOptions;

pub mod ingredients;
pub mod recipe_lists;
pub mod recipes;
pub mod shopping_list;
pub mod subscriptions;
pub mod tags;
pub mod tokens;
pub mod users;

pub use sqlx;
pub use sqlx::PgPool;

#[tracing::instrument(err)]
pub async fn setup_db_pool() -> Result<PgPool> {
    let database_url =
        std::env::var("DATABASE_URL").wrap_err("DATABASE_URL must be set to launch the app")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .wrap_err("Failed to connect to the database")?;

    const MIGRATION_LOCK_ID: i64 = 0xF0_0D_F0_0D_F0_0D_F0;
    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(&pool)
        .await?;

    sqlx::migrate!().run(&pool).await?;

    let unlocked: Option<bool> = sqlx::query_scalar("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_ID)
        .fetch_one(&pool)
        .await?;

    if unlocked == Some(true) {
        tracing::info!("Migration lock unlocked");
    } else {
        tracing::warn!("Failed to unlock migration lock");
    }

    Ok(pool)
}
