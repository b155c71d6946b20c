use color_eyre::eyre::{Context as _, eyre};
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::config::AppConfig;
use crate::game_service::GameService;
use crate::models::{PgScoreBoard, PgSessionStore};

pub type PgGameService = GameService<PgSessionStore, PgScoreBoard>;

#[tracing::instrument(skip(database_url), err)]
pub async fn setup_db_pool(database_url: &str) -> color_eyre::Result<PgPool> {
    const MIGRATION_LOCK_ID: i64 = 0x5A_4A_4E_5A_4A_4E_5A;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .wrap_err("Failed to connect to database")?;

    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(&pool)
        .await?;

    let migrated = sqlx::migrate!("../migrations").run(&pool).await;

    let unlocked: Option<bool> = sqlx::query_scalar("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_ID)
        .fetch_one(&pool)
        .await?;

    migrated.wrap_err("Failed to run migrations")?;

    match unlocked {
        Some(true) => tracing::info!("Migration lock unlocked"),
        Some(false) => tracing::info!("Failed to unlock migration lock"),
        None => return Err(eyre!("Failed to unlock migration lock")),
    }

    Ok(pool)
}

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: AppConfig,
}

impl AppState {
    pub async fn from_config(config: AppConfig) -> color_eyre::Result<Self> {
        let database_url = config
            .database_url
            .clone()
            .ok_or_else(|| eyre!("DATABASE_URL must be set"))?;
        let db = setup_db_pool(&database_url).await?;

        Ok(Self { db, config })
    }

    pub fn game_service(&self) -> color_eyre::Result<PgGameService> {
        let service = GameService::new(
            &self.config,
            PgSessionStore::new(self.db.clone()),
            PgScoreBoard::new(self.db.clone()),
        )?;
        Ok(service)
    }
}
