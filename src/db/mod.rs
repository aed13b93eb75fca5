pub mod schema;

use std::sync::Arc;

use anyhow::Context;
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct Db {
    pub pool: Arc<AnyPool>,
}

impl Db {
    /// Connects with the configured pool size and brings the schema up to
    /// date. The schema statements are idempotent, so every instance runs
    /// them at startup.
    pub async fn connect_and_migrate(cfg: &AppConfig) -> anyhow::Result<Self> {
        let pool = AnyPoolOptions::new()
            .max_connections(cfg.db_max_connections)
            .connect(&cfg.database_url)
            .await
            .context("connecting to database")?;

        schema::migrate(&pool).await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}
