use std::{str::FromStr, sync::Arc};

use anyhow::Context;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::auth::identity::{GoogleIdentityVerifier, IdentityVerifier};
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub identity: Arc<dyn IdentityVerifier>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let options = SqliteConnectOptions::from_str(&config.database_url)
            .with_context(|| format!("parse DATABASE_URL {}", config.database_url))?
            .create_if_missing(true)
            .foreign_keys(true);
        let db = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("connect to database")?;

        let identity = Arc::new(GoogleIdentityVerifier::new(
            config.google.client_id.clone(),
            config.google.jwks_url.clone(),
        )?) as Arc<dyn IdentityVerifier>;

        Ok(Self {
            db,
            config,
            identity,
        })
    }

    pub fn from_parts(
        db: SqlitePool,
        config: Arc<AppConfig>,
        identity: Arc<dyn IdentityVerifier>,
    ) -> Self {
        Self {
            db,
            config,
            identity,
        }
    }
}
