use crate::auth::service::AuthService;
use crate::auth::token::TokenSigner;
use crate::config::AppConfig;
use crate::store::{CredentialStore, PgStore};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

/// Process-wide state, built once at startup and cloned into handlers. The
/// store is injected into the orchestrator as a trait object rather than
/// reached through any global.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        let store = Arc::new(PgStore::new(db.clone())) as Arc<dyn CredentialStore>;
        let signer = TokenSigner::new(&config.jwt.secret);
        let auth = Arc::new(AuthService::new(store, signer));

        Ok(Self { db, config, auth })
    }
}
