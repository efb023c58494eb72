pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use anyhow::Result;
use std::sync::Arc;

use crate::app::auth::AuthService;
use crate::config::{AppConfig, StoreBackend};
use crate::infra::db::Db;
use crate::infra::store::{Collection, MemoryCollection, PgCollection};

#[derive(Clone)]
pub struct AppState {
    pub collection: Collection,
    pub auth: AuthService,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(collection: Collection, config: &AppConfig) -> Self {
        Self {
            collection,
            auth: AuthService::new(config.paseto_access_key, config.access_ttl_minutes),
            admin_token: config.admin_token.clone(),
        }
    }

    /// Opens the configured document store and builds the shared state around it.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let collection: Collection = match config.store_backend {
            StoreBackend::Postgres => {
                let db = Db::connect(config).await?;
                db.ensure_schema().await?;
                Arc::new(PgCollection::new(db, config.announcements_collection.clone()))
            }
            StoreBackend::Memory => Arc::new(MemoryCollection::new()),
        };
        tracing::info!(
            backend = config.store_backend.as_str(),
            collection = %config.announcements_collection,
            "document store ready"
        );

        Ok(Self::new(collection, config))
    }
}
