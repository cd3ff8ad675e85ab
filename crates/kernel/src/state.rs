//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;
use crate::content::{
    BlockService, ContentStore, DocumentService, MemoryContentStore, PgContentStore,
};
use crate::db;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// PostgreSQL connection pool, when configured.
    db: Option<PgPool>,

    blocks: BlockService,

    documents: DocumentService,

    /// Public site URL, without trailing slash.
    site_url: String,
}

impl AppState {
    /// Build state from configuration.
    ///
    /// Connects to PostgreSQL when `DATABASE_URL` is set, otherwise keeps
    /// content in memory.
    pub async fn new(config: &Config) -> Result<Self> {
        match &config.database_url {
            Some(url) => {
                let pool = db::create_pool(url, config.database_max_connections)
                    .await
                    .context("failed to create database pool")?;
                info!("Connected to PostgreSQL");
                let store: Arc<dyn ContentStore> = Arc::new(PgContentStore::new(pool.clone()));
                Ok(Self::build(store, Some(pool), config.site_url.clone()))
            }
            None => {
                info!("DATABASE_URL not set, using in-memory content store");
                Ok(Self::with_store(
                    Arc::new(MemoryContentStore::new()),
                    config.site_url.clone(),
                ))
            }
        }
    }

    /// Build state around an existing store with no database pool.
    pub fn with_store(store: Arc<dyn ContentStore>, site_url: impl Into<String>) -> Self {
        Self::build(store, None, site_url.into())
    }

    fn build(store: Arc<dyn ContentStore>, db: Option<PgPool>, site_url: String) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                db,
                blocks: BlockService::new(store.clone()),
                documents: DocumentService::new(store),
                site_url,
            }),
        }
    }

    pub fn blocks(&self) -> &BlockService {
        &self.inner.blocks
    }

    pub fn documents(&self) -> &DocumentService {
        &self.inner.documents
    }

    pub fn site_url(&self) -> &str {
        &self.inner.site_url
    }

    /// Whether the database is reachable. Always true for the memory store.
    pub async fn postgres_healthy(&self) -> bool {
        match &self.inner.db {
            Some(pool) => db::check_health(pool).await,
            None => true,
        }
    }

    /// Storage backend name, for health output.
    pub fn storage_backend(&self) -> &'static str {
        if self.inner.db.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }
}
