//! STAC catalog collaborator.
//!
//! The service store does not depend on this module. It exists so the
//! application state can own a STAC client for the lifetime of the process.

pub mod api;
pub mod retry;

use std::sync::Arc;

use async_trait::async_trait;
use configs::StacConfig;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

pub use api::StacApiBackend;
use retry::Retryable;

#[derive(Debug, Error)]
pub enum StacError {
    #[error("stac resource not found: {0}")]
    NotFound(String),
    #[error("stac api returned HTTP {status} for {url}")]
    Status { status: u16, url: String },
    #[error("stac request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("invalid stac response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl Retryable for StacError {
    /// Connection failures, timeouts, 429 and 5xx.
    fn is_retryable(&self) -> bool {
        match self {
            StacError::Transport { .. } => true,
            StacError::Status { status, .. } => *status == 429 || *status >= 500,
            StacError::NotFound(_) | StacError::Decode { .. } => false,
        }
    }
}

/// Item search parameters.
#[derive(Debug, Clone)]
pub struct ItemQuery {
    pub collection_id: String,
    pub limit: Option<u32>,
}

impl ItemQuery {
    pub fn new(collection_id: impl Into<String>) -> Self {
        Self { collection_id: collection_id.into(), limit: None }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[async_trait]
pub trait StacBackend: Send + Sync {
    async fn get_collections(&self) -> Result<Vec<Value>, StacError>;

    async fn get_collection(&self, collection_id: &str) -> Result<Value, StacError>;

    async fn get_items(&self, query: &ItemQuery) -> Result<Vec<Value>, StacError>;
}

/// STAC client owned by the application state between startup and shutdown.
pub struct StacHandle {
    url: String,
    backend: Arc<dyn StacBackend>,
}

impl StacHandle {
    /// Acquire a client when `api_url` is configured; `Ok(None)` otherwise.
    pub async fn acquire(cfg: &StacConfig) -> Result<Option<Self>, StacError> {
        let Some(url) = cfg.api_url.as_deref() else {
            return Ok(None);
        };
        let backend = StacApiBackend::open(url, cfg).await?;
        info!(stac_url = url, "stac client acquired");
        Ok(Some(Self { url: url.to_string(), backend: Arc::new(backend) }))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn backend(&self) -> Arc<dyn StacBackend> {
        Arc::clone(&self.backend)
    }

    pub fn release(self) {
        info!(stac_url = %self.url, "stac client released");
    }
}
