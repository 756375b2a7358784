//! Application state owned by the process between startup and shutdown.

use std::sync::Arc;

use anyhow::Context;
use configs::AppConfig;
use tracing::info;

use crate::stac::StacHandle;
use crate::store::{open_location, ServiceStore, StoreLocation};

/// Handles shared with the (external) routing layer.
pub struct AppState {
    pub store: Arc<dyn ServiceStore>,
    pub stac: Option<StacHandle>,
}

impl AppState {
    /// Open the configured service store and, when configured, the STAC client.
    pub async fn start(cfg: &AppConfig) -> anyhow::Result<Self> {
        let location = StoreLocation::parse(&cfg.store.url)?;
        if let Some(path) = &location.path {
            common::env::ensure_parent_dir(path).await?;
        }
        let store = open_location(&location).await?;
        let stac = StacHandle::acquire(&cfg.stac)
            .await
            .context("acquire stac client")?;
        info!(backend = %store.kind(), stac = stac.is_some(), "application state ready");
        Ok(Self { store, stac })
    }

    pub async fn shutdown(self) {
        if let Some(stac) = self.stac {
            stac.release();
        }
        info!(backend = %self.store.kind(), "application state released");
    }
}
