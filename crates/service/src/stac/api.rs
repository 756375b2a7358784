use std::time::Duration;

use async_trait::async_trait;
use configs::StacConfig;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use super::retry::{retry_with_policy, RetryPolicy};
use super::{ItemQuery, StacBackend, StacError};

/// Stop following `rel="next"` links after this many collection pages.
const MAX_COLLECTION_PAGES: usize = 100;

/// STAC API client over HTTP.
pub struct StacApiBackend {
    root: String,
    client: Client,
    policy: RetryPolicy,
}

impl StacApiBackend {
    /// Build the client and check the landing page answers.
    pub async fn open(url: &str, cfg: &StacConfig) -> Result<Self, StacError> {
        let root = url.trim().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| StacError::Transport { url: root.clone(), reason: e.to_string() })?;
        let backend = Self { root, client, policy: RetryPolicy::from_config(cfg) };

        let landing = backend.fetch(&format!("{}/", backend.root)).await?;
        if !landing.is_object() {
            return Err(StacError::Decode { url: backend.root.clone(), reason: "landing page is not an object".into() });
        }
        debug!(stac_url = %backend.root, id = ?landing.get("id"), "stac landing page fetched");
        Ok(backend)
    }

    async fn fetch(&self, url: &str) -> Result<Value, StacError> {
        retry_with_policy(&self.policy, || self.fetch_once(url)).await
    }

    async fn fetch_once(&self, url: &str) -> Result<Value, StacError> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| StacError::Transport { url: url.to_string(), reason: e.to_string() })?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StacError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(StacError::Status { status: status.as_u16(), url: url.to_string() });
        }
        resp.json::<Value>()
            .await
            .map_err(|e| StacError::Decode { url: url.to_string(), reason: e.to_string() })
    }
}

fn array_field(doc: &mut Value, field: &str, url: &str) -> Result<Vec<Value>, StacError> {
    match doc.get_mut(field).map(Value::take) {
        Some(Value::Array(values)) => Ok(values),
        _ => Err(StacError::Decode { url: url.to_string(), reason: format!("missing `{field}` array") }),
    }
}

fn next_link(doc: &Value) -> Option<String> {
    doc.get("links")?
        .as_array()?
        .iter()
        .find(|link| link.get("rel").and_then(Value::as_str) == Some("next"))?
        .get("href")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl StacBackend for StacApiBackend {
    async fn get_collections(&self) -> Result<Vec<Value>, StacError> {
        let mut url = format!("{}/collections", self.root);
        let mut collections = Vec::new();
        for page in 1..=MAX_COLLECTION_PAGES {
            let mut doc = self.fetch(&url).await?;
            collections.extend(array_field(&mut doc, "collections", &url)?);
            match next_link(&doc) {
                Some(next) if next != url => url = next,
                _ => break,
            }
            if page == MAX_COLLECTION_PAGES {
                debug!(stac_url = %self.root, pages = page, "collection paging bound reached");
            }
        }
        Ok(collections)
    }

    async fn get_collection(&self, collection_id: &str) -> Result<Value, StacError> {
        let url = format!("{}/collections/{collection_id}", self.root);
        match self.fetch(&url).await {
            Err(StacError::NotFound(_)) => Err(StacError::NotFound(collection_id.to_string())),
            other => other,
        }
    }

    async fn get_items(&self, query: &ItemQuery) -> Result<Vec<Value>, StacError> {
        let mut url = format!("{}/collections/{}/items", self.root, query.collection_id);
        if let Some(limit) = query.limit {
            url.push_str(&format!("?limit={limit}"));
        }
        let mut doc = match self.fetch(&url).await {
            Err(StacError::NotFound(_)) => return Err(StacError::NotFound(query.collection_id.clone())),
            other => other?,
        };
        array_field(&mut doc, "features", &url)
    }
}
