use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

/// Environment variable naming the service store URL.
pub const ENV_STORE_URL: &str = "OPENEO_SERVICE_STORE_URL";
/// Environment variable naming the STAC API root.
pub const ENV_STAC_API_URL: &str = "OPENEO_STAC_API_URL";
pub const ENV_STAC_RETRY: &str = "OPENEO_STAC_RETRY";
pub const ENV_STAC_RETRY_FACTOR: &str = "OPENEO_STAC_RETRY_FACTOR";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";
pub const ENV_WORKER_THREADS: &str = "TOKIO_WORKER_THREADS";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub stac: StacConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { worker_threads: Some(4) }
    }
}

/// Service store selection. The URL is resolved once at startup; see
/// `service::store::StoreLocation` for the selection rule.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_url")]
    pub url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { url: default_store_url() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StacConfig {
    /// STAC API root; the client is not acquired when unset.
    #[serde(default)]
    pub api_url: Option<String>,
    /// Retries after the first failed attempt.
    #[serde(default = "default_stac_retry")]
    pub retry: u32,
    /// Backoff factor in seconds: delay = factor * 2^(attempt - 1).
    #[serde(default)]
    pub retry_factor: f64,
    #[serde(default = "default_stac_timeout")]
    pub timeout_secs: u64,
}

impl Default for StacConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            retry: default_stac_retry(),
            retry_factor: 0.0,
            timeout_secs: default_stac_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { format: default_log_format() }
    }
}

fn default_store_url() -> String { "data/services.json".to_string() }
fn default_stac_retry() -> u32 { 3 }
fn default_stac_timeout() -> u64 { 30 }
fn default_log_format() -> String { "compact".to_string() }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`), falling back to defaults when the
    /// file is absent, then apply environment overrides and validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) => match e.downcast_ref::<std::io::Error>() {
                Some(io) if io.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
                _ => return Err(e),
            },
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.apply_env_overrides(|key| std::env::var(key).ok())?;
        self.server.normalize();
        self.store.validate()?;
        self.stac.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Overlay values from an environment lookup. Unset or blank variables are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_STORE_URL) {
            self.store.url = url;
        }
        if let Some(url) = get(ENV_STAC_API_URL) {
            self.stac.api_url = Some(url);
        }
        if let Some(retry) = get(ENV_STAC_RETRY) {
            self.stac.retry = retry
                .trim()
                .parse()
                .map_err(|_| anyhow!("{ENV_STAC_RETRY} must be a non-negative integer, got {retry:?}"))?;
        }
        if let Some(factor) = get(ENV_STAC_RETRY_FACTOR) {
            self.stac.retry_factor = factor
                .trim()
                .parse()
                .map_err(|_| anyhow!("{ENV_STAC_RETRY_FACTOR} must be a number, got {factor:?}"))?;
        }
        if let Some(format) = get(ENV_LOG_FORMAT) {
            self.logging.format = format;
        }
        if let Some(threads) = get(ENV_WORKER_THREADS) {
            self.server.worker_threads = threads.trim().parse().ok();
        }
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) {
        // 0 或未设置时回退到 4 个工作线程
        match self.worker_threads {
            Some(w) if w > 0 => {}
            _ => self.worker_threads = Some(4),
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("store.url is empty; set it in config.toml or {ENV_STORE_URL}"));
        }
        Ok(())
    }
}

impl StacConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.api_url {
            let lower = url.trim().to_lowercase();
            if !(lower.starts_with("http://") || lower.starts_with("https://")) {
                return Err(anyhow!("stac.api_url must start with http:// or https://"));
            }
        }
        if !self.retry_factor.is_finite() || self.retry_factor < 0.0 {
            return Err(anyhow!("stac.retry_factor must be a finite number >= 0"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("stac.timeout_secs must be a positive number of seconds"));
        }
        Ok(())
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<()> {
        match self.format.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" | "json" => Ok(()),
            other => Err(anyhow!("logging.format must be compact or json, got {other:?}")),
        }
    }
}
