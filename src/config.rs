//! Configuration management for SiteAcquire using the prefer crate.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::scrapers::fallback::FallbackConfig;
use crate::scrapers::http_client::{resolve_user_agent, HttpClientConfig, DEFAULT_MAX_RESPONSE_SIZE};
use crate::scrapers::strategies::{DEFAULT_FAST_SCRAPE_TIMEOUT, DEFAULT_RENDER_TIMEOUT};
use crate::scrapers::DEFAULT_MAX_CONCURRENCY;

/// Base URL of the headless render service.
pub const RENDER_SERVICE_URL_ENV: &str = "RENDER_SERVICE_URL";
/// Base URL of the fast-scrape service.
pub const FAST_SCRAPE_URL_ENV: &str = "FAST_SCRAPE_URL";
/// Comma-separated proxy URLs appended to the fallback pool.
pub const PROXIES_ENV: &str = "SITEACQUIRE_PROXIES";

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base per-request timeout.
    pub request_timeout: Duration,
    /// Retries for the legacy fetch loop.
    pub max_retries: u32,
    pub max_redirects: usize,
    /// `None` for the default browser UA, `"impersonate"` for a random pool
    /// member, anything else is sent verbatim.
    pub user_agent: Option<String>,
    pub verify_tls: bool,
    pub max_response_size: u64,
    /// Fixed delay for the legacy retry loop.
    pub retry_delay: Duration,
    pub max_concurrency: usize,
    pub render_service_url: Option<String>,
    pub render_timeout: Duration,
    pub fast_scrape_url: Option<String>,
    pub fast_scrape_timeout: Duration,
    pub fallback: FallbackConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            max_redirects: 10,
            user_agent: None,
            verify_tls: true,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            retry_delay: Duration::from_secs(1),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            render_service_url: None,
            render_timeout: DEFAULT_RENDER_TIMEOUT,
            fast_scrape_url: None,
            fast_scrape_timeout: DEFAULT_FAST_SCRAPE_TIMEOUT,
            fallback: FallbackConfig::default(),
        }
    }
}

impl Settings {
    /// Transport settings shared by every strategy's HTTP client.
    pub fn http_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: self.request_timeout,
            max_redirects: self.max_redirects,
            user_agent: resolve_user_agent(self.user_agent.as_deref()),
            verify_tls: self.verify_tls,
            max_response_size: self.max_response_size,
        }
    }

    /// Apply environment overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(RENDER_SERVICE_URL_ENV) {
            self.render_service_url = Some(url.trim().to_string());
        }
        if let Some(url) = get(FAST_SCRAPE_URL_ENV) {
            self.fast_scrape_url = Some(url.trim().to_string());
        }
        if let Some(list) = get(PROXIES_ENV) {
            for proxy in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                if !self.fallback.proxies.iter().any(|p| p == proxy) {
                    self.fallback.proxies.push(proxy.to_string());
                }
            }
        }
        self
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Base request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_redirects: Option<usize>,
    /// User agent string, or `"impersonate"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_tls: Option<bool>,
    /// Body size ceiling in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_response_size: Option<u64>,
    /// Legacy retry delay in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_service_url: Option<String>,
    /// Render timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fast_scrape_url: Option<String>,
    /// Fast-scrape timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fast_scrape_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackConfig>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer for discovery.
    /// Falls back to defaults when no file is found or it fails to parse.
    pub async fn load() -> Self {
        match prefer::load("siteacquire").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Ignoring config file");
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// The format is chosen by extension: TOML, YAML, or JSON otherwise.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let path = resolve_path(path);
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        debug!(path = %path.display(), "Loaded config file");
        config.source_path = Some(path);
        Ok(config)
    }

    /// Apply file values on top of `settings`.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = Duration::from_secs(timeout);
        }
        if let Some(retries) = self.max_retries {
            settings.max_retries = retries;
        }
        if let Some(redirects) = self.max_redirects {
            settings.max_redirects = redirects;
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = Some(user_agent.clone());
        }
        if let Some(verify) = self.verify_tls {
            settings.verify_tls = verify;
        }
        if let Some(size) = self.max_response_size {
            settings.max_response_size = size;
        }
        if let Some(delay) = self.retry_delay_ms {
            settings.retry_delay = Duration::from_millis(delay);
        }
        if let Some(concurrency) = self.max_concurrency {
            settings.max_concurrency = concurrency.max(1);
        }
        if let Some(ref url) = self.render_service_url {
            settings.render_service_url = Some(url.clone());
        }
        if let Some(timeout) = self.render_timeout {
            settings.render_timeout = Duration::from_secs(timeout);
        }
        if let Some(ref url) = self.fast_scrape_url {
            settings.fast_scrape_url = Some(url.clone());
        }
        if let Some(timeout) = self.fast_scrape_timeout {
            settings.fast_scrape_timeout = Duration::from_secs(timeout);
        }
        if let Some(ref fallback) = self.fallback {
            settings.fallback = fallback.clone();
        }
    }

    /// Resolved settings: defaults, then file values, then environment.
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        self.apply_to_settings(&mut settings);
        settings.with_env_overrides()
    }
}

/// Expand `~` in a user-supplied path.
fn resolve_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).as_ref()),
        None => path.to_path_buf(),
    }
}

/// Load settings from an explicit path, or discover a config file.
pub async fn load_settings(path: Option<&Path>) -> Result<Settings, String> {
    let config = match path {
        Some(path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };
    Ok(config.settings())
}
