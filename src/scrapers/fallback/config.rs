//! Fallback manager configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Archive or cache service queried when the live site cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Internet Archive availability API, then the closest snapshot.
    Wayback,
    /// Search-engine page cache.
    Cache,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wayback => "wayback",
            Self::Cache => "cache",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeSourceConfig {
    pub kind: SourceKind,
    pub base_url: String,
    /// Lower runs first.
    #[serde(default)]
    pub priority: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_sources() -> Vec<AlternativeSourceConfig> {
    vec![
        AlternativeSourceConfig {
            kind: SourceKind::Wayback,
            base_url: "https://archive.org".to_string(),
            priority: 1,
            enabled: true,
        },
        AlternativeSourceConfig {
            kind: SourceKind::Cache,
            base_url: "https://webcache.googleusercontent.com".to_string(),
            priority: 2,
            enabled: true,
        },
    ]
}

/// Fallback behaviour. Runtime changes go through
/// `FallbackManager::update_config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub enable_user_agent_rotation: bool,
    pub enable_header_customization: bool,
    /// Also requires a non-empty proxy pool.
    pub enable_proxy_rotation: bool,
    pub enable_alternative_sources: bool,
    /// Wall-clock budget for a whole fallback run, in seconds.
    pub timeout: u64,
    /// Pause between attempts, in milliseconds.
    pub attempt_delay_ms: u64,
    /// Cap on attempts per rotation kind.
    pub max_attempts_per_kind: usize,
    /// Rotation pool; empty means the built-in browser list.
    pub user_agents: Vec<String>,
    pub proxies: Vec<String>,
    pub sources: Vec<AlternativeSourceConfig>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enable_user_agent_rotation: true,
            enable_header_customization: true,
            enable_proxy_rotation: false,
            enable_alternative_sources: true,
            timeout: 10,
            attempt_delay_ms: 250,
            max_attempts_per_kind: 3,
            user_agents: Vec::new(),
            proxies: Vec::new(),
            sources: default_sources(),
        }
    }
}

impl FallbackConfig {
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn attempt_delay(&self) -> Duration {
        Duration::from_millis(self.attempt_delay_ms)
    }

    /// Enabled sources, lowest priority value first.
    pub fn ordered_sources(&self) -> Vec<AlternativeSourceConfig> {
        let mut sources: Vec<_> = self.sources.iter().filter(|s| s.enabled).cloned().collect();
        sources.sort_by_key(|s| s.priority);
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FallbackConfig::default();
        assert_eq!(config.timeout_duration(), Duration::from_secs(10));
        assert!(!config.enable_proxy_rotation);
        let order: Vec<_> = config.ordered_sources().iter().map(|s| s.kind).collect();
        assert_eq!(order, vec![SourceKind::Wayback, SourceKind::Cache]);
    }

    #[test]
    fn test_partial_toml() {
        let config: FallbackConfig = toml::from_str(
            r#"
            enable_proxy_rotation = true
            proxies = ["socks5://127.0.0.1:9050"]

            [[sources]]
            kind = "cache"
            base_url = "https://cache.example"
            priority = 0

            [[sources]]
            kind = "wayback"
            base_url = "https://archive.example"
            priority = 5
            enabled = false
            "#,
        )
        .unwrap();
        assert!(config.enable_proxy_rotation);
        assert_eq!(config.timeout, 10);
        let ordered = config.ordered_sources();
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].kind, SourceKind::Cache);
    }
}
