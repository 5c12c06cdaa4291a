//! Second-tier recovery after every primary strategy has failed.
//!
//! Attempts run one at a time in a fixed order: user-agent rotation (shuffled
//! pool), header templates, proxies, then alternative sources by priority.
//! One wall-clock budget covers the whole run; once it is spent the rest of
//! the queue is dropped. Content comes back raw; extraction is left to the
//! caller (see `RawContent::into_scraped`).

mod config;
mod sources;

pub use config::{AlternativeSourceConfig, FallbackConfig, SourceKind};
pub use sources::fetch_from_source;

use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::budget::budget_for;
use super::escalation::normalize_url;
use super::http_client::{
    browser_headers, default_pool, shuffled, FetchedPage, HeaderTemplate, HttpClient,
    HttpClientConfig, RequestOptions, HEADER_TEMPLATES,
};
use super::strategies::StrategyKind;
use crate::context::AcquireContext;
use crate::error::{AcquireError, Result};
use crate::models::{AttemptOutcome, FallbackAttempt, FallbackKind, FallbackResult, RawContent};

/// Rotation pools. Reads (attempt planning) share the lock; mutation is
/// exclusive.
#[derive(Debug, Clone, Default)]
struct IdentityPools {
    user_agents: Vec<String>,
    proxies: Vec<String>,
}

impl IdentityPools {
    fn from_config(config: &FallbackConfig) -> Self {
        let user_agents = if config.user_agents.is_empty() {
            default_pool()
        } else {
            config.user_agents.clone()
        };
        let mut proxies = Vec::new();
        for proxy in &config.proxies {
            if !proxies.contains(proxy) {
                proxies.push(proxy.clone());
            }
        }
        Self {
            user_agents,
            proxies,
        }
    }
}

#[derive(Debug, Clone)]
enum PlannedAttempt {
    UserAgent(String),
    Headers(HeaderTemplate),
    Proxy(String),
    Source(AlternativeSourceConfig),
}

impl PlannedAttempt {
    fn kind(&self) -> FallbackKind {
        match self {
            Self::UserAgent(_) => FallbackKind::UserAgentRotation,
            Self::Headers(_) => FallbackKind::HeaderCustomization,
            Self::Proxy(_) => FallbackKind::ProxyRotation,
            Self::Source(_) => FallbackKind::AlternativeSource,
        }
    }

    fn identity(&self) -> String {
        match self {
            Self::UserAgent(ua) => ua.clone(),
            Self::Headers(template) => template.name.to_string(),
            Self::Proxy(proxy) => redact_proxy(proxy),
            Self::Source(source) => format!("{} ({})", source.kind.as_str(), source.base_url),
        }
    }
}

/// Proxy URL with any password removed, for diagnostics.
fn redact_proxy(proxy: &str) -> String {
    match url::Url::parse(proxy) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        _ => proxy.to_string(),
    }
}

pub struct FallbackManager {
    http: HttpClient,
    http_config: HttpClientConfig,
    config: RwLock<FallbackConfig>,
    pools: RwLock<IdentityPools>,
}

impl FallbackManager {
    pub fn new(http_config: HttpClientConfig, config: FallbackConfig) -> Result<Self> {
        let http = HttpClient::new(http_config.clone())?;
        Ok(Self {
            http,
            http_config,
            pools: RwLock::new(IdentityPools::from_config(&config)),
            config: RwLock::new(config),
        })
    }

    pub async fn config(&self) -> FallbackConfig {
        self.config.read().await.clone()
    }

    /// Replace the configuration and reseed the rotation pools from it.
    /// Both locks are held together (config first, then pools) so a run
    /// never plans from a new config with old pools.
    pub async fn update_config(&self, config: FallbackConfig) {
        let pools = IdentityPools::from_config(&config);
        let mut config_guard = self.config.write().await;
        let mut pools_guard = self.pools.write().await;
        *config_guard = config;
        *pools_guard = pools;
        debug!("Fallback configuration updated");
    }

    /// Add a proxy to the rotation pool. Returns false if already present.
    pub async fn add_proxy(&self, proxy: impl Into<String>) -> bool {
        let proxy = proxy.into();
        let mut pools = self.pools.write().await;
        if pools.proxies.contains(&proxy) {
            return false;
        }
        pools.proxies.push(proxy);
        true
    }

    /// Remove a proxy from the rotation pool. Returns false if absent.
    pub async fn remove_proxy(&self, proxy: &str) -> bool {
        let mut pools = self.pools.write().await;
        let before = pools.proxies.len();
        pools.proxies.retain(|p| p != proxy);
        pools.proxies.len() != before
    }

    pub async fn proxies(&self) -> Vec<String> {
        self.pools.read().await.proxies.clone()
    }

    pub async fn user_agents(&self) -> Vec<String> {
        self.pools.read().await.user_agents.clone()
    }

    /// Consistent config and attempt plan, read under both locks in the
    /// same order `update_config` takes them.
    async fn snapshot(&self) -> (FallbackConfig, Vec<PlannedAttempt>) {
        let config = self.config.read().await;
        let pools = self.pools.read().await;
        let plan = plan(&config, shuffled(&pools.user_agents), pools.proxies.clone());
        (config.clone(), plan)
    }

    /// Run the fallback queue for `url`. Exhaustion is reported in the
    /// result, never as an error.
    pub async fn execute_fallbacks(
        &self,
        ctx: &AcquireContext,
        url: &str,
        original_error: &AcquireError,
    ) -> FallbackResult {
        let started = Instant::now();
        let normalized = match normalize_url(url) {
            Ok(normalized) => normalized,
            Err(e) => {
                warn!(url, error = %e, "Fallbacks skipped for unusable URL");
                return FallbackResult {
                    url: url.to_string(),
                    content: None,
                    attempts: Vec::new(),
                    original_error: original_error.to_string(),
                    budget_exhausted: false,
                    elapsed: started.elapsed(),
                };
            }
        };
        let url = normalized.as_str();

        let (config, plan) = self.snapshot().await;
        let budget = config.timeout_duration();
        let delay = config.attempt_delay();

        let mut result = FallbackResult {
            url: url.to_string(),
            content: None,
            attempts: Vec::with_capacity(plan.len()),
            original_error: original_error.to_string(),
            budget_exhausted: false,
            elapsed: Duration::ZERO,
        };

        debug!(url, planned = plan.len(), budget_ms = budget.as_millis() as u64, "Starting fallbacks");

        for (index, planned) in plan.into_iter().enumerate() {
            if ctx.err().is_some() {
                debug!(url, "Fallbacks stopped by context");
                break;
            }
            if index > 0 && !delay.is_zero() && ctx.sleep(delay).await.is_err() {
                break;
            }

            let remaining = match budget.checked_sub(started.elapsed()) {
                Some(r) if !r.is_zero() => r,
                _ => {
                    warn!(url, attempts = result.attempts.len(), "Fallback budget exhausted");
                    result.budget_exhausted = true;
                    break;
                }
            };

            // No single attempt may outlive the run budget.
            let attempt_ctx = ctx.child_with_timeout(remaining);
            let attempt_started = Instant::now();
            let outcome = self.run_attempt(&attempt_ctx, url, &planned).await;

            let mut attempt = FallbackAttempt {
                kind: planned.kind(),
                identity: planned.identity(),
                outcome: AttemptOutcome::Failed {
                    error: String::new(),
                },
                attempt: index + 1,
                duration: attempt_started.elapsed(),
            };

            match outcome {
                Ok(page) => {
                    attempt.outcome = AttemptOutcome::Success {
                        http_status: page.status,
                    };
                    info!(
                        url,
                        kind = %attempt.kind,
                        attempt = attempt.attempt,
                        "Fallback succeeded"
                    );
                    result.attempts.push(attempt);
                    result.content = Some(RawContent {
                        fetched_from: page.final_url,
                        status: page.status,
                        body: page.body,
                    });
                    break;
                }
                Err(e) => {
                    debug!(url, kind = %attempt.kind, error = %e, "Fallback attempt failed");
                    attempt.outcome = AttemptOutcome::Failed {
                        error: e.to_string(),
                    };
                    result.attempts.push(attempt);
                }
            }
        }

        result.elapsed = started.elapsed();
        if result.content.is_none() {
            warn!(
                url,
                attempts = result.attempts.len(),
                budget_exhausted = result.budget_exhausted,
                "All fallbacks failed"
            );
        }
        result
    }

    async fn run_attempt(
        &self,
        ctx: &AcquireContext,
        url: &str,
        planned: &PlannedAttempt,
    ) -> Result<FetchedPage> {
        let timeout = budget_for(ctx, self.http.timeout(), StrategyKind::Browser);
        let options = RequestOptions::with_timeout(timeout);

        let page = match planned {
            PlannedAttempt::UserAgent(ua) => {
                let options = options.headers(browser_headers()).user_agent(ua.as_str());
                self.http.fetch(ctx, url, options).await?
            }
            PlannedAttempt::Headers(template) => {
                self.http
                    .fetch(ctx, url, options.headers(template.to_header_map()))
                    .await?
            }
            PlannedAttempt::Proxy(proxy) => {
                let client = HttpClient::with_proxy(self.http_config.clone(), proxy)?;
                client
                    .fetch(ctx, url, options.headers(browser_headers()))
                    .await?
            }
            PlannedAttempt::Source(source) => {
                fetch_from_source(&self.http, ctx, source, url, options).await?
            }
        };

        accept_page(page, url)
    }
}

/// Attempt order: shuffled user agents, header templates, proxies, then
/// alternative sources by priority. Each rotation kind is capped at
/// `max_attempts_per_kind`.
fn plan(config: &FallbackConfig, agents: Vec<String>, proxies: Vec<String>) -> Vec<PlannedAttempt> {
    let per_kind = config.max_attempts_per_kind.max(1);

    let mut plan = Vec::new();
    if config.enable_user_agent_rotation {
        plan.extend(
            agents
                .into_iter()
                .take(per_kind)
                .map(PlannedAttempt::UserAgent),
        );
    }
    if config.enable_header_customization {
        plan.extend(
            HEADER_TEMPLATES
                .iter()
                .take(per_kind)
                .map(|t| PlannedAttempt::Headers(*t)),
        );
    }
    if config.enable_proxy_rotation && !proxies.is_empty() {
        plan.extend(
            proxies
                .into_iter()
                .take(per_kind)
                .map(PlannedAttempt::Proxy),
        );
    }
    if config.enable_alternative_sources {
        plan.extend(
            config
                .ordered_sources()
                .into_iter()
                .map(PlannedAttempt::Source),
        );
    }
    plan
}

/// A fallback only wins with a 200 and a non-blank body.
fn accept_page(page: FetchedPage, url: &str) -> Result<FetchedPage> {
    if page.status != 200 {
        return Err(AcquireError::from_status(page.status, url).unwrap_or_else(|| {
            AcquireError::TransportFailure(format!("unexpected HTTP {} from {}", page.status, url))
        }));
    }
    if page.body.trim().is_empty() {
        return Err(AcquireError::Decode(format!("empty body from {}", url)));
    }
    Ok(page)
}
