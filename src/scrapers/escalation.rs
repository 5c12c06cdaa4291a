//! Strategy escalation.
//!
//! Strategies run one at a time, cheapest first. The first result that passes
//! the quality gate ends the escalation; anything else (an error, or content
//! the gate rejects) is recorded and the next strategy is tried.

use std::time::Instant;

use tracing::{debug, info, warn};

use super::http_client::HttpClient;
use super::strategies::{
    AcquisitionStrategy, BrowserStrategy, DirectStrategy, FastScrapeClient, FastScrapeStrategy,
    RenderClient, RenderStrategy,
};
use crate::config::Settings;
use crate::context::AcquireContext;
use crate::error::{AcquireError, Result};
use crate::extract::QualityGate;
use crate::models::{Acquired, AcquisitionOutcome, EscalationResult};

/// Add `https://` when `raw` has no scheme, then validate.
pub fn normalize_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AcquireError::invalid_url(raw, "empty URL"));
    }

    let candidate = if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = url::Url::parse(&candidate).map_err(|e| AcquireError::invalid_url(raw, e))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(AcquireError::invalid_url(
                raw,
                format!("unsupported scheme '{}'", other),
            ))
        }
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(AcquireError::invalid_url(raw, "missing host"));
    }
    Ok(candidate)
}

/// Whether `raw` starts with `scheme://`. A `://` later in the URL, such as
/// inside a query string, does not count.
fn has_scheme(raw: &str) -> bool {
    let Some(end) = raw.find("://") else {
        return false;
    };
    let mut chars = raw[..end].chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-')
}

/// Cancellation before any strategy ran is returned as is; otherwise the
/// attempts made so far travel with it.
fn interrupted(url: String, err: AcquireError, outcomes: Vec<AcquisitionOutcome>) -> AcquireError {
    if outcomes.is_empty() {
        err
    } else {
        AcquireError::Exhausted {
            url,
            last: Box::new(err),
            outcomes,
        }
    }
}

/// Runs a fixed, cost-ordered strategy list against one URL.
pub struct EscalationController {
    strategies: Vec<Box<dyn AcquisitionStrategy>>,
    gate: QualityGate,
}

impl EscalationController {
    pub fn new(strategies: Vec<Box<dyn AcquisitionStrategy>>) -> Self {
        Self {
            strategies,
            gate: QualityGate::default(),
        }
    }

    pub fn with_gate(mut self, gate: QualityGate) -> Self {
        self.gate = gate;
        self
    }

    /// Direct, browser, fast-scrape (when configured), then render (when
    /// configured). All HTTP strategies share one connection pool.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = HttpClient::new(settings.http_config())?;

        let mut strategies: Vec<Box<dyn AcquisitionStrategy>> = vec![
            Box::new(DirectStrategy::new(http.clone())),
            Box::new(BrowserStrategy::new(http.clone())),
        ];
        if let Some(url) = &settings.fast_scrape_url {
            strategies.push(Box::new(FastScrapeStrategy::new(
                FastScrapeClient::new(http.clone(), url.as_str()),
                settings.fast_scrape_timeout,
            )));
        }
        if let Some(url) = &settings.render_service_url {
            strategies.push(Box::new(RenderStrategy::new(
                RenderClient::new(http, url.as_str()),
                settings.render_timeout,
            )));
        }

        Ok(Self::new(strategies))
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn gate(&self) -> &QualityGate {
        &self.gate
    }

    /// Acquire `url`, returning the first gate-accepted content.
    pub async fn acquire(&self, ctx: &AcquireContext, url: &str) -> EscalationResult {
        let url = normalize_url(url)?;
        ctx.check()?;

        let mut outcomes = Vec::with_capacity(self.strategies.len());
        let mut last_error: Option<AcquireError> = None;

        for strategy in &self.strategies {
            let name = strategy.name();
            if let Err(e) = ctx.check() {
                debug!(url = %url, strategy = name, attempted = outcomes.len(), "Context done before strategy");
                return Err(interrupted(url, e, outcomes));
            }

            let start = Instant::now();
            let result = strategy.scrape(ctx, &url).await;
            let duration = start.elapsed();

            match result {
                Ok(content) => {
                    let verdict = self.gate.evaluate(&content);
                    match verdict.into_result() {
                        Ok(score) => {
                            info!(
                                url = %url,
                                strategy = name,
                                score,
                                words = content.word_count(),
                                elapsed_ms = duration.as_millis() as u64,
                                "Content accepted"
                            );
                            outcomes.push(AcquisitionOutcome::accepted(
                                name,
                                content.clone(),
                                duration,
                            ));
                            return Ok(Acquired {
                                content,
                                strategy: name.to_string(),
                                outcomes,
                            });
                        }
                        Err(rejection) => {
                            warn!(url = %url, strategy = name, error = %rejection, "Content rejected");
                            outcomes.push(AcquisitionOutcome::rejected(
                                name,
                                content,
                                rejection.clone(),
                                duration,
                            ));
                            last_error = Some(rejection);
                        }
                    }
                }
                Err(e) if e.is_cancelled() => {
                    debug!(url = %url, strategy = name, "Strategy aborted by context");
                    outcomes.push(AcquisitionOutcome::failed(name, e.clone(), duration));
                    return Err(interrupted(url, e, outcomes));
                }
                Err(e) => {
                    warn!(
                        url = %url,
                        strategy = name,
                        error = %e,
                        elapsed_ms = duration.as_millis() as u64,
                        "Strategy failed"
                    );
                    outcomes.push(AcquisitionOutcome::failed(name, e.clone(), duration));
                    last_error = Some(e);
                }
            }
        }

        let last = last_error
            .unwrap_or_else(|| AcquireError::TransportFailure("no strategies configured".into()));
        Err(AcquireError::Exhausted {
            url,
            last: Box::new(last),
            outcomes,
        })
    }
}
