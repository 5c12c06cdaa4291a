//! Acquisition strategies.
//!
//! Each strategy is one way of turning a URL into `ScrapedContent`. They are
//! listed cheapest first; the escalation controller tries them in that order.
//! Every strategy checks the context before dispatch and sends its request
//! with a timeout from [`budget_for`](super::budget::budget_for).

mod browser;
mod direct;
mod fast_scrape;
mod render;

pub use browser::BrowserStrategy;
pub use direct::DirectStrategy;
pub use fast_scrape::{
    clamp_quality, FastScrapeClient, FastScrapeResult, FastScrapeStrategy, DEFAULT_FAST_SCRAPE_TIMEOUT,
};
pub use render::{RenderClient, RenderStrategy, DEFAULT_RENDER_TIMEOUT};

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::context::AcquireContext;
use crate::error::Result;
use crate::models::ScrapedContent;

use super::http_client::HttpClient;

/// Timeout for `/health` probes against remote services.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Strategy tier, used for budgeting and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Direct,
    Browser,
    FastScrape,
    Render,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Browser => "browser",
            Self::FastScrape => "fast_scrape",
            Self::Render => "render",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One method of retrieving page content.
#[async_trait]
pub trait AcquisitionStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> StrategyKind;

    /// Fetch `url` and return extracted content, or fail.
    ///
    /// `url` is already normalized. Quality gating is the caller's job.
    async fn scrape(&self, ctx: &AcquireContext, url: &str) -> Result<ScrapedContent>;
}

/// `GET {base}/health`; only a 200 counts as healthy.
pub(crate) async fn check_health(
    http: &HttpClient,
    ctx: &AcquireContext,
    service: &str,
    base_url: &str,
) -> bool {
    let url = format!("{}/health", base_url.trim_end_matches('/'));
    let options = super::http_client::RequestOptions::with_timeout(HEALTH_CHECK_TIMEOUT);
    match http.fetch(ctx, &url, options).await {
        Ok(page) => page.status == 200,
        Err(e) => {
            debug!(service, error = %e, "Health check failed");
            false
        }
    }
}

/// Trimmed prefix of a response body for error messages.
pub(crate) fn body_excerpt(body: &str) -> String {
    const MAX: usize = 200;
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX {
        trimmed.to_string()
    } else {
        let mut excerpt: String = trimmed.chars().take(MAX).collect();
        excerpt.push_str("...");
        excerpt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(StrategyKind::Direct.to_string(), "direct");
        assert_eq!(StrategyKind::FastScrape.as_str(), "fast_scrape");
    }

    #[test]
    fn test_body_excerpt_truncates() {
        let long = "e".repeat(500);
        let excerpt = body_excerpt(&long);
        assert!(excerpt.ends_with("..."));
        assert_eq!(excerpt.chars().count(), 203);
        assert_eq!(body_excerpt("  short  "), "short");
    }
}
