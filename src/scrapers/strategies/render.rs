//! Remote headless-render service.
//!
//! Protocol: `POST {base}/scrape` with `{"url": ...}`, answered by
//! `{"html": ..., "success": bool, "error": ...}`. The service queues work
//! before rendering, so this is the slowest strategy and runs last.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{body_excerpt, check_health, AcquisitionStrategy, StrategyKind};
use crate::context::AcquireContext;
use crate::error::{AcquireError, Result};
use crate::extract;
use crate::models::ScrapedContent;
use crate::scrapers::budget::budget_for;
use crate::scrapers::http_client::HttpClient;

const SERVICE: &str = "render";

/// Default base timeout for a render request.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct RenderResponse {
    #[serde(default)]
    html: String,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the render service.
#[derive(Clone)]
pub struct RenderClient {
    http: HttpClient,
    base_url: String,
}

impl RenderClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Render `url` and return the resulting HTML.
    pub async fn render(
        &self,
        ctx: &AcquireContext,
        url: &str,
        timeout: Duration,
    ) -> Result<String> {
        let endpoint = format!("{}/scrape", self.base_url);
        let page = self
            .http
            .post_json(ctx, &endpoint, &RenderRequest { url }, timeout)
            .await?;

        if !page.is_success() {
            return Err(AcquireError::remote(
                SERVICE,
                format!("HTTP {}: {}", page.status, body_excerpt(&page.body)),
            ));
        }

        let response: RenderResponse = serde_json::from_str(&page.body)?;
        if !response.success {
            return Err(AcquireError::remote(
                SERVICE,
                response
                    .error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| "render reported failure".to_string()),
            ));
        }
        if response.html.trim().is_empty() {
            return Err(AcquireError::remote(SERVICE, "empty HTML in response"));
        }
        Ok(response.html)
    }

    pub async fn health(&self, ctx: &AcquireContext) -> bool {
        check_health(&self.http, ctx, SERVICE, &self.base_url).await
    }
}

pub struct RenderStrategy {
    client: RenderClient,
    timeout: Duration,
}

impl RenderStrategy {
    pub fn new(client: RenderClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn client(&self) -> &RenderClient {
        &self.client
    }
}

#[async_trait]
impl AcquisitionStrategy for RenderStrategy {
    fn name(&self) -> &str {
        "render"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Render
    }

    async fn scrape(&self, ctx: &AcquireContext, url: &str) -> Result<ScrapedContent> {
        ctx.check()?;
        let timeout = budget_for(ctx, self.timeout, self.kind());
        let html = self.client.render(ctx, url, timeout).await?;
        Ok(extract::extract(html, url))
    }
}
