//! Plain GET with the client's default headers.

use async_trait::async_trait;

use super::{AcquisitionStrategy, StrategyKind};
use crate::context::AcquireContext;
use crate::error::Result;
use crate::extract;
use crate::models::ScrapedContent;
use crate::scrapers::budget::budget_for;
use crate::scrapers::http_client::{HttpClient, RequestOptions};

/// Cheapest strategy: minimal headers, no disguise.
pub struct DirectStrategy {
    http: HttpClient,
}

impl DirectStrategy {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AcquisitionStrategy for DirectStrategy {
    fn name(&self) -> &str {
        "direct"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Direct
    }

    async fn scrape(&self, ctx: &AcquireContext, url: &str) -> Result<ScrapedContent> {
        ctx.check()?;
        let timeout = budget_for(ctx, self.http.timeout(), self.kind());
        let page = self
            .http
            .fetch_ok(ctx, url, RequestOptions::with_timeout(timeout))
            .await?;
        Ok(extract::extract(page.body, url))
    }
}
