//! GET disguised as a desktop browser navigation.

use async_trait::async_trait;

use super::{AcquisitionStrategy, StrategyKind};
use crate::context::AcquireContext;
use crate::error::Result;
use crate::extract;
use crate::models::ScrapedContent;
use crate::scrapers::budget::budget_for;
use crate::scrapers::http_client::{browser_headers, HttpClient, RequestOptions};

/// Full browser header set (Accept, Accept-Language, Sec-Fetch-*, DNT).
/// Compressed bodies are decoded by the shared client.
pub struct BrowserStrategy {
    http: HttpClient,
}

impl BrowserStrategy {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AcquisitionStrategy for BrowserStrategy {
    fn name(&self) -> &str {
        "browser"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Browser
    }

    async fn scrape(&self, ctx: &AcquireContext, url: &str) -> Result<ScrapedContent> {
        ctx.check()?;
        let timeout = budget_for(ctx, self.http.timeout(), self.kind());
        let options = RequestOptions::with_timeout(timeout).headers(browser_headers());
        let page = self.http.fetch_ok(ctx, url, options).await?;
        Ok(extract::extract(page.body, url))
    }
}
