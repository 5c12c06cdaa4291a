//! Fixed-retry fetch kept for callers that predate strategy escalation.
//!
//! Retries the browser-header fetch a fixed number of times with a constant
//! delay. Nothing in the escalation path uses it; prefer
//! `EscalationController::acquire`.

use std::time::Duration;

use tracing::{debug, warn};

use super::escalation::normalize_url;
use super::http_client::HttpClient;
use super::strategies::{AcquisitionStrategy, BrowserStrategy};
use crate::config::Settings;
use crate::context::AcquireContext;
use crate::error::{AcquireError, Result};
use crate::models::ScrapedContent;

pub struct LegacyFetcher {
    strategy: Box<dyn AcquisitionStrategy>,
    max_retries: u32,
    retry_delay: Duration,
}

impl LegacyFetcher {
    pub fn new(strategy: BrowserStrategy, max_retries: u32, retry_delay: Duration) -> Self {
        Self::with_strategy(Box::new(strategy), max_retries, retry_delay)
    }

    /// Browser-header fetch over the configured client, retrying
    /// `max_retries` times `retry_delay` apart.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = HttpClient::new(settings.http_config())?;
        Ok(Self::new(
            BrowserStrategy::new(http),
            settings.max_retries,
            settings.retry_delay,
        ))
    }

    pub fn with_strategy(
        strategy: Box<dyn AcquisitionStrategy>,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            strategy,
            max_retries,
            retry_delay,
        }
    }

    /// One initial attempt plus up to `max_retries` retries. Invalid URLs,
    /// 4xx responses, oversized bodies and cancellation are never retried.
    /// No quality gate is applied.
    pub async fn fetch(&self, ctx: &AcquireContext, url: &str) -> Result<ScrapedContent> {
        let url = normalize_url(url)?;
        let mut attempt = 0;

        loop {
            ctx.check()?;
            match self.strategy.scrape(ctx, &url).await {
                Ok(content) => return Ok(content),
                Err(e) if !should_retry(&e) || attempt >= self.max_retries => {
                    debug!(url = %url, attempt, error = %e, "Giving up");
                    return Err(e);
                }
                Err(e) => {
                    attempt += 1;
                    warn!(
                        url = %url,
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "Fetch failed, retrying"
                    );
                    ctx.sleep(self.retry_delay).await?;
                }
            }
        }
    }
}

fn should_retry(err: &AcquireError) -> bool {
    !matches!(
        err,
        AcquireError::NonRetryableHttp { .. }
            | AcquireError::InvalidUrl { .. }
            | AcquireError::ResponseTooLarge { .. }
            | AcquireError::ContextCancelled(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::http_client::HttpClientConfig;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(max_retries: u32) -> LegacyFetcher {
        let http = HttpClient::new(HttpClientConfig::default()).unwrap();
        LegacyFetcher::new(
            BrowserStrategy::new(http),
            max_retries,
            Duration::from_millis(10),
        )
    }

    #[test]
    fn test_retry_classification() {
        assert!(should_retry(&AcquireError::TransportFailure("reset".into())));
        assert!(should_retry(&AcquireError::ServerStatus {
            status: 500,
            url: String::new()
        }));
        assert!(!should_retry(&AcquireError::NonRetryableHttp {
            status: 404,
            url: String::new()
        }));
        assert!(!should_retry(&AcquireError::ResponseTooLarge {
            limit: 1,
            actual: 2
        }));
        assert!(!should_retry(&AcquireError::ContextCancelled("x".into())));
    }

    #[tokio::test]
    async fn test_retries_server_errors_then_gives_up() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let res = fetcher(2)
            .fetch(&AcquireContext::background(), &server.uri())
            .await;
        assert!(matches!(res, Err(AcquireError::ServerStatus { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_from_settings_uses_retry_settings() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let settings = Settings {
            max_retries: 1,
            retry_delay: Duration::from_millis(10),
            ..Default::default()
        };
        let fetcher = LegacyFetcher::from_settings(&settings).unwrap();
        assert_eq!(fetcher.max_retries, 1);
        assert_eq!(fetcher.retry_delay, Duration::from_millis(10));

        let res = fetcher
            .fetch(&AcquireContext::background(), &server.uri())
            .await;
        assert!(matches!(res, Err(AcquireError::ServerStatus { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_does_not_retry_4xx() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let res = fetcher(5)
            .fetch(&AcquireContext::background(), &server.uri())
            .await;
        assert!(matches!(res, Err(AcquireError::NonRetryableHttp { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><head><title>Back</title></head></html>"),
            )
            .mount(&server)
            .await;

        let content = fetcher(3)
            .fetch(&AcquireContext::background(), &server.uri())
            .await
            .unwrap();
        assert_eq!(content.title(), "Back");
    }
}
