//! External fast-scrape microservice.
//!
//! The service returns already-structured content whose heuristics are not
//! ours, so its payload is read leniently and the result must clear a local
//! gate (word count and clamped remote quality) before it is trusted.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{body_excerpt, check_health, AcquisitionStrategy, StrategyKind};
use crate::context::AcquireContext;
use crate::error::{AcquireError, Result};
use crate::extract::{self, quality};
use crate::models::{ContentFields, ScrapedContent};
use crate::scrapers::budget::budget_for;
use crate::scrapers::http_client::HttpClient;

const SERVICE: &str = "fast_scrape";

/// Default base timeout for a fast-scrape request.
pub const DEFAULT_FAST_SCRAPE_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
}

/// Content built from the service payload plus the service's own score.
#[derive(Debug, Clone)]
pub struct FastScrapeResult {
    pub content: ScrapedContent,
    /// Remote quality score clamped to `[0, 1]`.
    pub remote_quality: f64,
}

#[derive(Clone)]
pub struct FastScrapeClient {
    http: HttpClient,
    base_url: String,
}

impl FastScrapeClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn scrape(
        &self,
        ctx: &AcquireContext,
        url: &str,
        timeout: Duration,
    ) -> Result<FastScrapeResult> {
        let endpoint = format!("{}/scrape", self.base_url);
        let page = self
            .http
            .post_json(ctx, &endpoint, &ScrapeRequest { url }, timeout)
            .await?;

        if !page.is_success() {
            return Err(AcquireError::remote(
                SERVICE,
                format!("HTTP {}: {}", page.status, body_excerpt(&page.body)),
            ));
        }
        if !page.body.trim_start().starts_with('{') {
            return Err(AcquireError::Decode(format!(
                "{} returned a non-JSON body ({})",
                SERVICE,
                page.content_type().unwrap_or("no content type")
            )));
        }

        let payload: Value = serde_json::from_str(&page.body)?;
        parse_payload(&payload, url)
    }

    pub async fn health(&self, ctx: &AcquireContext) -> bool {
        check_health(&self.http, ctx, SERVICE, &self.base_url).await
    }
}

fn str_field(payload: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| payload.get(*k).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn list_field(payload: &Value, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .find_map(|k| payload.get(*k).and_then(Value::as_array))
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Clamp to `[0, 1]`; anything non-numeric or NaN counts as zero.
pub fn clamp_quality(raw: Option<f64>) -> f64 {
    match raw {
        Some(q) if q.is_finite() => q.clamp(0.0, 1.0),
        Some(q) if q == f64::INFINITY => 1.0,
        _ => 0.0,
    }
}

/// RFC 3339 timestamp, or now when missing or invalid.
fn parse_timestamp(payload: &Value) -> DateTime<Utc> {
    ["scraped_at", "captured_at", "timestamp"]
        .iter()
        .find_map(|k| payload.get(*k).and_then(Value::as_str))
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

fn parse_payload(payload: &Value, url: &str) -> Result<FastScrapeResult> {
    if !payload.is_object() {
        return Err(AcquireError::Decode(format!(
            "{} payload is not a JSON object",
            SERVICE
        )));
    }
    if payload.get("success").and_then(Value::as_bool) == Some(false) {
        let message = str_field(payload, &["error", "message"]);
        return Err(AcquireError::remote(
            SERVICE,
            if message.is_empty() {
                "service reported failure".to_string()
            } else {
                message
            },
        ));
    }

    let html = str_field(payload, &["html", "raw_html"]);
    let mut fields = if html.is_empty() {
        ContentFields::default()
    } else {
        extract::extract_fields(&html)
    };
    fields.raw_html = html;

    // Remote values win where present.
    let overlay = |target: &mut String, keys: &[&str]| {
        let value = str_field(payload, keys);
        if !value.is_empty() {
            *target = value;
        }
    };
    overlay(&mut fields.title, &["title"]);
    overlay(&mut fields.meta_description, &["meta_description", "description"]);
    overlay(&mut fields.about_text, &["about_text", "about"]);
    overlay(&mut fields.contact_text, &["contact_text", "contact"]);
    overlay(&mut fields.body_text, &["body_text", "text", "content"]);

    for (target, keys) in [
        (&mut fields.headings, &["headings"][..]),
        (&mut fields.nav_items, &["nav_items", "navigation"][..]),
        (&mut fields.products, &["products", "services"][..]),
    ] {
        let items = list_field(payload, keys);
        if !items.is_empty() {
            *target = items;
        }
    }

    let language = str_field(payload, &["language", "lang"]);
    if !language.is_empty() {
        fields.language = Some(language.to_lowercase());
    }
    if let Some(has_logo) = payload.get("has_logo").and_then(Value::as_bool) {
        fields.has_logo = has_logo;
    }

    let remote_quality = clamp_quality(payload.get("quality_score").and_then(Value::as_f64));
    let content = ScrapedContent::with_timestamp(
        fields,
        extract::source_domain(url),
        parse_timestamp(payload),
    );

    Ok(FastScrapeResult {
        content,
        remote_quality,
    })
}

pub struct FastScrapeStrategy {
    client: FastScrapeClient,
    timeout: Duration,
}

impl FastScrapeStrategy {
    pub fn new(client: FastScrapeClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn client(&self) -> &FastScrapeClient {
        &self.client
    }
}

#[async_trait]
impl AcquisitionStrategy for FastScrapeStrategy {
    fn name(&self) -> &str {
        "fast_scrape"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::FastScrape
    }

    async fn scrape(&self, ctx: &AcquireContext, url: &str) -> Result<ScrapedContent> {
        ctx.check()?;
        let timeout = budget_for(ctx, self.timeout, self.kind());
        let result = self.client.scrape(ctx, url, timeout).await?;

        // Local word count, remote quality.
        let words = result.content.word_count();
        if words < quality::MIN_WORD_COUNT || result.remote_quality < quality::MIN_SCORE {
            debug!(
                url,
                words,
                remote_quality = result.remote_quality,
                "Fast-scrape result failed local gate"
            );
            return Err(AcquireError::QualityRejected {
                score: result.remote_quality,
                reason: format!(
                    "{} result has {} words and remote quality {:.2}",
                    SERVICE, words, result.remote_quality
                ),
            });
        }
        Ok(result.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::http_client::HttpClientConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn words(n: usize) -> String {
        vec!["widget"; n].join(" ")
    }

    async fn strategy_for(response: ResponseTemplate) -> (MockServer, FastScrapeStrategy) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scrape"))
            .respond_with(response)
            .mount(&server)
            .await;
        let client = FastScrapeClient::new(
            HttpClient::new(HttpClientConfig::default()).unwrap(),
            server.uri(),
        );
        (
            server,
            FastScrapeStrategy::new(client, DEFAULT_FAST_SCRAPE_TIMEOUT),
        )
    }

    #[test]
    fn test_clamp_quality() {
        assert_eq!(clamp_quality(Some(1.7)), 1.0);
        assert_eq!(clamp_quality(Some(-0.2)), 0.0);
        assert_eq!(clamp_quality(Some(0.42)), 0.42);
        assert_eq!(clamp_quality(Some(f64::NAN)), 0.0);
        assert_eq!(clamp_quality(None), 0.0);
    }

    #[test]
    fn test_payload_defaults() {
        let before = Utc::now();
        let payload = json!({
            "title": "Acme",
            "text": "hello world",
            "quality_score": 3.5,
            "scraped_at": "yesterday-ish"
        });
        let result = parse_payload(&payload, "https://acme.test/x").unwrap();
        assert_eq!(result.remote_quality, 1.0);
        assert!(result.content.captured_at() >= before);
        assert_eq!(result.content.title(), "Acme");
        assert_eq!(result.content.source_domain(), "acme.test");
    }

    #[test]
    fn test_payload_timestamp_kept_when_valid() {
        let payload = json!({"scraped_at": "2024-05-01T12:00:00Z"});
        let result = parse_payload(&payload, "https://acme.test").unwrap();
        assert_eq!(
            result.content.captured_at().to_rfc3339(),
            "2024-05-01T12:00:00+00:00"
        );
    }

    #[test]
    fn test_mistyped_fields_are_ignored() {
        let payload = json!({
            "title": 42,
            "headings": "not a list",
            "quality_score": "high",
            "body_text": "still usable"
        });
        let result = parse_payload(&payload, "https://acme.test").unwrap();
        assert_eq!(result.content.title(), "");
        assert!(result.content.headings().is_empty());
        assert_eq!(result.remote_quality, 0.0);
        assert_eq!(result.content.word_count(), 2);
    }

    #[tokio::test]
    async fn test_non_json_body_rejected() {
        let (_server, strategy) = strategy_for(
            ResponseTemplate::new(200)
                .set_body_string("<html>gateway login</html>")
                .insert_header("content-type", "text/html"),
        )
        .await;
        let res = strategy
            .scrape(&AcquireContext::background(), "https://acme.test")
            .await;
        assert!(matches!(res, Err(AcquireError::Decode(_))));
    }

    #[tokio::test]
    async fn test_accepted_when_local_gate_passes() {
        let (_server, strategy) = strategy_for(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Acme Widgets",
            "meta_description": "Widgets since 1952",
            "headings": ["Welcome"],
            "body_text": words(80),
            "quality_score": 0.8
        })))
        .await;
        let content = strategy
            .scrape(&AcquireContext::background(), "https://acme.test")
            .await
            .unwrap();
        assert_eq!(content.headings(), &["Welcome"]);
        assert!(content.word_count() >= 50);
    }

    #[tokio::test]
    async fn test_low_remote_quality_rejected() {
        let (_server, strategy) = strategy_for(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Acme Widgets",
            "body_text": words(120),
            "quality_score": 0.3
        })))
        .await;
        let res = strategy
            .scrape(&AcquireContext::background(), "https://acme.test")
            .await;
        assert!(matches!(res, Err(AcquireError::QualityRejected { .. })));
    }

    #[tokio::test]
    async fn test_too_few_local_words_rejected() {
        let (_server, strategy) = strategy_for(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Acme",
            "body_text": "tiny page",
            "word_count": 900,
            "quality_score": 0.95
        })))
        .await;
        let res = strategy
            .scrape(&AcquireContext::background(), "https://acme.test")
            .await;
        assert!(matches!(res, Err(AcquireError::QualityRejected { .. })));
    }

    #[tokio::test]
    async fn test_success_false_is_remote_error() {
        let (_server, strategy) = strategy_for(
            ResponseTemplate::new(200).set_body_json(json!({"success": false, "error": "blocked"})),
        )
        .await;
        let res = strategy
            .scrape(&AcquireContext::background(), "https://acme.test")
            .await;
        assert!(matches!(res, Err(AcquireError::RemoteService { .. })));
    }
}
