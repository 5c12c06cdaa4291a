//! Alternative data sources: web archive snapshots and page caches.

use serde::Deserialize;
use tracing::debug;

use super::config::{AlternativeSourceConfig, SourceKind};
use crate::context::AcquireContext;
use crate::error::{AcquireError, Result};
use crate::scrapers::http_client::{FetchedPage, HttpClient, RequestOptions};

#[derive(Debug, Deserialize)]
struct WaybackAvailability {
    #[serde(default)]
    archived_snapshots: ArchivedSnapshots,
}

#[derive(Debug, Default, Deserialize)]
struct ArchivedSnapshots {
    closest: Option<Snapshot>,
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    #[serde(default)]
    available: bool,
    url: String,
    #[serde(default)]
    status: Option<String>,
}

/// Fetch `url` through `source`, returning the page that was read.
pub async fn fetch_from_source(
    http: &HttpClient,
    ctx: &AcquireContext,
    source: &AlternativeSourceConfig,
    url: &str,
    options: RequestOptions,
) -> Result<FetchedPage> {
    let base = source.base_url.trim_end_matches('/');
    match source.kind {
        SourceKind::Wayback => fetch_wayback(http, ctx, base, url, options).await,
        SourceKind::Cache => {
            let cache_url = format!("{}/search?q=cache:{}", base, urlencoding::encode(url));
            http.fetch_ok(ctx, &cache_url, options).await
        }
    }
}

async fn fetch_wayback(
    http: &HttpClient,
    ctx: &AcquireContext,
    base: &str,
    url: &str,
    options: RequestOptions,
) -> Result<FetchedPage> {
    let lookup = format!("{}/wayback/available?url={}", base, urlencoding::encode(url));
    let page = http.fetch_ok(ctx, &lookup, options.clone()).await?;
    let availability: WaybackAvailability = serde_json::from_str(&page.body)?;

    let snapshot = availability
        .archived_snapshots
        .closest
        .filter(|s| s.available && s.status.as_deref().map_or(true, |st| st == "200"))
        .ok_or_else(|| AcquireError::remote("wayback", format!("no snapshot for {}", url)))?;

    debug!(url, snapshot = %snapshot.url, "Fetching archived snapshot");
    http.fetch_ok(ctx, &snapshot.url, options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::http_client::HttpClientConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(kind: SourceKind, base_url: String) -> AlternativeSourceConfig {
        AlternativeSourceConfig {
            kind,
            base_url,
            priority: 0,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_wayback_fetches_closest_snapshot() {
        let server = MockServer::start().await;
        let snapshot_url = format!("{}/web/20240101000000/acme", server.uri());
        Mock::given(method("GET"))
            .and(path("/wayback/available"))
            .and(query_param("url", "https://acme.test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "archived_snapshots": {
                    "closest": {"available": true, "url": snapshot_url, "status": "200"}
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/web/20240101000000/acme"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>archived</html>"))
            .mount(&server)
            .await;

        let http = HttpClient::new(HttpClientConfig::default()).unwrap();
        let page = fetch_from_source(
            &http,
            &AcquireContext::background(),
            &source(SourceKind::Wayback, server.uri()),
            "https://acme.test",
            RequestOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(page.body, "<html>archived</html>");
    }

    #[tokio::test]
    async fn test_wayback_without_snapshot_fails() {
        let server = MockServer::start().await;
        Mock::given(path("/wayback/available"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"archived_snapshots": {}})))
            .mount(&server)
            .await;

        let http = HttpClient::new(HttpClientConfig::default()).unwrap();
        let res = fetch_from_source(
            &http,
            &AcquireContext::background(),
            &source(SourceKind::Wayback, server.uri()),
            "https://acme.test",
            RequestOptions::default(),
        )
        .await;
        assert!(matches!(res, Err(AcquireError::RemoteService { .. })));
    }

    #[tokio::test]
    async fn test_cache_query() {
        let server = MockServer::start().await;
        Mock::given(path("/search"))
            .and(query_param("q", "cache:https://acme.test"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>cached</html>"))
            .mount(&server)
            .await;

        let http = HttpClient::new(HttpClientConfig::default()).unwrap();
        let page = fetch_from_source(
            &http,
            &AcquireContext::background(),
            &source(SourceKind::Cache, server.uri()),
            "https://acme.test",
            RequestOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(page.body, "<html>cached</html>");
    }
}
