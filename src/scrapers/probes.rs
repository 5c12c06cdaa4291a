//! Best-effort robots.txt and sitemap.xml probes.

use std::time::Duration;

use tracing::debug;

use super::escalation::normalize_url;
use super::http_client::{HttpClient, RequestOptions};
use crate::context::AcquireContext;
use crate::error::{AcquireError, Result};
use crate::models::SiteProbe;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetch `/robots.txt` and `/sitemap.xml` for the site hosting `url`.
///
/// Only an invalid URL is an error. A missing file, a non-200 status or a
/// failed request leaves that field `None`.
pub async fn probe_site(http: &HttpClient, ctx: &AcquireContext, url: &str) -> Result<SiteProbe> {
    let normalized = normalize_url(url)?;
    let parsed = url::Url::parse(&normalized).map_err(|e| AcquireError::invalid_url(url, e))?;
    let origin = parsed.origin().ascii_serialization();

    let robots_txt = fetch_optional(http, ctx, &format!("{}/robots.txt", origin)).await;
    let sitemap_xml = fetch_optional(http, ctx, &format!("{}/sitemap.xml", origin)).await;

    Ok(SiteProbe {
        robots_txt,
        sitemap_xml,
    })
}

async fn fetch_optional(http: &HttpClient, ctx: &AcquireContext, url: &str) -> Option<String> {
    let timeout = PROBE_TIMEOUT.min(http.timeout());
    match http.fetch(ctx, url, RequestOptions::with_timeout(timeout)).await {
        Ok(page) if page.status == 200 => Some(page.body),
        Ok(page) => {
            debug!(url, status = page.status, "Probe target absent");
            None
        }
        Err(e) => {
            debug!(url, error = %e, "Probe request failed");
            None
        }
    }
}
