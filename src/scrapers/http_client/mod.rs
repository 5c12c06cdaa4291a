//! Shared HTTP transport.
//!
//! One `reqwest::Client` (and so one connection pool) is built per client
//! configuration and shared read-only by every strategy. Per-attempt
//! differences (headers, user agent, budgeted timeout) are applied on the
//! request, never by rebuilding the client.

mod headers;
mod response;
mod user_agent;

pub use headers::{browser_headers, to_header_map, HeaderTemplate, BROWSER_HEADERS, HEADER_TEMPLATES};
pub use response::FetchedPage;
pub use user_agent::{
    default_pool, random_user_agent, resolve_user_agent, shuffled, IMPERSONATE_USER_AGENTS,
    USER_AGENT,
};

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT as USER_AGENT_HEADER};
use reqwest::{redirect, Client, Proxy, RequestBuilder};
use serde::Serialize;
use tracing::debug;

use crate::context::AcquireContext;
use crate::error::{AcquireError, Result};

/// Default ceiling on a response body: 10 MiB.
pub const DEFAULT_MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

/// Construction-time transport settings.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
    pub verify_tls: bool,
    pub max_response_size: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_redirects: 10,
            user_agent: USER_AGENT.to_string(),
            verify_tls: true,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }
}

/// Per-request overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub user_agent: Option<String>,
    /// Overrides the client timeout; normally the budgeted value.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Default::default()
        }
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// HTTP client with size-limited, cancellable requests.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let client = build_client(&config, None)?;
        Ok(Self { client, config })
    }

    /// A client whose requests all go through `proxy_url`
    /// (`http://`, `https://` or `socks5://`).
    pub fn with_proxy(config: HttpClientConfig, proxy_url: &str) -> Result<Self> {
        let client = build_client(&config, Some(proxy_url))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    pub fn max_response_size(&self) -> u64 {
        self.config.max_response_size
    }

    /// GET `url`, returning the page whatever its status.
    pub async fn fetch(
        &self,
        ctx: &AcquireContext,
        url: &str,
        options: RequestOptions,
    ) -> Result<FetchedPage> {
        let request = self.apply(self.client.get(url), options);
        self.execute(ctx, "GET", url, request).await
    }

    /// GET `url`, mapping 4xx/5xx (and any other non-2xx) to errors.
    pub async fn fetch_ok(
        &self,
        ctx: &AcquireContext,
        url: &str,
        options: RequestOptions,
    ) -> Result<FetchedPage> {
        let page = self.fetch(ctx, url, options).await?;
        ensure_success(page, url)
    }

    /// POST a JSON body, returning the response whatever its status.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        ctx: &AcquireContext,
        url: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<FetchedPage> {
        let request = self.client.post(url).json(body).timeout(timeout);
        self.execute(ctx, "POST", url, request).await
    }

    fn apply(&self, mut request: RequestBuilder, options: RequestOptions) -> RequestBuilder {
        if !options.headers.is_empty() {
            request = request.headers(options.headers);
        }
        if let Some(ua) = options.user_agent {
            if let Ok(value) = HeaderValue::from_str(&ua) {
                request = request.header(USER_AGENT_HEADER, value);
            }
        }
        request.timeout(options.timeout.unwrap_or(self.config.timeout))
    }

    async fn execute(
        &self,
        ctx: &AcquireContext,
        method: &str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<FetchedPage> {
        let limit = self.config.max_response_size;
        let start = Instant::now();

        // Dropping the future on cancellation aborts the in-flight request.
        let page = ctx
            .run(async move {
                let response = request.send().await?;
                let status = response.status().as_u16();
                let final_url = response.url().to_string();
                let headers = response::header_map(&response);
                let body = response::read_limited(response, limit).await?;
                Ok(FetchedPage {
                    status,
                    final_url,
                    headers,
                    body: response::decode_body(body),
                })
            })
            .await?;

        debug!(
            method,
            url,
            status = page.status,
            bytes = page.body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "HTTP request complete"
        );
        Ok(page)
    }
}

/// Turn a non-2xx page into the matching error.
pub fn ensure_success(page: FetchedPage, url: &str) -> Result<FetchedPage> {
    if page.is_success() {
        return Ok(page);
    }
    Err(AcquireError::from_status(page.status, url).unwrap_or_else(|| {
        AcquireError::TransportFailure(format!("unexpected HTTP {} from {}", page.status, url))
    }))
}

fn build_client(config: &HttpClientConfig, proxy_url: Option<&str>) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(resolve_user_agent(Some(&config.user_agent)))
        .timeout(config.timeout)
        .redirect(redirect::Policy::limited(config.max_redirects))
        .danger_accept_invalid_certs(!config.verify_tls)
        .cookie_store(true)
        .gzip(true)
        .brotli(true);

    if let Some(proxy_url) = proxy_url {
        let proxy =
            Proxy::all(proxy_url).map_err(|e| AcquireError::invalid_url(proxy_url, e))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| AcquireError::TransportFailure(format!("failed to build HTTP client: {}", e)))
}
