//! Network transport for cache misses and app-shell installs.
//!
//! ### Response classification
//! Every response is tagged with a fetch-model type relative to the
//! configured origin (judged on the final URL, after redirects):
//! - same origin: `basic`
//! - cross origin with `Access-Control-Allow-Origin` granting us: `cors`
//! - any other cross-origin response: `opaque` (status 0, no headers, empty
//!   body), which is never cacheable
//!
//! ### Failure model
//! Only transport failures (DNS, refused connection, reset, an optional
//! configured timeout) are errors. HTTP error statuses are ordinary responses
//! and are returned to the caller unchanged.

pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, header};

use blogsphere_core::{CapturedResponse, Error, Request, ResponseType};

pub use self::url::{UrlError, origin_root, parse_origin, resolve, same_origin};

/// Anything that can perform a network fetch for the worker.
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch `request`, returning `Error::Network` only when no response
    /// was received at all.
    async fn fetch(&self, request: &Request) -> Result<CapturedResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Origin the worker serves; decides `basic` vs cross-origin types.
    pub origin: ::url::Url,

    /// User agent string (default: "blogsphere-sw/0.1")
    pub user_agent: String,

    /// Optional request timeout (default: none)
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl FetchConfig {
    pub fn new(origin: ::url::Url) -> Self {
        Self { origin, user_agent: "blogsphere-sw/0.1".to_string(), timeout: None, max_redirects: 5 }
    }
}

/// reqwest-backed [`Network`] implementation.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn classify(&self, final_url: &::url::Url, headers: &header::HeaderMap) -> ResponseType {
        if same_origin(final_url, &self.config.origin) {
            return ResponseType::Basic;
        }

        let origin = self.config.origin.origin().ascii_serialization();
        let granted = headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "*" || v == origin);

        if granted { ResponseType::Cors } else { ResponseType::Opaque }
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<CapturedResponse, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {e}", request.method)))?;

        let response = self
            .http
            .request(method, request.url.as_str())
            .send()
            .await
            .map_err(|e| Error::Network(format!("{}: {e}", request.url)))?;

        let status = response.status();
        let final_url = response.url().clone();
        let response_type = self.classify(&final_url, response.headers());

        if response_type == ResponseType::Opaque {
            tracing::debug!(url = %request.url, final_url = %final_url, "opaque cross-origin response");
            return Ok(CapturedResponse::new(0, ResponseType::Opaque, bytes::Bytes::new()));
        }

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response body: {e}")))?;

        tracing::debug!(
            "fetched {} {} -> {} ({}, {} bytes) in {}ms",
            request.method,
            request.url,
            status.as_u16(),
            response_type,
            body.len(),
            start.elapsed().as_millis()
        );

        Ok(CapturedResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            response_type,
            headers,
            body,
        })
    }
}
