//! sw_fetch tool implementation.
//!
//! Routes one outbound request from a page context through the worker.

use blogsphere_client::resolve;
use blogsphere_core::{Destination, Error, Request};
use blogsphere_worker::{HostEvent, ResponseSource};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{HostBridge, json_result};

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path starting with `/` resolved against the origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET is intercepted.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination; `document` marks a full page navigation.
    #[serde(default)]
    pub destination: Destination,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    /// `basic`, `cors`, `opaque` or `default`.
    pub response_type: String,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    pub body_bytes: usize,
    /// Whether the response came from the cache, the network or a fallback.
    pub source: ResponseSource,
    pub events: Vec<HostEvent>,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(bridge: &HostBridge, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.method.trim().is_empty() {
        return Err(Error::InvalidInput("method cannot be empty".into()).into());
    }

    let url = resolve(&bridge.origin, &params.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;
    let request = Request::new(params.method.trim(), url).with_destination(params.destination);

    let served = bridge.registration.fetch(&request).await?;
    let response = served.response;

    let output = SwFetchOutput {
        url: request.url.to_string(),
        status: response.status,
        status_text: response.status_text.clone(),
        response_type: response.response_type.to_string(),
        body: response.text(),
        body_bytes: response.body.len(),
        headers: response.headers,
        source: served.source,
        events: bridge.drain_events().await,
    };
    json_result(&output)
}
