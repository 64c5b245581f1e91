//! Outbound requests and the identity used to key cached responses.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use super::hash::compute_request_key;
use crate::Error;

/// What the requesting page context intends to do with the response.
///
/// Only `Document` changes behavior: it marks a full page navigation,
/// which gets the cached-app-shell fallback when the network is down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    #[default]
    Empty,
    Document,
    Script,
    Style,
    Image,
    Font,
    Manifest,
}

/// An outbound request as seen by the fetch interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub destination: Destination,
}

impl Request {
    /// Build a request; the method is normalized to upper case.
    pub fn new(method: &str, url: Url) -> Self {
        Self { method: method.to_ascii_uppercase(), url, destination: Destination::Empty }
    }

    /// A plain GET subresource request.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    /// A GET full-page navigation.
    pub fn navigate(url: Url) -> Self {
        Self::get(url).with_destination(Destination::Document)
    }

    /// Parse the URL and build a request from it.
    pub fn parse(method: &str, url: &str) -> Result<Self, Error> {
        let url = Url::parse(url.trim()).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self::new(method, url))
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// True for `http` and `https` URLs; extension-internal and other
    /// schemes are never intercepted.
    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    pub fn is_navigation(&self) -> bool {
        self.destination == Destination::Document
    }

    pub fn identity(&self) -> RequestIdentity {
        RequestIdentity { method: self.method.clone(), url: self.url.to_string() }
    }
}

/// Method plus absolute URL; the key of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestIdentity {
    method: String,
    url: String,
}

impl RequestIdentity {
    /// Identity of a GET for `url`.
    pub fn get(url: &Url) -> Self {
        Self { method: "GET".into(), url: url.to_string() }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Storage key derived from method and URL.
    pub fn key(&self) -> String {
        compute_request_key(&self.method, &self.url)
    }
}
