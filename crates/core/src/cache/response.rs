//! Captured responses and the cacheability capability.
//!
//! A [`CapturedResponse`] is whatever the network (or a synthesizer) handed
//! back. Only a [`CacheableResponse`] can be written to the store, and the
//! only way to get one is the checked conversion below: status 200 with the
//! `basic` (same-origin, non-opaque) type.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Response type discriminator, following the fetch model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response with readable headers and body.
    Basic,
    /// Cross-origin response the server opted into sharing.
    Cors,
    /// Cross-origin response that cannot be inspected or replayed.
    Opaque,
    /// Response synthesized locally rather than fetched.
    Default,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
            ResponseType::Default => "default",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ResponseType::Basic),
            "cors" => Ok(ResponseType::Cors),
            "opaque" => Ok(ResponseType::Opaque),
            "default" => Ok(ResponseType::Default),
            other => Err(Error::CorruptEntry(format!("unknown response type: {other}"))),
        }
    }
}

/// A response as received from the network or synthesized locally.
///
/// The body is reference-counted, so `clone` yields an independent handle
/// without copying: one copy goes to the caller, one to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedResponse {
    pub status: u16,
    pub status_text: String,
    pub response_type: ResponseType,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl CapturedResponse {
    pub fn new(status: u16, response_type: ResponseType, body: impl Into<Bytes>) -> Self {
        Self { status, status_text: String::new(), response_type, headers: Vec::new(), body: body.into() }
    }

    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = text.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First header value for `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.response_type == ResponseType::Basic
    }
}

/// A response proven eligible for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheableResponse(CapturedResponse);

impl CacheableResponse {
    pub fn response(&self) -> &CapturedResponse {
        &self.0
    }
}

impl TryFrom<CapturedResponse> for CacheableResponse {
    /// The response is handed back untouched when it is not cacheable.
    type Error = CapturedResponse;

    fn try_from(response: CapturedResponse) -> Result<Self, Self::Error> {
        if response.is_cacheable() { Ok(Self(response)) } else { Err(response) }
    }
}
