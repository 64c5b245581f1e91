//! URL helpers for origins and request targets.

use url::Url;

/// Error type for origin and request URL parsing.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Parse a configured origin such as `https://blog.example.com`.
///
/// Only http(s) origins are accepted. Any path, query or fragment is
/// dropped so the result is the origin root (`https://blog.example.com/`).
pub fn parse_origin(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    let origin = parsed.origin().ascii_serialization();
    Url::parse(&format!("{origin}/")).map_err(|e| UrlError::InvalidUrl(e.to_string()))
}

/// Resolve a request target against the origin.
///
/// Absolute URLs of any scheme are kept as-is (non-HTTP schemes are later
/// bypassed by the interceptor); paths starting with `/` are joined onto the
/// origin. The fragment is removed, since it never reaches the network.
pub fn resolve(origin: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = if trimmed.starts_with('/') { origin.join(trimmed) } else { Url::parse(trimmed) };
    let mut resolved = parsed.map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    resolved.set_fragment(None);
    Ok(resolved)
}

/// True when both URLs share scheme, host and port.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

/// The origin root URL (`<origin>/`) of `url`.
pub fn origin_root(url: &Url) -> String {
    format!("{}/", url.origin().ascii_serialization())
}
