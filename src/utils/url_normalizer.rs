//! Target URL validation and host normalization for metrics keys.

use url::Url;

/// Errors that can occur while normalizing a URL.
#[derive(Debug, thiserror::Error)]
pub enum UrlNormalizationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("URL has no host")]
    MissingHost,
}

fn parse_http(input: &str) -> Result<Url, UrlNormalizationError> {
    let url = Url::parse(input).map_err(|e| UrlNormalizationError::InvalidFormat(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(UrlNormalizationError::UnsupportedProtocol),
    }
}

/// Normalizes a shortening target to a canonical form.
///
/// The scheme must be `http` or `https`. The `url` crate lowercases the host
/// and drops default ports while parsing; the fragment is removed here.
/// Path and query are preserved byte for byte.
///
/// # Errors
///
/// Returns [`UrlNormalizationError::InvalidFormat`] for malformed input,
/// [`UrlNormalizationError::UnsupportedProtocol`] for non-HTTP(S) schemes and
/// [`UrlNormalizationError::MissingHost`] when no host is present.
pub fn normalize_url(input: &str) -> Result<String, UrlNormalizationError> {
    let mut url = parse_http(input)?;

    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlNormalizationError::MissingHost);
    }

    url.set_fragment(None);

    Ok(url.to_string())
}

/// Extracts the key under which host metrics are aggregated.
///
/// The scheme, port, credentials and path are dropped, the host is lowercased
/// and a leading `www.` label is stripped, so `https://WWW.Example.com:8080/a`
/// and `http://example.com/b` share the key `example.com`.
///
/// # Errors
///
/// Same as [`normalize_url`].
pub fn metric_host(input: &str) -> Result<String, UrlNormalizationError> {
    let url = parse_http(input)?;

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(UrlNormalizationError::MissingHost)?
        .to_ascii_lowercase();

    Ok(match host.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => host,
    })
}
