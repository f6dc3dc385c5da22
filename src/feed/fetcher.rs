use std::collections::HashMap;
use std::time::Duration;

use futures::stream::StreamExt;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
    LOCATION,
};
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use super::model::Feed;
use super::parser::{parse, ParseOptions};
use super::FeedError;

/// Maximum number of redirects followed before giving up.
pub const MAX_REDIRECTS: usize = 5;
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("feedscan/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur while fetching a feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL (or a redirect target) could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// A configured request header name or value is not valid HTTP
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with a status other than 2xx or 304
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// More redirects than [`MAX_REDIRECTS`]
    #[error("Too many redirects (followed {0})")]
    TooManyRedirects(usize),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// The body was fetched but is not a feed
    #[error("Parse error: {0}")]
    Parse(#[from] FeedError),
}

/// Options for a single conditional GET.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Bounds each request, not parsing.
    pub timeout: Duration,
    /// Sent as `If-None-Match`.
    pub etag: Option<String>,
    /// Sent as `If-Modified-Since`.
    pub last_modified: Option<String>,
    /// Extra request headers.
    pub headers: HashMap<String, String>,
    pub follow_redirects: bool,
    pub parse: ParseOptions,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            etag: None,
            last_modified: None,
            headers: HashMap::new(),
            follow_redirects: true,
            parse: ParseOptions::default(),
        }
    }
}

/// What a conditional GET produced.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The body parsed into a feed carrying the response's cache tokens.
    Fetched(Feed),
    /// HTTP 304: the cached copy is still current.
    NotModified,
}

/// Builds a client for [`fetch`]. Automatic redirects are disabled so that the
/// fetcher's own hop limit applies.
pub fn build_client(user_agent: Option<&str>) -> Result<reqwest::Client, FetchError> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    Ok(client)
}

/// Fetches `url` with a conditional GET and parses the body.
///
/// # Errors
///
/// - [`FetchError::InvalidUrl`] - `url` or a `Location` header is not a valid URL
/// - [`FetchError::Network`] - Connection or TLS errors
/// - [`FetchError::Timeout`] - A request exceeded `options.timeout`
/// - [`FetchError::HttpStatus`] - Non-2xx response (including 3xx when redirects are off)
/// - [`FetchError::TooManyRedirects`] - More than [`MAX_REDIRECTS`] hops
/// - [`FetchError::ResponseTooLarge`] - Body exceeded 10MB
/// - [`FetchError::Parse`] - Body has no channel/feed container
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    options: &FetchOptions,
) -> Result<FetchOutcome, FetchError> {
    let mut current =
        Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
    let headers = request_headers(options)?;
    let mut redirects = 0;

    let response = loop {
        let response = tokio::time::timeout(
            options.timeout,
            client.get(current.clone()).headers(headers.clone()).send(),
        )
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::Network)?;

        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            tracing::debug!(feed = %current, "Feed not modified");
            return Ok(FetchOutcome::NotModified);
        }

        if status.is_redirection() && options.follow_redirects {
            let Some(location) = header_str(response.headers(), LOCATION) else {
                return Err(FetchError::HttpStatus(status.as_u16()));
            };
            if redirects >= MAX_REDIRECTS {
                return Err(FetchError::TooManyRedirects(redirects));
            }
            let next = current.join(&location).map_err(|e| {
                tracing::warn!(
                    feed = %current,
                    location = %location,
                    error = %e,
                    "Unusable redirect location"
                );
                FetchError::InvalidUrl(format!("{location}: {e}"))
            })?;
            tracing::debug!(from = %current, to = %next, status = %status, "Following redirect");
            current = next;
            redirects += 1;
            continue;
        }

        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }
        break response;
    };

    let etag = header_str(response.headers(), ETAG);
    let last_modified = header_str(response.headers(), LAST_MODIFIED);
    let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;

    let mut feed = parse(&bytes, &options.parse)?;
    feed.set_cache_tokens(etag, last_modified);
    tracing::debug!(feed = %current, entries = feed.len(), redirects, "Fetched feed");
    Ok(FetchOutcome::Fetched(feed))
}

fn request_headers(options: &FetchOptions) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();
    if let Some(etag) = &options.etag {
        headers.insert(IF_NONE_MATCH, header_value(etag)?);
    }
    if let Some(last_modified) = &options.last_modified {
        headers.insert(IF_MODIFIED_SINCE, header_value(last_modified)?);
    }
    for (name, value) in &options.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| FetchError::InvalidHeader(format!("{name}: {e}")))?;
        headers.insert(name, header_value(value)?);
    }
    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue, FetchError> {
    HeaderValue::from_str(value)
        .map_err(|e| FetchError::InvalidHeader(format!("{value:?}: {e}")))
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Capture Content-Length for completeness check
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
