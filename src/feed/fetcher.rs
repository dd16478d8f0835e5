use futures::StreamExt;
use thiserror::Error;
use url::Url;

/// Root of the talks site the feeds are served from.
pub const DEFAULT_BASE_URL: &str = "http://talks.bham.ac.uk";

/// Days ahead to search, so only the coming week's talk is announced.
pub const SEARCH_WINDOW_DAYS: u32 = 6;

const SECONDS_PER_DAY: u64 = 86_400;
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while retrieving a feed.
///
/// Every variant is fatal for the run: there is no retry and no partial result.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The base URL from config could not be turned into a feed URL
    #[error("Invalid feed URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// Network-level error (DNS, connection refused, TLS, body read)
    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {status} from {url}")]
    HttpStatus { status: u16, url: String },
    /// Response body exceeded the size limit
    #[error("Response from {url} too large (exceeds {limit} bytes)")]
    ResponseTooLarge { url: String, limit: usize },
}

/// Builds the XML feed endpoint for a seminar list.
///
/// The talks site takes the search window as a seconds range relative to
/// today; the lower bound is always zero so past talks are never returned.
///
/// # Examples
///
/// ```
/// use talkbot::feed::build_feed_url;
///
/// let url = build_feed_url("http://talks.bham.ac.uk", 1234, 6).unwrap();
/// assert_eq!(
///     url.as_str(),
///     "http://talks.bham.ac.uk/show/xml/1234?seconds_before_today=0&seconds_after_today=518400"
/// );
/// ```
pub fn build_feed_url(base: &str, talks_id: u64, window_days: u32) -> Result<Url, FetchError> {
    let raw = format!("{}/show/xml/{}", base.trim_end_matches('/'), talks_id);
    let mut url = Url::parse(&raw).map_err(|source| FetchError::InvalidUrl {
        url: raw.clone(),
        source,
    })?;

    let seconds = u64::from(window_days) * SECONDS_PER_DAY;
    url.query_pairs_mut()
        .append_pair("seconds_before_today", "0")
        .append_pair("seconds_after_today", &seconds.to_string());

    Ok(url)
}

/// Human-facing page listing every talk in a series.
///
/// # Examples
///
/// ```
/// use talkbot::feed::talks_page_url;
///
/// assert_eq!(
///     talks_page_url("http://talks.bham.ac.uk/", 1234),
///     "http://talks.bham.ac.uk/show/index/1234"
/// );
/// ```
pub fn talks_page_url(base: &str, talks_id: u64) -> String {
    format!("{}/show/index/{}", base.trim_end_matches('/'), talks_id)
}

/// Fetches a feed with a single GET request.
///
/// # Errors
///
/// - [`FetchError::Network`] - Connection, TLS or body read errors
/// - [`FetchError::HttpStatus`] - Any non-2xx response, including 5xx (never retried)
/// - [`FetchError::ResponseTooLarge`] - Body exceeded 10MB
pub async fn fetch(client: &reqwest::Client, url: &Url) -> Result<Vec<u8>, FetchError> {
    fetch_with_limit(client, url, MAX_FEED_SIZE).await
}

async fn fetch_with_limit(
    client: &reqwest::Client,
    url: &Url,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    tracing::debug!(url = %url, "Requesting talks feed");

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        tracing::error!(url = %url, status = %status, "Could not get talks feed");
        return Err(FetchError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let bytes = read_limited_bytes(response, url, limit).await?;
    tracing::debug!(url = %url, bytes = bytes.len(), "Fetched talks feed");
    Ok(bytes)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    url: &Url,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let too_large = || FetchError::ResponseTooLarge {
        url: url.to_string(),
        limit,
    };

    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(too_large());
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(too_large());
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
