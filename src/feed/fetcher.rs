use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

use crate::util::validate_url;

/// Upper bound on a feed body (10MB)
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024;

/// Default bound on one whole fetch, request and body
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_REDIRECTS: usize = 10;

const USER_AGENT: &str = concat!("feedpoll/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur while fetching a feed.
///
/// [`FetchError::RateLimited`] is the only variant the scheduler treats
/// differently; everything else is an ordinary fetch failure.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Server answered 429 Too Many Requests
    #[error("Rate limited (HTTP 429)")]
    RateLimited,
    /// HTTP response with a non-2xx status other than 429
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Network-level error (DNS, connection, TLS, body read)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// The fetch did not complete within the configured bound
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
}

impl FetchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited)
    }
}

/// Single-shot HTTP retrieval of feed bytes.
///
/// No retries happen here; retry timing belongs to the scheduler's
/// checkpoints.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect_policy())
            .build()?;
        Ok(Self { client, timeout })
    }

    /// GET `url` and return the body of a 2xx response.
    ///
    /// # Errors
    ///
    /// - [`FetchError::RateLimited`] - status 429
    /// - [`FetchError::HttpStatus`] - any other non-2xx status
    /// - [`FetchError::Timeout`] - request plus body took longer than the bound
    /// - [`FetchError::Network`] - connection, TLS or body-read failure
    /// - [`FetchError::ResponseTooLarge`] - body exceeded 10MB
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tokio::time::timeout(self.timeout, self.fetch_unbounded(url))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))?
    }

    async fn fetch_unbounded(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        read_limited_bytes(response, MAX_FEED_SIZE).await
    }
}

/// Follow at most [`MAX_REDIRECTS`] hops, re-validating every target so a
/// public feed cannot redirect the poller into the local network.
fn redirect_policy() -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        match validate_url(attempt.url().as_str()) {
            Ok(_) => attempt.follow(),
            Err(e) => {
                tracing::warn!(target_url = %attempt.url(), error = %e, "Refusing redirect");
                attempt.error(e)
            }
        }
    })
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
