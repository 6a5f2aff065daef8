//! Network abstraction layer for production and simulation environments
//!
//! Every page the system reads comes through [`HttpFetcher`]. The production
//! implementation dresses requests up as a desktop browser, bounds them in
//! time and redirect depth, and only reads text documents up to a size cap.
//! The simulated one serves canned documents so the scraping pipeline can be
//! driven deterministically.

pub mod simulation;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{
    ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue,
    REFERER, USER_AGENT,
};
pub use simulation::SimulatedFetcher;
use url::Url;

use crate::config::FetchConfig;

/// Failures of a single page fetch.
///
/// Callers in the scraping pipeline treat every variant as routine: they log
/// it and degrade to an empty result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("Failed to connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Too many redirects for {url}")]
    TooManyRedirects { url: String },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid header override '{name}'")]
    InvalidHeader { name: String },

    #[error("Failed to read response body from {url}: {reason}")]
    BodyRead { url: String, reason: String },

    #[error("Unsupported content type '{content_type}' from {url}")]
    UnsupportedContentType { url: String, content_type: String },

    #[error("Response body from {url} exceeds {limit} bytes")]
    BodyTooLarge { url: String, limit: usize },

    #[error("HTTP client construction failed: {reason}")]
    ClientBuild { reason: String },
}

/// Per-request adjustments on top of the fetcher's browser headers.
///
/// Headers given here replace the defaults of the same name, including the
/// derived `Referer`.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub headers: Vec<(String, String)>,
}

impl FetchOptions {
    /// Adds or replaces a header for this request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Page fetching abstraction
///
/// Enables both production HTTP clients and simulation environments
/// to feed the same extraction logic.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Fetches `url` and returns the document text, applying `options`.
    ///
    /// # Errors
    ///
    /// - `NetworkError::Timeout` - Request exceeded the configured timeout
    /// - `NetworkError::ConnectionFailed` - DNS or connection failure
    /// - `NetworkError::HttpStatus` - Non-2xx response
    /// - `NetworkError::TooManyRedirects` - Redirect limit exceeded
    /// - `NetworkError::UnsupportedContentType` - Response is not a text document
    /// - `NetworkError::BodyTooLarge` - Body exceeds the configured size cap
    async fn fetch_with(&self, url: &str, options: &FetchOptions) -> Result<String, NetworkError>;

    /// Fetches `url` with the default browser headers.
    ///
    /// # Errors
    ///
    /// Same as [`HttpFetcher::fetch_with`].
    async fn fetch(&self, url: &str) -> Result<String, NetworkError> {
        self.fetch_with(url, &FetchOptions::default()).await
    }
}

/// Returns the origin of `url` (`scheme://host[:port]`) used as its referer.
///
/// # Errors
///
/// - `NetworkError::InvalidUrl` - If `url` is not an absolute URL with a host
pub fn referer_for(url: &str) -> Result<String, NetworkError> {
    let parsed = Url::parse(url).map_err(|e| NetworkError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let origin = parsed.origin();
    if !origin.is_tuple() {
        return Err(NetworkError::InvalidUrl {
            url: url.to_string(),
            reason: "URL has no origin".to_string(),
        });
    }

    Ok(origin.ascii_serialization())
}

/// Whether a `Content-Type` value names a document worth parsing.
///
/// Accepts `text/*` and XML flavours such as `application/xhtml+xml`.
pub fn is_document_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence.starts_with("text/") || essence.ends_with("/xml") || essence.ends_with("+xml")
}

/// Production HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct ProductionFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_body_bytes: usize,
}

impl ProductionFetcher {
    /// Creates a fetcher with browser-like default headers.
    ///
    /// # Errors
    ///
    /// - `NetworkError::ClientBuild` - If the TLS backend or header values are rejected
    pub fn new(config: &FetchConfig) -> Result<Self, NetworkError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(config.accept));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(config.accept_language),
        );
        headers.insert(
            ACCEPT_ENCODING,
            HeaderValue::from_static(config.accept_encoding),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(config.user_agent));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| NetworkError::ClientBuild {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            timeout: config.timeout,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Returns current timeout setting
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the body size cap in bytes
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Reads the body chunk by chunk, giving up once it outgrows the cap.
    async fn read_body(
        &self,
        url: &str,
        mut response: reqwest::Response,
    ) -> Result<String, NetworkError> {
        let too_large = || NetworkError::BodyTooLarge {
            url: url.to_string(),
            limit: self.max_body_bytes,
        };

        if response
            .content_length()
            .is_some_and(|length| length > self.max_body_bytes as u64)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) if e.is_timeout() => {
                    return Err(NetworkError::Timeout {
                        url: url.to_string(),
                    });
                }
                Err(e) => {
                    return Err(NetworkError::BodyRead {
                        url: url.to_string(),
                        reason: e.to_string(),
                    });
                }
            };

            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    fn request_headers(url: &str, options: &FetchOptions) -> Result<HeaderMap, NetworkError> {
        let mut headers = HeaderMap::new();

        let referer = referer_for(url)?;
        let referer = HeaderValue::from_str(&referer).map_err(|_| NetworkError::InvalidHeader {
            name: REFERER.to_string(),
        })?;
        headers.insert(REFERER, referer);

        for (name, value) in &options.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| NetworkError::InvalidHeader { name: name.clone() })?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| NetworkError::InvalidHeader { name: name.clone() })?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }

    fn classify_error(url: &str, error: reqwest::Error) -> NetworkError {
        if error.is_timeout() {
            NetworkError::Timeout {
                url: url.to_string(),
            }
        } else if error.is_redirect() {
            NetworkError::TooManyRedirects {
                url: url.to_string(),
            }
        } else if let Some(status) = error.status() {
            NetworkError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            NetworkError::ConnectionFailed {
                url: url.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl HttpFetcher for ProductionFetcher {
    async fn fetch_with(&self, url: &str, options: &FetchOptions) -> Result<String, NetworkError> {
        let headers = Self::request_headers(url, options)?;

        tracing::debug!(url = %url, "Fetching page");

        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| Self::classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // A missing Content-Type is accepted
        if let Some(content_type) = response.headers().get(CONTENT_TYPE) {
            let content_type = String::from_utf8_lossy(content_type.as_bytes()).into_owned();
            if !is_document_type(&content_type) {
                return Err(NetworkError::UnsupportedContentType {
                    url: url.to_string(),
                    content_type,
                });
            }
        }

        self.read_body(url, response).await
    }
}
