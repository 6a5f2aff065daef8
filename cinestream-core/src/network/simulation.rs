//! Simulated fetcher for deterministic testing

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{FetchOptions, HttpFetcher, NetworkError};

/// Simulated page fetcher for testing
///
/// Serves canned documents keyed by exact URL without real network calls.
/// Unknown URLs answer with HTTP 404. Every request is recorded so tests can
/// assert how many hops the pipeline performed.
#[derive(Debug, Default)]
pub struct SimulatedFetcher {
    pages: Mutex<HashMap<String, String>>,
    failures: Mutex<HashMap<String, NetworkError>>,
    requests: Mutex<Vec<String>>,
}

impl SimulatedFetcher {
    /// Creates an empty simulated fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`SimulatedFetcher::add_page`].
    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.add_page(url, html);
        self
    }

    /// Serve `html` for requests to `url`.
    pub fn add_page(&self, url: &str, html: &str) {
        self.pages.lock().insert(url.to_string(), html.to_string());
    }

    /// Make requests to `url` fail with `error`.
    pub fn add_failure(&self, url: &str, error: NetworkError) {
        self.failures.lock().insert(url.to_string(), error);
    }

    /// Number of requests made for `url`.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.requests.lock().iter().filter(|r| *r == url).count()
    }

    /// Total number of requests made.
    pub fn total_fetches(&self) -> usize {
        self.requests.lock().len()
    }

    /// All requested URLs in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl HttpFetcher for SimulatedFetcher {
    async fn fetch_with(&self, url: &str, _options: &FetchOptions) -> Result<String, NetworkError> {
        self.requests.lock().push(url.to_string());

        if let Some(error) = self.failures.lock().get(url) {
            tracing::debug!(url = %url, "Simulating fetch failure");
            return Err(error.clone());
        }

        self.pages
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| NetworkError::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
    }
}
