//! Mock source implementation for testing.

#[cfg(test)]
use std::sync::Mutex;
#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
use async_trait::async_trait;

#[cfg(test)]
use super::ContentSource;
#[cfg(test)]
use crate::errors::MediaSearchError;
#[cfg(test)]
use crate::types::{MediaCandidate, MediaFormat, MediaKind, ResolvedStream, SearchResult};

/// How a mock source answers searches.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub enum MockBehavior {
    /// Return this many results
    Results(usize),
    /// Return `Err(SourceFailed)`
    Fail,
    /// Panic inside the search task
    Panic,
    /// Sleep, then return this many results
    Delayed(Duration, usize),
}

/// Mock source for testing.
#[cfg(test)]
#[derive(Debug)]
pub struct MockSource {
    name: String,
    behavior: MockBehavior,
    resolved: Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockSource {
    /// Creates a mock source answering with `behavior`.
    pub fn new(name: &str, behavior: MockBehavior) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            resolved: Mutex::new(Vec::new()),
        }
    }

    /// Detail URLs passed to `resolve_streams`, in call order.
    pub fn resolved_urls(&self) -> Vec<String> {
        self.resolved.lock().unwrap().clone()
    }

    fn results(&self, query: &str, kind: MediaKind, count: usize) -> Vec<SearchResult> {
        (0..count)
            .map(|i| SearchResult {
                title: format!("{query} {i}"),
                detail_url: format!("https://{}.example/{i}", self.name.to_lowercase()),
                poster_url: None,
                media_kind: kind,
                source_name: self.name.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
#[async_trait]
impl ContentSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn base_url(&self) -> &str {
        "https://mock.example"
    }

    async fn search(
        &self,
        query: &str,
        kind: MediaKind,
    ) -> Result<Vec<SearchResult>, MediaSearchError> {
        match self.behavior {
            MockBehavior::Results(count) => Ok(self.results(query, kind, count)),
            MockBehavior::Fail => Err(MediaSearchError::SourceFailed {
                source_name: self.name.clone(),
                reason: "mock failure".to_string(),
            }),
            MockBehavior::Panic => panic!("mock source panicked"),
            MockBehavior::Delayed(delay, count) => {
                tokio::time::sleep(delay).await;
                Ok(self.results(query, kind, count))
            }
        }
    }

    async fn resolve_streams(
        &self,
        detail_url: &str,
    ) -> Result<Vec<ResolvedStream>, MediaSearchError> {
        self.resolved.lock().unwrap().push(detail_url.to_string());
        Ok(vec![ResolvedStream::from_candidate(
            &self.name,
            MediaCandidate {
                url: format!("{detail_url}/video.mp4"),
                format: MediaFormat::DirectFile,
                quality: "720p".to_string(),
            },
        )])
    }
}
