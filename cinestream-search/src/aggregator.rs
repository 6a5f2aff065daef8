//! Fan-out search across all registered sources.

use std::sync::Arc;

use cinestream_core::{IdentifierStore, StoredEntry};

use crate::errors::MediaSearchError;
use crate::sources::ContentSource;
use crate::types::{MediaKind, ResolvedStream, SearchResult};

/// Runs every registered source concurrently and merges their answers.
///
/// Results are concatenated in registration order regardless of which source
/// finishes first. A source that errors or panics contributes nothing.
#[derive(Debug)]
pub struct SourceAggregator {
    sources: Vec<Arc<dyn ContentSource>>,
    store: Arc<IdentifierStore>,
    total_limit: usize,
}

impl SourceAggregator {
    pub fn new(store: Arc<IdentifierStore>, total_limit: usize) -> Self {
        Self {
            sources: Vec::new(),
            store,
            total_limit,
        }
    }

    /// Appends `source`; registration order is result order.
    pub fn register(&mut self, source: Arc<dyn ContentSource>) {
        tracing::debug!(source = %source.name(), "Registered source");
        self.sources.push(source);
    }

    pub fn sources(&self) -> &[Arc<dyn ContentSource>] {
        &self.sources
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|source| source.name()).collect()
    }

    pub fn store(&self) -> &Arc<IdentifierStore> {
        &self.store
    }

    /// Searches all sources and returns at most `total_limit` results.
    pub async fn search_all(&self, query: &str, kind: MediaKind) -> Vec<SearchResult> {
        let handles: Vec<_> = self
            .sources
            .iter()
            .map(|source| {
                let source = Arc::clone(source);
                let query = query.to_string();
                tokio::spawn(async move { source.search(&query, kind).await })
            })
            .collect();

        let mut merged = Vec::new();
        for (source, handle) in self.sources.iter().zip(handles) {
            match handle.await {
                Ok(Ok(results)) => {
                    tracing::debug!(source = %source.name(), found = results.len(), "Source answered");
                    merged.extend(results);
                }
                Ok(Err(e)) => {
                    tracing::warn!(source = %source.name(), error = %e, "Source search failed");
                }
                Err(e) => {
                    tracing::warn!(source = %source.name(), error = %e, "Source search task aborted");
                }
            }
        }

        merged.truncate(self.total_limit);
        tracing::info!(query = %query, %kind, results = merged.len(), "Aggregated search completed");
        merged
    }

    /// Registered source whose name equals `name`, ignoring ASCII case.
    pub fn find_source(&self, name: &str) -> Option<Arc<dyn ContentSource>> {
        self.sources
            .iter()
            .find(|source| source.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Stored entry for `id` together with the source that produced it.
    ///
    /// # Errors
    /// - `MediaSearchError::UnknownIdentifier` - `id` is not in the store
    /// - `MediaSearchError::UnknownSource` - No registered source matches the stored name
    pub fn lookup(
        &self,
        id: &str,
    ) -> Result<(StoredEntry, Arc<dyn ContentSource>), MediaSearchError> {
        let entry = self
            .store
            .get_entry(id)
            .ok_or_else(|| MediaSearchError::UnknownIdentifier { id: id.to_string() })?;
        let source = self
            .find_source(&entry.source_name)
            .ok_or_else(|| MediaSearchError::UnknownSource {
                name: entry.source_name.clone(),
            })?;
        Ok((entry, source))
    }

    /// Streams for a previously issued identifier, empty when it cannot be resolved.
    pub async fn resolve_streams_for_identifier(&self, id: &str) -> Vec<ResolvedStream> {
        let (entry, source) = match self.lookup(id) {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(id = %id, error = %e, "Cannot resolve identifier");
                return Vec::new();
            }
        };

        match source.resolve_streams(&entry.source_url).await {
            Ok(streams) => streams,
            Err(e) => {
                tracing::warn!(source = %source.name(), id = %id, error = %e, "Stream resolution failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::sources::{MockBehavior, MockSource};

    fn aggregator(sources: Vec<Arc<dyn ContentSource>>) -> SourceAggregator {
        let mut aggregator = SourceAggregator::new(Arc::new(IdentifierStore::new()), 20);
        for source in sources {
            aggregator.register(source);
        }
        aggregator
    }

    #[tokio::test]
    async fn test_failing_sources_are_isolated() {
        let aggregator = aggregator(vec![
            Arc::new(MockSource::new("Alpha", MockBehavior::Results(3))),
            Arc::new(MockSource::new("Broken", MockBehavior::Fail)),
            Arc::new(MockSource::new("Crashy", MockBehavior::Panic)),
            Arc::new(MockSource::new("Gamma", MockBehavior::Results(2))),
        ]);

        let results = aggregator.search_all("dune", MediaKind::Movie).await;

        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| r.source_name != "Broken"));
    }

    #[tokio::test]
    async fn test_results_follow_registration_order() {
        let aggregator = aggregator(vec![
            Arc::new(MockSource::new(
                "Slow",
                MockBehavior::Delayed(Duration::from_millis(50), 2),
            )),
            Arc::new(MockSource::new("Fast", MockBehavior::Results(2))),
        ]);

        let results = aggregator.search_all("dune", MediaKind::Series).await;
        let names: Vec<&str> = results.iter().map(|r| r.source_name.as_str()).collect();

        assert_eq!(names, vec!["Slow", "Slow", "Fast", "Fast"]);
        assert!(results.iter().all(|r| r.media_kind == MediaKind::Series));
    }

    #[tokio::test]
    async fn test_total_is_capped() {
        let aggregator = aggregator(
            (0..3)
                .map(|i| {
                    Arc::new(MockSource::new(&format!("S{i}"), MockBehavior::Results(10)))
                        as Arc<dyn ContentSource>
                })
                .collect(),
        );

        let results = aggregator.search_all("x", MediaKind::Movie).await;

        assert_eq!(results.len(), 20);
        assert_eq!(results[19].source_name, "S1");
    }

    #[tokio::test]
    async fn test_no_sources_yields_nothing() {
        let aggregator = aggregator(Vec::new());
        assert!(aggregator.search_all("x", MediaKind::Movie).await.is_empty());
    }

    #[test]
    fn test_find_source_ignores_case() {
        let aggregator = aggregator(vec![Arc::new(MockSource::new(
            "VegaMovies",
            MockBehavior::Results(0),
        ))]);

        assert!(aggregator.find_source("vegamovies").is_some());
        assert!(aggregator.find_source("VEGAMOVIES").is_some());
        assert!(aggregator.find_source("vega").is_none());
    }

    #[tokio::test]
    async fn test_resolve_identifier_routes_to_source() {
        let source = Arc::new(MockSource::new("Alpha", MockBehavior::Results(1)));
        let aggregator = aggregator(vec![source.clone() as Arc<dyn ContentSource>]);
        let id = aggregator
            .store()
            .store("https://alpha.example/0", "alpha", "Dune 0");

        let streams = aggregator.resolve_streams_for_identifier(&id).await;

        assert_eq!(streams.len(), 1);
        assert_eq!(source.resolved_urls(), vec!["https://alpha.example/0"]);
    }

    #[tokio::test]
    async fn test_unresolvable_identifiers_yield_nothing() {
        let aggregator = aggregator(vec![Arc::new(MockSource::new(
            "Alpha",
            MockBehavior::Results(1),
        ))]);
        let orphan = aggregator
            .store()
            .store("https://gone.example/1", "Gone", "Orphan");

        assert!(aggregator.resolve_streams_for_identifier("nope_123").await.is_empty());
        assert!(aggregator.resolve_streams_for_identifier(&orphan).await.is_empty());
        assert!(matches!(
            aggregator.lookup("nope_123"),
            Err(MediaSearchError::UnknownIdentifier { .. })
        ));
        assert!(matches!(
            aggregator.lookup(&orphan),
            Err(MediaSearchError::UnknownSource { .. })
        ));
    }
}
