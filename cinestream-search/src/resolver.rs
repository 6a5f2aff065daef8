//! Boundary entry points: catalog, stream lookup and entry metadata.
//!
//! [`ContentResolver`] owns the aggregator, the identifier store and the
//! background sweeper. Search results leave the system only with the
//! identifier they were stored under, and later lookups come back through
//! that identifier.

use std::sync::Arc;

use cinestream_core::config::CinestreamConfig;
use cinestream_core::{HttpFetcher, IdentifierStore, StoreSweeper, StoredEntry};

use crate::aggregator::SourceAggregator;
use crate::errors::MediaSearchError;
use crate::sources::{ContentSource, SiteDescriptor, build_sources};
use crate::types::{CatalogEntry, MediaKind, ResolvedStream};

/// Facade over search, identifier assignment and stream resolution.
#[derive(Debug)]
pub struct ContentResolver {
    aggregator: SourceAggregator,
    store: Arc<IdentifierStore>,
    sweeper: Option<StoreSweeper>,
}

impl ContentResolver {
    /// Builds a resolver with one site source per descriptor.
    ///
    /// Starts the sweeper when enabled in `config`, so this must run inside a
    /// tokio runtime.
    ///
    /// # Errors
    /// - `MediaSearchError::InvalidDescriptor` - A descriptor contains a selector that does not parse
    pub fn new(
        config: &CinestreamConfig,
        fetcher: Arc<dyn HttpFetcher>,
        descriptors: Vec<SiteDescriptor>,
    ) -> Result<Self, MediaSearchError> {
        let sources = build_sources(descriptors, fetcher, &config.search)?;
        Ok(Self::with_sources(config, sources))
    }

    /// Builds a resolver over already constructed sources.
    pub fn with_sources(config: &CinestreamConfig, sources: Vec<Arc<dyn ContentSource>>) -> Self {
        let store = Arc::new(IdentifierStore::new());
        let mut aggregator = SourceAggregator::new(Arc::clone(&store), config.search.total_limit);
        for source in sources {
            aggregator.register(source);
        }

        let sweeper = StoreSweeper::from_config(&store, &config.store);
        tracing::info!(
            sources = aggregator.sources().len(),
            sweeper = sweeper.is_some(),
            "Content resolver ready"
        );

        Self {
            aggregator,
            store,
            sweeper,
        }
    }

    /// Searches every source and assigns an identifier to each result.
    pub async fn catalog(&self, query: &str, kind: MediaKind) -> Vec<CatalogEntry> {
        let query = query.trim();
        if query.is_empty() {
            tracing::debug!("Empty catalog query");
            return Vec::new();
        }

        self.aggregator
            .search_all(query, kind)
            .await
            .into_iter()
            .map(|result| CatalogEntry {
                id: self
                    .store
                    .store(&result.detail_url, &result.source_name, &result.title),
                result,
            })
            .collect()
    }

    /// Streams for an identifier issued by [`catalog`](Self::catalog).
    ///
    /// Unknown or expired identifiers yield an empty list.
    pub async fn streams(&self, id: &str) -> Vec<ResolvedStream> {
        self.aggregator.resolve_streams_for_identifier(id).await
    }

    /// Stored metadata for `id`, if it is still live.
    pub fn entry(&self, id: &str) -> Option<StoredEntry> {
        self.store.get_entry(id)
    }

    pub fn aggregator(&self) -> &SourceAggregator {
        &self.aggregator
    }

    pub fn store(&self) -> &Arc<IdentifierStore> {
        &self.store
    }

    /// Stops the sweeper task.
    pub async fn shutdown(mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.stop().await;
        }
        tracing::debug!(entries = self.store.size(), "Content resolver shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{MockBehavior, MockSource};

    fn resolver(sources: Vec<Arc<dyn ContentSource>>) -> ContentResolver {
        ContentResolver::with_sources(&CinestreamConfig::for_testing(), sources)
    }

    #[tokio::test]
    async fn test_catalog_assigns_stable_identifiers() {
        let resolver = resolver(vec![Arc::new(MockSource::new(
            "Alpha",
            MockBehavior::Results(2),
        ))]);

        let first = resolver.catalog("dune", MediaKind::Movie).await;
        let second = resolver.catalog("dune", MediaKind::Movie).await;

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert!(first[0].id.starts_with("alpha_"));
        assert_eq!(resolver.store().size(), 2);
    }

    #[tokio::test]
    async fn test_entry_reflects_store() {
        let resolver = resolver(vec![Arc::new(MockSource::new(
            "Alpha",
            MockBehavior::Results(1),
        ))]);
        let catalog = resolver.catalog("dune", MediaKind::Movie).await;
        let id = &catalog[0].id;

        let entry = resolver.entry(id).unwrap();
        assert_eq!(entry.title, "dune 0");
        assert_eq!(entry.source_name, "Alpha");

        resolver.store().clear();
        assert!(resolver.entry(id).is_none());
        assert!(resolver.streams(id).await.is_empty());
    }

    #[tokio::test]
    async fn test_streams_round_trip_through_identifier() {
        let resolver = resolver(vec![Arc::new(MockSource::new(
            "Alpha",
            MockBehavior::Results(1),
        ))]);
        let catalog = resolver.catalog("dune", MediaKind::Movie).await;

        let streams = resolver.streams(&catalog[0].id).await;

        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].play_url, "https://alpha.example/0/video.mp4");
    }

    #[tokio::test]
    async fn test_blank_query_is_not_searched() {
        let resolver = resolver(vec![Arc::new(MockSource::new(
            "Alpha",
            MockBehavior::Results(3),
        ))]);

        assert!(resolver.catalog("   ", MediaKind::Movie).await.is_empty());
        assert_eq!(resolver.store().size(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_sweeper() {
        let mut config = CinestreamConfig::for_testing();
        config.store.enable_sweeper = true;
        let resolver = ContentResolver::with_sources(&config, Vec::new());

        assert!(resolver.sweeper.as_ref().is_some_and(StoreSweeper::is_running));
        resolver.shutdown().await;
    }
}
