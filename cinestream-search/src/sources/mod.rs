//! Content source implementations.

use async_trait::async_trait;

use crate::errors::MediaSearchError;
use crate::types::{MediaKind, ResolvedStream, SearchResult};

pub mod catalog;
pub mod mock;
pub mod site;

pub use catalog::{builtin_descriptors, build_sources, load_descriptors};
#[cfg(test)]
pub use mock::{MockBehavior, MockSource};
pub use site::{SiteDescriptor, SiteSource};

/// A content website the system can search and resolve streams from.
///
/// Implementations are expected to swallow site failures and return empty
/// lists; an `Err` is still tolerated by the aggregator, which logs it and
/// carries on with the other sources.
#[async_trait]
pub trait ContentSource: Send + Sync + std::fmt::Debug {
    /// Display name, also recorded with every stored identifier.
    fn name(&self) -> &str;

    /// Root URL of the site.
    fn base_url(&self) -> &str;

    /// Search the site for `query`.
    ///
    /// # Errors
    /// - `MediaSearchError::SourceFailed` - Implementation-specific failure
    async fn search(
        &self,
        query: &str,
        kind: MediaKind,
    ) -> Result<Vec<SearchResult>, MediaSearchError>;

    /// Resolve a detail page into playable streams.
    ///
    /// # Errors
    /// - `MediaSearchError::SourceFailed` - Implementation-specific failure
    async fn resolve_streams(
        &self,
        detail_url: &str,
    ) -> Result<Vec<ResolvedStream>, MediaSearchError>;
}
