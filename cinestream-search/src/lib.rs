//! CineStream Search - Multi-site content search and stream resolution
//!
//! Scrapes a set of content websites for a query, hands out stable
//! identifiers for the results, and later turns an identifier back into
//! playable stream URLs by extracting media references from the detail page
//! and following embedded players one level deep.

pub mod aggregator;
pub mod errors;
pub mod extractor;
pub mod resolver;
pub mod sources;
pub mod types;

// Re-export main types
pub use aggregator::SourceAggregator;
pub use errors::MediaSearchError;
pub use extractor::MediaExtractor;
pub use resolver::ContentResolver;
pub use sources::{ContentSource, SiteDescriptor, SiteSource, builtin_descriptors, load_descriptors};
pub use types::{CatalogEntry, MediaCandidate, MediaFormat, MediaKind, ResolvedStream, SearchResult};

/// Convenience type alias for Results with MediaSearchError.
pub type Result<T> = std::result::Result<T, MediaSearchError>;
