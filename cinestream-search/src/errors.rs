//! Error types for search and stream resolution.

use cinestream_core::NetworkError;
use thiserror::Error;

/// Errors that can occur inside the search pipeline.
///
/// Only `InvalidDescriptor`, `InvalidPattern` and `InvalidSiteFile` escape
/// to callers, at construction time. The rest are logged and degraded to
/// empty results at the source and aggregator boundaries.
#[derive(Debug, Error)]
pub enum MediaSearchError {
    /// Fetching a page failed.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// No stored entry for the identifier.
    #[error("Unknown identifier: {id}")]
    UnknownIdentifier {
        /// The identifier that was looked up
        id: String,
    },

    /// The stored source name matches no registered source.
    #[error("Unknown source: {name}")]
    UnknownSource {
        /// The stored source name
        name: String,
    },

    /// A site descriptor contains a selector that does not parse.
    #[error("Invalid selector '{selector}' for source '{source_name}': {reason}")]
    InvalidDescriptor {
        /// Display name of the offending source
        source_name: String,
        /// The selector text
        selector: String,
        /// Parser message
        reason: String,
    },

    /// A built-in extraction pattern failed to compile.
    #[error("Invalid extraction pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern text
        pattern: String,
        /// Parser message
        reason: String,
    },

    /// A site descriptor file could not be read or parsed.
    #[error("Invalid site file: {reason}")]
    InvalidSiteFile {
        /// The reason for the failure
        reason: String,
    },

    /// A source failed in a way specific to its implementation.
    #[error("Source '{source_name}' failed: {reason}")]
    SourceFailed {
        /// Display name of the source
        source_name: String,
        /// The reason for the failure
        reason: String,
    },
}
