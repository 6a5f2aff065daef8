//! CineStream Core - Fetching, identifier storage and configuration
//!
//! This crate provides the building blocks shared by the scraping pipeline:
//! the browser-like page fetcher, the time-bounded identifier store that
//! bridges catalog results to stream requests, configuration and tracing.

pub mod config;
pub mod network;
pub mod storage;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::CinestreamConfig;
pub use network::{FetchOptions, HttpFetcher, NetworkError, ProductionFetcher, SimulatedFetcher};
pub use storage::{IdentifierStore, StoreSweeper, StoredEntry};

/// Errors that can stop the application from starting.
///
/// Scraping failures never appear here; they are logged and degraded to
/// empty results inside the search crate.
#[derive(Debug, thiserror::Error)]
pub enum CinestreamError {
    #[error("Tracing setup failed: {reason}")]
    Tracing { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
