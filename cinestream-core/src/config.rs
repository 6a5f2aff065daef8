//! Centralized configuration for CineStream.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::time::Duration;

/// Central configuration for all CineStream components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct CinestreamConfig {
    pub fetch: FetchConfig,
    pub search: SearchConfig,
    pub store: StoreConfig,
}

/// HTTP fetching configuration.
///
/// Content sites reject obvious bots, so every request presents itself as a
/// desktop browser. Timeout, redirect and body size bounds apply to every fetch.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Whole-request timeout
    pub timeout: Duration,
    /// Maximum redirect hops before the request fails
    pub max_redirects: usize,
    /// Largest response body read before the fetch is abandoned
    pub max_body_bytes: usize,
    /// User agent for HTTP requests
    pub user_agent: &'static str,
    pub accept: &'static str,
    pub accept_language: &'static str,
    pub accept_encoding: &'static str,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_redirects: 5,
            max_body_bytes: 5 * 1024 * 1024,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            accept_language: "en-US,en;q=0.5",
            accept_encoding: "gzip, deflate",
        }
    }
}

/// Search fan-out and stream resolution limits.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Maximum results kept from a single source
    pub per_source_limit: usize,
    /// Maximum results returned by a merged search
    pub total_limit: usize,
    /// Maximum embed hops running at once while resolving one page
    pub embed_concurrency: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            per_source_limit: 10,
            total_limit: 20,
            embed_concurrency: 4,
        }
    }
}

/// Identifier store retention.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Entries older than this are removed by the sweeper
    pub max_age: Duration,
    /// How often the sweeper runs
    pub sweep_interval: Duration,
    /// Start the background sweeper when the store is created
    pub enable_sweeper: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(24 * 60 * 60),
            sweep_interval: Duration::from_secs(60 * 60),
            enable_sweeper: true,
        }
    }
}

impl CinestreamConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(seconds) = env_parse::<u64>("CINESTREAM_FETCH_TIMEOUT") {
            config.fetch.timeout = Duration::from_secs(seconds);
        }

        if let Some(hops) = env_parse::<usize>("CINESTREAM_MAX_REDIRECTS") {
            config.fetch.max_redirects = hops;
        }

        if let Some(bytes) = env_parse::<usize>("CINESTREAM_MAX_BODY_BYTES") {
            config.fetch.max_body_bytes = bytes;
        }

        if let Some(limit) = env_parse::<usize>("CINESTREAM_SOURCE_LIMIT") {
            config.search.per_source_limit = limit;
        }

        if let Some(limit) = env_parse::<usize>("CINESTREAM_TOTAL_LIMIT") {
            config.search.total_limit = limit;
        }

        if let Some(seconds) = env_parse::<u64>("CINESTREAM_STORE_MAX_AGE") {
            config.store.max_age = Duration::from_secs(seconds);
        }

        if let Some(seconds) = env_parse::<u64>("CINESTREAM_SWEEP_INTERVAL") {
            // A zero period would make tokio's interval panic
            if seconds > 0 {
                config.store.sweep_interval = Duration::from_secs(seconds);
            }
        }

        config
    }

    /// Creates a configuration optimized for testing.
    ///
    /// Short fetch timeout and no background sweeper; tests drive sweeps
    /// explicitly.
    pub fn for_testing() -> Self {
        Self {
            fetch: FetchConfig {
                timeout: Duration::from_secs(2),
                ..Default::default()
            },
            store: StoreConfig {
                enable_sweeper: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = CinestreamConfig::default();

        assert_eq!(config.fetch.timeout, Duration::from_secs(15));
        assert_eq!(config.fetch.max_redirects, 5);
        assert_eq!(config.fetch.max_body_bytes, 5 * 1024 * 1024);
        assert!(config.fetch.user_agent.starts_with("Mozilla/5.0"));
        assert_eq!(config.search.per_source_limit, 10);
        assert_eq!(config.search.total_limit, 20);
        assert_eq!(config.store.max_age, Duration::from_secs(86_400));
        assert_eq!(config.store.sweep_interval, Duration::from_secs(3_600));
        assert!(config.store.enable_sweeper);
    }

    #[test]
    fn test_testing_preset() {
        let config = CinestreamConfig::for_testing();
        assert!(!config.store.enable_sweeper);
        assert_eq!(config.fetch.timeout, Duration::from_secs(2));
        assert_eq!(config.search.total_limit, 20);
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("CINESTREAM_FETCH_TIMEOUT", "30");
            std::env::set_var("CINESTREAM_MAX_REDIRECTS", "2");
            std::env::set_var("CINESTREAM_MAX_BODY_BYTES", "65536");
            std::env::set_var("CINESTREAM_TOTAL_LIMIT", "40");
            std::env::set_var("CINESTREAM_STORE_MAX_AGE", "600");
            std::env::set_var("CINESTREAM_SWEEP_INTERVAL", "0");
        }

        let config = CinestreamConfig::from_env();

        assert_eq!(config.fetch.timeout, Duration::from_secs(30));
        assert_eq!(config.fetch.max_redirects, 2);
        assert_eq!(config.fetch.max_body_bytes, 65_536);
        assert_eq!(config.search.total_limit, 40);
        assert_eq!(config.store.max_age, Duration::from_secs(600));
        assert_eq!(config.store.sweep_interval, Duration::from_secs(3_600));

        // Cleanup
        unsafe {
            std::env::remove_var("CINESTREAM_FETCH_TIMEOUT");
            std::env::remove_var("CINESTREAM_MAX_REDIRECTS");
            std::env::remove_var("CINESTREAM_MAX_BODY_BYTES");
            std::env::remove_var("CINESTREAM_TOTAL_LIMIT");
            std::env::remove_var("CINESTREAM_STORE_MAX_AGE");
            std::env::remove_var("CINESTREAM_SWEEP_INTERVAL");
        }
    }
}
