//! Built-in site catalog and descriptor loading.

use std::path::Path;
use std::sync::Arc;

use cinestream_core::HttpFetcher;
use cinestream_core::config::SearchConfig;

use super::{ContentSource, SiteDescriptor, SiteSource};
use crate::errors::MediaSearchError;

const PRIMARY_CONTAINERS: &[&str] = &[".post-item", ".movie-item"];
const PRIMARY_TITLES: &[&str] = &["h2 a", ".title a"];
const COMMON_CONTAINERS: &[&str] = &[".post-item", ".movie-item", ".item"];
const COMMON_TITLES: &[&str] = &["h2 a", ".title a", "h3 a"];

/// Descriptors of the sites registered when no site file is given.
pub fn builtin_descriptors() -> Vec<SiteDescriptor> {
    vec![
        SiteDescriptor::new(
            "VegaMovies",
            "https://vegamovies.nl",
            PRIMARY_CONTAINERS,
            PRIMARY_TITLES,
        ),
        SiteDescriptor::new(
            "MoviesMode",
            "https://moviesmod.net",
            COMMON_CONTAINERS,
            COMMON_TITLES,
        ),
        SiteDescriptor::new(
            "MoviesDrive",
            "https://moviesdrive.net",
            COMMON_CONTAINERS,
            COMMON_TITLES,
        ),
        SiteDescriptor::new(
            "Bollyflix",
            "https://bollyflix.net",
            COMMON_CONTAINERS,
            COMMON_TITLES,
        ),
        SiteDescriptor::new(
            "MultiMovies",
            "https://multimovies.net",
            COMMON_CONTAINERS,
            COMMON_TITLES,
        ),
    ]
}

/// Reads a JSON array of site descriptors.
///
/// # Errors
/// - `MediaSearchError::InvalidSiteFile` - The file is unreadable, not valid JSON, or empty
pub fn load_descriptors(path: &Path) -> Result<Vec<SiteDescriptor>, MediaSearchError> {
    let contents = std::fs::read_to_string(path).map_err(|e| MediaSearchError::InvalidSiteFile {
        reason: format!("{}: {e}", path.display()),
    })?;

    let descriptors: Vec<SiteDescriptor> =
        serde_json::from_str(&contents).map_err(|e| MediaSearchError::InvalidSiteFile {
            reason: format!("{}: {e}", path.display()),
        })?;

    if descriptors.is_empty() {
        return Err(MediaSearchError::InvalidSiteFile {
            reason: format!("{}: no sites defined", path.display()),
        });
    }

    tracing::info!(path = %path.display(), sites = descriptors.len(), "Loaded site descriptors");
    Ok(descriptors)
}

/// Builds one source per descriptor, sharing `fetcher`.
///
/// # Errors
/// - `MediaSearchError::InvalidDescriptor` - A descriptor contains a selector that does not parse
pub fn build_sources(
    descriptors: Vec<SiteDescriptor>,
    fetcher: Arc<dyn HttpFetcher>,
    config: &SearchConfig,
) -> Result<Vec<Arc<dyn ContentSource>>, MediaSearchError> {
    descriptors
        .into_iter()
        .map(|descriptor| {
            SiteSource::new(descriptor, Arc::clone(&fetcher), config)
                .map(|source| Arc::new(source) as Arc<dyn ContentSource>)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use cinestream_core::SimulatedFetcher;

    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let descriptors = builtin_descriptors();
        let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();

        assert_eq!(
            names,
            vec!["VegaMovies", "MoviesMode", "MoviesDrive", "Bollyflix", "MultiMovies"]
        );
        assert_eq!(descriptors[0].container_selectors.len(), 2);
        assert_eq!(descriptors[4].title_selectors.len(), 3);
    }

    #[test]
    fn test_builtin_descriptors_compile() {
        let sources = build_sources(
            builtin_descriptors(),
            Arc::new(SimulatedFetcher::new()),
            &SearchConfig::default(),
        )
        .unwrap();

        assert_eq!(sources.len(), 5);
        assert_eq!(sources[1].name(), "MoviesMode");
        assert_eq!(sources[1].base_url(), "https://moviesmod.net");

        // No canned pages, so every site degrades to an empty answer.
        let results =
            tokio_test::block_on(sources[0].search("dune", crate::types::MediaKind::Movie));
        assert!(results.unwrap().is_empty());
    }

    #[test]
    fn test_load_descriptors_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name": "Local", "base_url": "http://127.0.0.1:8080", "search_param": "q",
                 "container_selectors": [".hit"], "title_selectors": ["a"]}}]"#
        )
        .unwrap();

        let descriptors = load_descriptors(file.path()).unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].search_url("a b"), "http://127.0.0.1:8080/?q=a%20b");
    }

    #[test]
    fn test_load_descriptors_rejects_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            load_descriptors(&missing),
            Err(MediaSearchError::InvalidSiteFile { .. })
        ));

        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, "[]").unwrap();
        assert!(matches!(
            load_descriptors(&empty),
            Err(MediaSearchError::InvalidSiteFile { .. })
        ));

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, "{not json").unwrap();
        assert!(load_descriptors(&garbage).is_err());
    }
}
