//! Catalog, identifier and stream workflow across the built-in sites.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use cinestream_core::config::CinestreamConfig;
use cinestream_core::{HttpFetcher, NetworkError, SimulatedFetcher};
use cinestream_search::{
    CatalogEntry, ContentResolver, MediaFormat, MediaKind, SiteDescriptor, builtin_descriptors,
    load_descriptors,
};

use crate::common::search_page;

fn descriptor(name: &str) -> SiteDescriptor {
    builtin_descriptors()
        .into_iter()
        .find(|descriptor| descriptor.name == name)
        .unwrap()
}

fn rows(prefix: &str, count: usize) -> Vec<(String, String)> {
    (0..count)
        .map(|i| (format!("{prefix} Title {i}"), format!("/{}-{i}/", prefix.to_lowercase())))
        .collect()
}

fn page(rows: &[(String, String)]) -> String {
    let borrowed: Vec<(&str, &str, Option<&str>)> = rows
        .iter()
        .map(|(title, href)| (title.as_str(), href.as_str(), Some("/poster.jpg")))
        .collect();
    search_page(&borrowed)
}

fn resolver(fetcher: Arc<SimulatedFetcher>) -> ContentResolver {
    let fetcher: Arc<dyn HttpFetcher> = fetcher;
    ContentResolver::new(
        &CinestreamConfig::for_testing(),
        fetcher,
        builtin_descriptors(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_catalog_to_streams_round_trip() {
    let vega = descriptor("VegaMovies");
    let detail = "https://vegamovies.nl/interstellar-2014/";
    let embed = "https://player.example/e/interstellar";

    let fetcher = Arc::new(
        SimulatedFetcher::new()
            .with_page(
                &vega.search_url("interstellar"),
                &search_page(&[(
                    "Interstellar (2014)",
                    "/interstellar-2014/",
                    Some("/wp-content/interstellar.jpg"),
                )]),
            )
            .with_page(
                detail,
                &format!(
                    r#"<iframe src="{embed}"></iframe><a href="https://cdn.example/interstellar.mp4">mp4</a>"#
                ),
            )
            .with_page(
                embed,
                r#"<video><source src="https://cdn.example/hls/interstellar.m3u8"></video>"#,
            ),
    );
    let resolver = resolver(Arc::clone(&fetcher));

    let catalog = resolver.catalog("interstellar", MediaKind::Movie).await;

    assert_eq!(catalog.len(), 1);
    let CatalogEntry { id, result } = &catalog[0];
    assert!(id.starts_with("vegamovies_"));
    assert_eq!(result.detail_url, detail);
    assert_eq!(
        result.poster_url.as_deref(),
        Some("https://vegamovies.nl/wp-content/interstellar.jpg")
    );

    let json = serde_json::to_value(&catalog[0]).unwrap();
    assert_eq!(json["id"], id.as_str());
    assert_eq!(json["title"], "Interstellar (2014)");
    assert_eq!(json["media_kind"], "movie");

    let entry = resolver.entry(id).unwrap();
    assert_eq!(entry.source_url, detail);
    assert_eq!(entry.source_name, "VegaMovies");
    assert_eq!(entry.title, "Interstellar (2014)");

    let streams = resolver.streams(id).await;
    let formats: Vec<MediaFormat> = streams.iter().map(|s| s.media_format).collect();
    assert_eq!(
        formats,
        vec![MediaFormat::AdaptivePlaylist, MediaFormat::DirectFile]
    );
    assert!(streams.iter().all(|s| s.source_name == "VegaMovies"));
    assert_eq!(fetcher.fetch_count(detail), 1);
    assert_eq!(fetcher.fetch_count(embed), 1);

    resolver.shutdown().await;
}

#[tokio::test]
async fn test_results_concatenate_in_site_order_and_cap_at_twenty() {
    let fetcher = Arc::new(SimulatedFetcher::new());
    let query = "space";

    // MultiMovies is registered last, so the cap drops all of its results.
    fetcher.add_page(
        &descriptor("MultiMovies").search_url(query),
        &page(&rows("Multi", 10)),
    );
    fetcher.add_page(
        &descriptor("MoviesMode").search_url(query),
        &page(&rows("Mode", 12)),
    );
    fetcher.add_page(
        &descriptor("Bollyflix").search_url(query),
        &page(&rows("Bolly", 10)),
    );
    fetcher.add_failure(
        &descriptor("VegaMovies").search_url(query),
        NetworkError::Timeout {
            url: descriptor("VegaMovies").search_url(query),
        },
    );

    let resolver = resolver(Arc::clone(&fetcher));
    let catalog = resolver.catalog(query, MediaKind::Series).await;

    assert_eq!(catalog.len(), 20);
    let sources: Vec<&str> = catalog
        .iter()
        .map(|entry| entry.result.source_name.as_str())
        .collect();
    assert!(sources[..10].iter().all(|name| *name == "MoviesMode"));
    assert!(sources[10..].iter().all(|name| *name == "Bollyflix"));
    assert!(catalog.iter().all(|entry| entry.result.media_kind == MediaKind::Series));
    assert_eq!(resolver.store().size(), 20);
    assert_eq!(fetcher.total_fetches(), 5);

    resolver.shutdown().await;
}

#[tokio::test]
async fn test_every_site_failing_yields_empty_catalog() {
    let fetcher = Arc::new(SimulatedFetcher::new());
    let resolver = resolver(Arc::clone(&fetcher));

    let catalog = resolver.catalog("anything", MediaKind::Movie).await;

    assert!(catalog.is_empty());
    assert_eq!(resolver.store().size(), 0);
    assert_eq!(fetcher.total_fetches(), 5);

    resolver.shutdown().await;
}

#[tokio::test]
async fn test_identifiers_are_stable_across_searches() {
    let mode = descriptor("MoviesMode");
    let fetcher = Arc::new(
        SimulatedFetcher::new().with_page(&mode.search_url("heat"), &page(&rows("Heat", 3))),
    );
    let resolver = resolver(fetcher);

    let first = resolver.catalog("heat", MediaKind::Movie).await;
    let second = resolver.catalog("heat", MediaKind::Movie).await;

    let first_ids: Vec<&str> = first.iter().map(|e| e.id.as_str()).collect();
    let second_ids: Vec<&str> = second.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(first_ids, second_ids);
    assert_eq!(resolver.store().size(), 3);
    assert_eq!(
        resolver.store().id_for_url("https://moviesmod.net/heat-0/").as_deref(),
        Some(first_ids[0])
    );

    resolver.shutdown().await;
}

#[tokio::test]
async fn test_expired_and_unknown_identifiers_yield_no_streams() {
    let drive = descriptor("MoviesDrive");
    let fetcher = Arc::new(
        SimulatedFetcher::new()
            .with_page(&drive.search_url("alien"), &page(&rows("Alien", 1)))
            .with_page(
                "https://moviesdrive.net/alien-0/",
                r#"<a href="https://cdn.example/alien.mp4">mp4</a>"#,
            ),
    );
    let resolver = resolver(Arc::clone(&fetcher));

    let catalog = resolver.catalog("alien", MediaKind::Movie).await;
    let id = catalog[0].id.clone();
    assert_eq!(resolver.streams(&id).await.len(), 1);

    let removed = resolver
        .store()
        .sweep_at(Utc::now() + TimeDelta::hours(25), Duration::from_secs(24 * 3600));
    assert_eq!(removed, 1);

    let fetches_before = fetcher.total_fetches();
    assert!(resolver.streams(&id).await.is_empty());
    assert!(resolver.streams("moviesdrive_0000").await.is_empty());
    assert_eq!(fetcher.total_fetches(), fetches_before);

    resolver.shutdown().await;
}

#[tokio::test]
async fn test_sites_loaded_from_file_replace_builtins() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sites.json");
    std::fs::write(
        &path,
        r#"[{
            "name": "Archive",
            "base_url": "https://archive.example",
            "search_param": "query",
            "container_selectors": [".post-item"],
            "title_selectors": ["h2 a"]
        }]"#,
    )
    .unwrap();
    let descriptors = load_descriptors(&path).unwrap();

    let fetcher = Arc::new(SimulatedFetcher::new().with_page(
        "https://archive.example/?query=night%20of%20the%20living%20dead",
        &search_page(&[("Night of the Living Dead", "/notld/", None)]),
    ));
    let dyn_fetcher: Arc<dyn HttpFetcher> = fetcher.clone();
    let resolver =
        ContentResolver::new(&CinestreamConfig::for_testing(), dyn_fetcher, descriptors).unwrap();

    let catalog = resolver
        .catalog("night of the living dead", MediaKind::Movie)
        .await;

    assert_eq!(resolver.aggregator().source_names(), vec!["Archive"]);
    assert_eq!(catalog.len(), 1);
    assert!(catalog[0].id.starts_with("archive_"));
    assert_eq!(catalog[0].result.detail_url, "https://archive.example/notld/");
    assert_eq!(fetcher.total_fetches(), 1);

    resolver.shutdown().await;
}
