//! Identifier expiry through the resolver's background sweeper.

use std::sync::Arc;
use std::time::Duration;

use cinestream_core::config::CinestreamConfig;
use cinestream_core::{HttpFetcher, SimulatedFetcher};
use cinestream_search::{ContentResolver, MediaKind, SiteDescriptor};

use crate::common::search_page;

const BASE: &str = "https://listing.example";

fn fetcher() -> Arc<SimulatedFetcher> {
    let descriptor = descriptor();
    Arc::new(
        SimulatedFetcher::new()
            .with_page(
                &descriptor.search_url("arrival"),
                &search_page(&[("Arrival", "/arrival/", None)]),
            )
            .with_page(
                "https://listing.example/arrival/",
                r#"<a href="https://cdn.example/arrival.mp4">watch</a>"#,
            ),
    )
}

fn descriptor() -> SiteDescriptor {
    SiteDescriptor::new("Listing", BASE, &[".post-item"], &["h2 a"])
}

fn sweeping_config(max_age: Duration) -> CinestreamConfig {
    let mut config = CinestreamConfig::for_testing();
    config.store.enable_sweeper = true;
    config.store.sweep_interval = Duration::from_millis(25);
    config.store.max_age = max_age;
    config
}

#[tokio::test]
async fn test_sweeper_expires_identifiers() {
    let fetcher: Arc<dyn HttpFetcher> = fetcher();
    let resolver = ContentResolver::new(
        &sweeping_config(Duration::from_millis(50)),
        fetcher,
        vec![descriptor()],
    )
    .unwrap();

    let catalog = resolver.catalog("arrival", MediaKind::Movie).await;
    assert_eq!(catalog.len(), 1);
    let id = catalog[0].id.clone();
    assert_eq!(resolver.streams(&id).await.len(), 1);

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(resolver.entry(&id).is_none());
    assert!(resolver.store().id_for_url(&catalog[0].result.detail_url).is_none());
    assert!(resolver.streams(&id).await.is_empty());

    resolver.shutdown().await;
}

#[tokio::test]
async fn test_live_identifiers_survive_sweeps() {
    let fetcher: Arc<dyn HttpFetcher> = fetcher();
    let resolver = ContentResolver::new(
        &sweeping_config(Duration::from_secs(3600)),
        fetcher,
        vec![descriptor()],
    )
    .unwrap();

    let catalog = resolver.catalog("arrival", MediaKind::Movie).await;
    tokio::time::sleep(Duration::from_millis(150)).await;

    let entry = resolver.entry(&catalog[0].id).unwrap();
    assert_eq!(entry.title, "Arrival");
    assert_eq!(entry.source_url, "https://listing.example/arrival/");

    resolver.shutdown().await;
}
