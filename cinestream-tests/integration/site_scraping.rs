//! Site source search and stream resolution over real HTTP.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::Query;
use axum::routing::get;
use cinestream_core::config::{FetchConfig, SearchConfig};
use cinestream_core::{HttpFetcher, ProductionFetcher};
use cinestream_search::{ContentSource, MediaFormat, MediaKind, SiteDescriptor, SiteSource};

use crate::common::{search_page, spawn_server, streamed_body};

#[derive(Default)]
struct Hits {
    search: AtomicUsize,
    embed: AtomicUsize,
    nested: AtomicUsize,
    video_chunks: Arc<AtomicUsize>,
}

async fn start(hits: Arc<Hits>) -> String {
    let search_hits = Arc::clone(&hits);
    let embed_hits = Arc::clone(&hits);
    let nested_hits = Arc::clone(&hits);
    let video_hits = Arc::clone(&hits);

    let router = Router::new()
        .route(
            "/",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let hits = Arc::clone(&search_hits);
                async move {
                    hits.search.fetch_add(1, Ordering::SeqCst);
                    let query = params.get("s").cloned().unwrap_or_default();
                    if query == "dune part two" {
                        search_page(&[
                            ("Dune: Part Two (2024)", "/movie/dune-2/", Some("/img/dune-2.jpg")),
                            ("Dune (2021)", "/movie/dune/", None),
                        ])
                    } else {
                        search_page(&[])
                    }
                }
            }),
        )
        .route(
            "/movie/dune-2/",
            get(|| async {
                r#"<html><body>
                    <iframe src="/embed/1"></iframe>
                    <a href="/files/Dune.Part.Two.1080p.mp4">Download</a>
                </body></html>"#
            }),
        )
        .route(
            "/embed/1",
            get(move || {
                let hits = Arc::clone(&embed_hits);
                async move {
                    hits.embed.fetch_add(1, Ordering::SeqCst);
                    r#"<video><source src="/hls/dune-2/master.m3u8"></video>
                       <iframe src="/embed/nested"></iframe>"#
                }
            }),
        )
        .route(
            "/embed/nested",
            get(move || {
                let hits = Arc::clone(&nested_hits);
                async move {
                    hits.nested.fetch_add(1, Ordering::SeqCst);
                    r#"<a href="/files/too-deep.mp4">deep</a>"#
                }
            }),
        )
        .route(
            "/movie/big/",
            get(|| async {
                r#"<html><body>
                    <iframe src="/files/movie.mp4"></iframe>
                    <a href="/files/Big.720p.mp4">Download</a>
                </body></html>"#
            }),
        )
        .route(
            "/files/movie.mp4",
            get(move || {
                let produced = Arc::clone(&video_hits.video_chunks);
                async move { streamed_body("video/mp4", 512, 1024 * 1024, produced) }
            }),
        );

    spawn_server(router).await
}

fn source(base: &str) -> SiteSource {
    let fetcher: Arc<dyn HttpFetcher> =
        Arc::new(ProductionFetcher::new(&FetchConfig::default()).unwrap());
    let descriptor = SiteDescriptor::new("LocalSite", base, &[".post-item"], &["h2 a"]);
    SiteSource::new(descriptor, fetcher, &SearchConfig::default()).unwrap()
}

#[tokio::test]
async fn test_search_resolves_links_against_site() {
    let hits = Arc::new(Hits::default());
    let base = start(Arc::clone(&hits)).await;

    let results = source(&base)
        .search("dune part two", MediaKind::Movie)
        .await
        .unwrap();

    assert_eq!(hits.search.load(Ordering::SeqCst), 1);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "Dune: Part Two (2024)");
    assert_eq!(results[0].detail_url, format!("{base}/movie/dune-2/"));
    assert_eq!(
        results[0].poster_url.as_deref(),
        Some(format!("{base}/img/dune-2.jpg").as_str())
    );
    assert!(results[1].poster_url.is_none());
    assert!(results.iter().all(|r| r.source_name == "LocalSite"));
}

#[tokio::test]
async fn test_search_without_matches_is_empty() {
    let hits = Arc::new(Hits::default());
    let base = start(hits).await;

    let results = source(&base)
        .search("nothing here", MediaKind::Series)
        .await
        .unwrap();

    assert!(results.is_empty());
}

#[tokio::test]
async fn test_resolve_streams_hops_once() {
    let hits = Arc::new(Hits::default());
    let base = start(Arc::clone(&hits)).await;

    let streams = source(&base)
        .resolve_streams(&format!("{base}/movie/dune-2/"))
        .await
        .unwrap();

    assert_eq!(hits.embed.load(Ordering::SeqCst), 1);
    assert_eq!(hits.nested.load(Ordering::SeqCst), 0);

    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].play_url, format!("{base}/hls/dune-2/master.m3u8"));
    assert_eq!(streams[0].media_format, MediaFormat::AdaptivePlaylist);
    assert_eq!(streams[1].play_url, format!("{base}/files/Dune.Part.Two.1080p.mp4"));
    assert_eq!(streams[1].name, "LocalSite - 1080p");
    assert_eq!(streams[1].display_title, "LocalSite - MP4");
}

#[tokio::test]
async fn test_video_embed_is_skipped_without_downloading() {
    let hits = Arc::new(Hits::default());
    let base = start(Arc::clone(&hits)).await;

    let started = Instant::now();
    let streams = source(&base)
        .resolve_streams(&format!("{base}/movie/big/"))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(hits.video_chunks.load(Ordering::SeqCst) < 512);
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].play_url, format!("{base}/files/Big.720p.mp4"));
    assert_eq!(streams[0].media_format, MediaFormat::DirectFile);
}

#[tokio::test]
async fn test_unreachable_site_degrades_to_empty() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let source = source(&base);

    assert!(source.search("dune", MediaKind::Movie).await.unwrap().is_empty());
    assert!(
        source
            .resolve_streams(&format!("{base}/movie/dune/"))
            .await
            .unwrap()
            .is_empty()
    );
}
