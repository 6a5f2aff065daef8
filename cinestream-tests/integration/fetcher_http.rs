//! HTTP behaviour of the production fetcher against a local server.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use cinestream_core::config::FetchConfig;
use cinestream_core::{FetchOptions, HttpFetcher, NetworkError, ProductionFetcher};

use crate::common::{spawn_server, streamed_body};

fn header(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

async fn echo_headers(headers: HeaderMap) -> String {
    [
        "referer",
        "user-agent",
        "accept",
        "accept-language",
        "x-custom",
    ]
    .iter()
    .map(|name| format!("{name}={}", header(&headers, name)))
    .collect::<Vec<_>>()
    .join("\n")
}

async fn redirect_chain(Path(remaining): Path<u32>) -> Response {
    if remaining == 0 {
        "arrived".into_response()
    } else {
        Redirect::temporary(&format!("/redirect/{}", remaining - 1)).into_response()
    }
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "too late"
}

async fn start() -> String {
    let router = Router::new()
        .route("/echo/{*rest}", get(echo_headers))
        .route("/redirect/{remaining}", get(redirect_chain))
        .route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, "gone") }),
        )
        .route(
            "/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "oops") }),
        )
        .route("/slow", get(slow));

    spawn_server(router).await
}

fn fetcher() -> ProductionFetcher {
    ProductionFetcher::new(&FetchConfig::default()).unwrap()
}

#[tokio::test]
async fn test_browser_headers_and_origin_referer() {
    let base = start().await;

    let body = fetcher()
        .fetch(&format!("{base}/echo/movies/dune?x=1"))
        .await
        .unwrap();

    let defaults = FetchConfig::default();
    assert!(body.contains(&format!("referer={base}\n")));
    assert!(body.contains(&format!("user-agent={}", defaults.user_agent)));
    assert!(body.contains(&format!("accept={}", defaults.accept)));
    assert!(body.contains("accept-language=en-US,en;q=0.5"));
    assert!(body.contains("x-custom=-"));
}

#[tokio::test]
async fn test_per_request_header_overrides() {
    let base = start().await;
    let options = FetchOptions::default()
        .with_header("Referer", "https://embedder.example/")
        .with_header("X-Custom", "yes");

    let body = fetcher()
        .fetch_with(&format!("{base}/echo/page"), &options)
        .await
        .unwrap();

    assert!(body.contains("referer=https://embedder.example/\n"));
    assert!(body.contains("x-custom=yes"));
}

#[tokio::test]
async fn test_non_success_status_is_an_error() {
    let base = start().await;

    let missing = fetcher().fetch(&format!("{base}/missing")).await;
    assert!(matches!(
        missing,
        Err(NetworkError::HttpStatus { status: 404, .. })
    ));

    let broken = fetcher().fetch(&format!("{base}/broken")).await;
    assert!(matches!(
        broken,
        Err(NetworkError::HttpStatus { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_follows_up_to_five_redirects() {
    let base = start().await;

    let body = fetcher()
        .fetch(&format!("{base}/redirect/5"))
        .await
        .unwrap();

    assert_eq!(body, "arrived");
}

#[tokio::test]
async fn test_sixth_redirect_fails() {
    let base = start().await;

    let result = fetcher().fetch(&format!("{base}/redirect/6")).await;

    assert!(matches!(result, Err(NetworkError::TooManyRedirects { .. })));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let base = start().await;
    let config = FetchConfig {
        timeout: Duration::from_millis(300),
        ..Default::default()
    };
    let fetcher = ProductionFetcher::new(&config).unwrap();

    let result = fetcher.fetch(&format!("{base}/slow")).await;

    assert!(matches!(result, Err(NetworkError::Timeout { .. })));
}

#[tokio::test]
async fn test_unreachable_host_is_connection_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = fetcher().fetch(&format!("http://{addr}/")).await;

    assert!(matches!(result, Err(NetworkError::ConnectionFailed { .. })));
}

const MEBIBYTE: usize = 1024 * 1024;

#[tokio::test]
async fn test_video_response_is_rejected_before_reading() {
    let produced = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&produced);
    let base = spawn_server(Router::new().route(
        "/files/movie.mp4",
        get(move || {
            let counter = Arc::clone(&counter);
            async move { streamed_body("video/mp4", 256, MEBIBYTE, counter) }
        }),
    ))
    .await;

    let result = fetcher().fetch(&format!("{base}/files/movie.mp4")).await;

    match result {
        Err(NetworkError::UnsupportedContentType { content_type, .. }) => {
            assert_eq!(content_type, "video/mp4");
        }
        other => panic!("expected UnsupportedContentType, got {other:?}"),
    }
    assert!(produced.load(Ordering::SeqCst) < 256);
}

#[tokio::test]
async fn test_declared_oversized_body_is_rejected() {
    let base = spawn_server(Router::new().route(
        "/large",
        get(|| async { Html("x".repeat(256 * 1024)) }),
    ))
    .await;
    let config = FetchConfig {
        max_body_bytes: 64 * 1024,
        ..Default::default()
    };
    let fetcher = ProductionFetcher::new(&config).unwrap();

    let result = fetcher.fetch(&format!("{base}/large")).await;

    assert_eq!(
        result,
        Err(NetworkError::BodyTooLarge {
            url: format!("{base}/large"),
            limit: 64 * 1024,
        })
    );
}

#[tokio::test]
async fn test_chunked_body_stops_at_cap() {
    let produced = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&produced);
    let base = spawn_server(Router::new().route(
        "/endless",
        get(move || {
            let counter = Arc::clone(&counter);
            async move { streamed_body("text/html; charset=utf-8", 512, 64 * 1024, counter) }
        }),
    ))
    .await;
    let config = FetchConfig {
        max_body_bytes: MEBIBYTE,
        ..Default::default()
    };
    let fetcher = ProductionFetcher::new(&config).unwrap();

    let result = fetcher.fetch(&format!("{base}/endless")).await;

    assert!(matches!(
        result,
        Err(NetworkError::BodyTooLarge { limit, .. }) if limit == MEBIBYTE
    ));
    assert!(produced.load(Ordering::SeqCst) < 512);
}

#[tokio::test]
async fn test_body_within_cap_is_returned() {
    let base = spawn_server(Router::new().route(
        "/page",
        get(|| async { Html("<p>fits</p>") }),
    ))
    .await;
    let config = FetchConfig {
        max_body_bytes: 11,
        ..Default::default()
    };
    let fetcher = ProductionFetcher::new(&config).unwrap();

    let body = fetcher.fetch(&format!("{base}/page")).await.unwrap();

    assert_eq!(body, "<p>fits</p>");
}
