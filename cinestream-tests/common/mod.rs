//! Shared helpers for integration and end-to-end tests.

#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use tokio::net::TcpListener;

/// Serves `router` on an ephemeral localhost port and returns its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{addr}")
}

/// Search page listing `(title, href, poster)` rows in `.post-item` containers.
pub fn search_page(rows: &[(&str, &str, Option<&str>)]) -> String {
    let items: String = rows
        .iter()
        .map(|(title, href, poster)| {
            let poster = poster
                .map(|src| format!(r#"<img src="{src}">"#))
                .unwrap_or_default();
            format!(
                r#"<article class="post-item"><a href="{href}">{poster}</a><h2><a href="{href}">{title}</a></h2></article>"#
            )
        })
        .collect();

    format!("<html><body><main>{items}</main></body></html>")
}

/// Chunked response of `chunks` blocks of `chunk_size` bytes, generated
/// lazily. `produced` counts the blocks the server actually handed out.
pub fn streamed_body(
    content_type: &'static str,
    chunks: usize,
    chunk_size: usize,
    produced: Arc<AtomicUsize>,
) -> Response {
    let stream = futures::stream::iter(0..chunks).map(move |_| {
        produced.fetch_add(1, Ordering::SeqCst);
        Ok::<_, Infallible>(vec![b'x'; chunk_size])
    });

    ([(CONTENT_TYPE, content_type)], Body::from_stream(stream)).into_response()
}
