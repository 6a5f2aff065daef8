//! Integration tests for CineStream
//!
//! These tests run the HTTP fetcher and the scraping sources against a local
//! axum server, so header, redirect and status handling go through a real
//! client and a real socket.

#[path = "common/mod.rs"]
mod common;

#[path = "integration/fetcher_http.rs"]
mod fetcher_http;
#[path = "integration/site_scraping.rs"]
mod site_scraping;
#[path = "integration/store_lifecycle.rs"]
mod store_lifecycle;
