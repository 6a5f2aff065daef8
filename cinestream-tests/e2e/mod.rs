//! End-to-end tests for CineStream
//!
//! These tests drive the full catalog, identifier and stream workflow through
//! the resolver against canned site pages.

#[path = "../common/mod.rs"]
mod common;

mod catalog_workflow;
