//! Identifier storage bridging search results and stream resolution.
//!
//! The catalog protocol only round-trips opaque strings, so every search
//! result is registered here under a deterministic identifier and looked up
//! again when a stream is requested. Entries are in-memory and expire by age.

pub mod identifier_store;
pub mod sweeper;

pub use identifier_store::{IdentifierStore, StoredEntry, generate_id};
pub use sweeper::StoreSweeper;
