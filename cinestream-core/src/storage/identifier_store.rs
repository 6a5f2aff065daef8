//! Time-bounded bidirectional map from identifiers to source pages.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// A search result remembered for later stream resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub id: String,
    pub source_url: String,
    pub source_name: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl StoredEntry {
    /// Age of the entry at `now`; entries stamped in the future have zero age.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at).to_std().unwrap_or_default()
    }

    /// Check if the entry is older than `max_age` at `now`.
    pub fn is_stale_at(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age_at(now) > max_age
    }
}

/// Derives the identifier for a `(source, url, title)` triple.
///
/// The identifier is `{source}_{sha1}` where `source` is the lowercased
/// source name with whitespace removed and the digest covers all three
/// inputs separated by NUL bytes. Equal inputs always give equal
/// identifiers; changing any input changes the digest.
pub fn generate_id(source_name: &str, url: &str, title: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(source_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(url.as_bytes());
    hasher.update([0u8]);
    hasher.update(title.as_bytes());
    let digest = hex::encode(hasher.finalize());

    let prefix: String = source_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    format!("{prefix}_{digest}")
}

#[derive(Debug, Default)]
struct StoreState {
    entries: HashMap<String, StoredEntry>,
    ids_by_url: HashMap<String, String>,
}

/// Process-wide identifier store.
///
/// Both directions live behind a single lock so a reader never observes an
/// entry without its reverse mapping or vice versa. Share it as
/// `Arc<IdentifierStore>`.
#[derive(Debug, Default)]
pub struct IdentifierStore {
    state: RwLock<StoreState>,
}

impl IdentifierStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source page and returns its identifier.
    ///
    /// Storing the same triple again yields the same identifier, refreshes
    /// its creation time and leaves the store size unchanged.
    pub fn store(&self, url: &str, source_name: &str, title: &str) -> String {
        self.store_at(url, source_name, title, Utc::now())
    }

    /// [`IdentifierStore::store`] with an explicit creation time.
    pub fn store_at(
        &self,
        url: &str,
        source_name: &str,
        title: &str,
        created_at: DateTime<Utc>,
    ) -> String {
        let id = generate_id(source_name, url, title);
        let entry = StoredEntry {
            id: id.clone(),
            source_url: url.to_string(),
            source_name: source_name.to_string(),
            title: title.to_string(),
            created_at,
        };

        let mut state = self.state.write();
        state.entries.insert(id.clone(), entry);
        state.ids_by_url.insert(url.to_string(), id.clone());
        drop(state);

        tracing::trace!(id = %id, url = %url, source = %source_name, "Stored identifier");
        id
    }

    /// Source URL for `id`, if known.
    pub fn get(&self, id: &str) -> Option<String> {
        self.state
            .read()
            .entries
            .get(id)
            .map(|entry| entry.source_url.clone())
    }

    /// Full entry for `id`, if known.
    pub fn get_entry(&self, id: &str) -> Option<StoredEntry> {
        self.state.read().entries.get(id).cloned()
    }

    /// Identifier most recently stored for `url`.
    pub fn id_for_url(&self, url: &str) -> Option<String> {
        self.state.read().ids_by_url.get(url).cloned()
    }

    /// Removes entries older than `max_age`, returning how many were removed.
    pub fn sweep(&self, max_age: Duration) -> usize {
        self.sweep_at(Utc::now(), max_age)
    }

    /// [`IdentifierStore::sweep`] evaluated at `now`.
    ///
    /// Stale candidates are collected under the read lock; each is re-checked
    /// under the write lock before removal so an entry refreshed in between
    /// survives.
    pub fn sweep_at(&self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let stale: Vec<String> = self
            .state
            .read()
            .entries
            .values()
            .filter(|entry| entry.is_stale_at(now, max_age))
            .map(|entry| entry.id.clone())
            .collect();

        if stale.is_empty() {
            return 0;
        }

        let mut state = self.state.write();
        let mut removed = 0;
        for id in stale {
            let still_stale = state
                .entries
                .get(&id)
                .is_some_and(|entry| entry.is_stale_at(now, max_age));
            if !still_stale {
                continue;
            }

            if let Some(entry) = state.entries.remove(&id) {
                if state.ids_by_url.get(&entry.source_url) == Some(&id) {
                    state.ids_by_url.remove(&entry.source_url);
                }
                removed += 1;
            }
        }
        drop(state);

        tracing::debug!(removed, "Swept stale identifiers");
        removed
    }

    /// Number of stored entries.
    pub fn size(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.ids_by_url.clear();
    }

    /// Snapshot of all entries, oldest first.
    pub fn entries(&self) -> Vec<StoredEntry> {
        let mut entries: Vec<StoredEntry> = self.state.read().entries.values().cloned().collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        entries
    }
}
