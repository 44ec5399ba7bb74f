//! Cache of derived views keyed by string identifiers.
//!
//! Write paths that mutate competitions, entries or participation records
//! invalidate the affected keys at the mutation site.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Cache keys used across the crate.
pub mod keys {
    use crate::db::CompetitionId;

    /// The full competition list, newest first.
    pub const COMPETITION_LIST: &str = "competitions";

    /// One competition's detail view data.
    pub fn competition(id: CompetitionId) -> String {
        format!("competition:{id}")
    }
}

#[derive(Default)]
pub struct ViewCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

struct CacheEntry {
    value: serde_json::Value,
    expires: Instant,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `key` unless it has expired.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) {
        self.entries.lock().insert(
            key.to_string(),
            CacheEntry {
                value,
                expires: Instant::now() + ttl,
            },
        );
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}
