use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::usecase::ports::cache::QueryCache;

struct Entry {
    value: Value,
    tags: Vec<String>,
    expires_at: Instant,
}

/// Process-wide memo table with per-entry expiry and tag invalidation.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl QueryCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    fn set(&self, key: &str, value: Value, tags: &[&str], ttl: Duration) {
        let entry = Entry {
            value,
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            expires_at: Instant::now() + ttl,
        };
        let mut entries = self.lock();
        let now = Instant::now();
        entries.retain(|_, existing| existing.expires_at > now);
        entries.insert(key.to_string(), entry);
    }

    fn invalidate_tag(&self, tag: &str) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.tags.iter().any(|existing| existing == tag));
        before - entries.len()
    }

    fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }
}

/// Cache that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl QueryCache for NoopCache {
    fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    fn set(&self, _key: &str, _value: Value, _tags: &[&str], _ttl: Duration) {}

    fn invalidate_tag(&self, _tag: &str) -> usize {
        0
    }

    fn len(&self) -> usize {
        0
    }
}
