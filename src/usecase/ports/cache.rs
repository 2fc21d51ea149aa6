use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

pub trait QueryCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value, tags: &[&str], ttl: Duration);
    /// Removes every entry carrying `tag`; returns how many were dropped.
    fn invalidate_tag(&self, tag: &str) -> usize;
    /// Live (unexpired) entries.
    fn len(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Duration,
    pub tags: Vec<&'static str>,
}

impl CachePolicy {
    pub fn new(ttl: Duration, tags: &[&'static str]) -> Self {
        Self {
            ttl,
            tags: tags.to_vec(),
        }
    }
}

/// `<name>-<json of params>`, so identical inputs share one entry.
pub fn cache_key<P: Serialize + ?Sized>(name: &str, params: &P) -> String {
    let encoded = serde_json::to_string(params).unwrap_or_default();
    format!("{name}-{encoded}")
}

pub async fn cached<T, F, Fut>(
    cache: &dyn QueryCache,
    key: &str,
    policy: CachePolicy,
    fetch: F,
) -> T
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    if let Some(hit) = cache.get(key) {
        match serde_json::from_value(hit) {
            Ok(value) => return value,
            Err(err) => warn!(key, error = %err, "discarding unreadable cache entry"),
        }
    }

    debug!(key, "cache miss");
    let value = fetch().await;
    match serde_json::to_value(&value) {
        Ok(encoded) => cache.set(key, encoded, &policy.tags, policy.ttl),
        Err(err) => warn!(key, error = %err, "value not cacheable"),
    }
    value
}
