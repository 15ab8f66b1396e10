use async_trait::async_trait;
use std::time::Duration;

/// Key-value cache with optional per-entry time to live.
#[async_trait]
pub trait Cache<K, V>: Send + Sync {
    /// Returns the value when present and not expired.
    async fn get(&self, key: &K) -> Option<V>;

    /// Stores a value; `None` keeps it until the process exits.
    async fn put(&self, key: K, value: V, ttl: Option<Duration>);
}

/// Fixed namespaces of the cache keys.
pub mod keys {
    use crate::core::instrument::normalize_identifier;

    pub const LISTING: &str = "instruments:all";
    pub const INSTRUMENT_NAMESPACE: &str = "instrument";
    pub const DETAIL_NAMESPACE: &str = "detail";

    pub fn instrument(identifier: &str) -> String {
        format!("{INSTRUMENT_NAMESPACE}:{}", normalize_identifier(identifier))
    }

    pub fn detail(identifier: &str) -> String {
        format!("{DETAIL_NAMESPACE}:{}", normalize_identifier(identifier))
    }

}
