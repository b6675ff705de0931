use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::cache::errors::CacheError;

/// Ephemeral key-value store with per-key expiry.
///
/// Every operation on a single key is atomic. `set` fully replaces the
/// previous value and TTL of a key.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Store a string value.
    ///
    /// # Arguments
    /// * `key` - Key to write
    /// * `value` - Value replacing anything previously stored
    /// * `ttl_seconds` - Time to live; `0` stores without expiry
    ///
    /// # Errors
    /// * `Transport` - Store is unreachable
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), CacheError>;

    /// Read a string value.
    ///
    /// # Errors
    /// * `NotFound` - Key is absent or expired
    /// * `WrongType` - Key holds a hash or list
    /// * `Transport` - Store is unreachable
    async fn get(&self, key: &str) -> Result<String, CacheError>;

    /// Remove keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError>;

    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Set a new TTL on an existing key.
    ///
    /// # Returns
    /// False when the key does not exist
    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<bool, CacheError>;

    /// Remaining TTL of a key.
    ///
    /// # Returns
    /// `None` when the key has no expiry
    ///
    /// # Errors
    /// * `NotFound` - Key is absent or expired
    async fn ttl(&self, key: &str) -> Result<Option<u64>, CacheError>;

    /// Increment an integer counter, creating it at zero first if needed.
    async fn increment(&self, key: &str) -> Result<i64, CacheError>;

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError>;

    /// # Errors
    /// * `NotFound` - Key or field is absent
    async fn hget(&self, key: &str, field: &str) -> Result<String, CacheError>;

    /// Every field of a hash; empty when the key is absent.
    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>, CacheError>;

    /// Prepend a value to a list, returning the new length.
    async fn lpush(&self, key: &str, value: &str) -> Result<u64, CacheError>;

    /// Inclusive range of a list; negative indices count from the end.
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, CacheError>;

    /// Delete a key only if it currently holds `expected`.
    ///
    /// # Returns
    /// True if this call removed the key
    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, CacheError>;
}
