use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::domain::cache::errors::CacheError;
use crate::domain::cache::ports::KeyValueStore;

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Hash(HashMap<String, String>),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Process-local key-value store.
///
/// Expired entries read as absent and are swept on every `set`, so tickets
/// that are never redeemed do not accumulate. Used for tests and
/// single-instance runs. Expiry follows `tokio::time`,
/// so paused-clock tests can advance past a TTL without sleeping.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn live<'a>(entries: &'a HashMap<String, Entry>, key: &str) -> Option<&'a Entry> {
        let now = Instant::now();
        entries.get(key).filter(|entry| entry.is_live(now))
    }

    fn purge_expired(entries: &mut HashMap<String, Entry>, key: &str) {
        let now = Instant::now();
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
    }

    fn sweep_expired(entries: &mut HashMap<String, Entry>) {
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));
    }

    fn deadline(ttl_seconds: u64) -> Option<Instant> {
        (ttl_seconds > 0).then(|| Instant::now() + Duration::from_secs(ttl_seconds))
    }

    fn wrong_type(key: &str) -> CacheError {
        CacheError::WrongType(key.to_string())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        Self::sweep_expired(&mut entries);
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at: Self::deadline(ttl_seconds),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String, CacheError> {
        let entries = self.entries.read().await;
        match Self::live(&entries, key) {
            Some(Entry {
                value: Value::Text(value),
                ..
            }) => Ok(value.clone()),
            Some(_) => Err(Self::wrong_type(key)),
            None => Err(CacheError::NotFound(key.to_string())),
        }
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        let mut entries = self.entries.write().await;
        let mut removed = 0;
        for key in keys {
            Self::purge_expired(&mut entries, key);
            if entries.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let entries = self.entries.read().await;
        Ok(Self::live(&entries, key).is_some())
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<bool, CacheError> {
        let mut entries = self.entries.write().await;
        Self::purge_expired(&mut entries, key);

        if ttl_seconds == 0 {
            return Ok(entries.remove(key).is_some());
        }

        match entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Self::deadline(ttl_seconds);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<Option<u64>, CacheError> {
        let entries = self.entries.read().await;
        let entry =
            Self::live(&entries, key).ok_or_else(|| CacheError::NotFound(key.to_string()))?;

        Ok(entry
            .expires_at
            .map(|at| at.saturating_duration_since(Instant::now()).as_secs()))
    }

    async fn increment(&self, key: &str) -> Result<i64, CacheError> {
        let mut entries = self.entries.write().await;
        Self::purge_expired(&mut entries, key);

        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Text("0".to_string()),
            expires_at: None,
        });

        match &mut entry.value {
            Value::Text(current) => {
                let next = current
                    .parse::<i64>()
                    .map_err(|_| Self::wrong_type(key))?
                    .checked_add(1)
                    .ok_or_else(|| Self::wrong_type(key))?;
                *current = next.to_string();
                Ok(next)
            }
            _ => Err(Self::wrong_type(key)),
        }
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        Self::purge_expired(&mut entries, key);

        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Hash(HashMap::new()),
            expires_at: None,
        });

        match &mut entry.value {
            Value::Hash(fields) => {
                fields.insert(field.to_string(), value.to_string());
                Ok(())
            }
            _ => Err(Self::wrong_type(key)),
        }
    }

    async fn hget(&self, key: &str, field: &str) -> Result<String, CacheError> {
        let entries = self.entries.read().await;
        match Self::live(&entries, key) {
            Some(Entry {
                value: Value::Hash(fields),
                ..
            }) => fields
                .get(field)
                .cloned()
                .ok_or_else(|| CacheError::NotFound(format!("{}.{}", key, field))),
            Some(_) => Err(Self::wrong_type(key)),
            None => Err(CacheError::NotFound(key.to_string())),
        }
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>, CacheError> {
        let entries = self.entries.read().await;
        match Self::live(&entries, key) {
            Some(Entry {
                value: Value::Hash(fields),
                ..
            }) => Ok(fields.clone()),
            Some(_) => Err(Self::wrong_type(key)),
            None => Ok(HashMap::new()),
        }
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<u64, CacheError> {
        let mut entries = self.entries.write().await;
        Self::purge_expired(&mut entries, key);

        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::List(VecDeque::new()),
            expires_at: None,
        });

        match &mut entry.value {
            Value::List(items) => {
                items.push_front(value.to_string());
                Ok(items.len() as u64)
            }
            _ => Err(Self::wrong_type(key)),
        }
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, CacheError> {
        let entries = self.entries.read().await;
        let items = match Self::live(&entries, key) {
            Some(Entry {
                value: Value::List(items),
                ..
            }) => items,
            Some(_) => return Err(Self::wrong_type(key)),
            None => return Ok(Vec::new()),
        };

        let len = items.len() as i64;
        let start = if start < 0 { (len + start).max(0) } else { start };
        let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

        if start > stop || start >= len {
            return Ok(Vec::new());
        }

        Ok(items
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .cloned()
            .collect())
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, CacheError> {
        let mut entries = self.entries.write().await;
        Self::purge_expired(&mut entries, key);

        let matches = matches!(
            entries.get(key),
            Some(Entry { value: Value::Text(current), .. }) if current == expected
        );
        if matches {
            entries.remove(key);
        }
        Ok(matches)
    }
}
