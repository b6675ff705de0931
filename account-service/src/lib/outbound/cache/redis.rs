use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::RedisError;
use redis::Script;

use crate::domain::cache::errors::CacheError;
use crate::domain::cache::ports::KeyValueStore;

const COMPARE_AND_DELETE: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
end
return 0
"#;

/// Redis-backed key-value store.
///
/// A single multiplexed connection is shared by all callers; the manager
/// reconnects on its own after transport failures.
#[derive(Clone)]
pub struct RedisKeyValueStore {
    connection: ConnectionManager,
    compare_and_delete: Script,
}

impl RedisKeyValueStore {
    /// Connect to Redis.
    ///
    /// # Arguments
    /// * `url` - Connection URL, e.g. `redis://127.0.0.1:6379`
    pub async fn connect(url: &str) -> Result<Self, anyhow::Error> {
        tracing::info!(url = %url, "Connecting to Redis");

        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!("Redis connection established");

        Ok(Self {
            connection,
            compare_and_delete: Script::new(COMPARE_AND_DELETE),
        })
    }

    fn map_error(key: &str, err: RedisError) -> CacheError {
        if err.code() == Some("WRONGTYPE") {
            CacheError::WrongType(key.to_string())
        } else {
            tracing::error!(key = %key, error = %err, "Redis command failed");
            CacheError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl KeyValueStore for RedisKeyValueStore {
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        let mut command = redis::cmd("SET");
        command.arg(key).arg(value);
        if ttl_seconds > 0 {
            command.arg("EX").arg(ttl_seconds);
        }

        command
            .query_async::<_, ()>(&mut connection)
            .await
            .map_err(|e| Self::map_error(key, e))
    }

    async fn get(&self, key: &str) -> Result<String, CacheError> {
        let mut connection = self.connection.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut connection)
            .await
            .map_err(|e| Self::map_error(key, e))?
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut connection = self.connection.clone();
        let mut command = redis::cmd("DEL");
        for key in keys {
            command.arg(key);
        }

        command
            .query_async::<_, u64>(&mut connection)
            .await
            .map_err(|e| Self::map_error(&keys.join(","), e))
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut connection = self.connection.clone();
        redis::cmd("EXISTS")
            .arg(key)
            .query_async::<_, bool>(&mut connection)
            .await
            .map_err(|e| Self::map_error(key, e))
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<bool, CacheError> {
        let mut connection = self.connection.clone();
        redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl_seconds)
            .query_async::<_, bool>(&mut connection)
            .await
            .map_err(|e| Self::map_error(key, e))
    }

    async fn ttl(&self, key: &str) -> Result<Option<u64>, CacheError> {
        let mut connection = self.connection.clone();
        let remaining = redis::cmd("TTL")
            .arg(key)
            .query_async::<_, i64>(&mut connection)
            .await
            .map_err(|e| Self::map_error(key, e))?;

        // -2: no such key, -1: key without expiry
        match remaining {
            -2 => Err(CacheError::NotFound(key.to_string())),
            -1 => Ok(None),
            seconds => Ok(Some(seconds.max(0) as u64)),
        }
    }

    async fn increment(&self, key: &str) -> Result<i64, CacheError> {
        let mut connection = self.connection.clone();
        redis::cmd("INCR")
            .arg(key)
            .query_async::<_, i64>(&mut connection)
            .await
            .map_err(|e| Self::map_error(key, e))
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        redis::cmd("HSET")
            .arg(key)
            .arg(field)
            .arg(value)
            .query_async::<_, i64>(&mut connection)
            .await
            .map(|_| ())
            .map_err(|e| Self::map_error(key, e))
    }

    async fn hget(&self, key: &str, field: &str) -> Result<String, CacheError> {
        let mut connection = self.connection.clone();
        redis::cmd("HGET")
            .arg(key)
            .arg(field)
            .query_async::<_, Option<String>>(&mut connection)
            .await
            .map_err(|e| Self::map_error(key, e))?
            .ok_or_else(|| CacheError::NotFound(format!("{}.{}", key, field)))
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>, CacheError> {
        let mut connection = self.connection.clone();
        redis::cmd("HGETALL")
            .arg(key)
            .query_async::<_, HashMap<String, String>>(&mut connection)
            .await
            .map_err(|e| Self::map_error(key, e))
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<u64, CacheError> {
        let mut connection = self.connection.clone();
        redis::cmd("LPUSH")
            .arg(key)
            .arg(value)
            .query_async::<_, u64>(&mut connection)
            .await
            .map_err(|e| Self::map_error(key, e))
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, CacheError> {
        let mut connection = self.connection.clone();
        redis::cmd("LRANGE")
            .arg(key)
            .arg(start)
            .arg(stop)
            .query_async::<_, Vec<String>>(&mut connection)
            .await
            .map_err(|e| Self::map_error(key, e))
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, CacheError> {
        let mut connection = self.connection.clone();
        self.compare_and_delete
            .key(key)
            .arg(expected)
            .invoke_async::<_, i64>(&mut connection)
            .await
            .map(|removed| removed > 0)
            .map_err(|e| Self::map_error(key, e))
    }
}
