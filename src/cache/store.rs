//! Key-Value Store Module
//!
//! The store protocol the cache layer speaks (`GET`, `SETEX`, `SET`, `DEL`,
//! `PING`) and its two backends: a redis connection and an in-process map.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::RwLock;

use crate::cache::CacheEntry;
use crate::error::StoreError;

// == Store Trait ==
/// Minimal key-value protocol used by the cache layer.
///
/// Implementations must be safe to share between concurrent requests; the
/// cache layer performs no locking of its own around these calls.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// `GET key`. `Ok(None)` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// `SETEX key ttl value`.
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError>;

    /// `SET key value` with no expiry.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// `DEL key...`. Returns how many keys actually existed.
    async fn del(&self, keys: &[String]) -> Result<u64, StoreError>;

    /// `PING`.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Short backend label for logs and health output.
    fn backend(&self) -> &'static str;
}

// == Memory Store ==
/// In-process store with per-entry TTL.
///
/// Expired entries are dropped when read; there is no background sweep.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| !entry.is_expired())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: take the write lock and drop it, unless it was replaced meanwhile
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(CacheEntry::is_expired) {
            entries.remove(key);
        }
        Ok(entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let entry = CacheEntry::with_ttl(value.to_string(), ttl_secs);
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let entry = CacheEntry::persistent(value.to_string());
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64, StoreError> {
        let mut entries = self.entries.write().await;
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                if !entry.is_expired() {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

// == Redis Store ==
/// Store backed by a redis server.
///
/// `ConnectionManager` multiplexes one connection across tasks and
/// reconnects on its own, so a single instance is shared process-wide.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Opens a managed connection to `url`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(url).map_err(|e| StoreError::Connection(e.to_string()))?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64, StoreError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(keys).await?;
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_memory_set_ex_and_get() {
        let store = MemoryStore::new();
        store.set_ex("kpi_average_price", "[]", 60).await.unwrap();

        let value = store.get("kpi_average_price").await.unwrap();
        assert_eq!(value.as_deref(), Some("[]"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_get_absent() {
        let store = MemoryStore::new();
        assert!(store.get("nothing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_ttl_respected() {
        let store = MemoryStore::new();
        store.set_ex("short", "value", 1).await.unwrap();
        assert!(store.get("short").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(store.get("short").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_set_is_persistent() {
        let store = MemoryStore::new();
        store.set("marker", "1700000000").await.unwrap();
        store.set("marker", "1700000100").await.unwrap();

        assert_eq!(store.get("marker").await.unwrap().as_deref(), Some("1700000100"));
    }

    #[tokio::test]
    async fn test_memory_del_counts_existing_only() {
        let store = MemoryStore::new();
        store.set_ex("a", "1", 60).await.unwrap();
        store.set_ex("b", "2", 60).await.unwrap();

        let keys = vec!["a".to_string(), "b".to_string(), "missing".to_string()];
        assert_eq!(store.del(&keys).await.unwrap(), 2);
        assert_eq!(store.del(&keys).await.unwrap(), 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_ping() {
        let store = MemoryStore::new();
        assert!(store.ping().await.is_ok());
        assert_eq!(store.backend(), "memory");
    }
}
