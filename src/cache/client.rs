//! Cache Client Module
//!
//! Fail-open handle over a [`KvStore`]. Constructed once at startup, pinged
//! once, then cloned into every component that needs the cache. Any store
//! error or timeout is logged and turned into "no value" / "nothing done".

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::cache::{CacheStats, KeyIndex, KvStore};
use crate::error::StoreError;

// == Cache Client ==
#[derive(Clone)]
pub struct CacheClient {
    /// None when the store failed its startup ping
    store: Option<Arc<dyn KvStore>>,
    /// Upper bound for every store round trip
    timeout: Duration,
    stats: Arc<CacheStats>,
    index: Arc<KeyIndex>,
}

impl CacheClient {
    /// Wraps `store`, keeping it only if it answers `PING` within `timeout`.
    pub async fn connect(store: Arc<dyn KvStore>, timeout: Duration) -> Self {
        let backend = store.backend();
        let mut client = Self {
            store: Some(store),
            timeout,
            stats: Arc::new(CacheStats::new()),
            index: Arc::new(KeyIndex::new()),
        };

        if client.ping().await {
            info!(backend, "cache store reachable, caching enabled");
        } else {
            warn!(backend, "cache store unreachable at startup, caching disabled");
            client.store = None;
        }
        client
    }

    /// A client with no store: every operation is a no-op.
    pub fn disabled() -> Self {
        Self {
            store: None,
            timeout: Duration::from_millis(0),
            stats: Arc::new(CacheStats::new()),
            index: Arc::new(KeyIndex::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Backend label, or `"disabled"`.
    pub fn backend(&self) -> &'static str {
        self.store.as_ref().map_or("disabled", |store| store.backend())
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn key_index(&self) -> &KeyIndex {
        &self.index
    }

    // == Operations ==

    /// `PING`. False when disabled, erroring, or slow.
    pub async fn ping(&self) -> bool {
        match &self.store {
            Some(store) => self.guarded("PING", store.ping()).await.is_some(),
            None => false,
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let store = self.store.as_ref()?;
        self.guarded("GET", store.get(key)).await.flatten()
    }

    /// `SETEX`. Returns whether the value was written.
    pub async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        match &self.store {
            Some(store) => self
                .guarded("SETEX", store.set_ex(key, value, ttl_secs))
                .await
                .is_some(),
            None => false,
        }
    }

    /// `SET` without expiry. Returns whether the value was written.
    pub async fn set(&self, key: &str, value: &str) -> bool {
        match &self.store {
            Some(store) => self.guarded("SET", store.set(key, value)).await.is_some(),
            None => false,
        }
    }

    /// `DEL`. Returns the number of keys removed, zero on any failure.
    pub async fn delete(&self, keys: &[String]) -> u64 {
        match &self.store {
            Some(store) if !keys.is_empty() => {
                self.guarded("DEL", store.del(keys)).await.unwrap_or(0)
            }
            _ => 0,
        }
    }

    async fn guarded<T, F>(&self, op: &'static str, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let err = match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(err)) => err,
            Err(_) => StoreError::Timeout(self.timeout.as_millis() as u64),
        };
        warn!(op, error = %err, "cache store operation failed, bypassing cache");
        None
    }
}

impl std::fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheClient")
            .field("backend", &self.backend())
            .field("timeout", &self.timeout)
            .finish()
    }
}
