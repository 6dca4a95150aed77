//! Cache-Aside Wrapper
//!
//! Wraps a pure read so that its result is served from the store when
//! present and computed then stored otherwise. Caching is best-effort: no
//! store or codec failure ever reaches the caller, while errors from the
//! wrapped read pass through untouched and are never cached.

use std::future::Future;

use tracing::{debug, warn};

use crate::cache::codec::{self, Cacheable};
use crate::cache::{derive_key, CacheClient, KeyParams};

/// Prefix shared by every dashboard aggregate key.
pub const KPI_PREFIX: &str = "kpi_";

/// TTL for series that change with every ingestion.
pub const HISTORY_TTL_SECS: u64 = 600;

/// TTL for coarse aggregates.
pub const AGGREGATE_TTL_SECS: u64 = 3600;

// == Cache Policy ==
/// Identity and lifetime of one cached read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Logical name, also used for invalidation
    pub name: &'static str,
    pub ttl_secs: u64,
}

impl CachePolicy {
    pub const fn new(name: &'static str, ttl_secs: u64) -> Self {
        Self { name, ttl_secs }
    }

    pub const fn aggregate(name: &'static str) -> Self {
        Self::new(name, AGGREGATE_TTL_SECS)
    }

    pub const fn history(name: &'static str) -> Self {
        Self::new(name, HISTORY_TTL_SECS)
    }

    /// Key prefix, `kpi_<name>`. Invalidation uses the same convention.
    pub fn prefix(&self) -> String {
        prefix_for(self.name)
    }
}

/// Maps a logical cache name to its key prefix.
pub fn prefix_for(name: &str) -> String {
    format!("{KPI_PREFIX}{name}")
}

// == Cache Aside ==
#[derive(Clone, Debug)]
pub struct CacheAside {
    client: CacheClient,
}

impl CacheAside {
    pub fn new(client: CacheClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &CacheClient {
        &self.client
    }

    /// Returns the result of `op`, going through the store under the key
    /// derived from `policy` and `params`.
    ///
    /// `op` must be side-effect free: on a hit it is not invoked at all.
    pub async fn fetch<P, T, E, F, Fut>(&self, policy: &CachePolicy, params: &P, op: F) -> Result<T, E>
    where
        P: KeyParams + ?Sized,
        T: Cacheable,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let prefix = policy.prefix();
        let key = derive_key(&prefix, params);
        self.fetch_keyed(policy, &prefix, key, op).await
    }

    /// Higher-order form: binds `policy` to `op` and returns a value whose
    /// [`Cached::call`] has the same signature and results as `op`.
    pub fn wrap<F>(&self, policy: CachePolicy, op: F) -> Cached<F> {
        Cached {
            aside: self.clone(),
            policy,
            op,
        }
    }

    async fn fetch_keyed<T, E, F, Fut>(
        &self,
        policy: &CachePolicy,
        prefix: &str,
        key: String,
        op: F,
    ) -> Result<T, E>
    where
        T: Cacheable,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let stats = self.client.stats();

        if let Some(raw) = self.client.get(&key).await {
            match codec::deserialize(&raw).and_then(T::from_cached) {
                Ok(value) => {
                    stats.record_hit();
                    debug!(key = %key, "cache hit");
                    return Ok(value);
                }
                Err(err) => warn!(key = %key, error = %err, "unreadable cache entry, recomputing"),
            }
        }

        stats.record_miss();
        debug!(key = %key, "cache miss");
        let result = op().await?;

        if self.client.is_enabled() && !result.is_empty_result() {
            match codec::serialize(&result.to_payload()) {
                Ok(raw) => {
                    if self.client.set_ex(&key, &raw, policy.ttl_secs).await {
                        stats.record_store();
                        self.client
                            .key_index()
                            .record(prefix, &key, policy.ttl_secs)
                            .await;
                    }
                }
                Err(err) => {
                    stats.record_skip();
                    warn!(key = %key, error = %err, "result not cached, serialization failed");
                }
            }
        }

        Ok(result)
    }
}

// == Cached ==
/// A read operation bound to a cache policy. See [`CacheAside::wrap`].
pub struct Cached<F> {
    aside: CacheAside,
    policy: CachePolicy,
    op: F,
}

impl<F> Cached<F> {
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub async fn call<P, T, E, Fut>(&self, params: P) -> Result<T, E>
    where
        P: KeyParams,
        T: Cacheable,
        F: Fn(P) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let prefix = self.policy.prefix();
        let key = derive_key(&prefix, &params);
        self.aside
            .fetch_keyed(&self.policy, &prefix, key, || (self.op)(params))
            .await
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::codec::{Fields, ToFields};
    use crate::cache::MemoryStore;
    use rust_decimal::Decimal;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Avg {
        fuel_type: String,
        average_price: Decimal,
    }

    impl ToFields for Avg {
        fn to_fields(&self) -> Fields {
            vec![
                ("fuel_type", self.fuel_type.clone().into()),
                ("average_price", self.average_price.into()),
            ]
        }
    }

    struct ByState(Option<String>);

    impl KeyParams for ByState {
        fn key_params(&self) -> Vec<(&'static str, Option<String>)> {
            vec![("state", self.0.clone())]
        }
    }

    const POLICY: CachePolicy = CachePolicy::aggregate("average_price");

    async fn memory_aside() -> CacheAside {
        let client = CacheClient::connect(Arc::new(MemoryStore::new()), Duration::from_millis(100)).await;
        CacheAside::new(client)
    }

    fn sample() -> Vec<Avg> {
        vec![Avg {
            fuel_type: "Gasoline".into(),
            average_price: Decimal::new(575, 2),
        }]
    }

    #[test]
    fn test_policy_prefix_and_ttls() {
        assert_eq!(POLICY.prefix(), "kpi_average_price");
        assert_eq!(POLICY.ttl_secs, 3600);
        assert_eq!(CachePolicy::history("price_history").ttl_secs, 600);
    }

    #[tokio::test]
    async fn test_hit_skips_operation() {
        let aside = memory_aside().await;
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let result: Result<Vec<Avg>, ()> = aside
                .fetch(&POLICY, &ByState(None), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(sample())
                })
                .await;
            assert_eq!(result.unwrap(), sample());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = aside.client().stats().snapshot();
        assert_eq!((stats.hits, stats.misses, stats.stores), (2, 1, 1));
    }

    #[tokio::test]
    async fn test_params_separate_entries() {
        let aside = memory_aside().await;
        let calls = AtomicUsize::new(0);

        for state in ["SP", "RJ", "SP"] {
            let _: Result<Vec<Avg>, ()> = aside
                .fetch(&POLICY, &ByState(Some(state.into())), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(sample())
                })
                .await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(aside.client().get("kpi_average_price:state:SP").await.is_some());
        assert!(aside.client().get("kpi_average_price:state:RJ").await.is_some());
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let aside = memory_aside().await;

        let first: Result<Vec<Avg>, &str> = aside
            .fetch(&POLICY, &(), || async { Err("not found") })
            .await;
        assert_eq!(first.unwrap_err(), "not found");
        assert!(aside.client().get("kpi_average_price").await.is_none());

        let second: Result<Vec<Avg>, &str> =
            aside.fetch(&POLICY, &(), || async { Ok(sample()) }).await;
        assert_eq!(second.unwrap(), sample());
    }

    #[tokio::test]
    async fn test_empty_results_are_not_cached() {
        let aside = memory_aside().await;
        let _: Result<Vec<Avg>, ()> = aside.fetch(&POLICY, &(), || async { Ok(Vec::new()) }).await;
        assert!(aside.client().get("kpi_average_price").await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_store_always_computes() {
        let aside = CacheAside::new(CacheClient::disabled());
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result: Result<Vec<Avg>, ()> = aside
                .fetch(&POLICY, &(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(sample())
                })
                .await;
            assert_eq!(result.unwrap(), sample());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_serialization_failure_still_returns_result() {
        let aside = memory_aside().await;
        let value = serde_json::json!({"ok": true});

        // A result whose payload cannot be encoded
        struct Opaque;
        impl Cacheable for Opaque {
            fn to_payload(&self) -> codec::Payload {
                codec::Payload::Record(vec![("raw", codec::FieldValue::Bytes(vec![0]))])
            }
            fn from_cached(_: serde_json::Value) -> Result<Self, crate::error::SerializationError> {
                Ok(Opaque)
            }
        }

        let result: Result<Opaque, ()> = aside.fetch(&POLICY, &(), || async { Ok(Opaque) }).await;
        assert!(result.is_ok());
        assert!(aside.client().get("kpi_average_price").await.is_none());
        assert_eq!(aside.client().stats().snapshot().skipped, 1);

        let json: Result<serde_json::Value, ()> = aside
            .fetch(&CachePolicy::aggregate("plain"), &(), || async { Ok(value.clone()) })
            .await;
        assert_eq!(json.unwrap(), value);
    }

    #[tokio::test]
    async fn test_unreadable_entry_is_recomputed() {
        let aside = memory_aside().await;
        aside.client().set_ex("kpi_average_price", "{broken", 60).await;

        let result: Result<Vec<Avg>, ()> = aside.fetch(&POLICY, &(), || async { Ok(sample()) }).await;
        assert_eq!(result.unwrap(), sample());
    }

    #[tokio::test]
    async fn test_wrapped_operation_matches_direct_call() {
        let aside = memory_aside().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let cached = aside.wrap(POLICY, move |state: ByState| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let fuel_type = state.0.unwrap_or_else(|| "all".into());
                Ok::<_, ()>(vec![Avg {
                    fuel_type,
                    average_price: Decimal::new(1250, 2),
                }])
            }
        });

        let first = cached.call(ByState(Some("SP".into()))).await.unwrap();
        let second = cached.call(ByState(Some("SP".into()))).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].fuel_type, "SP");
        assert_eq!(first[0].average_price, Decimal::new(1250, 2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached.policy().name, "average_price");
    }
}
