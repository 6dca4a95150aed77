//! Invalidation & Freshness Tracker
//!
//! Mutations clear the cached aggregates and stamp a process-wide "last data
//! ingestion" marker. The marker feeds the data-status endpoint so clients
//! can tell how fresh the dashboards are.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::aside::{prefix_for, CachePolicy};
use crate::cache::CacheClient;

/// Store key holding the Unix timestamp of the latest mutation.
pub const LAST_UPDATE_KEY: &str = "dashboard:last_data_ingestion";

// == Invalidation Registry ==
/// The cached reads a mutation has to clear.
///
/// Built from the same policy constants the read handlers use, so a read
/// added to the registry is invalidated by every write without a second,
/// hand-kept key list.
#[derive(Debug, Clone, Default)]
pub struct InvalidationRegistry {
    policies: Vec<CachePolicy>,
}

impl InvalidationRegistry {
    pub fn new(policies: &[CachePolicy]) -> Self {
        let mut registry = Self::default();
        for policy in policies {
            registry.register(*policy);
        }
        registry
    }

    /// Adds a policy; registering the same name twice is a no-op.
    pub fn register(&mut self, policy: CachePolicy) {
        if !self.policies.iter().any(|p| p.name == policy.name) {
            self.policies.push(policy);
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.policies.iter().map(|p| p.name).collect()
    }
}

// == Freshness Tracker ==
#[derive(Debug, Clone)]
pub struct FreshnessTracker {
    client: CacheClient,
    registry: InvalidationRegistry,
}

impl FreshnessTracker {
    pub fn new(client: CacheClient, registry: InvalidationRegistry) -> Self {
        Self { client, registry }
    }

    pub fn registry(&self) -> &InvalidationRegistry {
        &self.registry
    }

    // == Invalidate ==
    /// Deletes the cached entries of each logical name: the bare
    /// `kpi_<name>` key plus every parameterized variant this process
    /// stored. Returns how many keys the store actually removed.
    pub async fn invalidate(&self, names: &[&str]) -> u64 {
        if !self.client.is_enabled() {
            warn!("cache store inactive, invalidation skipped");
            return 0;
        }

        let keys = self.keys_for(names).await;
        let deleted = self.client.delete(&keys).await;
        self.client.stats().record_invalidated(deleted);
        info!(deleted, requested = keys.len(), "cache invalidated");
        deleted
    }

    /// Bare and indexed keys of each name, sorted and without duplicates.
    async fn keys_for(&self, names: &[&str]) -> Vec<String> {
        let mut keys = Vec::new();
        for name in names {
            let prefix = prefix_for(name);
            let variants = self.client.key_index().take(&prefix).await;
            keys.push(prefix);
            keys.extend(variants);
        }
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Invalidates every registered cached read.
    pub async fn invalidate_registered(&self) -> u64 {
        self.invalidate(&self.registry.names()).await
    }

    // == Marker ==
    /// Overwrites the marker with the current Unix time and returns it.
    pub async fn mark_updated(&self) -> i64 {
        let now = Utc::now().timestamp();
        if !self.client.set(LAST_UPDATE_KEY, &now.to_string()).await {
            warn!("cache store inactive, last update timestamp not recorded");
        }
        now
    }

    /// Reads the marker. `None` when absent, unparsable, or the store is down.
    pub async fn last_update(&self) -> Option<i64> {
        self.client
            .get(LAST_UPDATE_KEY)
            .await
            .and_then(|raw| raw.trim().parse().ok())
    }

    /// Clears every cached aggregate and stamps the marker. Write handlers
    /// call this after a successful mutation, before responding.
    pub async fn record_mutation(&self) {
        self.invalidate_registered().await;
        self.mark_updated().await;
    }

    pub async fn status(&self) -> DataStatus {
        DataStatus::new(self.last_update().await, Utc::now().timestamp())
    }
}

// == Data Status ==
/// Read-only freshness report served to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataStatus {
    pub last_update_ts: Option<i64>,
    /// RFC 3339, UTC
    pub last_update_at: Option<String>,
    pub seconds_since_update: Option<i64>,
    pub message: String,
}

impl DataStatus {
    pub fn new(last_update_ts: Option<i64>, now: i64) -> Self {
        let Some(ts) = last_update_ts else {
            return Self {
                last_update_ts: None,
                last_update_at: None,
                seconds_since_update: None,
                message: "No data ingestion has been recorded yet.".to_string(),
            };
        };

        let elapsed = (now - ts).max(0);
        Self {
            last_update_ts: Some(ts),
            last_update_at: DateTime::<Utc>::from_timestamp(ts, 0).map(|dt| dt.to_rfc3339()),
            seconds_since_update: Some(elapsed),
            message: freshness_message(elapsed),
        }
    }
}

fn freshness_message(elapsed: i64) -> String {
    let (count, unit) = match elapsed {
        0..=59 => (elapsed, "second"),
        60..=3_599 => (elapsed / 60, "minute"),
        3_600..=86_399 => (elapsed / 3_600, "hour"),
        _ => (elapsed / 86_400, "day"),
    };
    let plural = if count == 1 { "" } else { "s" };
    format!("Data updated {count} {unit}{plural} ago.")
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use std::sync::Arc;
    use std::time::Duration;

    const POLICIES: &[CachePolicy] = &[
        CachePolicy::aggregate("average_price"),
        CachePolicy::aggregate("volume_by_vehicle"),
        CachePolicy::history("price_history"),
    ];

    async fn tracker() -> FreshnessTracker {
        let client = CacheClient::connect(Arc::new(MemoryStore::new()), Duration::from_millis(100)).await;
        FreshnessTracker::new(client, InvalidationRegistry::new(POLICIES))
    }

    #[test]
    fn test_registry_dedups_names() {
        let mut registry = InvalidationRegistry::new(POLICIES);
        registry.register(CachePolicy::aggregate("average_price"));
        assert_eq!(
            registry.names(),
            vec!["average_price", "volume_by_vehicle", "price_history"]
        );
    }

    #[tokio::test]
    async fn test_invalidate_removes_all_named_keys() {
        let tracker = tracker().await;
        let client = &tracker.client;

        client.set_ex("kpi_average_price", "[]", 60).await;
        client.set_ex("kpi_volume_by_vehicle", "[]", 60).await;
        client.set_ex("kpi_average_price:state:SP", "[]", 60).await;
        client
            .key_index()
            .record("kpi_average_price", "kpi_average_price:state:SP", 60)
            .await;

        let deleted = tracker.invalidate(&["average_price", "volume_by_vehicle"]).await;
        assert_eq!(deleted, 3);
        assert!(client.get("kpi_average_price").await.is_none());
        assert!(client.get("kpi_volume_by_vehicle").await.is_none());
        assert!(client.get("kpi_average_price:state:SP").await.is_none());
    }

    #[tokio::test]
    async fn test_repeated_names_yield_each_key_once() {
        let tracker = tracker().await;
        tracker
            .client
            .key_index()
            .record("kpi_average_price", "kpi_average_price:state:SP", 60)
            .await;

        let keys = tracker
            .keys_for(&["average_price", "volume_by_vehicle", "average_price"])
            .await;
        assert_eq!(
            keys,
            vec![
                "kpi_average_price",
                "kpi_average_price:state:SP",
                "kpi_volume_by_vehicle",
            ]
        );
    }

    #[tokio::test]
    async fn test_invalidate_with_nothing_cached() {
        let tracker = tracker().await;
        assert_eq!(tracker.invalidate_registered().await, 0);
    }

    #[tokio::test]
    async fn test_marker_absent_until_first_mutation() {
        let tracker = tracker().await;
        assert!(tracker.last_update().await.is_none());

        let before = Utc::now().timestamp();
        tracker.record_mutation().await;
        let ts = tracker.last_update().await.unwrap();
        assert!(ts >= before);
    }

    #[tokio::test]
    async fn test_marker_is_monotonic() {
        let tracker = tracker().await;
        tracker.mark_updated().await;
        let first = tracker.last_update().await.unwrap();
        tracker.mark_updated().await;
        let second = tracker.last_update().await.unwrap();
        assert!(second >= first);
    }

    #[tokio::test]
    async fn test_unparsable_marker_reads_as_unknown() {
        let tracker = tracker().await;
        tracker.client.set(LAST_UPDATE_KEY, "yesterday").await;
        assert!(tracker.last_update().await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_store_is_noop() {
        let tracker = FreshnessTracker::new(CacheClient::disabled(), InvalidationRegistry::new(POLICIES));
        assert_eq!(tracker.invalidate_registered().await, 0);
        tracker.mark_updated().await;
        assert!(tracker.last_update().await.is_none());
        assert_eq!(tracker.status().await.last_update_ts, None);
    }

    #[test]
    fn test_status_without_update() {
        let status = DataStatus::new(None, 1_700_000_000);
        assert!(status.last_update_at.is_none());
        assert!(status.seconds_since_update.is_none());
        assert_eq!(status.message, "No data ingestion has been recorded yet.");
    }

    #[test]
    fn test_status_buckets() {
        let now = 1_700_000_000;
        let cases = [
            (1, "Data updated 1 second ago."),
            (45, "Data updated 45 seconds ago."),
            (60, "Data updated 1 minute ago."),
            (3_599, "Data updated 59 minutes ago."),
            (7_200, "Data updated 2 hours ago."),
            (86_400, "Data updated 1 day ago."),
            (3 * 86_400 + 5, "Data updated 3 days ago."),
        ];
        for (elapsed, expected) in cases {
            let status = DataStatus::new(Some(now - elapsed), now);
            assert_eq!(status.seconds_since_update, Some(elapsed));
            assert_eq!(status.message, expected);
        }
    }

    #[test]
    fn test_status_datetime_and_clock_skew() {
        let status = DataStatus::new(Some(0), -5);
        assert_eq!(status.seconds_since_update, Some(0));
        assert_eq!(status.last_update_at.as_deref(), Some("1970-01-01T00:00:00+00:00"));
    }
}
