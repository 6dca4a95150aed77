//! Cache Key Module
//!
//! Deterministic key derivation from an operation prefix and its declared
//! parameters, plus the per-prefix index of keys this process has written.

use std::borrow::Cow;
use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::cache::entry::current_timestamp_ms;

/// Separator between the prefix and each `name:value` part.
pub const KEY_DELIMITER: &str = ":";

// == Key Params ==
/// Parameters of a cached read that decide its result.
///
/// Entries are returned in the operation's declared order, which is fixed
/// by the implementor and never by the client. Connection handles and the
/// authenticated principal are not parameters and never appear here.
pub trait KeyParams {
    fn key_params(&self) -> Vec<(&'static str, Option<String>)>;
}

impl KeyParams for () {
    fn key_params(&self) -> Vec<(&'static str, Option<String>)> {
        Vec::new()
    }
}

/// Builds `prefix:name:value:name:value...`, skipping parameters with no value.
///
/// Values are percent-escaped (`%` and `:`), so a value can never spell out
/// further `name:value` parts and collide with another parameter set.
pub fn derive_key<P: KeyParams + ?Sized>(prefix: &str, params: &P) -> String {
    let mut parts = vec![prefix.to_string()];
    for (name, value) in params.key_params() {
        if let Some(value) = value {
            parts.push(format!("{name}{KEY_DELIMITER}{}", escape_value(&value)));
        }
    }
    parts.join(KEY_DELIMITER)
}

fn escape_value(value: &str) -> Cow<'_, str> {
    if !value.contains(['%', ':']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 4);
    for ch in value.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            ':' => escaped.push_str("%3A"),
            _ => escaped.push(ch),
        }
    }
    Cow::Owned(escaped)
}

// == Key Index ==
/// Keys populated under each prefix by this process, with their expiry.
///
/// Lets invalidation reach parameterized variants of a cached read, which
/// the store protocol alone cannot enumerate. Only covers keys written by
/// this process; entries written elsewhere still expire through their TTL.
/// A key whose TTL has elapsed is gone from the store as well, so it is
/// pruned on the next `record` or `take` under its prefix.
#[derive(Debug, Default)]
pub struct KeyIndex {
    /// prefix -> key -> expiry (Unix milliseconds)
    by_prefix: RwLock<HashMap<String, HashMap<String, u64>>>,
}

impl KeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks `key` under `prefix` until `ttl_secs` from now.
    pub async fn record(&self, prefix: &str, key: &str, ttl_secs: u64) {
        let now = current_timestamp_ms();
        let mut by_prefix = self.by_prefix.write().await;
        let keys = by_prefix.entry(prefix.to_string()).or_default();
        keys.retain(|_, expires| *expires > now);
        keys.insert(key.to_string(), now.saturating_add(ttl_secs.saturating_mul(1000)));
    }

    /// Removes and returns every unexpired key recorded under `prefix`.
    pub async fn take(&self, prefix: &str) -> Vec<String> {
        let now = current_timestamp_ms();
        let mut keys: Vec<String> = self
            .by_prefix
            .write()
            .await
            .remove(prefix)
            .map(|keys| {
                keys.into_iter()
                    .filter(|(_, expires)| *expires > now)
                    .map(|(key, _)| key)
                    .collect()
            })
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Number of keys currently tracked under `prefix`.
    pub async fn tracked(&self, prefix: &str) -> usize {
        self.by_prefix
            .read()
            .await
            .get(prefix)
            .map_or(0, HashMap::len)
    }
}
