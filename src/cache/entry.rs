//! Cache Entry Module
//!
//! A single value held by the in-process store, with its absolute expiry.

use std::time::{SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A serialized value and the instant it stops being readable.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: String,
    /// Expiration timestamp (Unix milliseconds), None = persistent
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    /// Creates an entry that expires `ttl_seconds` from now.
    pub fn with_ttl(value: String, ttl_seconds: u64) -> Self {
        Self {
            value,
            expires_at: Some(current_timestamp_ms() + ttl_seconds * 1000),
        }
    }

    /// Creates an entry with no expiry, as plain `SET` does.
    pub fn persistent(value: String) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its expiry, so a
    /// fully elapsed TTL is never readable.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }
}

/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_persistent_entry_never_expires() {
        let entry = CacheEntry::persistent("1700000000".to_string());
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::with_ttl("[]".to_string(), 1);
        assert!(!entry.is_expired());

        sleep(Duration::from_millis(1100));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry {
            value: "test".to_string(),
            expires_at: Some(current_timestamp_ms()),
        };

        assert!(entry.is_expired(), "Entry should be expired at boundary");
    }
}
