//! Response DTOs
//!
//! Defines the structure of outgoing HTTP response bodies that are not
//! domain records themselves.

use serde::{Deserialize, Serialize};

/// Response body for GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// API status, always "ok" when responding
    pub api_status: String,
    /// "ok" when the cache store answers PING, "unavailable" otherwise
    pub cache_status: String,
    /// Store backend label
    pub cache_backend: String,
}

impl HealthResponse {
    pub fn new(cache_ok: bool, cache_backend: &str) -> Self {
        Self {
            api_status: "ok".to_string(),
            cache_status: if cache_ok { "ok" } else { "unavailable" }.to_string(),
            cache_backend: cache_backend.to_string(),
        }
    }
}

/// Response body for POST /auth/token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_labels() {
        let health = HealthResponse::new(false, "disabled");
        assert_eq!(health.api_status, "ok");
        assert_eq!(health.cache_status, "unavailable");
        assert_eq!(HealthResponse::new(true, "redis").cache_status, "ok");
    }

    #[test]
    fn test_token_response_type() {
        let json = serde_json::to_value(TokenResponse::bearer("abc".into())).unwrap();
        assert_eq!(json["token_type"], "bearer");
        assert_eq!(json["access_token"], "abc");
    }
}
