//! Bearer-Token Guard
//!
//! Every rejection maps to the same `ApiError::Unauthenticated`, so a client
//! cannot tell a bad signature from an unknown user. The cause is logged at
//! debug level only.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::debug;

use crate::api::AppState;
use crate::auth::TokenKeys;
use crate::error::{ApiError, Result};
use crate::models::User;
use crate::repository::UserStore;

const BEARER_PREFIX: &str = "bearer ";

/// Resolves the principal of one request from its `Authorization` header.
pub async fn authenticate(
    header: Option<&str>,
    keys: &TokenKeys,
    users: &dyn UserStore,
) -> Result<User> {
    let Some(raw) = header else {
        debug!("rejected: missing authorization header");
        return Err(ApiError::Unauthenticated);
    };

    let token = strip_bearer(raw.trim());

    let Some(claims) = keys.decode(token) else {
        debug!("rejected: token failed verification");
        return Err(ApiError::Unauthenticated);
    };

    let Some(user_id) = claims.user_id.as_deref().and_then(|id| id.parse::<i64>().ok()) else {
        debug!(sub = %claims.sub, "rejected: missing or non-numeric user_id claim");
        return Err(ApiError::Unauthenticated);
    };

    match users.find_by_id(user_id).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => {
            debug!(user_id, "rejected: principal not found");
            Err(ApiError::Unauthenticated)
        }
        Err(err) => {
            debug!(user_id, error = %err, "rejected: principal lookup failed");
            Err(ApiError::Unauthenticated)
        }
    }
}

/// Strips a case-insensitive `Bearer ` prefix; otherwise the whole value is
/// the token.
fn strip_bearer(value: &str) -> &str {
    match value.get(..BEARER_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(BEARER_PREFIX) => {
            value[BEARER_PREFIX.len()..].trim_start()
        }
        _ => value,
    }
}

// == Extractor ==
/// The authenticated principal. Adding this extractor to a handler makes the
/// route protected.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        authenticate(header, &state.tokens, state.users.as_ref())
            .await
            .map(CurrentUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use crate::models::NewUser;
    use crate::repository::MemoryUserStore;
    use chrono::Utc;

    async fn setup() -> (TokenKeys, MemoryUserStore, User) {
        let users = MemoryUserStore::new();
        let user = users
            .insert(NewUser {
                name: "Ana".into(),
                email: "ana@example.com".into(),
                cpf: "12345678901".into(),
                core_id: "core-1".into(),
                password_hash: String::new(),
            })
            .await
            .unwrap();
        (TokenKeys::new("secret", 30), users, user)
    }

    fn claims(user_id: Option<&str>, exp_offset: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: "ana@example.com".into(),
            user_id: user_id.map(str::to_string),
            coreid: String::new(),
            iat: now,
            exp: now + exp_offset,
        }
    }

    #[test]
    fn test_strip_bearer_variants() {
        assert_eq!(strip_bearer("Bearer abc"), "abc");
        assert_eq!(strip_bearer("bearer abc"), "abc");
        assert_eq!(strip_bearer("BEARER abc"), "abc");
        assert_eq!(strip_bearer("abc"), "abc");
        assert_eq!(strip_bearer("Basic abc"), "Basic abc");
    }

    #[tokio::test]
    async fn test_valid_token_resolves_principal() {
        let (keys, users, user) = setup().await;
        let header = format!("Bearer {}", keys.issue(&user).unwrap());
        let resolved = authenticate(Some(&header), &keys, &users).await.unwrap();
        assert_eq!(resolved, user);

        // A bare token without the scheme is accepted as well
        let bare = keys.issue(&user).unwrap();
        assert!(authenticate(Some(&bare), &keys, &users).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_header_rejected() {
        let (keys, users, _) = setup().await;
        let err = authenticate(None, &keys, &users).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_bad_signature_rejected() {
        let (keys, users, user) = setup().await;
        let forged = TokenKeys::new("not-the-secret", 30).issue(&user).unwrap();
        let header = format!("Bearer {forged}");
        assert!(matches!(
            authenticate(Some(&header), &keys, &users).await,
            Err(ApiError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let (keys, users, user) = setup().await;
        let token = keys.issue_claims(&claims(Some(&user.id.to_string()), -1)).unwrap();
        assert!(authenticate(Some(&token), &keys, &users).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_or_non_numeric_user_id_rejected() {
        let (keys, users, _) = setup().await;
        for user_id in [None, Some("abc"), Some("")] {
            let token = keys.issue_claims(&claims(user_id, 60)).unwrap();
            assert!(authenticate(Some(&token), &keys, &users).await.is_err());
        }
    }

    #[tokio::test]
    async fn test_unknown_principal_rejected() {
        let (keys, users, _) = setup().await;
        let token = keys.issue_claims(&claims(Some("999"), 60)).unwrap();
        assert!(matches!(
            authenticate(Some(&token), &keys, &users).await,
            Err(ApiError::Unauthenticated)
        ));
    }
}
