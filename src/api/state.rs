//! Application state shared across all handlers.

use std::sync::Arc;

use crate::auth::TokenKeys;
use crate::cache::{CacheAside, CacheClient, FreshnessTracker, InvalidationRegistry};
use crate::models::policies;
use crate::repository::{CollectionRepository, UserStore};

/// Cheap to clone: every field is a handle.
#[derive(Clone)]
pub struct AppState {
    /// Read-through cache in front of the dashboard aggregates
    pub aside: CacheAside,
    /// Invalidation and freshness marker, driven by write handlers
    pub tracker: FreshnessTracker,
    pub repo: Arc<dyn CollectionRepository>,
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<TokenKeys>,
}

impl AppState {
    /// Builds the state around an already connected cache client. Every
    /// cached read declared in [`policies::ALL`] is registered for
    /// invalidation.
    pub fn new(
        client: CacheClient,
        repo: Arc<dyn CollectionRepository>,
        users: Arc<dyn UserStore>,
        tokens: TokenKeys,
    ) -> Self {
        let registry = InvalidationRegistry::new(policies::ALL);
        Self {
            aside: CacheAside::new(client.clone()),
            tracker: FreshnessTracker::new(client, registry),
            repo,
            users,
            tokens: Arc::new(tokens),
        }
    }

    pub fn cache(&self) -> &CacheClient {
        self.aside.client()
    }
}
