//! Fuelwatch - fuel-sale collection API
//!
//! Binary entry point: configuration, cache store, repositories and the
//! HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fuelwatch::auth::{hash_password, TokenKeys};
use fuelwatch::cache::{CacheClient, KvStore, MemoryStore, RedisStore};
use fuelwatch::config::{CacheBackendKind, Config};
use fuelwatch::models::NewUser;
use fuelwatch::repository::{MemoryCollectionRepository, MemoryUserStore, UserStore};
use fuelwatch::{create_router, AppState};

/// Main entry point for the Fuelwatch server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect the cache store and ping it once
/// 4. Create repositories and the optional bootstrap user
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fuelwatch=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Fuelwatch API");

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, cache_backend={:?}, cache_op_timeout={}ms, token_ttl={}min",
        config.server_port,
        config.cache_backend,
        config.cache_op_timeout_ms,
        config.access_token_expire_minutes
    );
    if config.uses_insecure_secret() {
        warn!("JWT_SECRET is not set, using the insecure development secret");
    }

    let cache = connect_cache(&config).await;

    let repo = Arc::new(MemoryCollectionRepository::new());
    let users = Arc::new(MemoryUserStore::new());
    bootstrap_user(&config, users.as_ref()).await?;

    let tokens = TokenKeys::new(&config.jwt_secret, config.access_token_expire_minutes);
    let state = AppState::new(cache, repo, users, tokens);
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Builds the cache client. A store that cannot be reached leaves caching
/// disabled for the life of the process; the API keeps serving.
async fn connect_cache(config: &Config) -> CacheClient {
    let timeout = Duration::from_millis(config.cache_op_timeout_ms);

    let store: Arc<dyn KvStore> = match config.cache_backend {
        CacheBackendKind::Memory => Arc::new(MemoryStore::new()),
        CacheBackendKind::Redis => {
            // The connection manager retries internally; bound the first attempt
            let connect_timeout = timeout.max(Duration::from_secs(2));
            match tokio::time::timeout(connect_timeout, RedisStore::connect(&config.redis_url)).await
            {
                Ok(Ok(store)) => Arc::new(store),
                Ok(Err(err)) => {
                    warn!(error = %err, "redis connection failed, caching disabled");
                    return CacheClient::disabled();
                }
                Err(_) => {
                    warn!("redis connection timed out, caching disabled");
                    return CacheClient::disabled();
                }
            }
        }
    };

    CacheClient::connect(store, timeout).await
}

/// Registers the configured bootstrap user, if any.
async fn bootstrap_user(config: &Config, users: &dyn UserStore) -> anyhow::Result<()> {
    let Some(bootstrap) = &config.bootstrap_user else {
        return Ok(());
    };

    if users.find_by_email(&bootstrap.email).await?.is_some() {
        return Ok(());
    }

    let password_hash = hash_password(&bootstrap.password)
        .map_err(|e| anyhow::anyhow!("failed to hash bootstrap password: {e}"))?;
    let user = users
        .insert(NewUser {
            name: bootstrap.name.clone(),
            email: bootstrap.email.clone(),
            cpf: String::new(),
            core_id: String::new(),
            password_hash,
        })
        .await?;
    info!(user_id = user.id, email = %user.email, "bootstrap user created");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
