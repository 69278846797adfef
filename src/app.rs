/*
 * Responsibility
 * - Load Config -> build dependencies -> assemble Router
 * - Apply middleware (CORS / request id / trace / timeout)
 * - Start with axum::serve() and shut down gracefully
 */
use std::{panic, process, sync::Arc, time::Duration};

use anyhow::Result;
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api,
    config::Config,
    middleware,
    services::{
        cache::{CacheClient, StoreHealth, ValkeyClient},
        lock::CacheLock,
        spotify::{CatalogClient, SpotifyCredentialProvider, TokenCache, TokenSource},
    },
    state::AppState,
};

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,spotify_proxy=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panics via tracing so they don't get lost
        // (stderr can be hidden depending on how the process is launched).
        tracing::error!(?info, "panic");

        // Development: fail fast. Production: default behavior, keep serving.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Connect to the shared cache (once per process) and wire the services on top of it.
async fn build_state(config: &Config) -> Result<AppState> {
    let cache = Arc::new(ValkeyClient::new(&config.redis_url).await?);
    CacheClient::ping(cache.as_ref()).await?;
    tracing::info!("connected to cache");

    wire_state(cache, config)
}

/// Build `AppState` over an already connected cache backend.
pub fn wire_state<C: CacheClient>(cache: Arc<C>, config: &Config) -> Result<AppState> {
    let lock = Arc::new(CacheLock::new(Arc::clone(&cache)));
    let provider = Arc::new(SpotifyCredentialProvider::new(
        config.spotify.clone(),
        config.spotify_token_url.clone(),
        config.token_cache.provider_timeout,
    )?);

    let tokens: Arc<dyn TokenSource> = Arc::new(TokenCache::new(
        Arc::clone(&cache),
        lock,
        provider,
        config.token_cache.clone(),
    ));

    let catalog = CatalogClient::new(
        config.spotify_api_base_url.clone(),
        config.upstream_timeout,
        tokens,
    )?;

    let store: Arc<dyn StoreHealth> = cache;
    Ok(AppState::new(catalog, store))
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .merge(api::v1::routes())
        .with_state(state);

    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router, request_timeout(config))
}

// Long enough for a full token wait plus one catalog call.
fn request_timeout(config: &Config) -> Duration {
    config.token_cache.wait_budget + config.token_cache.provider_timeout + config.upstream_timeout
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
