// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Webmention engine service.
//!
//! Serves the receiving endpoint (`POST /webmention`) for a site. The
//! storage seam is filled with an in-memory post store here; an embedding
//! application supplies its own `PostStore` and `MentionSink`.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `SITE_URL`: Base URL mention targets must be rooted under
//! - `POST_SLUGS`: Comma-separated slugs the in-memory store accepts
//! - `FETCH_TIMEOUT_SECS`: Outbound fetch timeout (default: 8)
//! - `REQUIRE_TARGET_BACKLINK`: Strict backlink check (default: false)
//! - `RATE_LIMIT_ENABLED`: Per-source limiter (default: false)

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use webmention_engine::{
    config::Config,
    fetch::Fetcher,
    handlers::{health, receive_webmention, AppState, MemorySink},
    limiter::SourceRateLimiter,
    verify::{MemoryPosts, Verifier},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_config();
    info!(
        bind_addr = %config.bind_addr,
        site_url = %config.site.base_url,
        fetch_timeout_secs = config.fetch.timeout_secs,
        require_target_backlink = config.verification.require_target_backlink,
        rate_limit_enabled = config.rate_limit.enabled,
        "Starting Webmention engine"
    );

    // Create application state
    let fetcher = Fetcher::new(&config.fetch)?;
    let store = Arc::new(MemoryPosts::from_slugs(post_slugs_from_env()));
    let verifier = Verifier::new(fetcher, store, &config.site, &config.verification);
    let limiter = SourceRateLimiter::new(config.rate_limit.clone());

    let state = Arc::new(AppState {
        verifier,
        limiter,
        sink: Arc::new(MemorySink::default()),
    });

    // Spawn limiter cleanup task
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_state.limiter.cleanup().await;
        }
    });

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/webmention", post(receive_webmention))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Load configuration from environment variables.
fn load_config() -> Config {
    let mut config = Config::default();

    if let Ok(bind_addr) = std::env::var("BIND_ADDR") {
        config.bind_addr = bind_addr;
    }
    if let Ok(site_url) = std::env::var("SITE_URL") {
        config.site.base_url = site_url;
    }
    if let Some(timeout) = env_parse("FETCH_TIMEOUT_SECS") {
        config.fetch.timeout_secs = timeout;
    }
    if let Some(strict) = env_parse("REQUIRE_TARGET_BACKLINK") {
        config.verification.require_target_backlink = strict;
    }
    if let Some(enabled) = env_parse("RATE_LIMIT_ENABLED") {
        config.rate_limit.enabled = enabled;
    }
    if let Some(rate) = env_parse("MAX_RATE_PER_SOURCE") {
        config.rate_limit.max_rate_per_source = rate;
    }

    config
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn post_slugs_from_env() -> Vec<String> {
    std::env::var("POST_SLUGS")
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
