/*
 * Responsibility
 * - Load Config (fail fast) -> build dependencies -> assemble the Router
 * - Apply middleware (security headers / CORS / HTTP plumbing)
 * - Start axum::serve() with graceful shutdown
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::middleware::{
    cors, http,
    matcher::RequestMatcher,
    security_headers::{self, SecurityHeaders},
};
use crate::services::nonce::{NonceSource, OsNonceSource};
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,cms_api=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("info,cms_api=debug,tower_http=info")
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // Development: crash the whole process so it gets noticed.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

/// Load configuration. Any violation is logged per key and aborts startup.
fn load_config() -> Result<Config> {
    Config::from_env().map_err(|err| {
        for violation in err.violations() {
            tracing::error!(key = violation.key(), reason = %violation, "configuration rejected");
        }
        anyhow::Error::new(err)
    })
}

/// Scheme, host and port only; userinfo, path and query stay out of the logs.
fn origin_of(raw: &str) -> String {
    url::Url::parse(raw)
        .map(|u| u.origin().ascii_serialization())
        .unwrap_or_default()
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Arc::new(load_config()?);

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        app_env = ?config.app_env,
        addr = %config.addr,
        database = config.database_url.split(':').next().unwrap_or_default(),
        auth_url = %origin_of(&config.auth_url),
        public_api_url = %origin_of(&config.public_api_url),
        "starting CMS API"
    );

    let app = build_router(AppState::new(config.clone()), Arc::new(OsNonceSource));

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

/// Assemble the full application: routes, then security headers, CORS and
/// HTTP plumbing (outermost).
pub fn build_router(state: AppState, nonces: Arc<dyn NonceSource>) -> Router {
    let config = state.config.clone();

    let router = Router::new()
        .merge(api::page_routes())
        .nest("/api", api::api_routes())
        .with_state(state);

    let matcher = RequestMatcher::new(config.excluded_paths.iter().cloned());
    let router = security_headers::apply(router, SecurityHeaders::new(nonces, matcher));
    let router = cors::apply(router, &config);
    http::apply(router, &config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
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
