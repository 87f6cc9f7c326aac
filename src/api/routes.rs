/*
 * Responsibility
 * - URL structure: pages at the root, JSON API under /api
 * - Security headers are attached per request by middleware::security_headers, not here
 */
use axum::{Router, routing::get};

use crate::api::handlers::{
    health::{health, not_found, root},
    pages::dashboard,
};
use crate::state::AppState;

/// Routes rendered for browsers.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/dashboard", get(dashboard))
        .fallback(not_found)
}

/// Routes mounted under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
