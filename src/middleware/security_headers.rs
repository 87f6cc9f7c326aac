//! Per-request security headers for browser clients.
//!
//! This middleware is applied at the Router level (not inside individual handlers).
//!
//! For every request accepted by the `RequestMatcher`:
//! 1. generate a fresh nonce,
//! 2. forward it to handlers in the `x-nonce` request header,
//! 3. run the handler,
//! 4. set Content-Security-Policy (embedding the same nonce) plus
//!    X-Frame-Options, X-Content-Type-Options, Referrer-Policy,
//!    Strict-Transport-Security and Permissions-Policy on the response.
//!
//! If no nonce can be produced the request fails with 500 and the handler never runs.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, header::InvalidHeaderValue},
    middleware::{self, Next},
    response::Response,
};
use thiserror::Error;

use crate::error::AppError;
use crate::middleware::matcher::RequestMatcher;
use crate::services::nonce::{NonceError, NonceSource};
use crate::services::security_policy::{NONCE_HEADER, SecurityPolicy};

#[derive(Debug, Error)]
pub enum SecurityHeaderError {
    #[error(transparent)]
    Nonce(#[from] NonceError),
    #[error("security header is not a valid header value")]
    HeaderValue(#[from] InvalidHeaderValue),
}

/// Middleware state: where nonces come from and which requests get them.
#[derive(Clone)]
pub struct SecurityHeaders {
    nonces: Arc<dyn NonceSource>,
    matcher: RequestMatcher,
}

impl SecurityHeaders {
    pub fn new(nonces: Arc<dyn NonceSource>, matcher: RequestMatcher) -> Self {
        Self { nonces, matcher }
    }
}

/// Apply the security-header injector to every route of `router`.
pub fn apply<S>(router: Router<S>, headers: SecurityHeaders) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(headers, inject))
}

async fn inject(
    State(headers): State<SecurityHeaders>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if !headers.matcher.matches(&req) {
        // Handlers must only ever see a nonce that we generated.
        req.headers_mut().remove(NONCE_HEADER);
        tracing::debug!(path = %req.uri().path(), "security headers skipped");
        return Ok(next.run(req).await);
    }

    let nonce = headers
        .nonces
        .generate()
        .map_err(SecurityHeaderError::from)?;
    let policy = SecurityPolicy::new(nonce);
    let forwarded = policy
        .nonce_header_value()
        .map_err(SecurityHeaderError::from)?;
    req.headers_mut().insert(NONCE_HEADER, forwarded);

    let mut response = next.run(req).await;
    policy
        .apply(response.headers_mut())
        .map_err(SecurityHeaderError::from)?;
    Ok(response)
}
