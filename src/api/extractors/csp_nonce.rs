/*
 * Responsibility
 * - Hand the per-request nonce (x-nonce, set by the security_headers middleware) to renderers
 * - Refuse to render when it is missing: inline code without a nonce would be blocked anyway
 * - Option<CspNonce> for handlers that also serve skipped requests (prefetches)
 */
use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::security_policy::NONCE_HEADER;

/// Nonce to put on every inline `<script>` / `<style>` a handler emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CspNonce(pub String);

impl CspNonce {
    fn from_parts(parts: &Parts) -> Option<Self> {
        parts
            .headers
            .get(NONCE_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| CspNonce(v.to_string()))
    }
}

impl<S> FromRequestParts<S> for CspNonce
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_parts(parts).ok_or_else(|| {
            tracing::error!(
                path = %parts.uri.path(),
                "x-nonce missing; refusing to render inline code"
            );
            AppError::Internal
        })
    }
}

impl<S> OptionalFromRequestParts<S> for CspNonce
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;

    use super::*;

    async fn extract(req: Request<()>) -> Result<CspNonce, AppError> {
        let (mut parts, _) = req.into_parts();
        <CspNonce as FromRequestParts<()>>::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn reads_forwarded_nonce() {
        let req = Request::get("/dashboard")
            .header(NONCE_HEADER, "bm9uY2U=")
            .body(())
            .unwrap();

        assert_eq!(extract(req).await.unwrap(), CspNonce("bm9uY2U=".to_string()));
    }

    #[tokio::test]
    async fn missing_nonce_is_a_server_error() {
        let req = Request::get("/dashboard").body(()).unwrap();

        let err = extract(req).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn optional_nonce_is_none_when_absent() {
        let (mut parts, _) = Request::get("/dashboard").body(()).unwrap().into_parts();

        let nonce = <CspNonce as OptionalFromRequestParts<()>>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(nonce, None);
    }
}
