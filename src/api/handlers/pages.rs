/*
 * Responsibility
 * - GET /dashboard: HTML shell for the CMS frontend
 * - Every inline <script>/<style> carries the request nonce so the CSP lets it run
 * - Requests skipped by security_headers (prefetches) get an empty 204
 */
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};

use crate::api::extractors::CspNonce;
use crate::state::AppState;

pub async fn dashboard(
    State(state): State<AppState>,
    uri: Uri,
    nonce: Option<CspNonce>,
) -> Response {
    let Some(CspNonce(nonce)) = nonce else {
        tracing::debug!(path = %uri.path(), "no nonce forwarded; skipping render");
        return StatusCode::NO_CONTENT.into_response();
    };
    let api_url = js_string(&state.config.public_api_url);

    Html(format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>CMS Dashboard</title>
<style nonce="{nonce}">body {{ font-family: system-ui, sans-serif; margin: 2rem; }}</style>
</head>
<body>
<main id="app">Loading…</main>
<script nonce="{nonce}">window.__CMS_API_URL__ = {api_url};</script>
</body>
</html>
"#
    ))
    .into_response()
}

// JSON string literal that cannot close the surrounding <script> element.
fn js_string(value: &str) -> String {
    serde_json::Value::from(value)
        .to_string()
        .replace('<', "\\u003c")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_string_cannot_break_out_of_script() {
        assert_eq!(js_string("http://a.test"), r#""http://a.test""#);
        assert_eq!(
            js_string("http://a.test/</script>"),
            r#""http://a.test/\u003c/script>""#
        );
    }
}
