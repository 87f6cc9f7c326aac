//! Content-Security-Policy and companion headers for one request.
//!
//! A `SecurityPolicy` is derived from a single nonce and discarded with the
//! response. The nonce embedded in `script-src`/`style-src` is the same value
//! forwarded to handlers in `x-nonce`.

use axum::http::header::{
    CONTENT_SECURITY_POLICY, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue,
    REFERRER_POLICY, STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
};

use crate::services::nonce::Nonce;

/// Request header carrying the nonce to downstream renderers.
pub const NONCE_HEADER: HeaderName = HeaderName::from_static("x-nonce");

pub const PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");

/// Response headers that do not depend on the nonce.
const STATIC_HEADERS: [(HeaderName, &str); 5] = [
    (X_FRAME_OPTIONS, "DENY"),
    (X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (REFERRER_POLICY, "strict-origin-when-cross-origin"),
    (STRICT_TRANSPORT_SECURITY, "max-age=3156000; includeSubDomains"),
    (PERMISSIONS_POLICY, "camera=(), microphone=(), geolocation=()"),
];

/// Every header this policy writes onto a response.
pub const RESPONSE_HEADERS: [HeaderName; 6] = [
    CONTENT_SECURITY_POLICY,
    X_FRAME_OPTIONS,
    X_CONTENT_TYPE_OPTIONS,
    REFERRER_POLICY,
    STRICT_TRANSPORT_SECURITY,
    PERMISSIONS_POLICY,
];

#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    nonce: Nonce,
    content_security_policy: String,
}

impl SecurityPolicy {
    pub fn new(nonce: Nonce) -> Self {
        let content_security_policy = build_csp(&nonce);
        Self {
            nonce,
            content_security_policy,
        }
    }

    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    pub fn content_security_policy(&self) -> &str {
        &self.content_security_policy
    }

    pub fn nonce_header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(self.nonce.as_str())
    }

    /// Overwrite the six security headers on `headers`.
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), InvalidHeaderValue> {
        headers.insert(
            CONTENT_SECURITY_POLICY,
            HeaderValue::from_str(&self.content_security_policy)?,
        );
        for (name, value) in STATIC_HEADERS {
            headers.insert(name, HeaderValue::from_static(value));
        }
        Ok(())
    }
}

fn build_csp(nonce: &Nonce) -> String {
    let nonce_src = format!("'nonce-{nonce}'");
    [
        "default-src 'self'".to_string(),
        format!("script-src 'self' {nonce_src} 'strict-dynamic'"),
        format!("style-src 'self' {nonce_src}"),
        "img-src 'self' blob: data: https:".to_string(),
        "font-src 'self'".to_string(),
        "object-src 'none'".to_string(),
        "base-uri 'self'".to_string(),
        "form-action 'self'".to_string(),
        "frame-ancestors 'none'".to_string(),
        "upgrade-insecure-requests".to_string(),
    ]
    .join("; ")
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn policy() -> SecurityPolicy {
        SecurityPolicy::new(Nonce::from_uuid(Uuid::nil()))
    }

    fn directive<'a>(csp: &'a str, name: &str) -> &'a str {
        csp.split("; ")
            .find(|d| d.split(' ').next() == Some(name))
            .unwrap_or_else(|| panic!("missing directive {name}"))
    }

    #[test]
    fn csp_contains_every_directive() {
        let p = policy();
        let csp = p.content_security_policy();
        let nonce = p.nonce().as_str();

        assert_eq!(directive(csp, "default-src"), "default-src 'self'");
        assert_eq!(
            directive(csp, "script-src"),
            format!("script-src 'self' 'nonce-{nonce}' 'strict-dynamic'")
        );
        assert_eq!(
            directive(csp, "style-src"),
            format!("style-src 'self' 'nonce-{nonce}'")
        );
        assert_eq!(
            directive(csp, "img-src"),
            "img-src 'self' blob: data: https:"
        );
        assert_eq!(directive(csp, "font-src"), "font-src 'self'");
        assert_eq!(directive(csp, "object-src"), "object-src 'none'");
        assert_eq!(directive(csp, "base-uri"), "base-uri 'self'");
        assert_eq!(directive(csp, "form-action"), "form-action 'self'");
        assert_eq!(directive(csp, "frame-ancestors"), "frame-ancestors 'none'");
        assert_eq!(
            directive(csp, "upgrade-insecure-requests"),
            "upgrade-insecure-requests"
        );
        assert_eq!(csp.split("; ").count(), 10);
    }

    #[test]
    fn csp_is_single_line() {
        let p = policy();
        let csp = p.content_security_policy();

        assert!(!csp.contains('\n'));
        assert!(!csp.contains('\r'));
        assert!(!csp.contains("  "));
        assert_eq!(csp.trim(), csp);
    }

    #[test]
    fn apply_sets_all_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));

        policy().apply(&mut headers).expect("apply");

        for name in RESPONSE_HEADERS {
            assert_eq!(headers.get_all(&name).iter().count(), 1, "{name}");
        }
        assert_eq!(headers.get(X_FRAME_OPTIONS).unwrap(), "DENY");
        assert_eq!(headers.get(X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert_eq!(
            headers.get(REFERRER_POLICY).unwrap(),
            "strict-origin-when-cross-origin"
        );
        assert_eq!(
            headers.get(STRICT_TRANSPORT_SECURITY).unwrap(),
            "max-age=3156000; includeSubDomains"
        );
        assert_eq!(
            headers.get("permissions-policy").unwrap(),
            "camera=(), microphone=(), geolocation=()"
        );
    }
}
