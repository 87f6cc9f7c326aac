/*
 * Responsibility
 * - Public interface of the middleware layer (re-export)
 * - http::apply, cors::apply, security_headers::apply
 */
pub mod cors;
pub mod http;
pub mod matcher;
pub mod security_headers;
