/*
 * Responsibility
 * - Public surface of the HTTP layer (routes() re-export)
 */
pub mod extractors;
pub mod handlers;
mod routes;

pub use routes::{api_routes, page_routes};
