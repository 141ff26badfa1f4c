//! Request extractors and middleware layers.
//!
//! - [`auth::AuthUser`] -- Authenticated caller from a JWT Bearer token, with
//!   per-module permission checks.
//! - [`envelope`] -- Encrypted `{"payload": ...}` request/response bodies.
//! - [`request_log`] -- One structured log line per request.

pub mod auth;
pub mod envelope;
pub mod request_log;
