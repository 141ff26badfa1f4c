//! Request handlers.
//!
//! Each submodule holds the async handler functions for one resource.
//! Handlers check permissions through [`AuthUser`](crate::middleware::auth::AuthUser),
//! delegate to the repositories in `intake_db` and map errors via
//! [`AppError`](crate::error::AppError).

pub mod auth;
pub mod documents;
pub mod modules;
pub mod permissions;
pub mod roles;
pub mod users;
