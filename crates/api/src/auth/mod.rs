//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- JWT access/reset tokens and refresh-token helpers.
//! - [`sso`] -- OAuth code exchanges for Microsoft and Dropbox.

pub mod jwt;
pub mod password;
pub mod sso;
