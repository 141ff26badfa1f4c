//! Domain logic shared by the intake services.
//!
//! Nothing in this crate touches the network or the database; the `db`,
//! `cloud`, `pipeline` and `api` crates build on top of it.

pub mod crypto;
pub mod error;
pub mod otp;
pub mod permissions;
pub mod search;
pub mod template;
pub mod types;
pub mod validation;
