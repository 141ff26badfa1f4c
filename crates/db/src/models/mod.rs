//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - Create / update DTOs (update DTOs carry all-`Option` fields) for writes

pub mod document;
pub mod email_template;
pub mod module;
pub mod role;
pub mod session;
pub mod user;
pub mod user_module_permission;
