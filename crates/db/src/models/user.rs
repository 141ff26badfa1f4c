//! User entity model and DTOs.

use intake_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use crate::sealed::Sealed;

/// Full user row from the `users` table.
///
/// Contains the password hash and sealed columns -- NEVER serialize this to
/// API responses directly. Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<Sealed>,
    pub country_code: String,
    pub title: Option<String>,
    pub role_id: DbId,
    pub status: String,
    pub is_superuser: bool,
    pub otp_code: Option<String>,
    pub otp_created_at: Option<Timestamp>,
    pub last_login_at: Option<Timestamp>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Live and not switched off by an admin.
    pub fn can_sign_in(&self) -> bool {
        !self.is_deleted() && self.status == intake_core::permissions::STATUS_ACTIVE
    }
}

/// Safe user representation for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Decrypted phone number.
    pub phone_number: Option<String>,
    pub country_code: String,
    pub title: Option<String>,
    pub role: DbId,
    pub role_name: Option<String>,
    pub status: String,
    pub is_deleted: bool,
    pub is_superuser: bool,
    pub created_at: Timestamp,
}

/// DTO for creating (or restoring) a user.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<Sealed>,
    pub country_code: Option<String>,
    pub title: Option<String>,
    pub role_id: DbId,
    pub status: Option<String>,
    pub is_superuser: bool,
}

/// DTO for updating an existing user. All fields are optional.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<Sealed>,
    pub country_code: Option<String>,
    pub title: Option<String>,
    pub role_id: Option<DbId>,
    pub status: Option<String>,
}

/// Filters for the paginated user list.
#[derive(Debug, Clone, Default)]
pub struct UserListFilter {
    pub search: Option<String>,
    pub role_id: Option<DbId>,
    pub limit: i64,
    pub offset: i64,
}
