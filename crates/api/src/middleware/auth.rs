//! JWT-based authentication extractor and module permission checks.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use intake_core::error::CoreError;
use intake_core::permissions::Action;
use intake_core::types::DbId;
use intake_db::repositories::{UserModulePermissionRepo, UserRepo};

use crate::auth::jwt::validate_token;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

const FORBIDDEN: &str = "You do not have permission to perform this action.";

/// Authenticated user extracted from a JWT Bearer token in the `Authorization` header.
///
/// The token must be valid and its subject must still be a live, active user.
///
/// ```ignore
/// async fn my_handler(State(state): State<AppState>, user: AuthUser) -> AppResult<..> {
///     user.require(&state, MODULE_ROLES, Action::Read).await?;
///     ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
    /// The user's role name at the time the token was issued.
    pub role: String,
    pub is_superuser: bool,
}

impl AuthUser {
    /// Fail with 403 unless the caller may perform `action` on the module at
    /// `module_path`. Superusers pass every check.
    pub async fn require(&self, state: &AppState, module_path: &str, action: Action) -> AppResult<()> {
        if self.is_superuser {
            return Ok(());
        }
        let row =
            UserModulePermissionRepo::find_for_path(&state.pool, self.user_id, module_path).await?;
        match row {
            Some(row) if row.flags().allows(action) => Ok(()),
            _ => {
                tracing::debug!(
                    user_id = self.user_id,
                    module = module_path,
                    ?action,
                    "Permission denied"
                );
                Err(AppError::Core(CoreError::Forbidden(FORBIDDEN.into())))
            }
        }
    }
}

/// Bearer token from the `Authorization` header, if well formed.
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing or malformed Authorization header".into(),
            ))
        })?;

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        let user = UserRepo::find_by_id(&state.pool, claims.sub)
            .await?
            .filter(|u| u.can_sign_in())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Token subject is no longer active".into(),
                ))
            })?;

        Ok(AuthUser {
            user_id: user.id,
            role: claims.role,
            is_superuser: user.is_superuser,
        })
    }
}
