//! Handlers for materialized per-user module permissions.

use axum::extract::{Path, State};
use axum::Json;
use intake_core::error::CoreError;
use intake_core::permissions::{Action, PermissionPatch, MODULE_USERS};
use intake_core::types::DbId;
use intake_db::models::user_module_permission::UserModulePermissionView;
use intake_db::repositories::UserModulePermissionRepo;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Body of `PUT /api/user-permissions/{user_id}`.
#[derive(Debug, Default, Deserialize)]
pub struct PermissionUpdateRequest {
    #[serde(default)]
    pub permissions: Vec<PermissionPatch>,
}

fn into_views<T: Into<UserModulePermissionView>>(rows: Vec<T>) -> Vec<UserModulePermissionView> {
    rows.into_iter().map(Into::into).collect()
}

/// GET /api/my-permissions
///
/// The caller's rows for active, live modules. Drives client navigation.
pub async fn my_permissions(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<ApiResponse<Vec<UserModulePermissionView>>> {
    let rows = UserModulePermissionRepo::list_active_for_user(&state.pool, auth_user.user_id).await?;
    Ok(ApiResponse::ok(
        "Your permissions fetched successfully.",
        into_views(rows),
    ))
}

/// PUT /api/my-permissions
pub async fn update_my_permissions(_auth_user: AuthUser) -> AppResult<ApiResponse<Value>> {
    Err(AppError::Core(CoreError::Forbidden(
        "You are not allowed to update permissions.".into(),
    )))
}

/// GET /api/user-permissions/{user_id}
pub async fn get_user_permissions(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<DbId>,
) -> AppResult<ApiResponse<Vec<UserModulePermissionView>>> {
    auth_user.require(&state, MODULE_USERS, Action::Read).await?;

    let rows = UserModulePermissionRepo::list_for_user(&state.pool, user_id).await?;
    Ok(ApiResponse::ok(
        "User permissions fetched successfully.",
        into_views(rows),
    ))
}

/// PUT /api/user-permissions/{user_id}
///
/// Partial merge: only the flags present in each entry are written.
pub async fn update_user_permissions(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<DbId>,
    Json(input): Json<PermissionUpdateRequest>,
) -> AppResult<ApiResponse<Vec<UserModulePermissionView>>> {
    auth_user.require(&state, MODULE_USERS, Action::Update).await?;

    let rows = UserModulePermissionRepo::merge(&state.pool, user_id, &input.permissions).await?;
    tracing::info!(
        user_id,
        updated_by = auth_user.user_id,
        rows = rows.len(),
        "User permissions merged"
    );
    Ok(ApiResponse::ok(
        "User permissions updated successfully.",
        into_views(rows),
    ))
}

/// GET /api/users/permissions/{user_id}
pub async fn list_user_permissions(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<DbId>,
) -> AppResult<ApiResponse<Vec<UserModulePermissionView>>> {
    auth_user.require(&state, MODULE_USERS, Action::Read).await?;

    let rows = UserModulePermissionRepo::list_for_user(&state.pool, user_id).await?;
    Ok(ApiResponse::ok(
        "User permissions fetched successfully",
        into_views(rows),
    ))
}
