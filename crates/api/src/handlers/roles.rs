//! Handlers for the `/api/roles` resource.

use axum::extract::{Path, Query, State};
use axum::Json;
use intake_core::error::CoreError;
use intake_core::permissions::{validate_template, Action, ModulePermission, MODULE_ROLES};
use intake_core::types::DbId;
use intake_db::models::role::{CreateRole, RoleWithPermissions, UpdateRole};
use intake_db::repositories::{ModuleRepo, RoleRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::handlers::auth::non_blank;
use crate::middleware::auth::AuthUser;
use crate::query::ListParams;
use crate::response::{ApiResponse, IdOnly, Paginated};
use crate::state::AppState;

const DUPLICATE_NAME: &str = "Role name already exists.";

/// Body for role create and update.
#[derive(Debug, Default, Deserialize)]
pub struct RolePayload {
    pub role_name: Option<String>,
    pub module_permissions: Option<Vec<ModulePermission>>,
}

/// Reject duplicate entries and module ids that were never created.
async fn check_template(state: &AppState, entries: &[ModulePermission]) -> AppResult<()> {
    validate_template(entries)?;
    let ids: Vec<DbId> = entries.iter().map(|e| e.module_id).collect();
    let missing = ModuleRepo::missing_ids(&state.pool, &ids).await?;
    if !missing.is_empty() {
        let listed: Vec<String> = missing.iter().map(ToString::to_string).collect();
        return Err(AppError::BadRequest(format!(
            "Unknown module ids in module_permissions: {}",
            listed.join(", ")
        )));
    }
    Ok(())
}

/// GET /api/roles
pub async fn list_roles(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<ListParams>,
) -> AppResult<ApiResponse<Paginated<RoleWithPermissions>>> {
    auth_user.require(&state, MODULE_ROLES, Action::Read).await?;

    let search = params.search();
    let (roles, count) =
        RoleRepo::list(&state.pool, search.as_deref(), params.limit(), params.offset()).await?;
    Ok(ApiResponse::ok(
        "Roles fetched successfully.",
        params.paginate("/api/roles", roles, count),
    ))
}

/// POST /api/roles
pub async fn create_role(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<RolePayload>,
) -> AppResult<ApiResponse<RoleWithPermissions>> {
    auth_user.require(&state, MODULE_ROLES, Action::Create).await?;

    let role_name = non_blank(input.role_name)
        .ok_or_else(|| AppError::BadRequest("Role name is required.".into()))?;
    if RoleRepo::name_exists(&state.pool, &role_name, None).await? {
        return Err(AppError::BadRequest(DUPLICATE_NAME.into()));
    }
    let module_permissions = input.module_permissions.unwrap_or_default();
    check_template(&state, &module_permissions).await?;

    let role = RoleRepo::create(
        &state.pool,
        &CreateRole {
            role_name,
            module_permissions,
        },
    )
    .await?;
    tracing::info!(
        role_id = role.id,
        modules = role.module_permissions.len(),
        "Role created"
    );
    Ok(ApiResponse::ok("Role added successfully.", role))
}

/// GET /api/roles/{id}
pub async fn get_role(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<ApiResponse<RoleWithPermissions>> {
    auth_user.require(&state, MODULE_ROLES, Action::Read).await?;

    let role = RoleRepo::find_with_permissions(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Role", id }))?;
    Ok(ApiResponse::ok("Role fetched successfully.", role))
}

/// PUT|PATCH /api/roles/{id}
///
/// A supplied `module_permissions` replaces the whole template. Users
/// already holding the role keep their permission rows.
pub async fn update_role(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<RolePayload>,
) -> AppResult<ApiResponse<RoleWithPermissions>> {
    auth_user.require(&state, MODULE_ROLES, Action::Update).await?;

    let role_name = non_blank(input.role_name);
    if let Some(name) = &role_name {
        if RoleRepo::name_exists(&state.pool, name, Some(id)).await? {
            return Err(AppError::BadRequest(DUPLICATE_NAME.into()));
        }
    }
    if let Some(entries) = &input.module_permissions {
        check_template(&state, entries).await?;
    }

    let update = UpdateRole {
        role_name,
        module_permissions: input.module_permissions,
    };
    let role = RoleRepo::update(&state.pool, id, &update)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Role", id }))?;
    Ok(ApiResponse::ok("Role updated successfully.", role))
}

/// DELETE /api/roles/{id}
pub async fn delete_role(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<ApiResponse<IdOnly>> {
    auth_user.require(&state, MODULE_ROLES, Action::Delete).await?;

    if !RoleRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "Role", id }));
    }
    tracing::info!(role_id = id, deleted_by = auth_user.user_id, "Role soft-deleted");
    Ok(ApiResponse::ok("Role removed successfully.", IdOnly { id }))
}
