//! Handlers for the `/api/modules` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use intake_core::error::CoreError;
use intake_core::permissions::{normalize_module_path, validate_status, Action, MODULE_MODULES};
use intake_core::types::DbId;
use intake_db::models::module::{CreateModule, Module, ModuleListFilter, UpdateModule};
use intake_db::repositories::ModuleRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::handlers::auth::non_blank;
use crate::middleware::auth::AuthUser;
use crate::query::ListParams;
use crate::response::{ApiResponse, IdOnly, Paginated};
use crate::state::AppState;

const DUPLICATE_NAME: &str = "Module name already exists.";
const DUPLICATE_PATH: &str = "Module path already exists.";

#[derive(Debug, Default, Deserialize)]
pub struct ModulePayload {
    pub module_name: Option<String>,
    pub path: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

/// Duplicate checks shared by create and update. `path` is already normalized.
async fn ensure_unique(
    state: &AppState,
    name: Option<&str>,
    path: Option<&str>,
    exclude_id: Option<DbId>,
) -> AppResult<()> {
    if let Some(name) = name {
        if ModuleRepo::name_exists(&state.pool, name, exclude_id).await? {
            return Err(AppError::BadRequest(DUPLICATE_NAME.into()));
        }
    }
    if let Some(path) = path {
        if ModuleRepo::path_exists(&state.pool, path, exclude_id).await? {
            return Err(AppError::BadRequest(DUPLICATE_PATH.into()));
        }
    }
    Ok(())
}

/// GET /api/modules
pub async fn list_modules(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<ListParams>,
) -> AppResult<ApiResponse<Paginated<Module>>> {
    auth_user.require(&state, MODULE_MODULES, Action::Read).await?;

    if let Some(status) = &params.status {
        validate_status(status)?;
    }
    let filter = ModuleListFilter {
        search: params.search(),
        status: params.status.clone(),
        limit: params.limit(),
        offset: params.offset(),
    };
    let (modules, count) = ModuleRepo::list(&state.pool, &filter).await?;
    Ok(ApiResponse::ok(
        "Modules fetched successfully.",
        params.paginate("/api/modules", modules, count),
    ))
}

/// POST /api/modules
pub async fn create_module(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<ModulePayload>,
) -> AppResult<ApiResponse<Module>> {
    auth_user.require(&state, MODULE_MODULES, Action::Create).await?;

    let (Some(module_name), Some(path)) = (non_blank(input.module_name), non_blank(input.path))
    else {
        return Err(AppError::BadRequest(
            "module_name and path are required.".into(),
        ));
    };
    let path = normalize_module_path(&path);
    if let Some(status) = &input.status {
        validate_status(status)?;
    }
    ensure_unique(&state, Some(&module_name), Some(&path), None).await?;

    let module = ModuleRepo::create(
        &state.pool,
        &CreateModule {
            module_name,
            path,
            description: input.description,
            status: input.status,
        },
    )
    .await?;
    tracing::info!(module_id = module.id, path = %module.path, "Module created");
    Ok(ApiResponse::with_status(
        StatusCode::CREATED,
        "Module created successfully.",
        module,
    ))
}

/// GET /api/modules/{id}
pub async fn get_module(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<ApiResponse<Module>> {
    auth_user.require(&state, MODULE_MODULES, Action::Read).await?;

    let module = ModuleRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Module", id }))?;
    Ok(ApiResponse::ok("Module fetched successfully.", module))
}

/// PUT|PATCH /api/modules/{id}
pub async fn update_module(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<ModulePayload>,
) -> AppResult<ApiResponse<Module>> {
    auth_user.require(&state, MODULE_MODULES, Action::Update).await?;

    let module_name = non_blank(input.module_name);
    let path = non_blank(input.path).map(|p| normalize_module_path(&p));
    if let Some(status) = &input.status {
        validate_status(status)?;
    }
    ensure_unique(&state, module_name.as_deref(), path.as_deref(), Some(id)).await?;

    let update = UpdateModule {
        module_name,
        path,
        description: input.description,
        status: input.status,
    };
    let module = ModuleRepo::update(&state.pool, id, &update)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Module", id }))?;
    Ok(ApiResponse::ok("Module updated successfully.", module))
}

/// DELETE /api/modules/{id}
pub async fn delete_module(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<ApiResponse<IdOnly>> {
    auth_user.require(&state, MODULE_MODULES, Action::Delete).await?;

    if !ModuleRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "Module", id }));
    }
    tracing::info!(module_id = id, deleted_by = auth_user.user_id, "Module soft-deleted");
    Ok(ApiResponse::ok("Module removed successfully.", IdOnly { id }))
}
