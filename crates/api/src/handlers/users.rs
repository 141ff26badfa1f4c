//! Handlers for user management under `/auth`: register, add-user and the
//! `/auth/users` collection.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use intake_core::error::CoreError;
use intake_core::permissions::{validate_status, Action, MODULE_USERS, ROLE_SUPER_ADMIN};
use intake_core::types::DbId;
use intake_core::validation::{normalize_email, validate_email};
use intake_db::models::user::{CreateUser, UpdateUser, User, UserListFilter, UserResponse};
use intake_db::repositories::{RoleRepo, UserRepo};
use intake_db::sealed::Sealed;
use serde::Deserialize;

use crate::auth::password::hash_new_password;
use crate::error::{AppError, AppResult};
use crate::handlers::auth::non_blank;
use crate::middleware::auth::AuthUser;
use crate::query::ListParams;
use crate::response::{ApiResponse, IdOnly, Paginated};
use crate::state::AppState;

const DUPLICATE_EMAIL: &str = "User already exists with this email.";

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body accepted by every user write. Required fields are checked per
/// operation; updates apply only the fields present.
#[derive(Debug, Default, Deserialize)]
pub struct UserPayload {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub country_code: Option<String>,
    pub title: Option<String>,
    pub role: Option<DbId>,
    pub status: Option<String>,
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

/// Render a user for API output, decrypting the sealed phone number.
pub(crate) async fn user_response(state: &AppState, user: &User) -> AppResult<UserResponse> {
    let role_name = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    Ok(render_user(state, user, role_name))
}

fn render_user(state: &AppState, user: &User, role_name: Option<String>) -> UserResponse {
    UserResponse {
        id: user.id,
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        phone_number: user
            .phone_number
            .as_ref()
            .map(|p| p.open_or_raw(&state.cipher)),
        country_code: user.country_code.clone(),
        title: user.title.clone(),
        role: user.role_id,
        role_name,
        status: user.status.clone(),
        is_deleted: user.is_deleted(),
        is_superuser: user.is_superuser,
        created_at: user.created_at,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

async fn ensure_role_exists(state: &AppState, role_id: DbId) -> AppResult<()> {
    if RoleRepo::find_by_id(&state.pool, role_id).await?.is_none() {
        return Err(AppError::BadRequest("Role does not exist.".into()));
    }
    Ok(())
}

/// Check a full create payload and build the insert DTO.
async fn validate_new_user(state: &AppState, input: UserPayload) -> AppResult<CreateUser> {
    let email = non_blank(input.email);
    let password = non_blank(input.password);
    let first_name = non_blank(input.first_name);
    let last_name = non_blank(input.last_name);

    let missing: Vec<&str> = [
        ("email", email.is_none()),
        ("password", password.is_none()),
        ("first_name", first_name.is_none()),
        ("last_name", last_name.is_none()),
        ("role", input.role.is_none()),
    ]
    .into_iter()
    .filter_map(|(field, absent)| absent.then_some(field))
    .collect();

    let (Some(email), Some(password), Some(first_name), Some(last_name), Some(role_id)) =
        (email, password, first_name, last_name, input.role)
    else {
        return Err(AppError::BadRequest(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    };

    let email = normalize_email(&email);
    validate_email(&email)?;
    if let Some(status) = &input.status {
        validate_status(status)?;
    }
    ensure_role_exists(state, role_id).await?;

    Ok(CreateUser {
        email,
        password_hash: hash_new_password(&password)?,
        first_name,
        last_name,
        phone_number: non_blank(input.phone_number).map(|p| Sealed::seal(&state.cipher, &p)),
        country_code: non_blank(input.country_code),
        title: non_blank(input.title),
        role_id,
        status: input.status,
        is_superuser: false,
    })
}

async fn insert_user(state: &AppState, input: &CreateUser) -> AppResult<User> {
    if UserRepo::email_taken(&state.pool, &input.email, None).await? {
        return Err(AppError::BadRequest(DUPLICATE_EMAIL.into()));
    }
    let (user, materialized) = UserRepo::create_with_permissions(&state.pool, input).await?;
    tracing::info!(
        user_id = user.id,
        role_id = user.role_id,
        permissions = materialized,
        "User created"
    );
    Ok(user)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /auth/register
///
/// Public, so the administrator role cannot be chosen here.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<UserPayload>,
) -> AppResult<ApiResponse<UserResponse>> {
    if let Some(role_id) = input.role {
        let role_name = RoleRepo::resolve_name(&state.pool, role_id).await?;
        if role_name.is_some_and(|name| name.eq_ignore_ascii_case(ROLE_SUPER_ADMIN)) {
            return Err(AppError::Core(CoreError::Forbidden(
                "This role cannot be assigned through registration.".into(),
            )));
        }
    }
    let create = validate_new_user(&state, input).await?;
    let user = insert_user(&state, &create).await?;
    let data = user_response(&state, &user).await?;
    Ok(ApiResponse::ok("User registered successfully.", data))
}

/// POST /auth/add-user
pub async fn add_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<UserPayload>,
) -> AppResult<ApiResponse<UserResponse>> {
    auth_user.require(&state, MODULE_USERS, Action::Create).await?;

    let create = validate_new_user(&state, input).await?;
    let user = insert_user(&state, &create).await?;
    let data = user_response(&state, &user).await?;
    Ok(ApiResponse::created("User added successfully.", data))
}

/// GET /auth/users
pub async fn list_users(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<ListParams>,
) -> AppResult<ApiResponse<Paginated<UserResponse>>> {
    auth_user.require(&state, MODULE_USERS, Action::Read).await?;

    let filter = UserListFilter {
        search: params.search(),
        role_id: params.role,
        limit: params.limit(),
        offset: params.offset(),
    };
    let (users, count) = UserRepo::list(&state.pool, &filter).await?;

    let mut role_names: HashMap<DbId, Option<String>> = HashMap::new();
    let mut list = Vec::with_capacity(users.len());
    for user in &users {
        if !role_names.contains_key(&user.role_id) {
            let name = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
            role_names.insert(user.role_id, name);
        }
        let role_name = role_names.get(&user.role_id).cloned().flatten();
        list.push(render_user(&state, user, role_name));
    }

    Ok(ApiResponse::ok(
        "Users fetched successfully.",
        params.paginate("/auth/users", list, count),
    ))
}

/// POST /auth/users
///
/// Creates a user, or reactivates a soft-deleted one with the same email.
/// A restored row is overwritten with the supplied fields; its existing
/// permission rows are kept.
pub async fn create_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<UserPayload>,
) -> AppResult<ApiResponse<UserResponse>> {
    auth_user.require(&state, MODULE_USERS, Action::Create).await?;

    let email = non_blank(input.email.clone())
        .ok_or_else(|| AppError::BadRequest("Email is required.".into()))?;
    let existing =
        UserRepo::find_by_email_include_deleted(&state.pool, &normalize_email(&email)).await?;

    let create = validate_new_user(&state, input).await?;
    match existing {
        Some(deleted) if deleted.is_deleted() => {
            let user = UserRepo::restore_with(&state.pool, deleted.id, &create)
                .await?
                .ok_or(AppError::Core(CoreError::NotFound {
                    entity: "User",
                    id: deleted.id,
                }))?;
            tracing::info!(user_id = user.id, "Soft-deleted user restored");
            let data = user_response(&state, &user).await?;
            Ok(ApiResponse::ok("User restored successfully.", data))
        }
        _ => {
            let user = insert_user(&state, &create).await?;
            let data = user_response(&state, &user).await?;
            Ok(ApiResponse::created("User added successfully.", data))
        }
    }
}

/// GET /auth/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<ApiResponse<UserResponse>> {
    auth_user.require(&state, MODULE_USERS, Action::Read).await?;

    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;
    let data = user_response(&state, &user).await?;
    Ok(ApiResponse::ok("User fetched successfully.", data))
}

/// PUT|PATCH /auth/users/{id}
///
/// Partial update. Soft-deleted users are not found.
pub async fn update_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UserPayload>,
) -> AppResult<ApiResponse<UserResponse>> {
    auth_user.require(&state, MODULE_USERS, Action::Update).await?;

    let email = match non_blank(input.email) {
        Some(email) => {
            let email = normalize_email(&email);
            validate_email(&email)?;
            if UserRepo::email_taken(&state.pool, &email, Some(id)).await? {
                return Err(AppError::BadRequest(DUPLICATE_EMAIL.into()));
            }
            Some(email)
        }
        None => None,
    };
    if let Some(status) = &input.status {
        validate_status(status)?;
    }
    if let Some(role_id) = input.role {
        ensure_role_exists(&state, role_id).await?;
    }
    let password_hash = match non_blank(input.password) {
        Some(password) => Some(hash_new_password(&password)?),
        None => None,
    };

    let update = UpdateUser {
        email,
        password_hash,
        first_name: non_blank(input.first_name),
        last_name: non_blank(input.last_name),
        phone_number: non_blank(input.phone_number).map(|p| Sealed::seal(&state.cipher, &p)),
        country_code: non_blank(input.country_code),
        title: input.title,
        role_id: input.role,
        status: input.status,
    };

    let user = UserRepo::update(&state.pool, id, &update)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;
    let data = user_response(&state, &user).await?;
    Ok(ApiResponse::ok("User updated successfully.", data))
}

/// DELETE /auth/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<ApiResponse<IdOnly>> {
    auth_user.require(&state, MODULE_USERS, Action::Delete).await?;

    if !UserRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "User", id }));
    }
    tracing::info!(user_id = id, deleted_by = auth_user.user_id, "User soft-deleted");
    Ok(ApiResponse::ok("User removed successfully.", IdOnly { id }))
}
