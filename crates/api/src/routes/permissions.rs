//! Routes for materialized user permissions. Merged directly into `/api`.

use axum::routing::get;
use axum::Router;

use crate::handlers::permissions;
use crate::state::AppState;

/// ```text
/// GET, PUT  /my-permissions
/// GET, PUT  /user-permissions/{user_id}
/// GET       /users/permissions/{user_id}
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/my-permissions",
            get(permissions::my_permissions).put(permissions::update_my_permissions),
        )
        .route(
            "/user-permissions/{user_id}",
            get(permissions::get_user_permissions).put(permissions::update_user_permissions),
        )
        .route(
            "/users/permissions/{user_id}",
            get(permissions::list_user_permissions),
        )
}
