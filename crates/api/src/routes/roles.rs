//! Route definitions for `/api/roles`.

use axum::routing::get;
use axum::Router;

use crate::handlers::roles;
use crate::state::AppState;

/// ```text
/// GET, POST                /roles
/// GET, PUT, PATCH, DELETE  /roles/{id}
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(roles::list_roles).post(roles::create_role))
        .route(
            "/{id}",
            get(roles::get_role)
                .put(roles::update_role)
                .patch(roles::update_role)
                .delete(roles::delete_role),
        )
}
