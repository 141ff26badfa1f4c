//! Route definitions for `/api/modules`.

use axum::routing::get;
use axum::Router;

use crate::handlers::modules;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(modules::list_modules).post(modules::create_module))
        .route(
            "/{id}",
            get(modules::get_module)
                .put(modules::update_module)
                .patch(modules::update_module)
                .delete(modules::delete_module),
        )
}
