//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{auth, users};
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST   /register                  -> register (public)
/// POST   /login                     -> login (public)
/// POST   /login/microsoft           -> login_microsoft (public)
/// POST   /login/dropbox             -> login_dropbox (public)
/// POST   /token/refresh             -> refresh (public)
/// POST   /logout                    -> logout
/// GET    /profile                   -> profile
/// POST   /forgot-password/email     -> forgot_password_email (public)
/// POST   /forgot-password/verify    -> forgot_password_verify (public)
/// POST   /forgot-password/reset     -> forgot_password_reset (public)
/// POST   /add-user                  -> add_user
/// GET    /users                     -> list_users
/// POST   /users                     -> create_user
/// GET    /users/{id}                -> get_user
/// PUT    /users/{id}                -> update_user
/// PATCH  /users/{id}                -> update_user
/// DELETE /users/{id}                -> delete_user
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(users::register))
        .route("/login", post(auth::login))
        .route("/login/microsoft", post(auth::login_microsoft))
        .route("/login/dropbox", post(auth::login_dropbox))
        .route("/token/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/profile", get(auth::profile))
        .route("/forgot-password/email", post(auth::forgot_password_email))
        .route("/forgot-password/verify", post(auth::forgot_password_verify))
        .route("/forgot-password/reset", post(auth::forgot_password_reset))
        .route("/add-user", post(users::add_user))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
}
