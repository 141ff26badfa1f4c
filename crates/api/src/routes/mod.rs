pub mod auth;
pub mod documents;
pub mod health;
pub mod modules;
pub mod permissions;
pub mod roles;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /roles                                   list, create
/// /roles/{id}                              get, update, delete
///
/// /modules                                 list, create
/// /modules/{id}                            get, update, delete
///
/// /my-permissions                          get (put is refused)
/// /user-permissions/{user_id}              get, merge
/// /users/permissions/{user_id}             get
///
/// /documents                               list, upload
/// /documents/dropbox/files                 browse a Dropbox folder
/// /documents/import/dropbox                import from Dropbox
/// /documents/import/sharepoint             import from SharePoint
/// /documents/{id}                          get, delete
/// /documents/{id}/replace-pages            splice pages
/// ```
///
/// `/auth` is mounted separately, see [`auth::router`].
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/roles", roles::router())
        .nest("/modules", modules::router())
        .nest("/documents", documents::router())
        .merge(permissions::router())
}
