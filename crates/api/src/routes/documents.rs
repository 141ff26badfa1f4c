//! Route definitions for `/api/documents`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::documents;
use crate::state::AppState;

/// ```text
/// GET, POST     /
/// GET           /dropbox/files
/// POST          /import/dropbox
/// POST          /import/sharepoint
/// GET, DELETE   /{id}
/// POST          /{id}/replace-pages
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(documents::list_documents).post(documents::upload_document),
        )
        .route("/dropbox/files", get(documents::list_dropbox_files))
        .route("/import/dropbox", post(documents::import_from_dropbox))
        .route("/import/sharepoint", post(documents::import_from_sharepoint))
        .route(
            "/{id}",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route("/{id}/replace-pages", post(documents::replace_document_pages))
}
