//! Handlers for ingested fax documents under `/api/documents`.
//!
//! Every intake path (direct upload, Dropbox, SharePoint) funnels into
//! [`ingest`]: run the extraction pipeline, store the original file, and
//! persist the row with its extraction sealed.

use axum::extract::{Path, Query, State};
use axum::Json;
use intake_cloud::dropbox::{DropboxSource, FolderListing};
use intake_cloud::sharepoint::SharePointSource;
use intake_cloud::DEFAULT_PRESIGN_EXPIRY;
use intake_core::error::CoreError;
use intake_core::permissions::{Action, MODULE_DOCUMENTS};
use intake_core::types::{DbId, Timestamp};
use intake_db::models::document::{CreateDocument, Document, DocumentListFilter};
use intake_db::repositories::DocumentRepo;
use intake_db::sealed::Sealed;
use intake_pipeline::ingest::{decode_base64, replace_pages_from_urls};
use intake_pipeline::pdf::{self, ReplaceReport};
use intake_pipeline::PipelineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::handlers::auth::non_blank;
use crate::middleware::auth::AuthUser;
use crate::query::ListParams;
use crate::response::{ApiResponse, IdOnly, Paginated};
use crate::state::AppState;

/// Project used when a request does not name one.
pub const DEFAULT_PROJECT: &str = "default_project";

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub project_name: Option<String>,
    pub file_name: Option<String>,
    /// Base64 file content, optionally as a `data:` URL.
    pub file_data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReplacePagesRequest {
    /// Stored URL of the PDF supplying the new pages.
    pub replacement_url: Option<String>,
    /// Base64 PDF supplying the new pages. Stored first when given.
    pub replacement_data: Option<String>,
    #[serde(default)]
    pub pages: Vec<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DropboxImportRequest {
    pub access_token: Option<String>,
    pub file_path: Option<String>,
    pub project_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SharePointImportRequest {
    pub access_token: Option<String>,
    pub site_id: Option<String>,
    pub item_id: Option<String>,
    pub project_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DropboxFilesQuery {
    pub access_token: Option<String>,
    #[serde(default)]
    pub path: String,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// List row. Sealed fields are never opened for lists.
#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    pub id: DbId,
    pub project_name: String,
    pub file_name: String,
    pub scanned: bool,
    pub fax_type: Option<String>,
    pub uploaded_by: Option<DbId>,
    pub created_at: Timestamp,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            project_name: doc.project_name.clone(),
            file_name: doc.file_name.clone(),
            scanned: doc.scanned,
            fax_type: doc.fax_type.clone(),
            uploaded_by: doc.uploaded_by,
            created_at: doc.created_at,
        }
    }
}

/// Single document with its extraction opened and a short-lived file link.
#[derive(Debug, Serialize)]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub summary: DocumentSummary,
    pub extracted_text: Option<String>,
    pub extraction: Option<Value>,
    /// `YYYY-MM-DD`.
    pub patient_dob: Option<String>,
    pub file_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReplacePagesResult {
    pub document: DocumentSummary,
    #[serde(flatten)]
    pub report: ReplaceReport,
    /// The rewritten PDF, base64.
    pub file_data: String,
}

#[derive(Debug, Serialize)]
pub struct ImportResult {
    pub file_name: String,
    pub storage_url: String,
    pub document: DocumentDetail,
}

// ---------------------------------------------------------------------------
// Shared steps
// ---------------------------------------------------------------------------

fn project_or_default(project_name: Option<String>) -> String {
    non_blank(project_name).unwrap_or_else(|| DEFAULT_PROJECT.to_string())
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Document",
        id,
    })
}

/// Extract, store and persist one PDF.
async fn ingest(
    state: &AppState,
    uploaded_by: DbId,
    project_name: String,
    file_name: String,
    bytes: Vec<u8>,
) -> AppResult<Document> {
    pdf::page_count(&bytes).map_err(PipelineError::from)?;
    let store = state.storage()?;

    let extraction = state.pipeline.extract(&bytes).await;
    let structured = extraction.structured();

    let storage_url = store.upload(&project_name, &file_name, bytes).await?;

    let sealed_extraction = match &structured {
        Some(value) => Some(Sealed::seal_json(&state.cipher, value).map_err(|e| {
            AppError::InternalError(format!("Extraction could not be sealed: {e}"))
        })?),
        None => None,
    };
    let input = CreateDocument {
        project_name,
        file_name,
        storage_url,
        scanned: extraction.scanned,
        fax_type: extraction.fax_type(),
        extracted_text: Some(Sealed::seal(&state.cipher, &extraction.text)),
        extraction: sealed_extraction,
        patient_dob: extraction
            .patient_dob()
            .map(|dob| Sealed::seal_date(&state.cipher, dob)),
        uploaded_by: Some(uploaded_by),
    };
    let document = DocumentRepo::create(&state.pool, &input).await?;

    tracing::info!(
        document_id = document.id,
        project = %document.project_name,
        backend = store.name(),
        scanned = document.scanned,
        "Document ingested"
    );
    Ok(document)
}

async fn detail(state: &AppState, doc: &Document) -> AppResult<DocumentDetail> {
    let cipher = &state.cipher;
    let extraction = doc.extraction.as_ref().and_then(|sealed| {
        sealed
            .open_json(cipher)
            .inspect_err(|e| tracing::warn!(document_id = doc.id, error = %e, "Extraction did not open"))
            .ok()
    });
    let patient_dob = doc.patient_dob.as_ref().and_then(|sealed| {
        sealed
            .open_date(cipher)
            .inspect_err(|e| tracing::warn!(document_id = doc.id, error = %e, "DOB did not open"))
            .ok()
            .map(|d| d.format("%Y-%m-%d").to_string())
    });

    let file_url = match &state.storage {
        Some(store) => Some(
            store
                .presigned_url(&doc.storage_url, DEFAULT_PRESIGN_EXPIRY)
                .await?,
        ),
        None => None,
    };

    Ok(DocumentDetail {
        summary: doc.into(),
        extracted_text: doc.extracted_text.as_ref().map(|s| s.open_or_raw(cipher)),
        extraction,
        patient_dob,
        file_url,
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/documents
pub async fn upload_document(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<UploadRequest>,
) -> AppResult<ApiResponse<DocumentDetail>> {
    auth_user.require(&state, MODULE_DOCUMENTS, Action::Create).await?;

    let (Some(file_name), Some(file_data)) =
        (non_blank(input.file_name), non_blank(input.file_data))
    else {
        return Err(AppError::BadRequest(
            "file_name and file_data are required.".into(),
        ));
    };
    let bytes = decode_base64(&file_data)?;

    let document = ingest(
        &state,
        auth_user.user_id,
        project_or_default(input.project_name),
        file_name,
        bytes,
    )
    .await?;
    let data = detail(&state, &document).await?;
    Ok(ApiResponse::created("Document uploaded successfully.", data))
}

/// GET /api/documents
pub async fn list_documents(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<ListParams>,
) -> AppResult<ApiResponse<Paginated<DocumentSummary>>> {
    auth_user.require(&state, MODULE_DOCUMENTS, Action::Read).await?;

    let filter = DocumentListFilter {
        search: params.search(),
        project_name: non_blank(params.project_name.clone()),
        limit: params.limit(),
        offset: params.offset(),
    };
    let (documents, count) = DocumentRepo::list(&state.pool, &filter).await?;
    let list = documents.iter().map(DocumentSummary::from).collect();
    Ok(ApiResponse::ok(
        "Documents fetched successfully.",
        params.paginate("/api/documents", list, count),
    ))
}

/// GET /api/documents/{id}
pub async fn get_document(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<ApiResponse<DocumentDetail>> {
    auth_user.require(&state, MODULE_DOCUMENTS, Action::Read).await?;

    let document = DocumentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    let data = detail(&state, &document).await?;
    Ok(ApiResponse::ok("Document fetched successfully.", data))
}

/// DELETE /api/documents/{id}
///
/// Soft delete. The stored file is kept.
pub async fn delete_document(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<ApiResponse<IdOnly>> {
    auth_user.require(&state, MODULE_DOCUMENTS, Action::Delete).await?;

    if !DocumentRepo::soft_delete(&state.pool, id).await? {
        return Err(not_found(id));
    }
    tracing::info!(document_id = id, deleted_by = auth_user.user_id, "Document soft-deleted");
    Ok(ApiResponse::ok("Document removed successfully.", IdOnly { id }))
}

/// POST /api/documents/{id}/replace-pages
///
/// Splices pages from a replacement PDF into the stored document, stores
/// the result as a new object and repoints the document at it.
pub async fn replace_document_pages(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<ReplacePagesRequest>,
) -> AppResult<ApiResponse<ReplacePagesResult>> {
    auth_user.require(&state, MODULE_DOCUMENTS, Action::Update).await?;

    if input.pages.is_empty() {
        return Err(AppError::BadRequest("pages must list at least one page.".into()));
    }
    let document = DocumentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    let store = state.storage()?;

    let replacement_url = match (non_blank(input.replacement_url), non_blank(input.replacement_data)) {
        (Some(url), _) => url,
        (None, Some(data)) => {
            let bytes = decode_base64(&data)?;
            pdf::page_count(&bytes).map_err(PipelineError::from)?;
            let name = format!("replacement_{}", document.file_name);
            store.upload(&document.project_name, &name, bytes).await?
        }
        (None, None) => {
            return Err(AppError::BadRequest(
                "replacement_url or replacement_data is required.".into(),
            ))
        }
    };

    let (file_data, report) = replace_pages_from_urls(
        store.as_ref(),
        &document.storage_url,
        &replacement_url,
        &input.pages,
    )
    .await?;
    let merged = decode_base64(&file_data)?;
    let storage_url = store
        .upload(&document.project_name, &document.file_name, merged)
        .await?;
    let document = DocumentRepo::update_storage_url(&state.pool, id, &storage_url)
        .await?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(
        document_id = id,
        replaced = ?report.replaced,
        skipped = report.skipped.len(),
        "Document pages replaced"
    );
    Ok(ApiResponse::ok(
        "Pages replaced successfully.",
        ReplacePagesResult {
            document: (&document).into(),
            report,
            file_data,
        },
    ))
}

/// GET /api/documents/dropbox/files?access_token=&path=
pub async fn list_dropbox_files(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<DropboxFilesQuery>,
) -> AppResult<ApiResponse<FolderListing>> {
    auth_user.require(&state, MODULE_DOCUMENTS, Action::Read).await?;

    let token = non_blank(query.access_token)
        .ok_or_else(|| AppError::BadRequest("Access token is required.".into()))?;
    let endpoints = &state.config.endpoints;
    let source = DropboxSource::with_base_urls(
        state.http.clone(),
        &endpoints.dropbox_api_base,
        &endpoints.dropbox_content_base,
    );
    let listing = source.list_folder(&token, &query.path).await?;
    Ok(ApiResponse::ok("Files fetched successfully.", listing))
}

/// POST /api/documents/import/dropbox
pub async fn import_from_dropbox(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<DropboxImportRequest>,
) -> AppResult<ApiResponse<ImportResult>> {
    auth_user.require(&state, MODULE_DOCUMENTS, Action::Create).await?;

    let (Some(token), Some(path)) = (non_blank(input.access_token), non_blank(input.file_path))
    else {
        return Err(AppError::BadRequest(
            "Access token and file path are required.".into(),
        ));
    };
    let endpoints = &state.config.endpoints;
    let source = DropboxSource::with_base_urls(
        state.http.clone(),
        &endpoints.dropbox_api_base,
        &endpoints.dropbox_content_base,
    );
    let (bytes, file_name) = source.download(&token, &path).await?;

    let document = ingest(
        &state,
        auth_user.user_id,
        project_or_default(input.project_name),
        file_name.clone(),
        bytes,
    )
    .await?;
    let storage_url = document.storage_url.clone();
    Ok(ApiResponse::created(
        "File downloaded from Dropbox and stored.",
        ImportResult {
            file_name,
            storage_url,
            document: detail(&state, &document).await?,
        },
    ))
}

/// POST /api/documents/import/sharepoint
pub async fn import_from_sharepoint(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<SharePointImportRequest>,
) -> AppResult<ApiResponse<ImportResult>> {
    auth_user.require(&state, MODULE_DOCUMENTS, Action::Create).await?;

    let (Some(token), Some(site_id), Some(item_id)) = (
        non_blank(input.access_token),
        non_blank(input.site_id),
        non_blank(input.item_id),
    ) else {
        return Err(AppError::BadRequest(
            "access_token, site_id and item_id are required.".into(),
        ));
    };
    let source = SharePointSource::with_base_url(state.http.clone(), &state.config.endpoints.graph_base);
    let (bytes, file_name) = source.download(&token, &site_id, &item_id).await?;

    let document = ingest(
        &state,
        auth_user.user_id,
        project_or_default(input.project_name),
        file_name.clone(),
        bytes,
    )
    .await?;
    let storage_url = document.storage_url.clone();
    Ok(ApiResponse::created(
        "File downloaded from SharePoint and stored.",
        ImportResult {
            file_name,
            storage_url,
            document: detail(&state, &document).await?,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_project_falls_back_to_default() {
        assert_eq!(project_or_default(None), DEFAULT_PROJECT);
        assert_eq!(project_or_default(Some("  ".into())), DEFAULT_PROJECT);
        assert_eq!(project_or_default(Some("cardio".into())), "cardio");
    }
}
