use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use intake_cloud::{SourceError, StorageError};
use intake_core::error::CoreError;
use intake_pipeline::pdf::PdfError;
use intake_pipeline::PipelineError;
use serde_json::{json, Value};

const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce the `{message, errors, status}`
/// envelope shared by every endpoint.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `intake_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A bad request carrying structured detail in `errors`.
    #[error("Bad request: {message}")]
    Rejected { message: String, errors: Value },

    /// A lookup by something other than an id came up empty.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    format!("{entity} with id {id} not found"),
                    json!({}),
                ),
                CoreError::Validation(msg) | CoreError::Conflict(msg) => {
                    (StatusCode::BAD_REQUEST, msg.clone(), json!(msg))
                }
                CoreError::Unauthorized(msg) => {
                    tracing::debug!(reason = %msg, "Rejected unauthenticated request");
                    return unauthorized();
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, json!({})),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(&err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), json!(msg)),
            AppError::Rejected { message, errors } => (StatusCode::BAD_REQUEST, message, errors),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, json!({})),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }

            // --- Integrations ---
            AppError::Storage(err) => classify_storage_error(&err),
            AppError::Source(err) => classify_source_error(&err),
            AppError::Pipeline(err) => match err {
                PipelineError::InvalidBase64 => bad_request("Invalid base64 file content."),
                PipelineError::Pdf(PdfError::Pdf(e)) => {
                    tracing::warn!(error = %e, "Rejected unreadable PDF");
                    bad_request("File is not a valid PDF.")
                }
                PipelineError::Pdf(PdfError::Io(e)) => {
                    tracing::error!(error = %e, "PDF write failed");
                    internal()
                }
                PipelineError::Storage(e) => classify_storage_error(&e),
            },
        };

        let body = json!({
            "message": message,
            "errors": errors,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Every authentication failure renders the same body.
fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        axum::Json(json!({ "message": "Unauthorized", "status": 401 })),
    )
        .into_response()
}

fn bad_request(message: &str) -> (StatusCode, String, Value) {
    (StatusCode::BAD_REQUEST, message.to_string(), json!(message))
}

fn internal() -> (StatusCode, String, Value) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        INTERNAL_MESSAGE.to_string(),
        json!({}),
    )
}

/// Classify a sqlx error into an HTTP status, message and error detail.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 400.
/// - Foreign key violations map to 400.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, String, Value) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "Resource not found".to_string(),
            json!({}),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    let message =
                        format!("Duplicate value violates unique constraint: {constraint}");
                    return (StatusCode::BAD_REQUEST, message.clone(), json!(message));
                }
            }
            // Foreign key violation: error code 23503
            if db_err.code().as_deref() == Some("23503") {
                return bad_request("Referenced record does not exist.");
            }
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}

fn classify_storage_error(err: &StorageError) -> (StatusCode, String, Value) {
    match err {
        StorageError::NotFound(key) => (
            StatusCode::NOT_FOUND,
            "Stored file not found.".to_string(),
            json!(key),
        ),
        StorageError::InvalidUrl(url) => (
            StatusCode::BAD_REQUEST,
            "File URL does not belong to the configured storage.".to_string(),
            json!(url),
        ),
        other => {
            tracing::error!(error = %other, "Storage error");
            internal()
        }
    }
}

fn classify_source_error(err: &SourceError) -> (StatusCode, String, Value) {
    match err {
        SourceError::InvalidToken { .. } | SourceError::IsFolder => bad_request(&err.to_string()),
        SourceError::Api {
            provider,
            status,
            body,
        } if *status == 404 || *status == 409 => (
            StatusCode::NOT_FOUND,
            format!("File not found in {provider}."),
            json!(body),
        ),
        other => {
            tracing::error!(error = %other, "Remote source error");
            internal()
        }
    }
}
