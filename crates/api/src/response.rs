//! Shared response envelope types for API handlers.
//!
//! Every successful response uses the `{ "message", "data", "status" }`
//! envelope. Use [`ApiResponse`] instead of ad-hoc `json!` bodies so the
//! status in the body always matches the HTTP status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

/// Standard `{ "message", "data", "status" }` response envelope.
///
/// ```ignore
/// Ok(ApiResponse::ok("Role fetched successfully.", role))
/// ```
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub message: String,
    pub data: T,
    pub status: u16,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn with_status(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
            status: status.as_u16(),
        }
    }

    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::OK, message, data)
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::CREATED, message, data)
    }
}

impl ApiResponse<Value> {
    /// A response with an empty `data` object.
    pub fn message(message: impl Into<String>) -> Self {
        Self::ok(message, Value::Object(Default::default()))
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// `{"id": ..}` payload returned by delete endpoints.
#[derive(Debug, Serialize)]
pub struct IdOnly {
    pub id: intake_core::types::DbId,
}

/// One page of a list endpoint.
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub list: Vec<T>,
    pub count: i64,
    /// Relative URL of the next page, or `null` on the last page.
    pub next: Option<String>,
    pub previous: Option<String>,
}
