//! Encrypted `{"payload": ...}` envelope around JSON request and response bodies.
//!
//! Clients send `{"payload": "<ciphertext>"}` on `POST`/`PUT`/`PATCH`; the
//! ciphertext holds the real JSON body. Every JSON response is sealed the
//! same way and keeps its status code.

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use intake_core::crypto::{CryptoError, FieldCipher};
use serde_json::Value;

use crate::error::AppError;
use crate::state::AppState;

/// Largest body buffered by the envelope. Uploads carry base64 PDFs.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("payload could not be decrypted: {0}")]
    Decrypt(#[from] CryptoError),

    #[error("decrypted payload is not JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Unwrap a request body.
///
/// Returns `Ok(None)` when the body is not an envelope (not JSON, not an
/// object, or no string `payload`), in which case it is used as-is.
pub fn open_envelope(cipher: &FieldCipher, body: &[u8]) -> Result<Option<Vec<u8>>, EnvelopeError> {
    let Ok(Value::Object(outer)) = serde_json::from_slice::<Value>(body) else {
        return Ok(None);
    };
    let Some(Value::String(payload)) = outer.get("payload") else {
        return Ok(None);
    };

    let plaintext = cipher.decrypt(payload)?;
    let inner: Value = serde_json::from_str(&plaintext)?;
    Ok(Some(serde_json::to_vec(&inner)?))
}

/// Seal a JSON response body. Returns `None` if `body` is not JSON.
pub fn seal_envelope(cipher: &FieldCipher, body: &[u8]) -> Option<Vec<u8>> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let text = serde_json::to_string(&value).ok()?;
    let sealed = serde_json::json!({ "payload": cipher.encrypt(&text) });
    serde_json::to_vec(&sealed).ok()
}

fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

fn is_json(content_type: Option<&HeaderValue>) -> bool {
    content_type
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

/// Axum middleware applying the envelope in both directions.
///
/// Disabled entirely when `PAYLOAD_ENCRYPTION` is off.
pub async fn payload_envelope(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.payload_encryption {
        return next.run(request).await;
    }

    let request = if carries_body(request.method()) {
        let (mut parts, body) = request.into_parts();
        let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Request body could not be read");
                return AppError::BadRequest("Request body could not be read.".into())
                    .into_response();
            }
        };

        let body = match open_envelope(&state.cipher, &bytes) {
            Ok(Some(opened)) => {
                parts
                    .headers
                    .insert(CONTENT_LENGTH, HeaderValue::from(opened.len()));
                parts
                    .headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Body::from(opened)
            }
            Ok(None) => Body::from(bytes),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %parts.uri.path(),
                    "Envelope could not be opened, passing body through"
                );
                Body::from(bytes)
            }
        };
        Request::from_parts(parts, body)
    } else {
        request
    };

    let response = next.run(request).await;
    if !is_json(response.headers().get(CONTENT_TYPE)) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "Response body could not be read for sealing");
            return AppError::InternalError("Response body could not be read".into())
                .into_response();
        }
    };

    match seal_envelope(&state.cipher, &bytes) {
        Some(sealed) => {
            parts
                .headers
                .insert(CONTENT_LENGTH, HeaderValue::from(sealed.len()));
            Response::from_parts(parts, Body::from(sealed))
        }
        None => {
            tracing::warn!("JSON response did not parse, sending it unsealed");
            Response::from_parts(parts, Body::from(bytes))
        }
    }
}
