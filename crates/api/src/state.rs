use std::sync::Arc;

use intake_cloud::ObjectStore;
use intake_core::crypto::FieldCipher;
use intake_core::error::CoreError;
use intake_core::otp::OtpCache;
use intake_pipeline::IngestionPipeline;

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::notifications::email::Mailer;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: intake_db::DbPool,
    /// Server configuration, immutable after startup.
    pub config: Arc<ServerConfig>,
    /// Cipher for sealed columns and the payload envelope.
    pub cipher: Arc<FieldCipher>,
    /// In-process mirror of outstanding password reset codes.
    pub otp_cache: Arc<OtpCache>,
    /// Document storage. `None` when no backend is configured.
    pub storage: Option<Arc<dyn ObjectStore>>,
    pub pipeline: Arc<IngestionPipeline>,
    /// Shared HTTP client for OAuth exchanges and remote file sources.
    pub http: reqwest::Client,
    /// SMTP mailer. `None` when SMTP is not configured.
    pub mailer: Option<Arc<Mailer>>,
}

impl AppState {
    /// The configured object store, or a 500 when none is.
    pub fn storage(&self) -> AppResult<&Arc<dyn ObjectStore>> {
        self.storage.as_ref().ok_or_else(|| {
            AppError::Core(CoreError::Internal(
                "Document storage is not configured".into(),
            ))
        })
    }
}
