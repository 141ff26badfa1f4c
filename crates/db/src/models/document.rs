//! Ingested fax/document model and DTOs.

use intake_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use crate::sealed::Sealed;

/// A row from the `documents` table. Extraction output is sealed at rest.
#[derive(Debug, Clone, FromRow)]
pub struct Document {
    pub id: DbId,
    pub project_name: String,
    pub file_name: String,
    pub storage_url: String,
    pub scanned: bool,
    pub fax_type: Option<String>,
    pub extracted_text: Option<Sealed>,
    pub extraction: Option<Sealed>,
    pub patient_dob: Option<Sealed>,
    pub uploaded_by: Option<DbId>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateDocument {
    pub project_name: String,
    pub file_name: String,
    pub storage_url: String,
    pub scanned: bool,
    pub fax_type: Option<String>,
    pub extracted_text: Option<Sealed>,
    pub extraction: Option<Sealed>,
    pub patient_dob: Option<Sealed>,
    pub uploaded_by: Option<DbId>,
}

/// Filters for the paginated document list.
#[derive(Debug, Clone, Default)]
pub struct DocumentListFilter {
    pub search: Option<String>,
    pub project_name: Option<String>,
    pub limit: i64,
    pub offset: i64,
}
