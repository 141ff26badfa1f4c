//! Module (navigable application area) model and DTOs.

use intake_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A module row from the `modules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Module {
    pub id: DbId,
    pub module_name: String,
    pub path: String,
    pub description: Option<String>,
    pub status: String,
    #[serde(skip_serializing)]
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a module. `path` must already be normalized.
#[derive(Debug, Clone)]
pub struct CreateModule {
    pub module_name: String,
    pub path: String,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateModule {
    pub module_name: Option<String>,
    pub path: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

/// Filters for the paginated module list.
#[derive(Debug, Clone, Default)]
pub struct ModuleListFilter {
    pub search: Option<String>,
    pub status: Option<String>,
    pub limit: i64,
    pub offset: i64,
}
