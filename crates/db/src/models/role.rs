//! Role entity model and its permission template projection.

use intake_core::permissions::ModulePermission;
use intake_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A role row from the `roles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Role {
    pub id: DbId,
    pub role_name: String,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One row of `role_module_permissions`.
#[derive(Debug, Clone, FromRow)]
pub struct RoleModulePermissionRow {
    pub role_id: DbId,
    pub module_id: DbId,
    pub position: i32,
    pub visible: bool,
    pub can_create: bool,
    pub can_read: bool,
    pub can_update: bool,
    pub can_delete: bool,
}

impl From<RoleModulePermissionRow> for ModulePermission {
    fn from(row: RoleModulePermissionRow) -> Self {
        ModulePermission {
            module_id: row.module_id,
            visible: row.visible,
            can_create: row.can_create,
            can_read: row.can_read,
            can_update: row.can_update,
            can_delete: row.can_delete,
        }
    }
}

/// Read-side view of a role with its ordered template.
#[derive(Debug, Clone, Serialize)]
pub struct RoleWithPermissions {
    pub id: DbId,
    pub role_name: String,
    pub module_permissions: Vec<ModulePermission>,
    pub created_at: Timestamp,
}

impl RoleWithPermissions {
    pub fn new(role: Role, module_permissions: Vec<ModulePermission>) -> Self {
        Self {
            id: role.id,
            role_name: role.role_name,
            module_permissions,
            created_at: role.created_at,
        }
    }
}

/// DTO for creating a role.
#[derive(Debug, Clone)]
pub struct CreateRole {
    pub role_name: String,
    pub module_permissions: Vec<ModulePermission>,
}

/// DTO for updating a role. A present template replaces the whole list.
#[derive(Debug, Clone, Default)]
pub struct UpdateRole {
    pub role_name: Option<String>,
    pub module_permissions: Option<Vec<ModulePermission>>,
}
