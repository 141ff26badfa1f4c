//! Materialized per-user module permissions.

use intake_core::permissions::{CrudView, PermissionFlags};
use intake_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from `user_module_permissions`.
#[derive(Debug, Clone, FromRow)]
pub struct UserModulePermission {
    pub id: DbId,
    pub user_id: DbId,
    pub module_id: DbId,
    pub visible: bool,
    pub can_create: bool,
    pub can_read: bool,
    pub can_update: bool,
    pub can_delete: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserModulePermission {
    pub fn flags(&self) -> PermissionFlags {
        PermissionFlags {
            visible: self.visible,
            can_create: self.can_create,
            can_read: self.can_read,
            can_update: self.can_update,
            can_delete: self.can_delete,
        }
    }
}

/// Permission row joined with its module, as listed to clients.
#[derive(Debug, Clone, FromRow)]
pub struct UserModulePermissionDetail {
    pub id: DbId,
    pub user_id: DbId,
    pub module_id: DbId,
    pub module_name: String,
    pub module_path: String,
    pub module_status: String,
    pub visible: bool,
    pub can_create: bool,
    pub can_read: bool,
    pub can_update: bool,
    pub can_delete: bool,
}

/// `{id, module_id, module_name, module_path, module_status, visible, permissions}`.
#[derive(Debug, Clone, Serialize)]
pub struct UserModulePermissionView {
    pub id: DbId,
    pub module_id: DbId,
    pub module_name: String,
    pub module_path: String,
    pub module_status: String,
    pub visible: bool,
    pub permissions: CrudView,
}

impl From<UserModulePermissionDetail> for UserModulePermissionView {
    fn from(d: UserModulePermissionDetail) -> Self {
        let flags = PermissionFlags {
            visible: d.visible,
            can_create: d.can_create,
            can_read: d.can_read,
            can_update: d.can_update,
            can_delete: d.can_delete,
        };
        Self {
            id: d.id,
            module_id: d.module_id,
            module_name: d.module_name,
            module_path: d.module_path,
            module_status: d.module_status,
            visible: d.visible,
            permissions: flags.into(),
        }
    }
}
