//! Module permission matrix: per-module visibility plus CRUD flags.
//!
//! Roles carry an ordered template of [`ModulePermission`] entries. When a
//! user is created the template is copied into per-user rows; after that the
//! two are independent and admins edit the user rows with [`PermissionPatch`].

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Well-known names
// ---------------------------------------------------------------------------

/// Role seeded at startup with every permission on every default module.
pub const ROLE_SUPER_ADMIN: &str = "Super Admin";

/// `(module_name, path, description)` for the modules seeded at startup.
pub const DEFAULT_MODULES: &[(&str, &str, &str)] = &[
    ("Dashboard", "/dashboard", "Main overview"),
    ("Users", "/users", "Manage application users"),
    ("Customer", "/customer", "Manage customers"),
    ("Modules", "/modules", "Manage modules"),
    ("Roles", "/roles", "Manage user roles"),
    ("Projects", "/projects", "Manage projects"),
    ("Documents", "/documents", "Fax and document intake"),
];

/// Paths the management endpoints gate on.
pub const MODULE_USERS: &str = "/users";
pub const MODULE_ROLES: &str = "/roles";
pub const MODULE_MODULES: &str = "/modules";
pub const MODULE_DOCUMENTS: &str = "/documents";

// ---------------------------------------------------------------------------
// Module status
// ---------------------------------------------------------------------------

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_INACTIVE: &str = "inactive";

const VALID_STATUSES: &[&str] = &[STATUS_ACTIVE, STATUS_INACTIVE];

/// Validate a module or user status value.
pub fn validate_status(status: &str) -> Result<(), CoreError> {
    if VALID_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid status '{status}'. Must be one of: {VALID_STATUSES:?}"
        )))
    }
}

/// Ensure a module path starts with `/`.
///
/// ```
/// use intake_core::permissions::normalize_module_path;
/// assert_eq!(normalize_module_path("reports"), "/reports");
/// assert_eq!(normalize_module_path("/reports"), "/reports");
/// ```
pub fn normalize_module_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

/// CRUD action being checked against a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

/// Materialized flags for one (user, module) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionFlags {
    pub visible: bool,
    pub can_create: bool,
    pub can_read: bool,
    pub can_update: bool,
    pub can_delete: bool,
}

impl PermissionFlags {
    pub const ALL: PermissionFlags = PermissionFlags {
        visible: true,
        can_create: true,
        can_read: true,
        can_update: true,
        can_delete: true,
    };

    /// A hidden module grants nothing, whatever its CRUD flags say.
    pub fn allows(&self, action: Action) -> bool {
        self.visible
            && match action {
                Action::Create => self.can_create,
                Action::Read => self.can_read,
                Action::Update => self.can_update,
                Action::Delete => self.can_delete,
            }
    }

    /// Overwrite only the fields present in `patch`.
    pub fn apply(&mut self, patch: &PermissionPatch) {
        if let Some(visible) = patch.visible {
            self.visible = visible;
        }
        let crud = &patch.permissions;
        if let Some(v) = crud.create {
            self.can_create = v;
        }
        if let Some(v) = crud.read {
            self.can_read = v;
        }
        if let Some(v) = crud.update {
            self.can_update = v;
        }
        if let Some(v) = crud.delete {
            self.can_delete = v;
        }
    }
}

/// `{create, read, update, delete}` as rendered to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CrudView {
    pub create: bool,
    pub read: bool,
    pub update: bool,
    pub delete: bool,
}

impl From<PermissionFlags> for CrudView {
    fn from(f: PermissionFlags) -> Self {
        Self {
            create: f.can_create,
            read: f.can_read,
            update: f.can_update,
            delete: f.can_delete,
        }
    }
}

// ---------------------------------------------------------------------------
// Role template
// ---------------------------------------------------------------------------

/// One entry of a role's permission template. Missing flags default to false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePermission {
    pub module_id: DbId,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub can_create: bool,
    #[serde(default)]
    pub can_read: bool,
    #[serde(default)]
    pub can_update: bool,
    #[serde(default)]
    pub can_delete: bool,
}

impl ModulePermission {
    pub fn flags(&self) -> PermissionFlags {
        PermissionFlags {
            visible: self.visible,
            can_create: self.can_create,
            can_read: self.can_read,
            can_update: self.can_update,
            can_delete: self.can_delete,
        }
    }

    pub fn with_flags(module_id: DbId, flags: PermissionFlags) -> Self {
        Self {
            module_id,
            visible: flags.visible,
            can_create: flags.can_create,
            can_read: flags.can_read,
            can_update: flags.can_update,
            can_delete: flags.can_delete,
        }
    }
}

/// Reject templates that list the same module twice.
pub fn validate_template(entries: &[ModulePermission]) -> Result<(), CoreError> {
    let mut seen = std::collections::HashSet::new();
    for entry in entries {
        if !seen.insert(entry.module_id) {
            return Err(CoreError::Validation(format!(
                "Module {} appears more than once in module_permissions",
                entry.module_id
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Partial updates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CrudPatch {
    pub create: Option<bool>,
    pub read: Option<bool>,
    pub update: Option<bool>,
    pub delete: Option<bool>,
}

/// Admin edit of one user's permission row. Absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PermissionPatch {
    /// Entries without a module id are skipped by the merge.
    pub module_id: Option<DbId>,
    pub visible: Option<bool>,
    #[serde(default)]
    pub permissions: CrudPatch,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
