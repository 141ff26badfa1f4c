//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod document_repo;
pub mod email_template_repo;
pub mod module_repo;
pub mod role_repo;
pub mod session_repo;
pub mod user_module_permission_repo;
pub mod user_repo;

pub use document_repo::DocumentRepo;
pub use email_template_repo::EmailTemplateRepo;
pub use module_repo::ModuleRepo;
pub use role_repo::RoleRepo;
pub use session_repo::SessionRepo;
pub use user_module_permission_repo::UserModulePermissionRepo;
pub use user_repo::UserRepo;
