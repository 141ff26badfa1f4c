use intake_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A transactional email template from `email_templates`.
#[derive(Debug, Clone, FromRow)]
pub struct EmailTemplate {
    pub id: DbId,
    pub name: String,
    pub subject: String,
    pub html_body: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
