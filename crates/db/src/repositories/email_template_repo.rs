//! Repository for `email_templates`.

use sqlx::PgPool;

use crate::models::email_template::EmailTemplate;

const COLUMNS: &str = "id, name, subject, html_body, created_at, updated_at";

pub struct EmailTemplateRepo;

impl EmailTemplateRepo {
    pub async fn find_by_name(
        pool: &PgPool,
        name: &str,
    ) -> Result<Option<EmailTemplate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM email_templates WHERE name = $1");
        sqlx::query_as::<_, EmailTemplate>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }
}
