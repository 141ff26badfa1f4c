//! Repository for the `documents` table.

use intake_core::search::{contains_pattern, ilike_any};
use intake_core::types::DbId;
use sqlx::PgPool;

use crate::models::document::{CreateDocument, Document, DocumentListFilter};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_name, file_name, storage_url, scanned, fax_type, \
                       extracted_text, extraction, patient_dob, uploaded_by, deleted_at, \
                       created_at, updated_at";

const SEARCH_COLUMNS: &[&str] = &["file_name", "project_name", "COALESCE(fax_type, '')"];

pub struct DocumentRepo;

impl DocumentRepo {
    pub async fn create(pool: &PgPool, input: &CreateDocument) -> Result<Document, sqlx::Error> {
        let query = format!(
            "INSERT INTO documents
                (project_name, file_name, storage_url, scanned, fax_type,
                 extracted_text, extraction, patient_dob, uploaded_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(&input.project_name)
            .bind(&input.file_name)
            .bind(&input.storage_url)
            .bind(input.scanned)
            .bind(&input.fax_type)
            .bind(&input.extracted_text)
            .bind(&input.extraction)
            .bind(&input.patient_dob)
            .bind(input.uploaded_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Document>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM documents WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Newest first, with optional search and project filter.
    pub async fn list(
        pool: &PgPool,
        filter: &DocumentListFilter,
    ) -> Result<(Vec<Document>, i64), sqlx::Error> {
        let mut conditions = vec!["deleted_at IS NULL".to_string()];
        let mut next = 1;
        let pattern = filter.search.as_deref().map(contains_pattern);
        if pattern.is_some() {
            conditions.push(ilike_any(SEARCH_COLUMNS, next));
            next += 1;
        }
        if filter.project_name.is_some() {
            conditions.push(format!("project_name = ${next}"));
            next += 1;
        }
        let where_clause = conditions.join(" AND ");

        let count_query = format!("SELECT COUNT(*) FROM documents WHERE {where_clause}");
        let mut count = sqlx::query_as::<_, (i64,)>(&count_query);
        if let Some(p) = &pattern {
            count = count.bind(p);
        }
        if let Some(project) = &filter.project_name {
            count = count.bind(project);
        }
        let (total,) = count.fetch_one(pool).await?;

        let query = format!(
            "SELECT {COLUMNS} FROM documents WHERE {where_clause}
             ORDER BY created_at DESC, id DESC
             LIMIT ${next} OFFSET ${}",
            next + 1
        );
        let mut rows = sqlx::query_as::<_, Document>(&query);
        if let Some(p) = &pattern {
            rows = rows.bind(p);
        }
        if let Some(project) = &filter.project_name {
            rows = rows.bind(project);
        }
        let documents = rows
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await?;

        Ok((documents, total))
    }

    /// Point a document at a new stored file (after page replacement).
    pub async fn update_storage_url(
        pool: &PgPool,
        id: DbId,
        storage_url: &str,
    ) -> Result<Option<Document>, sqlx::Error> {
        let query = format!(
            "UPDATE documents SET storage_url = $2
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .bind(storage_url)
            .fetch_optional(pool)
            .await
    }

    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE documents SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
