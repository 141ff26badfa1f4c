//! Repository for the `modules` table.

use intake_core::search::{contains_pattern, ilike_any};
use intake_core::types::DbId;
use sqlx::PgPool;

use crate::models::module::{CreateModule, Module, ModuleListFilter, UpdateModule};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, module_name, path, description, status, deleted_at, created_at, updated_at";

const SEARCH_COLUMNS: &[&str] = &["module_name", "COALESCE(description, '')"];

/// Provides CRUD operations for modules.
pub struct ModuleRepo;

impl ModuleRepo {
    pub async fn create(pool: &PgPool, input: &CreateModule) -> Result<Module, sqlx::Error> {
        let query = format!(
            "INSERT INTO modules (module_name, path, description, status)
             VALUES ($1, $2, $3, COALESCE($4, 'active'))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Module>(&query)
            .bind(&input.module_name)
            .bind(&input.path)
            .bind(&input.description)
            .bind(&input.status)
            .fetch_one(pool)
            .await
    }

    /// Find a live module by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Module>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM modules WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Module>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Paginated list with optional search over name and description and an
    /// optional status filter. Returns the page and the total match count.
    pub async fn list(
        pool: &PgPool,
        filter: &ModuleListFilter,
    ) -> Result<(Vec<Module>, i64), sqlx::Error> {
        let mut conditions = vec!["deleted_at IS NULL".to_string()];
        let mut next = 1;
        let pattern = filter.search.as_deref().map(contains_pattern);
        if pattern.is_some() {
            conditions.push(ilike_any(SEARCH_COLUMNS, next));
            next += 1;
        }
        if filter.status.is_some() {
            conditions.push(format!("status = ${next}"));
            next += 1;
        }
        let where_clause = conditions.join(" AND ");

        let count_query = format!("SELECT COUNT(*) FROM modules WHERE {where_clause}");
        let mut count = sqlx::query_as::<_, (i64,)>(&count_query);
        if let Some(p) = &pattern {
            count = count.bind(p);
        }
        if let Some(status) = &filter.status {
            count = count.bind(status);
        }
        let (total,) = count.fetch_one(pool).await?;

        let query = format!(
            "SELECT {COLUMNS} FROM modules WHERE {where_clause}
             ORDER BY created_at ASC, id ASC
             LIMIT ${next} OFFSET ${}",
            next + 1
        );
        let mut rows = sqlx::query_as::<_, Module>(&query);
        if let Some(p) = &pattern {
            rows = rows.bind(p);
        }
        if let Some(status) = &filter.status {
            rows = rows.bind(status);
        }
        let modules = rows
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await?;

        Ok((modules, total))
    }

    /// Whether a live module other than `exclude_id` already uses `name`.
    pub async fn name_exists(
        pool: &PgPool,
        name: &str,
        exclude_id: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(
                SELECT 1 FROM modules
                WHERE LOWER(module_name) = LOWER($1) AND deleted_at IS NULL
                  AND ($2::BIGINT IS NULL OR id <> $2)
             )",
        )
        .bind(name.trim())
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Whether a live module other than `exclude_id` already uses `path`.
    pub async fn path_exists(
        pool: &PgPool,
        path: &str,
        exclude_id: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(
                SELECT 1 FROM modules
                WHERE LOWER(path) = LOWER($1) AND deleted_at IS NULL
                  AND ($2::BIGINT IS NULL OR id <> $2)
             )",
        )
        .bind(path)
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// IDs among `ids` that have no module row at all.
    pub async fn missing_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT wanted.id FROM UNNEST($1::BIGINT[]) AS wanted(id)
             WHERE NOT EXISTS (SELECT 1 FROM modules m WHERE m.id = wanted.id)",
        )
        .bind(ids)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Update a live module. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateModule,
    ) -> Result<Option<Module>, sqlx::Error> {
        let query = format!(
            "UPDATE modules SET
                module_name = COALESCE($2, module_name),
                path = COALESCE($3, path),
                description = COALESCE($4, description),
                status = COALESCE($5, status)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Module>(&query)
            .bind(id)
            .bind(&input.module_name)
            .bind(&input.path)
            .bind(&input.description)
            .bind(&input.status)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a module. Returns `true` if a live row was flagged.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE modules SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
