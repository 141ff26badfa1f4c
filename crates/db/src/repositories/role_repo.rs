//! Repository for the `roles` table and its permission template.

use std::collections::HashMap;

use intake_core::permissions::ModulePermission;
use intake_core::search::{contains_pattern, ilike_any};
use intake_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::role::{
    CreateRole, Role, RoleModulePermissionRow, RoleWithPermissions, UpdateRole,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, role_name, deleted_at, created_at, updated_at";

const TEMPLATE_COLUMNS: &str = "role_id, module_id, position, visible, can_create, can_read, \
                                can_update, can_delete";

/// Provides CRUD operations for roles.
pub struct RoleRepo;

impl RoleRepo {
    /// Insert a role and its template in one transaction.
    pub async fn create(
        pool: &PgPool,
        input: &CreateRole,
    ) -> Result<RoleWithPermissions, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!("INSERT INTO roles (role_name) VALUES ($1) RETURNING {COLUMNS}");
        let role = sqlx::query_as::<_, Role>(&query)
            .bind(&input.role_name)
            .fetch_one(&mut *tx)
            .await?;
        Self::write_template(&mut tx, role.id, &input.module_permissions).await?;

        tx.commit().await?;
        Ok(RoleWithPermissions::new(role, input.module_permissions.clone()))
    }

    /// Replace a role's template with `entries`, preserving their order.
    async fn write_template(
        conn: &mut PgConnection,
        role_id: DbId,
        entries: &[ModulePermission],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM role_module_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *conn)
            .await?;

        for (position, entry) in entries.iter().enumerate() {
            sqlx::query(
                "INSERT INTO role_module_permissions
                    (role_id, module_id, position, visible, can_create, can_read, can_update, can_delete)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(role_id)
            .bind(entry.module_id)
            .bind(position as i32)
            .bind(entry.visible)
            .bind(entry.can_create)
            .bind(entry.can_read)
            .bind(entry.can_update)
            .bind(entry.can_delete)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Find a live role by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Role>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM roles WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Role>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a live role by name (case-insensitive).
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Role>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM roles WHERE LOWER(role_name) = LOWER($1) AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, Role>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Whether a live role other than `exclude_id` already uses `name`,
    /// compared case-insensitively.
    pub async fn name_exists(
        pool: &PgPool,
        name: &str,
        exclude_id: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(
                SELECT 1 FROM roles
                WHERE LOWER(role_name) = LOWER($1) AND deleted_at IS NULL
                  AND ($2::BIGINT IS NULL OR id <> $2)
             )",
        )
        .bind(name.trim())
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Ordered template of one role.
    pub async fn template(pool: &PgPool, role_id: DbId) -> Result<Vec<ModulePermission>, sqlx::Error> {
        let query = format!(
            "SELECT {TEMPLATE_COLUMNS} FROM role_module_permissions
             WHERE role_id = $1 ORDER BY position ASC"
        );
        let rows = sqlx::query_as::<_, RoleModulePermissionRow>(&query)
            .bind(role_id)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(ModulePermission::from).collect())
    }

    /// Live role with its template.
    pub async fn find_with_permissions(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<RoleWithPermissions>, sqlx::Error> {
        let Some(role) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let template = Self::template(pool, role.id).await?;
        Ok(Some(RoleWithPermissions::new(role, template)))
    }

    /// List live roles in creation order, optionally filtered by a name
    /// substring. Returns the page and the total match count.
    pub async fn list(
        pool: &PgPool,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RoleWithPermissions>, i64), sqlx::Error> {
        let pattern = search.map(contains_pattern);
        let (where_clause, next) = match pattern {
            Some(_) => (
                format!("deleted_at IS NULL AND {}", ilike_any(&["role_name"], 1)),
                2,
            ),
            None => ("deleted_at IS NULL".to_string(), 1),
        };

        let count_query = format!("SELECT COUNT(*) FROM roles WHERE {where_clause}");
        let mut count = sqlx::query_as::<_, (i64,)>(&count_query);
        if let Some(p) = &pattern {
            count = count.bind(p);
        }
        let (total,) = count.fetch_one(pool).await?;

        let query = format!(
            "SELECT {COLUMNS} FROM roles WHERE {where_clause}
             ORDER BY created_at ASC, id ASC
             LIMIT ${next} OFFSET ${}",
            next + 1
        );
        let mut rows = sqlx::query_as::<_, Role>(&query);
        if let Some(p) = &pattern {
            rows = rows.bind(p);
        }
        let roles = rows.bind(limit).bind(offset).fetch_all(pool).await?;

        let ids: Vec<DbId> = roles.iter().map(|r| r.id).collect();
        let template_query = format!(
            "SELECT {TEMPLATE_COLUMNS} FROM role_module_permissions
             WHERE role_id = ANY($1) ORDER BY role_id, position"
        );
        let template_rows = sqlx::query_as::<_, RoleModulePermissionRow>(&template_query)
            .bind(&ids)
            .fetch_all(pool)
            .await?;

        let mut by_role: HashMap<DbId, Vec<ModulePermission>> = HashMap::new();
        for row in template_rows {
            by_role.entry(row.role_id).or_default().push(row.into());
        }

        let page = roles
            .into_iter()
            .map(|role| {
                let template = by_role.remove(&role.id).unwrap_or_default();
                RoleWithPermissions::new(role, template)
            })
            .collect();
        Ok((page, total))
    }

    /// Rename a role and/or replace its template.
    ///
    /// Existing users keep their materialized permissions. Returns `None` if
    /// no live role with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateRole,
    ) -> Result<Option<RoleWithPermissions>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE roles SET role_name = COALESCE($2, role_name)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        let role = sqlx::query_as::<_, Role>(&query)
            .bind(id)
            .bind(&input.role_name)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(role) = role else {
            return Ok(None);
        };

        if let Some(entries) = &input.module_permissions {
            Self::write_template(&mut tx, role.id, entries).await?;
        }
        tx.commit().await?;

        let template = Self::template(pool, role.id).await?;
        Ok(Some(RoleWithPermissions::new(role, template)))
    }

    /// Soft-delete a role. Returns `true` if a live row was flagged.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE roles SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Resolve a role ID to its name, including soft-deleted roles.
    pub async fn resolve_name(pool: &PgPool, role_id: DbId) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as("SELECT role_name FROM roles WHERE id = $1")
            .bind(role_id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(|r| r.0))
    }
}
