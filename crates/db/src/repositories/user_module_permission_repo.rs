//! Repository for `user_module_permissions`, the per-user permission matrix.

use intake_core::permissions::PermissionPatch;
use intake_core::types::DbId;
use sqlx::PgPool;

use crate::models::user_module_permission::{UserModulePermission, UserModulePermissionDetail};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, module_id, visible, can_create, can_read, can_update, \
                       can_delete, created_at, updated_at";

/// Permission columns joined with module metadata.
const DETAIL_SELECT: &str = "SELECT p.id, p.user_id, p.module_id, m.module_name, \
                                    m.path AS module_path, m.status AS module_status, \
                                    p.visible, p.can_create, p.can_read, p.can_update, p.can_delete \
                             FROM user_module_permissions p \
                             JOIN modules m ON m.id = p.module_id";

pub struct UserModulePermissionRepo;

impl UserModulePermissionRepo {
    /// Every row of a user, including rows for inactive or deleted modules.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<UserModulePermissionDetail>, sqlx::Error> {
        let query = format!("{DETAIL_SELECT} WHERE p.user_id = $1 ORDER BY m.created_at, m.id");
        sqlx::query_as::<_, UserModulePermissionDetail>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Rows of a user for active, live modules only. Backs "my permissions".
    pub async fn list_active_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<UserModulePermissionDetail>, sqlx::Error> {
        let query = format!(
            "{DETAIL_SELECT}
             WHERE p.user_id = $1 AND m.status = 'active' AND m.deleted_at IS NULL
             ORDER BY m.created_at, m.id"
        );
        sqlx::query_as::<_, UserModulePermissionDetail>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// The user's row for the live module mounted at `path`.
    pub async fn find_for_path(
        pool: &PgPool,
        user_id: DbId,
        path: &str,
    ) -> Result<Option<UserModulePermission>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM user_module_permissions p
             JOIN modules m ON m.id = p.module_id
             WHERE p.user_id = $1 AND LOWER(m.path) = LOWER($2) AND m.deleted_at IS NULL",
            prefixed_columns("p")
        );
        sqlx::query_as::<_, UserModulePermission>(&query)
            .bind(user_id)
            .bind(path)
            .fetch_optional(pool)
            .await
    }

    pub async fn count_for_user(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM user_module_permissions WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// Apply admin edits to a user's rows in one transaction.
    ///
    /// For each patch the row is fetched or created (all flags false), then
    /// only the fields present in the patch are overwritten. Patches without
    /// a `module_id` are skipped. Returns the touched rows in patch order.
    pub async fn merge(
        pool: &PgPool,
        user_id: DbId,
        patches: &[PermissionPatch],
    ) -> Result<Vec<UserModulePermissionDetail>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut touched = Vec::with_capacity(patches.len());

        let select = format!(
            "SELECT {COLUMNS} FROM user_module_permissions
             WHERE user_id = $1 AND module_id = $2
             FOR UPDATE"
        );

        for patch in patches {
            let Some(module_id) = patch.module_id else {
                continue;
            };

            sqlx::query(
                "INSERT INTO user_module_permissions (user_id, module_id) VALUES ($1, $2)
                 ON CONFLICT (user_id, module_id) DO NOTHING",
            )
            .bind(user_id)
            .bind(module_id)
            .execute(&mut *tx)
            .await?;

            let row = sqlx::query_as::<_, UserModulePermission>(&select)
                .bind(user_id)
                .bind(module_id)
                .fetch_one(&mut *tx)
                .await?;

            let mut flags = row.flags();
            flags.apply(patch);

            sqlx::query(
                "UPDATE user_module_permissions SET
                    visible = $2, can_create = $3, can_read = $4, can_update = $5, can_delete = $6
                 WHERE id = $1",
            )
            .bind(row.id)
            .bind(flags.visible)
            .bind(flags.can_create)
            .bind(flags.can_read)
            .bind(flags.can_update)
            .bind(flags.can_delete)
            .execute(&mut *tx)
            .await?;

            if !touched.contains(&row.id) {
                touched.push(row.id);
            }
        }

        tx.commit().await?;

        let query = format!("{DETAIL_SELECT} WHERE p.id = ANY($1)");
        let mut rows = sqlx::query_as::<_, UserModulePermissionDetail>(&query)
            .bind(&touched)
            .fetch_all(pool)
            .await?;
        rows.sort_by_key(|r| touched.iter().position(|id| *id == r.id));
        Ok(rows)
    }
}

fn prefixed_columns(alias: &str) -> String {
    COLUMNS
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
