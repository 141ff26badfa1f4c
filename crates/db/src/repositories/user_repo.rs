//! Repository for the `users` table.

use intake_core::search::{contains_pattern, ilike_any};
use intake_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::user::{CreateUser, UpdateUser, User, UserListFilter};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone_number, \
                       country_code, title, role_id, status, is_superuser, otp_code, \
                       otp_created_at, last_login_at, deleted_at, created_at, updated_at";

/// Columns matched by `?search=`.
const SEARCH_COLUMNS: &[&str] = &["first_name", "last_name", "email"];

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a user and copy its role's permission template into
    /// `user_module_permissions`, all in one transaction.
    ///
    /// Template entries whose module no longer exists are skipped. Returns
    /// the user and the number of permission rows created.
    pub async fn create_with_permissions(
        pool: &PgPool,
        input: &CreateUser,
    ) -> Result<(User, u64), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO users
                (email, password_hash, first_name, last_name, phone_number, country_code,
                 title, role_id, status, is_superuser)
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, '+91'), $7, $8, COALESCE($9, 'active'), $10)
             RETURNING {COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.phone_number)
            .bind(&input.country_code)
            .bind(&input.title)
            .bind(input.role_id)
            .bind(&input.status)
            .bind(input.is_superuser)
            .fetch_one(&mut *tx)
            .await?;

        let materialized = Self::materialize_role_template(&mut tx, user.id, user.role_id).await?;

        tx.commit().await?;
        Ok((user, materialized))
    }

    /// Reactivate a soft-deleted user and overwrite it with `input`.
    ///
    /// Existing permission rows are kept; template entries the user has no
    /// row for yet are added. Returns `None` if `id` is not a deleted user.
    pub async fn restore_with(
        pool: &PgPool,
        id: DbId,
        input: &CreateUser,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE users SET
                password_hash = $2,
                first_name = $3,
                last_name = $4,
                phone_number = COALESCE($5, phone_number),
                country_code = COALESCE($6, country_code),
                title = COALESCE($7, title),
                role_id = $8,
                status = COALESCE($9, 'active'),
                otp_code = NULL,
                otp_created_at = NULL,
                deleted_at = NULL
             WHERE id = $1 AND deleted_at IS NOT NULL
             RETURNING {COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.password_hash)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.phone_number)
            .bind(&input.country_code)
            .bind(&input.title)
            .bind(input.role_id)
            .bind(&input.status)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(user) = user else {
            return Ok(None);
        };
        Self::materialize_role_template(&mut tx, user.id, user.role_id).await?;

        tx.commit().await?;
        Ok(Some(user))
    }

    async fn materialize_role_template(
        conn: &mut PgConnection,
        user_id: DbId,
        role_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO user_module_permissions
                (user_id, module_id, visible, can_create, can_read, can_update, can_delete)
             SELECT $1, t.module_id, t.visible, t.can_create, t.can_read, t.can_update, t.can_delete
             FROM role_module_permissions t
             JOIN modules m ON m.id = t.module_id
             WHERE t.role_id = $2
             ORDER BY t.position
             ON CONFLICT (user_id, module_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Find a live user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a live user by email.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email, including soft-deleted rows. Used by
    /// create-with-restore.
    pub async fn find_by_email_include_deleted(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Whether a user other than `exclude_id` already uses `email`.
    ///
    /// Soft-deleted rows count: `uq_users_email` spans them too.
    pub async fn email_taken(
        pool: &PgPool,
        email: &str,
        exclude_id: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(
                SELECT 1 FROM users
                WHERE email = $1 AND ($2::BIGINT IS NULL OR id <> $2)
             )",
        )
        .bind(email)
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// List live users in creation order with optional search and role
    /// filter. Returns the page and the total match count.
    pub async fn list(
        pool: &PgPool,
        filter: &UserListFilter,
    ) -> Result<(Vec<User>, i64), sqlx::Error> {
        let mut conditions = vec!["deleted_at IS NULL".to_string()];
        let mut next = 1;
        let pattern = filter.search.as_deref().map(contains_pattern);
        if pattern.is_some() {
            conditions.push(ilike_any(SEARCH_COLUMNS, next));
            next += 1;
        }
        if filter.role_id.is_some() {
            conditions.push(format!("role_id = ${next}"));
            next += 1;
        }
        let where_clause = conditions.join(" AND ");

        let count_query = format!("SELECT COUNT(*) FROM users WHERE {where_clause}");
        let mut count = sqlx::query_as::<_, (i64,)>(&count_query);
        if let Some(p) = &pattern {
            count = count.bind(p);
        }
        if let Some(role_id) = filter.role_id {
            count = count.bind(role_id);
        }
        let (total,) = count.fetch_one(pool).await?;

        let query = format!(
            "SELECT {COLUMNS} FROM users WHERE {where_clause}
             ORDER BY created_at ASC, id ASC
             LIMIT ${next} OFFSET ${}",
            next + 1
        );
        let mut rows = sqlx::query_as::<_, User>(&query);
        if let Some(p) = &pattern {
            rows = rows.bind(p);
        }
        if let Some(role_id) = filter.role_id {
            rows = rows.bind(role_id);
        }
        let users = rows
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await?;

        Ok((users, total))
    }

    /// Update a live user. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no live row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateUser,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                first_name = COALESCE($4, first_name),
                last_name = COALESCE($5, last_name),
                phone_number = COALESCE($6, phone_number),
                country_code = COALESCE($7, country_code),
                title = COALESCE($8, title),
                role_id = COALESCE($9, role_id),
                status = COALESCE($10, status)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.phone_number)
            .bind(&input.country_code)
            .bind(&input.title)
            .bind(input.role_id)
            .bind(&input.status)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a user. Returns `true` if a live row was flagged.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // OTP
    // -----------------------------------------------------------------------

    /// Store a freshly issued code, replacing any outstanding one.
    pub async fn set_otp(
        pool: &PgPool,
        id: DbId,
        code: &str,
        issued_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET otp_code = $2, otp_created_at = $3
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(code)
        .bind(issued_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Clear the code only if it still equals `code`. Returns `false` when a
    /// concurrent verify already consumed it.
    pub async fn consume_otp(pool: &PgPool, id: DbId, code: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET otp_code = NULL, otp_created_at = NULL
             WHERE id = $1 AND otp_code = $2",
        )
        .bind(id)
        .bind(code)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Credentials
    // -----------------------------------------------------------------------

    /// Replace the password hash and revoke every session of the user in one
    /// transaction. Returns `false` if the user is not live.
    pub async fn reset_password(
        pool: &PgPool,
        id: DbId,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE users SET password_hash = $2, otp_code = NULL, otp_created_at = NULL
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE user_sessions SET is_revoked = true
             WHERE user_id = $1 AND is_revoked = false",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Stamp `last_login_at`.
    pub async fn record_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
