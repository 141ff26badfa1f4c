//! Idempotent seeding of default modules, the super admin role and user, and
//! the transactional email templates. Runs after migrations on every start.

use intake_core::permissions::{DEFAULT_MODULES, ROLE_SUPER_ADMIN};
use intake_core::types::DbId;
use sqlx::PgPool;

use crate::sealed::Sealed;

/// Template used for password reset codes.
pub const TEMPLATE_FORGOT_PASSWORD_OTP: &str = "forgot_password_otp";

const FORGOT_PASSWORD_SUBJECT: &str = "Your password reset code";
const FORGOT_PASSWORD_BODY: &str = "<p>Hello {{ first_name }},</p>\
<p>Your verification code is <strong>{{ otp }}</strong>. It expires in {{ validity_mins }} minutes.</p>\
<p>If you did not request a password reset you can ignore this email.</p>";

/// Credentials for the seeded super admin account.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password_hash: String,
    pub phone_number: Option<Sealed>,
}

/// What a bootstrap run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub modules_created: usize,
    pub role_template_written: bool,
    pub admin_created: bool,
    pub templates_created: usize,
}

/// Seed defaults in one transaction. Existing rows are never modified,
/// except that an empty super admin template is filled in.
pub async fn seed_defaults(
    pool: &PgPool,
    admin: &BootstrapAdmin,
) -> Result<BootstrapReport, sqlx::Error> {
    let mut report = BootstrapReport::default();
    let mut tx = pool.begin().await?;

    // Modules (matched by name among live rows).
    let mut module_ids: Vec<DbId> = Vec::with_capacity(DEFAULT_MODULES.len());
    for (name, path, description) in DEFAULT_MODULES {
        let existing: Option<(DbId,)> = sqlx::query_as(
            "SELECT id FROM modules WHERE LOWER(module_name) = LOWER($1) AND deleted_at IS NULL",
        )
        .bind(name)
        .fetch_optional(&mut *tx)
        .await?;

        let id = match existing {
            Some((id,)) => id,
            None => {
                let (id,): (DbId,) = sqlx::query_as(
                    "INSERT INTO modules (module_name, path, description) VALUES ($1, $2, $3)
                     RETURNING id",
                )
                .bind(name)
                .bind(path)
                .bind(description)
                .fetch_one(&mut *tx)
                .await?;
                tracing::info!(module = %name, path = %path, "Seeded module");
                report.modules_created += 1;
                id
            }
        };
        module_ids.push(id);
    }

    // Super admin role.
    let existing: Option<(DbId,)> = sqlx::query_as(
        "SELECT id FROM roles WHERE LOWER(role_name) = LOWER($1) AND deleted_at IS NULL",
    )
    .bind(ROLE_SUPER_ADMIN)
    .fetch_optional(&mut *tx)
    .await?;
    let role_id = match existing {
        Some((id,)) => id,
        None => {
            let (id,): (DbId,) =
                sqlx::query_as("INSERT INTO roles (role_name) VALUES ($1) RETURNING id")
                    .bind(ROLE_SUPER_ADMIN)
                    .fetch_one(&mut *tx)
                    .await?;
            id
        }
    };

    let (template_len,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM role_module_permissions WHERE role_id = $1")
            .bind(role_id)
            .fetch_one(&mut *tx)
            .await?;
    if template_len == 0 {
        for (position, module_id) in module_ids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO role_module_permissions
                    (role_id, module_id, position, visible, can_create, can_read, can_update, can_delete)
                 VALUES ($1, $2, $3, true, true, true, true, true)",
            )
            .bind(role_id)
            .bind(module_id)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }
        report.role_template_written = true;
        tracing::info!(role = ROLE_SUPER_ADMIN, "Seeded role template");
    }

    // Super admin user.
    let (admin_exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND deleted_at IS NULL)",
    )
    .bind(&admin.email)
    .fetch_one(&mut *tx)
    .await?;
    if !admin_exists {
        let (user_id,): (DbId,) = sqlx::query_as(
            "INSERT INTO users
                (email, password_hash, first_name, last_name, phone_number, role_id, is_superuser)
             VALUES ($1, $2, 'Super', 'Admin', $3, $4, true)
             ON CONFLICT (email) DO UPDATE SET
                password_hash = EXCLUDED.password_hash,
                role_id = EXCLUDED.role_id,
                is_superuser = true,
                status = 'active',
                deleted_at = NULL
             RETURNING id",
        )
        .bind(&admin.email)
        .bind(&admin.password_hash)
        .bind(&admin.phone_number)
        .bind(role_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO user_module_permissions
                (user_id, module_id, visible, can_create, can_read, can_update, can_delete)
             SELECT $1, t.module_id, t.visible, t.can_create, t.can_read, t.can_update, t.can_delete
             FROM role_module_permissions t
             JOIN modules m ON m.id = t.module_id
             WHERE t.role_id = $2
             ON CONFLICT (user_id, module_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&mut *tx)
        .await?;

        report.admin_created = true;
        tracing::info!(email = %admin.email, "Seeded super admin user");
    }

    // Email templates.
    let inserted = sqlx::query(
        "INSERT INTO email_templates (name, subject, html_body) VALUES ($1, $2, $3)
         ON CONFLICT (name) DO NOTHING",
    )
    .bind(TEMPLATE_FORGOT_PASSWORD_OTP)
    .bind(FORGOT_PASSWORD_SUBJECT)
    .bind(FORGOT_PASSWORD_BODY)
    .execute(&mut *tx)
    .await?;
    report.templates_created += inserted.rows_affected() as usize;

    tx.commit().await?;
    Ok(report)
}
