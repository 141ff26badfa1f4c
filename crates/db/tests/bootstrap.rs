use intake_core::permissions::{DEFAULT_MODULES, ROLE_SUPER_ADMIN};
use intake_db::bootstrap::{seed_defaults, BootstrapAdmin, TEMPLATE_FORGOT_PASSWORD_OTP};
use intake_db::repositories::{EmailTemplateRepo, RoleRepo, UserModulePermissionRepo, UserRepo};
use sqlx::PgPool;

fn admin() -> BootstrapAdmin {
    BootstrapAdmin {
        email: "admin@yopmail.com".to_string(),
        password_hash: "$argon2id$placeholder".to_string(),
        phone_number: None,
    }
}

/// Full bootstrap test: connect, migrate, seed, verify.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_seed_creates_defaults(pool: PgPool) {
    intake_db::health_check(&pool).await.unwrap();

    let report = seed_defaults(&pool, &admin()).await.unwrap();
    assert_eq!(report.modules_created, DEFAULT_MODULES.len());
    assert!(report.role_template_written);
    assert!(report.admin_created);
    assert_eq!(report.templates_created, 1);

    let role = RoleRepo::find_by_name(&pool, ROLE_SUPER_ADMIN)
        .await
        .unwrap()
        .expect("super admin role");
    let template = RoleRepo::template(&pool, role.id).await.unwrap();
    assert_eq!(template.len(), DEFAULT_MODULES.len());
    assert!(template.iter().all(|e| e.can_delete && e.visible));

    let user = UserRepo::find_by_email(&pool, "admin@yopmail.com")
        .await
        .unwrap()
        .expect("super admin user");
    assert!(user.is_superuser);
    assert_eq!(user.role_id, role.id);
    assert_eq!(
        UserModulePermissionRepo::count_for_user(&pool, user.id)
            .await
            .unwrap(),
        DEFAULT_MODULES.len() as i64
    );

    assert!(EmailTemplateRepo::find_by_name(&pool, TEMPLATE_FORGOT_PASSWORD_OTP)
        .await
        .unwrap()
        .is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_seed_is_idempotent(pool: PgPool) {
    seed_defaults(&pool, &admin()).await.unwrap();
    let second = seed_defaults(&pool, &admin()).await.unwrap();

    assert_eq!(second.modules_created, 0);
    assert!(!second.role_template_written);
    assert!(!second.admin_created);
    assert_eq!(second.templates_created, 0);

    let (modules,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM modules")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(modules, DEFAULT_MODULES.len() as i64);
}
