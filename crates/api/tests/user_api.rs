//! Integration tests for user management under `/auth`.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{
    admin_token, body_json, create_role, delete_auth, get_auth, module_id, patch_json_auth,
    post_json, post_json_auth, put_json_auth,
};
use intake_core::permissions::{MODULE_DOCUMENTS, MODULE_USERS, ROLE_SUPER_ADMIN};
use intake_db::repositories::RoleRepo;
use sqlx::PgPool;

const PASSWORD: &str = "Secret#123";

fn user_body(email: &str, role: i64) -> serde_json::Value {
    serde_json::json!({
        "email": email,
        "password": PASSWORD,
        "first_name": "Grace",
        "last_name": "Hopper",
        "phone_number": "555-0100",
        "role": role,
    })
}

/// A role granting read on users and full access to documents.
async fn clerk_role(app: Router, pool: &PgPool, token: &str) -> i64 {
    let users = module_id(pool, MODULE_USERS).await;
    let documents = module_id(pool, MODULE_DOCUMENTS).await;
    create_role(
        app,
        token,
        serde_json::json!({
            "role_name": "Clerk",
            "module_permissions": [
                { "module_id": users, "visible": true, "can_read": true },
                { "module_id": documents, "visible": true, "can_create": true,
                  "can_read": true, "can_update": true, "can_delete": true },
            ],
        }),
    )
    .await
}

async fn add_user(app: Router, token: &str, email: &str, role: i64) -> serde_json::Value {
    let response = post_json_auth(app, "/auth/add-user", user_body(email, role), token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn add_user_materializes_the_role_template(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let role = clerk_role(app.clone(), &pool, &token).await;

    let json = add_user(app.clone(), &token, "grace@intake.test", role).await;
    assert_eq!(json["message"], "User added successfully.");
    assert_eq!(json["status"], 201);
    assert_eq!(json["data"]["role_name"], "Clerk");
    assert_eq!(json["data"]["phone_number"], "555-0100");
    assert!(json["data"].get("password_hash").is_none());
    let user_id = json["data"]["id"].as_i64().unwrap();

    let response = get_auth(
        app,
        &format!("/api/users/permissions/{user_id}"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rows = body_json(response).await["data"].as_array().unwrap().clone();
    assert_eq!(rows.len(), 2);

    let users_row = rows
        .iter()
        .find(|r| r["module_path"] == MODULE_USERS)
        .unwrap();
    assert_eq!(users_row["visible"], true);
    assert_eq!(
        users_row["permissions"],
        serde_json::json!({ "create": false, "read": true, "update": false, "delete": false })
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn phone_number_is_sealed_at_rest(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let role = clerk_role(app.clone(), &pool, &token).await;
    add_user(app, &token, "sealed@intake.test", role).await;

    let (stored,): (Option<String>,) =
        sqlx::query_as("SELECT phone_number FROM users WHERE email = 'sealed@intake.test'")
            .fetch_one(&pool)
            .await
            .unwrap();
    let stored = stored.unwrap();
    assert_ne!(stored, "555-0100");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_email_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let role = clerk_role(app.clone(), &pool, &token).await;
    add_user(app.clone(), &token, "dup@intake.test", role).await;

    let response = post_json_auth(
        app,
        "/auth/add-user",
        user_body("DUP@intake.test", role),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "User already exists with this email."
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_fields_are_listed(pool: PgPool) {
    let app = common::build_test_app(pool).await;
    let token = admin_token(app.clone()).await;

    let response = post_json_auth(
        app,
        "/auth/add-user",
        serde_json::json!({ "email": "half@intake.test", "first_name": "Half" }),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "Missing required fields: password, last_name, role"
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn malformed_email_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let role = clerk_role(app.clone(), &pool, &token).await;

    let response = post_json_auth(app, "/auth/add-user", user_body("not-an-email", role), &token).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_is_public(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let role = clerk_role(app.clone(), &pool, &token).await;

    let response = post_json(app.clone(), "/auth/register", user_body("self@intake.test", role)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "User registered successfully."
    );
    common::login(app, "self@intake.test", PASSWORD).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_cannot_pick_the_super_admin_role(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let super_admin = RoleRepo::find_by_name(&pool, ROLE_SUPER_ADMIN)
        .await
        .unwrap()
        .unwrap();

    let response = post_json(
        app,
        "/auth/register",
        user_body("climber@intake.test", super_admin.id),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = 'climber@intake.test'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleted_email_is_reported_as_duplicate(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let role = clerk_role(app.clone(), &pool, &token).await;

    let id = add_user(app.clone(), &token, "gone@intake.test", role).await["data"]["id"]
        .as_i64()
        .unwrap();
    let deleted = delete_auth(app.clone(), &format!("/auth/users/{id}"), &token).await;
    assert_eq!(deleted.status(), StatusCode::OK);

    let response = post_json(app.clone(), "/auth/register", user_body("gone@intake.test", role)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "User already exists with this email."
    );

    let response =
        post_json_auth(app, "/auth/add-user", user_body("gone@intake.test", role), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "User already exists with this email."
    );
}

// ---------------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn recreating_a_deleted_user_restores_the_row(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let role = clerk_role(app.clone(), &pool, &token).await;

    let created = post_json_auth(
        app.clone(),
        "/auth/users",
        user_body("again@intake.test", role),
        &token,
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let id = body_json(created).await["data"]["id"].as_i64().unwrap();

    let deleted = delete_auth(app.clone(), &format!("/auth/users/{id}"), &token).await;
    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(body_json(deleted).await["data"]["id"], id);

    let mut body = user_body("again@intake.test", role);
    body["first_name"] = "Restored".into();
    let restored = post_json_auth(app.clone(), "/auth/users", body, &token).await;
    assert_eq!(restored.status(), StatusCode::OK);
    let json = body_json(restored).await;
    assert_eq!(json["message"], "User restored successfully.");
    assert_eq!(json["data"]["id"], id);
    assert_eq!(json["data"]["first_name"], "Restored");
    assert_eq!(json["data"]["is_deleted"], false);

    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = 'again@intake.test'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_requires_an_email(pool: PgPool) {
    let app = common::build_test_app(pool).await;
    let token = admin_token(app.clone()).await;

    let response = post_json_auth(
        app,
        "/auth/users",
        serde_json::json!({ "first_name": "Nobody" }),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Email is required.");
}

// ---------------------------------------------------------------------------
// Read / update / delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_filters_by_search_and_role(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let role = clerk_role(app.clone(), &pool, &token).await;
    add_user(app.clone(), &token, "ada@intake.test", role).await;
    add_user(app.clone(), &token, "alan@intake.test", role).await;

    let response = get_auth(app.clone(), "/auth/users?search=ADA", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Users fetched successfully.");
    assert_eq!(json["data"]["count"], 1);
    assert_eq!(json["data"]["list"][0]["email"], "ada@intake.test");

    let response = get_auth(
        app,
        &format!("/auth/users?role={role}&limit=1"),
        &token,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["count"], 2);
    assert_eq!(json["data"]["list"].as_array().unwrap().len(), 1);
    let next = json["data"]["next"].as_str().unwrap();
    assert!(next.contains("page=2"), "next link was {next}");
    assert!(next.contains(&format!("role={role}")), "next link was {next}");
    assert!(json["data"]["previous"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn patch_updates_only_supplied_fields(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let role = clerk_role(app.clone(), &pool, &token).await;
    let id = add_user(app.clone(), &token, "patch@intake.test", role).await["data"]["id"]
        .as_i64()
        .unwrap();

    let response = patch_json_auth(
        app.clone(),
        &format!("/auth/users/{id}"),
        serde_json::json!({ "title": "Dr." }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "User updated successfully.");
    assert_eq!(json["data"]["title"], "Dr.");
    assert_eq!(json["data"]["first_name"], "Grace");

    // Password unchanged.
    common::login(app, "patch@intake.test", PASSWORD).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_rejects_an_email_in_use(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let role = clerk_role(app.clone(), &pool, &token).await;
    add_user(app.clone(), &token, "first@intake.test", role).await;
    let id = add_user(app.clone(), &token, "second@intake.test", role).await["data"]["id"]
        .as_i64()
        .unwrap();

    let response = put_json_auth(
        app,
        &format!("/auth/users/{id}"),
        serde_json::json!({ "email": "first@intake.test" }),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleted_users_are_not_found(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let role = clerk_role(app.clone(), &pool, &token).await;
    let id = add_user(app.clone(), &token, "gone@intake.test", role).await["data"]["id"]
        .as_i64()
        .unwrap();

    delete_auth(app.clone(), &format!("/auth/users/{id}"), &token).await;

    let get = get_auth(app.clone(), &format!("/auth/users/{id}"), &token).await;
    assert_eq!(get.status(), StatusCode::NOT_FOUND);

    let update = patch_json_auth(
        app.clone(),
        &format!("/auth/users/{id}"),
        serde_json::json!({ "title": "Late" }),
        &token,
    )
    .await;
    assert_eq!(update.status(), StatusCode::NOT_FOUND);

    let again = delete_auth(app, &format!("/auth/users/{id}"), &token).await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Permission gating
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn read_only_role_cannot_create_users(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let role = clerk_role(app.clone(), &pool, &token).await;
    add_user(app.clone(), &token, "clerk@intake.test", role).await;
    let clerk = common::login(app.clone(), "clerk@intake.test", PASSWORD).await;

    let list = get_auth(app.clone(), "/auth/users", &clerk).await;
    assert_eq!(list.status(), StatusCode::OK);

    let create = post_json_auth(
        app,
        "/auth/add-user",
        user_body("other@intake.test", role),
        &clerk,
    )
    .await;
    assert_eq!(create.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(create).await["message"],
        "You do not have permission to perform this action."
    );
}
