//! Integration tests for materialized user permissions and their enforcement.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{
    admin_token, body_json, create_role, get_auth, login, module_id, patch_json_auth,
    post_json_auth, put_json_auth,
};
use intake_core::permissions::{MODULE_DOCUMENTS, MODULE_ROLES, MODULE_USERS};
use sqlx::PgPool;

const PASSWORD: &str = "Secret#123";

/// Create a user holding a role with the given template; returns its id.
async fn user_with_template(
    app: Router,
    token: &str,
    email: &str,
    template: serde_json::Value,
) -> i64 {
    let role = create_role(
        app.clone(),
        token,
        serde_json::json!({ "role_name": format!("role for {email}"), "module_permissions": template }),
    )
    .await;
    let response = post_json_auth(
        app,
        "/auth/add-user",
        serde_json::json!({
            "email": email,
            "password": PASSWORD,
            "first_name": "Test",
            "last_name": "User",
            "role": role,
        }),
        token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn user_without_a_row_is_forbidden(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let documents = module_id(&pool, MODULE_DOCUMENTS).await;
    user_with_template(
        app.clone(),
        &token,
        "reader@intake.test",
        serde_json::json!([{ "module_id": documents, "visible": true, "can_read": true }]),
    )
    .await;
    let reader = login(app.clone(), "reader@intake.test", PASSWORD).await;

    let response = get_auth(app.clone(), "/api/roles", &reader).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["status"], 403);

    let response = get_auth(app, "/api/documents", &reader).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invisible_row_denies_every_action(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let roles = module_id(&pool, MODULE_ROLES).await;
    user_with_template(
        app.clone(),
        &token,
        "hidden@intake.test",
        serde_json::json!([{ "module_id": roles, "visible": false, "can_read": true }]),
    )
    .await;
    let hidden = login(app.clone(), "hidden@intake.test", PASSWORD).await;

    let response = get_auth(app, "/api/roles", &hidden).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn my_permissions_lists_active_modules_only(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let users = module_id(&pool, MODULE_USERS).await;
    let documents = module_id(&pool, MODULE_DOCUMENTS).await;
    user_with_template(
        app.clone(),
        &token,
        "mine@intake.test",
        serde_json::json!([
            { "module_id": users, "visible": true, "can_read": true },
            { "module_id": documents, "visible": true, "can_read": true },
        ]),
    )
    .await;

    patch_json_auth(
        app.clone(),
        &format!("/api/modules/{documents}"),
        serde_json::json!({ "status": "inactive" }),
        &token,
    )
    .await;

    let mine = login(app.clone(), "mine@intake.test", PASSWORD).await;
    let response = get_auth(app, "/api/my-permissions", &mine).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Your permissions fetched successfully.");
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["module_path"], MODULE_USERS);
    assert_eq!(rows[0]["module_status"], "active");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn users_cannot_edit_their_own_permissions(pool: PgPool) {
    let app = common::build_test_app(pool).await;
    let token = admin_token(app.clone()).await;

    let response = put_json_auth(
        app,
        "/api/my-permissions",
        serde_json::json!({ "permissions": [] }),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["message"],
        "You are not allowed to update permissions."
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn merge_only_touches_supplied_flags(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let documents = module_id(&pool, MODULE_DOCUMENTS).await;
    let user_id = user_with_template(
        app.clone(),
        &token,
        "merge@intake.test",
        serde_json::json!([{
            "module_id": documents, "visible": true,
            "can_create": true, "can_read": true, "can_update": true, "can_delete": false,
        }]),
    )
    .await;

    let response = put_json_auth(
        app.clone(),
        &format!("/api/user-permissions/{user_id}"),
        serde_json::json!({
            "permissions": [
                { "module_id": documents, "visible": false },
                { "visible": true },
            ],
        }),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "User permissions updated successfully.");
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1, "entries without module_id are skipped");
    assert_eq!(rows[0]["visible"], false);
    assert_eq!(
        rows[0]["permissions"],
        serde_json::json!({ "create": true, "read": true, "update": true, "delete": false })
    );

    let response = put_json_auth(
        app.clone(),
        &format!("/api/user-permissions/{user_id}"),
        serde_json::json!({
            "permissions": [{ "module_id": documents, "permissions": { "delete": true } }],
        }),
        &token,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"][0]["visible"], false);
    assert_eq!(json["data"][0]["permissions"]["delete"], true);
    assert_eq!(json["data"][0]["permissions"]["create"], true);

    let response = get_auth(app, &format!("/api/user-permissions/{user_id}"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn merge_creates_missing_rows(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let roles = module_id(&pool, MODULE_ROLES).await;
    let user_id =
        user_with_template(app.clone(), &token, "grow@intake.test", serde_json::json!([])).await;

    let response = put_json_auth(
        app.clone(),
        &format!("/api/user-permissions/{user_id}"),
        serde_json::json!({
            "permissions": [{ "module_id": roles, "visible": true, "permissions": { "read": true } }],
        }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let grown = login(app.clone(), "grow@intake.test", PASSWORD).await;
    let response = get_auth(app, "/api/roles", &grown).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn role_edits_do_not_change_existing_users(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let users = module_id(&pool, MODULE_USERS).await;
    let role = create_role(
        app.clone(),
        &token,
        serde_json::json!({
            "role_name": "Snapshot",
            "module_permissions": [{ "module_id": users, "visible": true, "can_read": true }],
        }),
    )
    .await;
    let response = post_json_auth(
        app.clone(),
        "/auth/add-user",
        serde_json::json!({
            "email": "snap@intake.test", "password": PASSWORD,
            "first_name": "Snap", "last_name": "Shot", "role": role,
        }),
        &token,
    )
    .await;
    let user_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    put_json_auth(
        app.clone(),
        &format!("/api/roles/{role}"),
        serde_json::json!({ "module_permissions": [] }),
        &token,
    )
    .await;

    let response = get_auth(app, &format!("/api/users/permissions/{user_id}"), &token).await;
    let json = body_json(response).await;
    assert_eq!(json["message"], "User permissions fetched successfully");
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}
