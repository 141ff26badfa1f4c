//! Integration tests for `/api/roles` and `/api/modules`.

mod common;

use axum::http::StatusCode;
use common::{
    admin_token, body_json, create_role, delete_auth, get_auth, module_id, patch_json_auth,
    post_json_auth, put_json_auth,
};
use intake_core::permissions::{MODULE_DOCUMENTS, MODULE_USERS};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn role_crud_round_trip(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let users = module_id(&pool, MODULE_USERS).await;

    let id = create_role(
        app.clone(),
        &token,
        serde_json::json!({
            "role_name": "Auditor",
            "module_permissions": [{ "module_id": users, "visible": true, "can_read": true }],
        }),
    )
    .await;

    let response = get_auth(app.clone(), &format!("/api/roles/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Role fetched successfully.");
    assert_eq!(json["data"]["role_name"], "Auditor");
    let template = &json["data"]["module_permissions"][0];
    assert_eq!(template["module_id"], users);
    assert_eq!(template["can_read"], true);
    assert_eq!(template["can_delete"], false);

    let response = put_json_auth(
        app.clone(),
        &format!("/api/roles/{id}"),
        serde_json::json!({ "role_name": "Senior Auditor", "module_permissions": [] }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Role updated successfully.");
    assert_eq!(json["data"]["role_name"], "Senior Auditor");
    assert_eq!(json["data"]["module_permissions"], serde_json::json!([]));

    let response = delete_auth(app.clone(), &format!("/api/roles/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Role removed successfully.");

    let response = get_auth(app, &format!("/api/roles/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn role_names_are_unique(pool: PgPool) {
    let app = common::build_test_app(pool).await;
    let token = admin_token(app.clone()).await;
    create_role(app.clone(), &token, serde_json::json!({ "role_name": "Intake" })).await;

    let response = post_json_auth(
        app,
        "/api/roles",
        serde_json::json!({ "role_name": "Intake" }),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Role name already exists.");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn role_name_is_required(pool: PgPool) {
    let app = common::build_test_app(pool).await;
    let token = admin_token(app.clone()).await;

    let response = post_json_auth(
        app,
        "/api/roles",
        serde_json::json!({ "role_name": "   " }),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Role name is required.");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_module_ids_are_rejected(pool: PgPool) {
    let app = common::build_test_app(pool).await;
    let token = admin_token(app.clone()).await;

    let response = post_json_auth(
        app,
        "/api/roles",
        serde_json::json!({
            "role_name": "Broken",
            "module_permissions": [{ "module_id": 999999, "visible": true }],
        }),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "Unknown module ids in module_permissions: 999999"
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_template_entries_are_rejected(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let users = module_id(&pool, MODULE_USERS).await;

    let response = post_json_auth(
        app,
        "/api/roles",
        serde_json::json!({
            "role_name": "Twice",
            "module_permissions": [{ "module_id": users }, { "module_id": users }],
        }),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn role_list_is_searchable(pool: PgPool) {
    let app = common::build_test_app(pool).await;
    let token = admin_token(app.clone()).await;
    create_role(app.clone(), &token, serde_json::json!({ "role_name": "Fax Reviewer" })).await;

    let response = get_auth(app, "/api/roles?search=reviewer", &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Roles fetched successfully.");
    assert_eq!(json["data"]["count"], 1);
    assert_eq!(json["data"]["list"][0]["role_name"], "Fax Reviewer");
}

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn module_path_is_normalized(pool: PgPool) {
    let app = common::build_test_app(pool).await;
    let token = admin_token(app.clone()).await;

    let response = post_json_auth(
        app,
        "/api/modules",
        serde_json::json!({ "module_name": "Reports", "path": "reports" }),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Module created successfully.");
    assert_eq!(json["data"]["path"], "/reports");
    assert_eq!(json["data"]["status"], "active");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn module_name_and_path_are_unique(pool: PgPool) {
    let app = common::build_test_app(pool).await;
    let token = admin_token(app.clone()).await;

    let same_name = post_json_auth(
        app.clone(),
        "/api/modules",
        serde_json::json!({ "module_name": "Documents", "path": "/elsewhere" }),
        &token,
    )
    .await;
    assert_eq!(same_name.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(same_name).await["message"], "Module name already exists.");

    let same_path = post_json_auth(
        app,
        "/api/modules",
        serde_json::json!({ "module_name": "Docs Two", "path": "documents" }),
        &token,
    )
    .await;
    assert_eq!(same_path.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(same_path).await["message"], "Module path already exists.");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn module_requires_name_and_path(pool: PgPool) {
    let app = common::build_test_app(pool).await;
    let token = admin_token(app.clone()).await;

    let response = post_json_auth(
        app,
        "/api/modules",
        serde_json::json!({ "module_name": "Orphan" }),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "module_name and path are required."
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn module_status_filter_and_validation(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let token = admin_token(app.clone()).await;
    let documents = module_id(&pool, MODULE_DOCUMENTS).await;

    let response = patch_json_auth(
        app.clone(),
        &format!("/api/modules/{documents}"),
        serde_json::json!({ "status": "inactive" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["path"], MODULE_DOCUMENTS);

    let response = get_auth(app.clone(), "/api/modules?status=inactive", &token).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["count"], 1);
    assert_eq!(json["data"]["list"][0]["id"], documents);

    let response = get_auth(app.clone(), "/api/modules?status=archived", &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = patch_json_auth(
        app,
        &format!("/api/modules/{documents}"),
        serde_json::json!({ "status": "paused" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleted_module_is_gone(pool: PgPool) {
    let app = common::build_test_app(pool).await;
    let token = admin_token(app.clone()).await;

    let response = post_json_auth(
        app.clone(),
        "/api/modules",
        serde_json::json!({ "module_name": "Temp", "path": "/temp" }),
        &token,
    )
    .await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = delete_auth(app.clone(), &format!("/api/modules/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["id"], id);

    let response = get_auth(app, &format!("/api/modules/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
