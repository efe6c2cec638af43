//! Registration, login, profile and role gating over HTTP.

use reqwest::StatusCode;
use serde_json::json;

use bookstore_integration_tests::TestContext;

#[tokio::test]
async fn test_register_login_profile() {
    let ctx = TestContext::spawn().await;

    let reply = ctx
        .post(
            "/user/register",
            None,
            json!({
                "name": "Ada Reader",
                "email": "Ada@Example.com",
                "password": "correct horse battery",
            }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["user"]["email"], "ada@example.com");
    assert_eq!(reply.body["user"]["role"], "user");
    assert!(reply.body["user"].get("passwordHash").is_none());

    let reply = ctx
        .post(
            "/user/login",
            None,
            json!({"email": "ada@example.com", "password": "correct horse battery"}),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let token = reply.body["token"].as_str().unwrap().to_owned();

    let reply = ctx.get("/user/profile", Some(&token)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["name"], "Ada Reader");
}

#[tokio::test]
async fn test_login_wrong_password_is_unauthorized() {
    let ctx = TestContext::spawn().await;
    ctx.register("Ada", "ada@example.com", None).await;

    let reply = ctx
        .post(
            "/user/login",
            None,
            json!({"email": "ada@example.com", "password": "not the password"}),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let ctx = TestContext::spawn().await;
    ctx.register("Ada", "ada@example.com", None).await;

    let reply = ctx
        .post(
            "/user/register",
            None,
            json!({
                "name": "Other Ada",
                "email": "ADA@example.com",
                "password": "correct horse battery",
            }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_only_one_admin() {
    let ctx = TestContext::spawn().await;

    let reply = ctx.get("/user/check-admin", None).await;
    assert_eq!(reply.body["adminExists"], false);

    ctx.admin().await;

    let reply = ctx.get("/user/check-admin", None).await;
    assert_eq!(reply.body["adminExists"], true);

    let reply = ctx
        .post(
            "/user/register",
            None,
            json!({
                "name": "Second Admin",
                "email": "second@example.com",
                "password": "correct horse battery",
                "role": "admin",
            }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.body["error"], "ADMIN_EXISTS");
}

#[tokio::test]
async fn test_role_gating() {
    let ctx = TestContext::spawn().await;
    let user = ctx.register("Ada", "ada@example.com", None).await;

    let reply = ctx.get("/admin/orders", None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = ctx.get("/admin/orders", Some("not-a-token")).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = ctx.get("/admin/orders", Some(&user)).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body["error"], "FORBIDDEN");

    let admin = ctx.admin().await;
    let reply = ctx.get("/admin/orders", Some(&admin)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!([]));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let ctx = TestContext::spawn().await;

    let resp = ctx
        .client
        .get(format!("{}/health", ctx.base_url))
        .header("x-request-id", "trace-abc.123")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("x-request-id").unwrap(),
        "trace-abc.123"
    );
    assert_eq!(resp.headers().get("x-content-type-options").unwrap(), "nosniff");
}
