//! HTTP-level integration tests
//!
//! Exercises the full router against an in-memory SQLite database,
//! including the end-to-end session and moderation scenarios.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;

use postern::{
    api::{build_router, AppState},
    db::{
        create_test_pool, migrations,
        repositories::{SqlxPostRepository, SqlxSessionRepository, SqlxUserRepository},
        DynDatabasePool,
    },
    services::{AuthService, PostService, UserService},
};

async fn spawn_app() -> (TestServer, DynDatabasePool) {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let post_repo = SqlxPostRepository::boxed(pool.clone());

    let state = AppState {
        auth: Arc::new(AuthService::new(
            user_repo.clone(),
            session_repo.clone(),
            24,
        )),
        users: Arc::new(UserService::new(
            user_repo,
            session_repo,
            post_repo.clone(),
        )),
        posts: Arc::new(PostService::new(post_repo)),
    };

    let app = build_router(state, "http://localhost:5173");
    let server = TestServer::new(app).expect("Failed to start test server");

    (server, pool)
}

fn token_header(token: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-access-token"),
        HeaderValue::from_str(token).expect("Invalid token header"),
    )
}

async fn create_account(server: &TestServer, email: &str, password: &str) -> Value {
    let response = server
        .post("/v1/create-account")
        .json(&json!({
            "email": email,
            "password": password,
            "first_name": "A",
            "last_name": "B",
        }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()
}

async fn set_role(pool: &DynDatabasePool, user_id: i64, role: &str) {
    sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(role)
        .bind(user_id)
        .execute(pool.as_sqlite().expect("Test pool should be SQLite"))
        .await
        .expect("Failed to set role");
}

#[tokio::test]
async fn test_account_session_scenario() {
    let (server, _pool) = spawn_app().await;

    // create account and receive a first session token
    let created = create_account(&server, "a@x.com", "pw").await;
    let t1 = created["session"]["token"].as_str().expect("token").to_string();
    let user_id = created["user"]["id"].as_i64().expect("user id");
    assert!(created["user"].get("password").is_none());
    assert!(created["user"].get("password_hash").is_none());

    // login issues a second, distinct token; both are valid at once
    let login = server
        .post("/v1/login")
        .json(&json!({"email": "a@x.com", "password": "pw"}))
        .await;
    login.assert_status_ok();
    let t2 = login.json::<Value>()["session"]["token"]
        .as_str()
        .expect("token")
        .to_string();
    assert_ne!(t1, t2);

    // logout of the first token
    let logout = server.put("/v1/logout").json(&json!({"token": t1})).await;
    logout.assert_status_ok();
    assert_eq!(
        logout.json::<Value>()["message"],
        "Logout was successful"
    );

    // t1 is dead: authenticated operations now fail
    let (name, value) = token_header(&t1);
    let denied = server
        .post("/v1/create-post")
        .add_header(name, value)
        .json(&json!({"title": "t", "content": "c"}))
        .await;
    denied.assert_status(StatusCode::UNAUTHORIZED);

    // t2 is still alive and sees the privileged self view
    let (name, value) = token_header(&t2);
    let me = server
        .get(&format!("/v1/users/{user_id}"))
        .add_header(name, value)
        .await;
    me.assert_status_ok();
    let body = me.json::<Value>();
    assert_eq!(body["role"], "USER");
    assert!(body.get("sessions").is_some());
    assert!(body.get("profile").is_some());
}

#[tokio::test]
async fn test_logout_unknown_token() {
    let (server, _pool) = spawn_app().await;

    let response = server
        .put("/v1/logout")
        .json(&json!({"token": "no-such-token"}))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let (server, _pool) = spawn_app().await;

    create_account(&server, "dup@x.com", "pw").await;

    let response = server
        .post("/v1/create-account")
        .json(&json!({
            "email": "dup@x.com",
            "password": "pw",
            "first_name": "A",
            "last_name": "B",
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(
        response.json::<Value>()["error"]["message"],
        "email already exists"
    );
}

#[tokio::test]
async fn test_invalid_email_is_validation_error() {
    let (server, _pool) = spawn_app().await;

    let response = server
        .post("/v1/create-account")
        .json(&json!({
            "email": "not-an-email",
            "password": "pw",
            "first_name": "A",
            "last_name": "B",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_moderation_scenario() {
    let (server, pool) = spawn_app().await;

    // U1 is a plain user, U2 gets promoted to SUPER
    let u1 = create_account(&server, "u1@x.com", "pw").await;
    let u2 = create_account(&server, "u2@x.com", "pw").await;
    set_role(&pool, u2["user"]["id"].as_i64().expect("id"), "SUPER").await;

    let t1 = u1["session"]["token"].as_str().expect("token").to_string();

    // U1 creates a post
    let (name, value) = token_header(&t1);
    let created = server
        .post("/v1/create-post")
        .add_header(name, value)
        .json(&json!({"title": "Hello", "content": "World"}))
        .await;
    created.assert_status_ok();
    let post_id = created.json::<Value>()["id"].as_i64().expect("post id");

    // promoting U2 happened after its session was issued, so log in again
    let t2 = server
        .post("/v1/login")
        .json(&json!({"email": "u2@x.com", "password": "pw"}))
        .await
        .json::<Value>()["session"]["token"]
        .as_str()
        .expect("token")
        .to_string();

    // U2 blacklists the post
    let (name, value) = token_header(&t2);
    let toggled = server
        .put(&format!("/v1/posts/{post_id}/flag"))
        .add_header(name, value)
        .await;
    toggled.assert_status_ok();
    assert_eq!(
        toggled.json::<Value>()["message"],
        "Post has been blacklisted"
    );

    // anonymous lookup conceals the post entirely
    let anonymous = server.get(&format!("/v1/posts/{post_id}")).await;
    anonymous.assert_status(StatusCode::NOT_FOUND);

    // anonymous listing omits it too
    let listed = server.get("/v1/posts").await;
    listed.assert_status_ok();
    assert_eq!(listed.json::<Value>().as_array().expect("array").len(), 0);

    // the SUPER viewer sees the full record
    let (name, value) = token_header(&t2);
    let visible = server
        .get(&format!("/v1/posts/{post_id}"))
        .add_header(name, value)
        .await;
    visible.assert_status_ok();
    let body = visible.json::<Value>();
    assert_eq!(body["blacklisted"], true);
    assert_eq!(body["title"], "Hello");
}

#[tokio::test]
async fn test_user_flag_requires_super_exactly() {
    let (server, pool) = spawn_app().await;

    let admin = create_account(&server, "admin@x.com", "pw").await;
    let target = create_account(&server, "target@x.com", "pw").await;
    set_role(&pool, admin["user"]["id"].as_i64().expect("id"), "ADMIN").await;
    let target_id = target["user"]["id"].as_i64().expect("id");

    let t_admin = server
        .post("/v1/login")
        .json(&json!({"email": "admin@x.com", "password": "pw"}))
        .await
        .json::<Value>()["session"]["token"]
        .as_str()
        .expect("token")
        .to_string();

    // ADMIN is in the admin roles but user moderation wants SUPER exactly
    let (name, value) = token_header(&t_admin);
    let denied = server
        .put(&format!("/v1/users/{target_id}/flag"))
        .add_header(name, value)
        .await;
    denied.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(denied.json::<Value>()["error"]["message"], "Access denied");

    // post moderation accepts any admin role
    let (name, value) = token_header(&t_admin);
    let post_created = server
        .post("/v1/create-post")
        .add_header(name, value)
        .json(&json!({"title": "t", "content": "c"}))
        .await;
    let post_id = post_created.json::<Value>()["id"].as_i64().expect("id");

    let (name, value) = token_header(&t_admin);
    server
        .put(&format!("/v1/posts/{post_id}/flag"))
        .add_header(name, value)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_list_users_admin_only() {
    let (server, pool) = spawn_app().await;

    let user = create_account(&server, "plain@x.com", "pw").await;
    let t_plain = user["session"]["token"].as_str().expect("token").to_string();

    // no token at all
    server
        .get("/v1/users")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // authenticated but not an admin
    let (name, value) = token_header(&t_plain);
    server
        .get("/v1/users")
        .add_header(name, value)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    // admins get the full, unshaped list (newest first)
    let admin = create_account(&server, "admin@x.com", "pw").await;
    set_role(&pool, admin["user"]["id"].as_i64().expect("id"), "ADMIN").await;
    let t_admin = server
        .post("/v1/login")
        .json(&json!({"email": "admin@x.com", "password": "pw"}))
        .await
        .json::<Value>()["session"]["token"]
        .as_str()
        .expect("token")
        .to_string();

    let (name, value) = token_header(&t_admin);
    let listed = server.get("/v1/users").add_header(name, value).await;
    listed.assert_status_ok();
    let body = listed.json::<Value>();
    let users = body.as_array().expect("array");
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["email"], "admin@x.com");
    // no password material in the listing
    assert!(users.iter().all(|u| u.get("password_hash").is_none()));
}

#[tokio::test]
async fn test_get_user_hides_privileged_fields_from_strangers() {
    let (server, _pool) = spawn_app().await;

    let target = create_account(&server, "target@x.com", "pw").await;
    let target_id = target["user"]["id"].as_i64().expect("id");

    let response = server.get(&format!("/v1/users/{target_id}")).await;
    response.assert_status_ok();
    let body = response.json::<Value>();

    assert_eq!(body["email"], "target@x.com");
    assert_eq!(body["blacklisted"], false);
    assert!(body.get("role").is_none());
    assert!(body.get("profile").is_none());
    assert!(body.get("sessions").is_none());
}

#[tokio::test]
async fn test_update_account_and_change_password() {
    let (server, _pool) = spawn_app().await;

    let created = create_account(&server, "me@x.com", "pw").await;
    let token = created["session"]["token"].as_str().expect("token").to_string();
    let user_id = created["user"]["id"].as_i64().expect("id");

    let (name, value) = token_header(&token);
    let updated = server
        .put("/v1/update-account")
        .add_header(name, value)
        .json(&json!({
            "email": "me@x.com",
            "first_name": "New",
            "last_name": "Name",
            "phone": "0123456789",
            "address": "1 Main St",
            "gender": "other",
            "theme": "light",
        }))
        .await;
    updated.assert_status_ok();
    assert_eq!(updated.json::<Value>()["message"], "Update was successful");

    // the self view now carries the profile
    let (name, value) = token_header(&token);
    let me = server
        .get(&format!("/v1/users/{user_id}"))
        .add_header(name, value)
        .await;
    let body = me.json::<Value>();
    assert_eq!(body["first_name"], "New");
    assert_eq!(body["profile"]["gender"], "OTHER");
    assert_eq!(body["profile"]["theme"], "LIGHT");

    // wrong current password is rejected as unauthenticated
    let (name, value) = token_header(&token);
    let rejected = server
        .put("/v1/change-password")
        .add_header(name, value)
        .json(&json!({
            "current_password": "wrong",
            "new_password": "new-password",
            "repeat_password": "new-password",
        }))
        .await;
    rejected.assert_status(StatusCode::UNAUTHORIZED);

    // correct current password goes through
    let (name, value) = token_header(&token);
    let changed = server
        .put("/v1/change-password")
        .add_header(name, value)
        .json(&json!({
            "current_password": "pw",
            "new_password": "new-password",
            "repeat_password": "new-password",
        }))
        .await;
    changed.assert_status_ok();

    server
        .post("/v1/login")
        .json(&json!({"email": "me@x.com", "password": "new-password"}))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_unknown_route() {
    let (server, _pool) = spawn_app().await;

    let response = server.get("/v1/does-not-exist").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(
        response.json::<Value>()["error"]["message"],
        "API link does not exist or is no longer available"
    );
}

#[tokio::test]
async fn test_blacklisted_user_sessions_rejected() {
    let (server, pool) = spawn_app().await;

    let victim = create_account(&server, "victim@x.com", "pw").await;
    let victim_id = victim["user"]["id"].as_i64().expect("id");
    let victim_token = victim["session"]["token"].as_str().expect("token").to_string();

    let moderator = create_account(&server, "super@x.com", "pw").await;
    set_role(&pool, moderator["user"]["id"].as_i64().expect("id"), "SUPER").await;
    let t_super = server
        .post("/v1/login")
        .json(&json!({"email": "super@x.com", "password": "pw"}))
        .await
        .json::<Value>()["session"]["token"]
        .as_str()
        .expect("token")
        .to_string();

    // SUPER blacklists the victim account
    let (name, value) = token_header(&t_super);
    let toggled = server
        .put(&format!("/v1/users/{victim_id}/flag"))
        .add_header(name, value)
        .await;
    toggled.assert_status_ok();
    assert_eq!(
        toggled.json::<Value>()["message"],
        "User has been blacklisted"
    );

    // the victim's existing session no longer authenticates
    let (name, value) = token_header(&victim_token);
    server
        .post("/v1/create-post")
        .add_header(name, value)
        .json(&json!({"title": "t", "content": "c"}))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // and the victim cannot log in again
    server
        .post("/v1/login")
        .json(&json!({"email": "victim@x.com", "password": "pw"}))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // anonymous lookup of the blacklisted account is concealed
    server
        .get(&format!("/v1/users/{victim_id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
