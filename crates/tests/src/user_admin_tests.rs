use serde_json::{Value, json};

use crate::fixtures::test_app::TestApp;

#[tokio::test]
async fn create_user_returns_the_new_profile() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/users"))
        .json(&json!({
            "email": "alice@example.com",
            "password": "s3cret-pass",
            "display_name": "Alice",
        }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["email"], json!("alice@example.com"));
    assert_eq!(body["data"]["display_name"], json!("Alice"));
    assert_eq!(body["data"]["is_active"], json!(true));

    // Both sides exist: the login and the profile row.
    assert_eq!(app.stub.auth_user_count(), 1);
    assert_eq!(app.stub.rows("profiles").len(), 1);
}

#[tokio::test]
async fn create_user_validates_input() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/users"))
        .json(&json!({
            "email": "not-an-email",
            "password": "s3cret-pass",
            "display_name": "Alice",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].is_object());
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("email")
    );

    let resp = app
        .client
        .post(app.url("/users"))
        .json(&json!({
            "email": "alice@example.com",
            "password": "short",
            "display_name": "Alice",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    assert_eq!(app.stub.auth_user_count(), 0);
}

#[tokio::test]
async fn failed_profile_insert_removes_the_auth_user() {
    let app = TestApp::spawn().await;
    app.stub
        .fail_next_profile_insert
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let resp = app
        .client
        .post(app.url("/users"))
        .json(&json!({
            "email": "alice@example.com",
            "password": "s3cret-pass",
            "display_name": "Alice",
        }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_server_error());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], json!(false));

    // The compensating deletion left no orphaned login behind.
    assert_eq!(app.stub.auth_user_count(), 0);
    assert!(app.stub.rows("profiles").is_empty());
}

#[tokio::test]
async fn list_users_paginates_with_an_exact_total() {
    let app = TestApp::spawn().await;
    for i in 0..3 {
        app.seed_profile(
            &format!("u{i}"),
            &format!("user{i}@example.com"),
            &format!("User {i}"),
            true,
        );
    }

    let resp = app
        .client
        .get(app.url("/users?page=1&limit=2"))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    let data = &body["data"];
    assert_eq!(data["items"].as_array().unwrap().len(), 2);
    assert_eq!(data["page"], json!(1));
    assert_eq!(data["limit"], json!(2));
    assert_eq!(data["total"], json!(3));
    assert_eq!(data["totalPages"], json!(2));

    let resp = app
        .client
        .get(app.url("/users?page=2&limit=2"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn update_user_changes_the_profile() {
    let app = TestApp::spawn().await;
    app.seed_profile("u1", "alice@example.com", "Alice", true);
    app.stub.seed_auth_user("u1", "alice@example.com");

    let resp = app
        .client
        .put(app.url("/users/u1"))
        .json(&json!({ "display_name": "Alice Cooper", "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["display_name"], json!("Alice Cooper"));
    assert_eq!(body["data"]["role"], json!("admin"));
}

#[tokio::test]
async fn update_with_no_fields_is_rejected() {
    let app = TestApp::spawn().await;
    app.seed_profile("u1", "alice@example.com", "Alice", true);

    let resp = app
        .client
        .put(app.url("/users/u1"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn disable_bans_the_login_and_flags_the_profile() {
    let app = TestApp::spawn().await;
    app.seed_profile("u1", "alice@example.com", "Alice", true);
    app.stub.seed_auth_user("u1", "alice@example.com");

    let resp = app
        .client
        .patch(app.url("/users/u1/disable"))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["is_active"], json!(false));
    let auth_user = app.stub.auth_user("u1").unwrap();
    assert!(!auth_user["banned_until"].is_null());

    let resp = app
        .client
        .patch(app.url("/users/u1/enable"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["is_active"], json!(true));
    let auth_user = app.stub.auth_user("u1").unwrap();
    assert!(auth_user["banned_until"].is_null());
}

#[tokio::test]
async fn delete_user_removes_login_and_profile() {
    let app = TestApp::spawn().await;
    app.seed_profile("u1", "alice@example.com", "Alice", true);
    app.stub.seed_auth_user("u1", "alice@example.com");

    let resp = app
        .client
        .delete(app.url("/users/u1"))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert_eq!(app.stub.auth_user_count(), 0);
    assert!(app.stub.rows("profiles").is_empty());

    // A second delete finds nothing.
    let resp = app
        .client
        .delete(app.url("/users/u1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}
