use serde_json::{Value, json};

use crate::fixtures::test_app::TestApp;

#[tokio::test]
async fn localhost_origins_pass_on_any_port() {
    let app = TestApp::spawn().await;

    for origin in ["http://localhost:3000", "http://localhost:5173", "http://127.0.0.1:8080"] {
        let resp = app
            .client
            .get(app.url("/health"))
            .header("Origin", origin)
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success(), "origin {origin} was rejected");
        assert_eq!(
            resp.headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some(origin)
        );
    }
}

#[tokio::test]
async fn unknown_origins_get_a_403() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/health"))
        .header("Origin", "https://evil.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["data"], Value::Null);
    assert_eq!(body["error"]["message"], json!("Origin not allowed"));
}

#[tokio::test]
async fn allow_listed_origins_pass() {
    let app = TestApp::spawn_with_settings(|settings| {
        settings.app.cors_origins = vec!["https://admin.example.com".to_string()];
    })
    .await;

    let resp = app
        .client
        .get(app.url("/health"))
        .header("Origin", "https://admin.example.com")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("https://admin.example.com")
    );
}

#[tokio::test]
async fn requests_without_an_origin_are_untouched() {
    let app = TestApp::spawn().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert!(resp.status().is_success());
}
