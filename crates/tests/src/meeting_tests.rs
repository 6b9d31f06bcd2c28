use serde_json::{Value, json};

use crate::fixtures::test_app::TestApp;

#[tokio::test]
async fn list_meetings_paginates() {
    let app = TestApp::spawn().await;
    for i in 0..5 {
        app.seed_meeting(&format!("m{i}"), &format!("Standup {i}"), false);
    }

    let resp = app
        .client
        .get(app.url("/meetings?page=2&limit=2"))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    let data = &body["data"];
    assert_eq!(data["items"].as_array().unwrap().len(), 2);
    assert_eq!(data["page"], json!(2));
    assert_eq!(data["total"], json!(5));
    assert_eq!(data["totalPages"], json!(3));
}

#[tokio::test]
async fn list_meetings_is_empty_without_rows() {
    let app = TestApp::spawn().await;

    let resp = app.client.get(app.url("/meetings")).send().await.unwrap();
    assert!(resp.status().is_success());

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["items"], json!([]));
    assert_eq!(body["data"]["total"], json!(0));
}
