use serde_json::{Value, json};

use crate::fixtures::test_app::TestApp;

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::spawn().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert!(resp.status().is_success());

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], json!("ok"));
}

#[tokio::test]
async fn dashboard_metrics_is_404_when_unconfigured() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/dashboard/metrics"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn dashboard_metrics_serves_the_latest_sample_set() {
    let app = TestApp::spawn_with_metrics().await;

    // Give the poller a moment for its first query.
    let mut samples = Vec::new();
    for _ in 0..50 {
        let resp = app
            .client
            .get(app.url("/dashboard/metrics"))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
        let body: Value = resp.json().await.unwrap();
        samples = body["data"].as_array().cloned().unwrap_or_default();
        if !samples.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0]["metric"]["__name__"], json!("up"));
}

#[tokio::test]
async fn dashboard_stats_count_rows() {
    let app = TestApp::spawn().await;
    app.seed_profile("u1", "alice@example.com", "Alice", true);
    app.seed_profile("u2", "bob@example.com", "Bob", false);
    app.seed_meeting("m1", "Standup", false);
    app.seed_meeting("m2", "Retro", true);
    app.seed_meeting("m3", "Planning", true);

    let resp = app
        .client
        .get(app.url("/dashboard/stats"))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    let data = &body["data"];
    assert_eq!(data["users"], json!(2));
    assert_eq!(data["activeUsers"], json!(1));
    assert_eq!(data["meetings"], json!(3));
    assert_eq!(data["completedMeetings"], json!(2));
}
