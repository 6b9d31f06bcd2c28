use std::net::SocketAddr;
use std::sync::Arc;

use huddle_api::{build_router, state::AppState};
use huddle_config::Settings;
use serde_json::json;
use tokio::net::TcpListener;

use super::stub_supabase::{self, StubSupabase};

/// A running admin API wired to an in-process backend stub.
pub struct TestApp {
    pub addr: SocketAddr,
    pub base_url: String,
    pub settings: Settings,
    pub client: reqwest::Client,
    pub stub: Arc<StubSupabase>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_settings(|_| {}).await
    }

    /// Spawn with the metrics poller pointed at the stub's instant-query
    /// surface.
    pub async fn spawn_with_metrics() -> Self {
        Self::spawn_with_settings(|settings| {
            let base = settings.supabase.url.clone();
            settings.metrics.endpoint = Some(format!("{base}/metrics/query"));
        })
        .await
    }

    /// Spawn with customized settings. The `mutator` closure receives the
    /// defaults after the stub URL is wired in.
    pub async fn spawn_with_settings(mutator: impl FnOnce(&mut Settings)) -> Self {
        let stub = StubSupabase::new();
        let stub_url = stub_supabase::serve(stub.clone()).await;

        let mut settings = test_settings(&stub_url);
        mutator(&mut settings);

        let app = build_router(AppState::new(settings.clone()));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base_url = format!("http://{}", addr);
        let client = reqwest::Client::new();

        Self {
            addr,
            base_url,
            settings,
            client,
            stub,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn seed_profile(&self, id: &str, email: &str, display_name: &str, active: bool) {
        self.stub.seed_row(
            "profiles",
            json!({
                "id": id,
                "email": email,
                "display_name": display_name,
                "role": "user",
                "is_active": active,
                "avatar_url": null,
                "created_at": chrono::Utc::now().to_rfc3339(),
                "updated_at": chrono::Utc::now().to_rfc3339(),
            }),
        );
    }

    pub fn seed_meeting(&self, id: &str, name: &str, completed: bool) {
        let completed_at = if completed {
            json!(chrono::Utc::now().to_rfc3339())
        } else {
            serde_json::Value::Null
        };
        self.stub.seed_row(
            "meetings",
            json!({
                "id": id,
                "name": name,
                "purpose": null,
                "scheduled": false,
                "scheduled_at": null,
                "completed_at": completed_at,
                "created_by": "seed",
                "host_token": "seed-token",
                "admin_ids": [],
                "admin_names": [],
                "banned_names": [],
                "whiteboard_open": false,
                "host_participant_id": null,
                "start_with_audio_muted": false,
                "start_with_video_muted": false,
                "lobby_enabled": false,
                "webinar": false,
                "created_at": chrono::Utc::now().to_rfc3339(),
                "updated_at": chrono::Utc::now().to_rfc3339(),
            }),
        );
    }
}

fn test_settings(stub_url: &str) -> Settings {
    Settings {
        app: huddle_config::AppSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec![],
        },
        supabase: huddle_config::SupabaseSettings {
            url: stub_url.to_string(),
            service_role_key: "test-service-role-key".to_string(),
            meetings_table: "meetings".to_string(),
            actions_table: "meeting_actions".to_string(),
            profiles_table: "profiles".to_string(),
        },
        session: huddle_config::SessionSettings {
            settle_delay_ms: 10,
            role_poll_interval_ms: 100,
            feed_poll_interval_ms: 50,
            widget_ready_timeout_ms: 500,
            widget_pool_grace_ms: 100,
        },
        credential: huddle_config::CredentialSettings {
            endpoint: None,
            timeout_ms: 100,
        },
        metrics: huddle_config::MetricsSettings {
            endpoint: None,
            query: "up".to_string(),
            poll_interval_secs: 30,
            max_backoff_secs: 300,
        },
    }
}
