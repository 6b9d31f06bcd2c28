use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub supabase: SupabaseSettings,
    pub session: SessionSettings,
    pub credential: CredentialSettings,
    pub metrics: MetricsSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    /// Extra allowed CORS origins on top of the implicit localhost rule.
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SupabaseSettings {
    pub url: String,
    pub service_role_key: String,
    pub meetings_table: String,
    pub actions_table: String,
    pub profiles_table: String,
}

/// Timings for the meeting-session core. All bounded waits live here so
/// tests can shrink them.
#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    /// How long the resolver waits for auth state to settle before treating
    /// the viewer as anonymous.
    pub settle_delay_ms: u64,
    /// Safety-poll period for the role reconciler.
    pub role_poll_interval_ms: u64,
    /// Polling period behind the realtime action/meeting feeds.
    pub feed_poll_interval_ms: u64,
    /// Fallback timer that force-clears the loading state if the widget
    /// never reports ready.
    pub widget_ready_timeout_ms: u64,
    /// How long a released widget instance survives in the pool.
    pub widget_pool_grace_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CredentialSettings {
    /// Endpoint of the out-of-scope signed-credential issuer. None disables
    /// issuance entirely (hosts join as plain participants).
    pub endpoint: Option<String>,
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsSettings {
    pub endpoint: Option<String>,
    /// Instant-query expression polled for the dashboard.
    pub query: String,
    pub poll_interval_secs: u64,
    pub max_backoff_secs: u64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::default().separator("__").prefix("HUDDLE"))
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 3001)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("supabase.url", "")?
            .set_default("supabase.service_role_key", "")?
            .set_default("supabase.meetings_table", "meetings")?
            .set_default("supabase.actions_table", "meeting_actions")?
            .set_default("supabase.profiles_table", "profiles")?
            .set_default("session.settle_delay_ms", 1500)?
            .set_default("session.role_poll_interval_ms", 10_000)?
            .set_default("session.feed_poll_interval_ms", 2_000)?
            .set_default("session.widget_ready_timeout_ms", 12_000)?
            .set_default("session.widget_pool_grace_ms", 5_000)?
            .set_default("credential.endpoint", None::<String>)?
            .set_default("credential.timeout_ms", 6_000)?
            .set_default("metrics.endpoint", None::<String>)?
            .set_default("metrics.query", "up")?
            .set_default("metrics.poll_interval_secs", 30)?
            .set_default("metrics.max_backoff_secs", 300)?;

        // The admin front door documents these plain variable names; they
        // win over the prefixed form when both are set.
        if let Ok(port) = std::env::var("PORT") {
            builder = builder.set_override("app.port", port)?;
        }
        if let Ok(url) = std::env::var("SUPABASE_URL") {
            builder = builder.set_override("supabase.url", url)?;
        }
        if let Ok(key) = std::env::var("SUPABASE_SERVICE_ROLE_KEY") {
            builder = builder.set_override("supabase.service_role_key", key)?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Missing Supabase credentials are fatal at startup: the front door
    /// cannot degrade without its backing store.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.supabase.url.is_empty() {
            return Err(ConfigError::Message(
                "SUPABASE_URL (or HUDDLE__SUPABASE__URL) is required".into(),
            ));
        }
        if self.supabase.service_role_key.is_empty() {
            return Err(ConfigError::Message(
                "SUPABASE_SERVICE_ROLE_KEY (or HUDDLE__SUPABASE__SERVICE_ROLE_KEY) is required"
                    .into(),
            ));
        }
        Ok(())
    }
}
