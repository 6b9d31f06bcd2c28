use std::sync::Arc;
use std::time::Duration;

use huddle_config::Settings;
use huddle_services::SupabaseClient;
use huddle_services::metrics::{MetricsClient, VectorSample};
use tokio::sync::watch;

#[derive(Clone)]
pub struct AppState {
    pub supabase: Arc<SupabaseClient>,
    pub settings: Settings,
    /// Latest dashboard metrics sample set, fed by the background poller.
    /// `None` when no metrics endpoint is configured.
    pub metrics: Option<watch::Receiver<Vec<VectorSample>>>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let supabase = Arc::new(SupabaseClient::new(settings.supabase.clone()));
        let metrics = settings.metrics.endpoint.clone().map(|endpoint| {
            MetricsClient::new(endpoint).spawn_poller(
                settings.metrics.query.clone(),
                Duration::from_secs(settings.metrics.poll_interval_secs),
                Duration::from_secs(settings.metrics.max_backoff_secs),
            )
        });
        Self {
            supabase,
            settings,
            metrics,
        }
    }
}
