use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Instant-query response in the standard vector-result shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstantQueryResponse {
    pub status: String,
    pub data: InstantQueryData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstantQueryData {
    #[serde(rename = "resultType")]
    pub result_type: String,
    pub result: Vec<VectorSample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSample {
    pub metric: serde_json::Map<String, serde_json::Value>,
    /// `[unix_seconds, "value"]`.
    pub value: (f64, String),
}

/// Display-only client for the time-series collaborator.
pub struct MetricsClient {
    http: reqwest::Client,
    endpoint: String,
}

impl MetricsClient {
    pub fn new(endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    pub async fn instant_query(&self, expr: &str) -> anyhow::Result<Vec<VectorSample>> {
        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[("query", expr)])
            .send()
            .await?
            .error_for_status()?
            .json::<InstantQueryResponse>()
            .await?;
        Ok(resp.data.result)
    }

    /// Fixed-interval poll with bounded exponential backoff on failure. The
    /// latest successful sample set lands on the returned watch channel.
    pub fn spawn_poller(
        self,
        expr: String,
        interval: Duration,
        max_backoff: Duration,
    ) -> watch::Receiver<Vec<VectorSample>> {
        let (tx, rx) = watch::channel(Vec::new());
        tokio::spawn(async move {
            let mut backoff = interval;
            loop {
                match self.instant_query(&expr).await {
                    Ok(samples) => {
                        debug!(count = samples.len(), "metrics sample");
                        if tx.send(samples).is_err() {
                            break;
                        }
                        backoff = interval;
                    }
                    Err(e) => {
                        warn!(%e, next_retry = ?backoff, "metrics query failed");
                        backoff = (backoff * 2).min(max_backoff);
                    }
                }
                tokio::time::sleep(backoff).await;
            }
        });
        rx
    }
}
