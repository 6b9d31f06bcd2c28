use async_trait::async_trait;
use serde::Deserialize;

/// Out-of-scope collaborator issuing the signed admin credential a
/// recognized host presents to the widget. Only the interface lives here.
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    async fn issue(&self, meeting_id: &str, display_name: &str) -> anyhow::Result<String>;
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    token: String,
}

/// HTTP implementation against the hosted issuance endpoint.
pub struct HttpCredentialIssuer {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpCredentialIssuer {
    pub fn new(endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl CredentialIssuer for HttpCredentialIssuer {
    async fn issue(&self, meeting_id: &str, display_name: &str) -> anyhow::Result<String> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "room": meeting_id,
                "display_name": display_name,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<IssueResponse>()
            .await?;
        Ok(resp.token)
    }
}
