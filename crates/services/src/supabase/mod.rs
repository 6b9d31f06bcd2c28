pub mod auth_admin;
pub mod rest;

use huddle_config::SupabaseSettings;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use crate::error::{BackendError, BackendResult};

pub use auth_admin::AuthUser;

/// Client for the hosted database/auth collaborator. Rows go over the
/// PostgREST surface (`/rest/v1`), auth-user management over the admin auth
/// surface (`/auth/v1/admin`). Both authenticate with the service role key.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    pub settings: SupabaseSettings,
}

impl SupabaseClient {
    pub fn new(settings: SupabaseSettings) -> Self {
        let base_url = settings.url.trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            settings,
        }
    }

    pub(crate) fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/admin{}", self.base_url, path)
    }

    pub(crate) fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(key) = HeaderValue::from_str(&self.settings.service_role_key) {
            headers.insert("apikey", key);
        }
        if let Ok(bearer) =
            HeaderValue::from_str(&format!("Bearer {}", self.settings.service_role_key))
        {
            headers.insert(AUTHORIZATION, bearer);
        }
        headers
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Like `error_for_status`, but keeps the response body for the error.
    pub(crate) async fn check(resp: reqwest::Response) -> BackendResult<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
