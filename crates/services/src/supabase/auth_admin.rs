use serde::{Deserialize, Serialize};
use tracing::warn;

use super::SupabaseClient;
use crate::error::BackendResult;

/// The slice of the hosted auth user we care about.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    pub banned_until: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateAuthUser<'a> {
    email: &'a str,
    password: &'a str,
    email_confirm: bool,
    user_metadata: serde_json::Value,
}

/// Ban duration long enough to be "disabled"; lifted with `"none"`.
const DISABLE_BAN_DURATION: &str = "876600h";

impl SupabaseClient {
    pub async fn create_auth_user(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> BackendResult<AuthUser> {
        let body = CreateAuthUser {
            email,
            password,
            email_confirm: true,
            user_metadata: serde_json::json!({ "display_name": display_name }),
        };
        let resp = self
            .http()
            .post(self.auth_url("/users"))
            .headers(self.headers())
            .json(&body)
            .send()
            .await?;
        let user = Self::check(resp).await?.json::<AuthUser>().await?;
        Ok(user)
    }

    pub async fn update_auth_user(
        &self,
        user_id: &str,
        patch: &serde_json::Value,
    ) -> BackendResult<AuthUser> {
        let resp = self
            .http()
            .put(self.auth_url(&format!("/users/{user_id}")))
            .headers(self.headers())
            .json(patch)
            .send()
            .await?;
        let user = Self::check(resp).await?.json::<AuthUser>().await?;
        Ok(user)
    }

    pub async fn set_auth_user_banned(
        &self,
        user_id: &str,
        banned: bool,
    ) -> BackendResult<AuthUser> {
        let duration = if banned { DISABLE_BAN_DURATION } else { "none" };
        self.update_auth_user(user_id, &serde_json::json!({ "ban_duration": duration }))
            .await
    }

    pub async fn delete_auth_user(&self, user_id: &str) -> BackendResult<()> {
        let resp = self
            .http()
            .delete(self.auth_url(&format!("/users/{user_id}")))
            .headers(self.headers())
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Best-effort compensation after a half-finished user creation. Errors
    /// are logged, not surfaced; the caller already has a failure to report.
    pub async fn delete_auth_user_best_effort(&self, user_id: &str) {
        if let Err(e) = self.delete_auth_user(user_id).await {
            warn!(user_id, %e, "compensating auth-user deletion failed");
        }
    }
}
