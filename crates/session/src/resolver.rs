use std::sync::Arc;
use std::time::Duration;

use huddle_db::Meeting;
use huddle_services::names::normalize_display_name;
use tracing::{debug, warn};

use crate::backend::MeetingBackend;
use crate::credentials::CredentialIssuer;
use crate::identity::IdentityProvider;
use crate::store::SessionStore;
use crate::ui::{Route, ToastLevel, UiSink};

/// Everything downstream needs about an active meeting, resolved once per
/// meeting-id change and discarded on navigation.
#[derive(Debug, Clone)]
pub struct SessionDescriptor {
    pub meeting_id: String,
    pub display_name: String,
    pub normalized_name: String,
    pub is_host: bool,
    /// Signed admin credential; `None` when issuance failed or timed out
    /// and the host joins as a plain participant.
    pub credential: Option<String>,
    /// Meeting row snapshot at join time.
    pub meeting: Meeting,
    /// Whether a host is already known inside the conference. Informational
    /// only; entry is never gated on it.
    pub host_present: bool,
}

/// Resolves route + identity + meeting row into either a redirect or a
/// session descriptor. Every early return has already navigated.
pub struct SessionResolver {
    backend: Arc<dyn MeetingBackend>,
    store: Arc<SessionStore>,
    identity: Arc<dyn IdentityProvider>,
    issuer: Option<Arc<dyn CredentialIssuer>>,
    ui: Arc<dyn UiSink>,
    settle_delay: Duration,
    credential_timeout: Duration,
}

impl SessionResolver {
    pub fn new(
        backend: Arc<dyn MeetingBackend>,
        store: Arc<SessionStore>,
        identity: Arc<dyn IdentityProvider>,
        issuer: Option<Arc<dyn CredentialIssuer>>,
        ui: Arc<dyn UiSink>,
        settle_delay: Duration,
        credential_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            store,
            identity,
            issuer,
            ui,
            settle_delay,
            credential_timeout,
        }
    }

    pub async fn resolve(&self, meeting_id: &str, path: &str) -> Option<SessionDescriptor> {
        // 1. Identifier and route shape. Ids are opaque: a non-UUID id is
        // logged and accepted, not rejected.
        if meeting_id.is_empty() || !path_matches(meeting_id, path) {
            self.ui.toast(ToastLevel::Error, "Invalid meeting link");
            self.ui.navigate(Route::Home);
            return None;
        }
        if uuid::Uuid::parse_str(meeting_id).is_err() {
            warn!(meeting_id, "meeting id is not a UUID, accepting as-is");
        }

        // 2. Identity, with one bounded settle recheck.
        let mut identity = self.identity.current().await;
        if identity.is_none() && !self.store.is_guest() {
            debug!(meeting_id, "no session yet, waiting for auth state to settle");
            tokio::time::sleep(self.settle_delay).await;
            identity = self.identity.current().await;
            if identity.is_none() && !self.store.is_guest() {
                self.ui.navigate(Route::GuestEntry {
                    meeting_id: meeting_id.to_string(),
                });
                return None;
            }
        }
        let anonymous = identity.is_none();

        // 3. Meeting row.
        let meeting = match self.backend.fetch_meeting(meeting_id).await {
            Ok(Some(meeting)) => meeting,
            Ok(None) => {
                if anonymous {
                    self.ui.navigate(Route::GuestEntry {
                        meeting_id: meeting_id.to_string(),
                    });
                } else {
                    self.ui.toast(ToastLevel::Error, "Meeting not found");
                    self.ui.navigate(Route::Denied);
                }
                return None;
            }
            Err(e) => {
                warn!(meeting_id, %e, "meeting fetch failed");
                if anonymous {
                    self.ui.navigate(Route::GuestEntry {
                        meeting_id: meeting_id.to_string(),
                    });
                } else {
                    self.ui.toast(ToastLevel::Error, "Could not load the meeting");
                    self.ui.navigate(Route::Denied);
                }
                return None;
            }
        };

        // 4. Ban check, before any widget connection exists.
        let display_name = self
            .store
            .display_name()
            .or_else(|| identity.as_ref().and_then(|i| i.display_name.clone()))
            .unwrap_or_else(|| "Guest".to_string());
        let normalized_name = normalize_display_name(&display_name);
        let banned = meeting
            .banned_names
            .iter()
            .any(|b| normalize_display_name(b) == normalized_name);
        if banned {
            self.ui
                .toast(ToastLevel::Error, "You have been removed from this meeting");
            self.ui.navigate(Route::Denied);
            return None;
        }

        // 5. Host recognition: exact token match from the session store.
        let is_host = self
            .store
            .host_token(meeting_id)
            .is_some_and(|token| token == meeting.host_token);

        // 6. Hosts ask for the signed credential, bounded. Failure is the
        // documented fallback, not the error path: join as participant.
        let mut credential = None;
        if is_host {
            match &self.issuer {
                Some(issuer) => {
                    let request = issuer.issue(meeting_id, &display_name);
                    match tokio::time::timeout(self.credential_timeout, request).await {
                        Ok(Ok(token)) => credential = Some(token),
                        Ok(Err(e)) => {
                            warn!(meeting_id, %e, "credential issuance failed");
                            self.ui.toast(
                                ToastLevel::Warning,
                                "Joining without host privileges, they may arrive later",
                            );
                        }
                        Err(_) => {
                            warn!(meeting_id, "credential issuance timed out");
                            self.ui.toast(
                                ToastLevel::Warning,
                                "Joining without host privileges, they may arrive later",
                            );
                        }
                    }
                }
                None => debug!(meeting_id, "no credential issuer configured"),
            }
        }

        // 7. Non-hosts are joinable immediately; host presence is tracked
        // for a banner, never as a gate.
        let host_present = meeting.host_participant_id.is_some();

        Some(SessionDescriptor {
            meeting_id: meeting_id.to_string(),
            display_name,
            normalized_name,
            is_host,
            credential,
            meeting,
            host_present,
        })
    }
}

/// Accepts the two recognized shapes: `/meeting/<id>` and
/// `/meeting/webinar/<id>`.
fn path_matches(meeting_id: &str, path: &str) -> bool {
    path == format!("/meeting/{meeting_id}") || path == format!("/meeting/webinar/{meeting_id}")
}
