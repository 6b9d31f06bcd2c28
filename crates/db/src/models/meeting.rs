use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row per meeting. The `id` doubles as the conferencing room name, so
/// it is opaque here: usually a UUID, but an external namespace is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub scheduled: bool,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Set exactly once, when a scheduled meeting's session concludes.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: String,
    /// Compared against the locally stored token to recognize the host.
    /// Never forwarded to the conferencing widget as a credential.
    pub host_token: String,
    /// Participant ids currently granted moderator rights.
    #[serde(default)]
    pub admin_ids: Vec<String>,
    /// Normalized display names granted moderator rights, used before the
    /// participant id is known.
    #[serde(default)]
    pub admin_names: Vec<String>,
    #[serde(default)]
    pub banned_names: Vec<String>,
    #[serde(default)]
    pub whiteboard_open: bool,
    /// Participant currently recognized as host inside the live conference.
    #[serde(default)]
    pub host_participant_id: Option<String>,
    #[serde(default)]
    pub start_with_audio_muted: bool,
    #[serde(default)]
    pub start_with_video_muted: bool,
    #[serde(default)]
    pub lobby_enabled: bool,
    #[serde(default)]
    pub webinar: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    pub const TABLE: &'static str = "meetings";

    pub fn is_admin_id(&self, participant_id: &str) -> bool {
        self.admin_ids.iter().any(|id| id == participant_id)
    }

    pub fn is_admin_name(&self, normalized_name: &str) -> bool {
        self.admin_names.iter().any(|n| n == normalized_name)
    }
}
