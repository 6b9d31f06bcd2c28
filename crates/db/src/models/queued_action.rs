use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row per administrative command, consumed at most once by the current
/// host's dispatcher. A stuck `Pending` row stays pending until a host
/// instance picks it up; there is no automatic retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedAction {
    pub id: String,
    pub meeting_id: String,
    pub action: ActionType,
    #[serde(default)]
    pub target_participant_id: Option<String>,
    /// Normalized display name, the fallback identity key.
    #[serde(default)]
    pub target_name: Option<String>,
    #[serde(default)]
    pub stream: Option<StreamParams>,
    #[serde(default)]
    pub status: ActionStatus,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl QueuedAction {
    pub const TABLE: &'static str = "meeting_actions";

    /// Whether this row addresses the given viewer, by id or by normalized
    /// display name.
    pub fn targets(&self, participant_id: Option<&str>, normalized_name: &str) -> bool {
        if let (Some(target), Some(own)) = (self.target_participant_id.as_deref(), participant_id)
        {
            if target == own {
                return true;
            }
        }
        self.target_name.as_deref() == Some(normalized_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Kick,
    Mute,
    MuteEveryone,
    GrantModerator,
    RevokeModerator,
    RecordingStart,
    RecordingStop,
    StreamStart,
    StreamStop,
    EndMeeting,
    NotifyAdminGranted,
    NotifyAdminRevoked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Pending,
    Done,
    Error,
}

/// Payload for stream-start rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamParams {
    pub platform: Option<String>,
    pub stream_key: Option<String>,
    pub rtmp_url: Option<String>,
}
