use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use huddle_db::{ActionStatus, Meeting, QueuedAction};
use huddle_services::error::{BackendError, BackendResult};
use huddle_services::realtime::RealtimeHub;
use huddle_services::supabase::SupabaseClient;
use parking_lot::RwLock;
use tokio::sync::broadcast;

/// Row-store seam for the session core: meeting fetch/update, the queued
/// action table, and realtime row-change subscriptions.
#[async_trait]
pub trait MeetingBackend: Send + Sync {
    async fn fetch_meeting(&self, meeting_id: &str) -> BackendResult<Option<Meeting>>;

    /// Inserts a freshly built meeting row and returns it as stored.
    async fn create_meeting(&self, meeting: Meeting) -> BackendResult<Meeting>;

    /// Replaces both moderator lists. This is a read-modify-write without a
    /// server-side atomic union; two near-simultaneous grants from different
    /// dispatchers can race and one can lose. Accepted limitation — callers
    /// recompute from a fresh row per action to bound the window.
    async fn update_admin_lists(
        &self,
        meeting_id: &str,
        admin_ids: Vec<String>,
        admin_names: Vec<String>,
    ) -> BackendResult<()>;

    async fn set_host_participant(
        &self,
        meeting_id: &str,
        participant_id: Option<&str>,
    ) -> BackendResult<()>;

    async fn set_whiteboard_open(&self, meeting_id: &str, open: bool) -> BackendResult<()>;

    /// Sets `completed_at`, once. A second call is a no-op.
    async fn complete_meeting(&self, meeting_id: &str) -> BackendResult<()>;

    async fn pending_actions(&self, meeting_id: &str) -> BackendResult<Vec<QueuedAction>>;

    async fn complete_action(&self, action_id: &str, processed_by: &str) -> BackendResult<()>;

    async fn fail_action(
        &self,
        action_id: &str,
        processed_by: &str,
        error: &str,
    ) -> BackendResult<()>;

    fn subscribe_meeting(&self, meeting_id: &str) -> broadcast::Receiver<Meeting>;

    fn subscribe_actions(&self, meeting_id: &str) -> broadcast::Receiver<QueuedAction>;
}

/// Production implementation: rows over the hosted PostgREST surface,
/// subscriptions over the polling realtime hub.
pub struct SupabaseMeetingBackend {
    client: Arc<SupabaseClient>,
    hub: Arc<RealtimeHub>,
}

impl SupabaseMeetingBackend {
    pub fn new(client: Arc<SupabaseClient>, hub: Arc<RealtimeHub>) -> Self {
        Self { client, hub }
    }

    fn meetings_table(&self) -> &str {
        &self.client.settings.meetings_table
    }

    fn actions_table(&self) -> &str {
        &self.client.settings.actions_table
    }

    async fn patch_meeting(
        &self,
        meeting_id: &str,
        mut patch: serde_json::Value,
    ) -> BackendResult<()> {
        if let Some(obj) = patch.as_object_mut() {
            obj.insert("updated_at".into(), serde_json::json!(Utc::now()));
        }
        self.client
            .update(
                self.meetings_table(),
                &[("id", format!("eq.{meeting_id}"))],
                &patch,
            )
            .await
    }
}

#[async_trait]
impl MeetingBackend for SupabaseMeetingBackend {
    async fn fetch_meeting(&self, meeting_id: &str) -> BackendResult<Option<Meeting>> {
        self.client
            .select_one::<Meeting>(self.meetings_table(), &[("id", format!("eq.{meeting_id}"))])
            .await
    }

    async fn create_meeting(&self, meeting: Meeting) -> BackendResult<Meeting> {
        self.client.insert(self.meetings_table(), &meeting).await
    }

    async fn update_admin_lists(
        &self,
        meeting_id: &str,
        admin_ids: Vec<String>,
        admin_names: Vec<String>,
    ) -> BackendResult<()> {
        self.patch_meeting(
            meeting_id,
            serde_json::json!({ "admin_ids": admin_ids, "admin_names": admin_names }),
        )
        .await
    }

    async fn set_host_participant(
        &self,
        meeting_id: &str,
        participant_id: Option<&str>,
    ) -> BackendResult<()> {
        self.patch_meeting(
            meeting_id,
            serde_json::json!({ "host_participant_id": participant_id }),
        )
        .await
    }

    async fn set_whiteboard_open(&self, meeting_id: &str, open: bool) -> BackendResult<()> {
        self.patch_meeting(meeting_id, serde_json::json!({ "whiteboard_open": open }))
            .await
    }

    async fn complete_meeting(&self, meeting_id: &str) -> BackendResult<()> {
        // The is.null filter makes the write first-wins.
        self.client
            .update(
                self.meetings_table(),
                &[
                    ("id", format!("eq.{meeting_id}")),
                    ("completed_at", "is.null".to_string()),
                ],
                &serde_json::json!({
                    "completed_at": Utc::now(),
                    "updated_at": Utc::now(),
                }),
            )
            .await
    }

    async fn pending_actions(&self, meeting_id: &str) -> BackendResult<Vec<QueuedAction>> {
        self.client
            .select::<QueuedAction>(
                self.actions_table(),
                &[
                    ("meeting_id", format!("eq.{meeting_id}")),
                    ("status", "eq.pending".to_string()),
                ],
            )
            .await
    }

    async fn complete_action(&self, action_id: &str, processed_by: &str) -> BackendResult<()> {
        self.client
            .update(
                self.actions_table(),
                &[("id", format!("eq.{action_id}"))],
                &serde_json::json!({
                    "status": "done",
                    "processed_at": Utc::now(),
                    "processed_by": processed_by,
                }),
            )
            .await
    }

    async fn fail_action(
        &self,
        action_id: &str,
        processed_by: &str,
        error: &str,
    ) -> BackendResult<()> {
        self.client
            .update(
                self.actions_table(),
                &[("id", format!("eq.{action_id}"))],
                &serde_json::json!({
                    "status": "error",
                    "error": error,
                    "processed_at": Utc::now(),
                    "processed_by": processed_by,
                }),
            )
            .await
    }

    fn subscribe_meeting(&self, meeting_id: &str) -> broadcast::Receiver<Meeting> {
        self.hub.subscribe(meeting_id).0
    }

    fn subscribe_actions(&self, meeting_id: &str) -> broadcast::Receiver<QueuedAction> {
        self.hub.subscribe(meeting_id).1
    }
}

const CHANNEL_CAPACITY: usize = 64;

struct MemoryChannels {
    meeting_tx: broadcast::Sender<Meeting>,
    action_tx: broadcast::Sender<QueuedAction>,
}

/// In-memory backend: the row store for unit tests and local development.
/// Mutations fan out on the same broadcast channels the hosted feed would
/// use, so the rest of the core cannot tell the difference.
#[derive(Default)]
pub struct MemoryBackend {
    meetings: RwLock<HashMap<String, Meeting>>,
    actions: RwLock<Vec<QueuedAction>>,
    channels: DashMap<String, MemoryChannels>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_meeting(&self, meeting: Meeting) {
        self.meetings
            .write()
            .insert(meeting.id.clone(), meeting);
    }

    pub fn meeting(&self, meeting_id: &str) -> Option<Meeting> {
        self.meetings.read().get(meeting_id).cloned()
    }

    pub fn action(&self, action_id: &str) -> Option<QueuedAction> {
        self.actions
            .read()
            .iter()
            .find(|a| a.id == action_id)
            .cloned()
    }

    /// Inserts a pending action row and announces it on the action feed,
    /// like an out-of-scope admin UI would.
    pub fn push_action(&self, action: QueuedAction) {
        let meeting_id = action.meeting_id.clone();
        self.actions.write().push(action.clone());
        let _ = self.channels_for(&meeting_id).action_tx.send(action);
    }

    fn channels_for(&self, meeting_id: &str) -> dashmap::mapref::one::Ref<'_, String, MemoryChannels> {
        if let Some(existing) = self.channels.get(meeting_id) {
            return existing;
        }
        let (meeting_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (action_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        self.channels
            .entry(meeting_id.to_string())
            .or_insert(MemoryChannels {
                meeting_tx,
                action_tx,
            })
            .downgrade()
    }

    fn announce_meeting(&self, meeting_id: &str) {
        if let Some(meeting) = self.meeting(meeting_id) {
            let _ = self.channels_for(meeting_id).meeting_tx.send(meeting);
        }
    }

    fn mutate_meeting(
        &self,
        meeting_id: &str,
        f: impl FnOnce(&mut Meeting),
    ) -> BackendResult<()> {
        {
            let mut meetings = self.meetings.write();
            let meeting = meetings.get_mut(meeting_id).ok_or(BackendError::NotFound)?;
            f(meeting);
            meeting.updated_at = Utc::now();
        }
        self.announce_meeting(meeting_id);
        Ok(())
    }

    fn mutate_action(
        &self,
        action_id: &str,
        f: impl FnOnce(&mut QueuedAction),
    ) -> BackendResult<()> {
        let mut actions = self.actions.write();
        let action = actions
            .iter_mut()
            .find(|a| a.id == action_id)
            .ok_or(BackendError::NotFound)?;
        f(action);
        Ok(())
    }
}

#[async_trait]
impl MeetingBackend for MemoryBackend {
    async fn fetch_meeting(&self, meeting_id: &str) -> BackendResult<Option<Meeting>> {
        Ok(self.meeting(meeting_id))
    }

    async fn create_meeting(&self, meeting: Meeting) -> BackendResult<Meeting> {
        self.insert_meeting(meeting.clone());
        Ok(meeting)
    }

    async fn update_admin_lists(
        &self,
        meeting_id: &str,
        admin_ids: Vec<String>,
        admin_names: Vec<String>,
    ) -> BackendResult<()> {
        self.mutate_meeting(meeting_id, |m| {
            m.admin_ids = admin_ids;
            m.admin_names = admin_names;
        })
    }

    async fn set_host_participant(
        &self,
        meeting_id: &str,
        participant_id: Option<&str>,
    ) -> BackendResult<()> {
        let participant_id = participant_id.map(str::to_string);
        self.mutate_meeting(meeting_id, |m| m.host_participant_id = participant_id)
    }

    async fn set_whiteboard_open(&self, meeting_id: &str, open: bool) -> BackendResult<()> {
        self.mutate_meeting(meeting_id, |m| m.whiteboard_open = open)
    }

    async fn complete_meeting(&self, meeting_id: &str) -> BackendResult<()> {
        self.mutate_meeting(meeting_id, |m| {
            if m.completed_at.is_none() {
                m.completed_at = Some(Utc::now());
            }
        })
    }

    async fn pending_actions(&self, meeting_id: &str) -> BackendResult<Vec<QueuedAction>> {
        Ok(self
            .actions
            .read()
            .iter()
            .filter(|a| a.meeting_id == meeting_id && a.status == ActionStatus::Pending)
            .cloned()
            .collect())
    }

    async fn complete_action(&self, action_id: &str, processed_by: &str) -> BackendResult<()> {
        self.mutate_action(action_id, |a| {
            a.status = ActionStatus::Done;
            a.processed_at = Some(Utc::now());
            a.processed_by = Some(processed_by.to_string());
        })
    }

    async fn fail_action(
        &self,
        action_id: &str,
        processed_by: &str,
        error: &str,
    ) -> BackendResult<()> {
        self.mutate_action(action_id, |a| {
            a.status = ActionStatus::Error;
            a.error = Some(error.to_string());
            a.processed_at = Some(Utc::now());
            a.processed_by = Some(processed_by.to_string());
        })
    }

    fn subscribe_meeting(&self, meeting_id: &str) -> broadcast::Receiver<Meeting> {
        self.channels_for(meeting_id).meeting_tx.subscribe()
    }

    fn subscribe_actions(&self, meeting_id: &str) -> broadcast::Receiver<QueuedAction> {
        self.channels_for(meeting_id).action_tx.subscribe()
    }
}
