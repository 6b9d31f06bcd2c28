use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use huddle_db::{ActionStatus, ActionType, QueuedAction};
use huddle_services::names::normalize_display_name;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::backend::MeetingBackend;
use crate::events::SessionEvent;
use crate::roles::RoleReconciler;
use crate::ui::{Route, ToastLevel, UiSink};
use crate::widget::{ConferenceWidget, RecordingTarget, WidgetCommand};

/// Host-side consumer of the queued-action table. Exactly one instance per
/// meeting is supposed to run (the recognized host's tab); each row is
/// transitioned pending → done/error at most once and never retried.
pub struct ActionDispatcher {
    backend: Arc<dyn MeetingBackend>,
    widget: Arc<dyn ConferenceWidget>,
    meeting_id: String,
    /// Normalized names keyed by participant id, recorded at grant time.
    /// A revoke for a participant who already left still has to clear
    /// their `admin_names` entry.
    granted_names: Mutex<HashMap<String, String>>,
}

impl ActionDispatcher {
    pub fn new(
        backend: Arc<dyn MeetingBackend>,
        widget: Arc<dyn ConferenceWidget>,
        meeting_id: String,
    ) -> Self {
        Self {
            backend,
            widget,
            meeting_id,
            granted_names: Mutex::new(HashMap::new()),
        }
    }

    /// Drains rows that queued up before this host connected, then follows
    /// the insert feed until it closes.
    pub async fn run(&self, mut actions: broadcast::Receiver<QueuedAction>) {
        match self.backend.pending_actions(&self.meeting_id).await {
            Ok(pending) => {
                for action in pending {
                    self.process(&action).await;
                }
            }
            Err(e) => warn!(meeting_id = %self.meeting_id, %e, "initial action drain failed"),
        }

        loop {
            match actions.recv().await {
                Ok(action) => self.process(&action).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Missed inserts stay pending; the next host pickup or
                    // initial drain recovers them.
                    warn!(meeting_id = %self.meeting_id, skipped, "action feed lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// One row: dispatch the widget command, then record the outcome. A
    /// failing command marks this row `error` and does not halt the queue.
    pub async fn process(&self, action: &QueuedAction) {
        if action.status != ActionStatus::Pending {
            return;
        }
        let processed_by = self.widget.local_participant_id().unwrap_or_default();

        match self.dispatch(action).await {
            Ok(()) => {
                info!(action_id = %action.id, action = ?action.action, "action done");
                if let Err(e) = self.backend.complete_action(&action.id, &processed_by).await {
                    warn!(action_id = %action.id, %e, "failed to mark action done");
                }
            }
            Err(e) => {
                let message = e.to_string();
                let message = if message.is_empty() {
                    "action failed".to_string()
                } else {
                    message
                };
                warn!(action_id = %action.id, %message, "action failed");
                if let Err(e) = self
                    .backend
                    .fail_action(&action.id, &processed_by, &message)
                    .await
                {
                    warn!(action_id = %action.id, %e, "failed to mark action errored");
                }
            }
        }
    }

    async fn dispatch(&self, action: &QueuedAction) -> anyhow::Result<()> {
        match action.action {
            ActionType::Kick => {
                // A target that already left is a harmless no-op.
                if let Some(id) = self.resolve_target(action) {
                    self.widget
                        .execute(WidgetCommand::KickParticipant { participant_id: id })
                        .await?;
                } else {
                    debug!(action_id = %action.id, "kick target not present, skipping");
                }
            }
            ActionType::Mute => {
                if let Some(id) = self.resolve_target(action) {
                    self.widget
                        .execute(WidgetCommand::MuteParticipant { participant_id: id })
                        .await?;
                } else {
                    debug!(action_id = %action.id, "mute target not present, skipping");
                }
            }
            ActionType::MuteEveryone => {
                self.widget.execute(WidgetCommand::MuteEveryone).await?;
            }
            ActionType::GrantModerator => {
                if let Some(id) = self.resolve_target(action) {
                    self.widget
                        .execute(WidgetCommand::GrantModerator { participant_id: id })
                        .await?;
                }
                self.mirror_admin(action, true).await?;
            }
            ActionType::RevokeModerator => {
                if let Some(id) = self.resolve_target(action) {
                    self.widget
                        .execute(WidgetCommand::RevokeModerator { participant_id: id })
                        .await?;
                }
                self.mirror_admin(action, false).await?;
            }
            ActionType::RecordingStart => {
                self.widget
                    .execute(WidgetCommand::StartRecording {
                        target: RecordingTarget::File,
                    })
                    .await?;
            }
            ActionType::RecordingStop => {
                self.widget
                    .execute(WidgetCommand::StopRecording {
                        target: RecordingTarget::File,
                    })
                    .await?;
            }
            ActionType::StreamStart => {
                let stream = action.stream.clone().unwrap_or(huddle_db::StreamParams {
                    platform: None,
                    stream_key: None,
                    rtmp_url: None,
                });
                self.widget
                    .execute(WidgetCommand::StartRecording {
                        target: RecordingTarget::Stream {
                            rtmp_url: stream.rtmp_url,
                            stream_key: stream.stream_key,
                        },
                    })
                    .await?;
            }
            ActionType::StreamStop => {
                self.widget
                    .execute(WidgetCommand::StopRecording {
                        target: RecordingTarget::Stream {
                            rtmp_url: None,
                            stream_key: None,
                        },
                    })
                    .await?;
            }
            ActionType::EndMeeting => {
                self.end_meeting().await?;
            }
            // Notification rows exist for their targets; the host only
            // acknowledges them.
            ActionType::NotifyAdminGranted | ActionType::NotifyAdminRevoked => {}
        }
        Ok(())
    }

    /// Target participant id, falling back to a normalized-name lookup in
    /// the widget's live participant list.
    fn resolve_target(&self, action: &QueuedAction) -> Option<String> {
        if let Some(id) = &action.target_participant_id {
            return Some(id.clone());
        }
        let target_name = action.target_name.as_deref()?;
        self.widget
            .participants()
            .into_iter()
            .find(|p| normalize_display_name(&p.display_name) == target_name)
            .map(|p| p.id)
    }

    /// Mirrors a grant/revoke into the meeting row's moderator lists with
    /// set semantics, so tabs relying on the row signal converge without a
    /// direct event.
    async fn mirror_admin(&self, action: &QueuedAction, grant: bool) -> anyhow::Result<()> {
        let meeting = self
            .backend
            .fetch_meeting(&self.meeting_id)
            .await?
            .context("meeting row vanished")?;

        let mut admin_ids = meeting.admin_ids;
        let mut admin_names = meeting.admin_names;

        let target_id = self.resolve_target(action);
        let target_name = action
            .target_name
            .clone()
            .or_else(|| {
                let id = target_id.as_deref()?;
                self.widget
                    .participants()
                    .iter()
                    .find(|p| p.id == id)
                    .map(|p| normalize_display_name(&p.display_name))
            })
            .or_else(|| {
                // Target already left; use the name recorded at grant time.
                let id = target_id.as_deref()?;
                self.granted_names.lock().get(id).cloned()
            });

        if grant {
            if let Some(id) = &target_id {
                if !admin_ids.iter().any(|a| a == id) {
                    admin_ids.push(id.clone());
                }
                if let Some(name) = &target_name {
                    self.granted_names
                        .lock()
                        .insert(id.clone(), name.clone());
                }
            }
            if let Some(name) = &target_name {
                if !admin_names.iter().any(|n| n == name) {
                    admin_names.push(name.clone());
                }
            }
        } else {
            if let Some(id) = &target_id {
                admin_ids.retain(|a| a != id);
                self.granted_names.lock().remove(id);
            }
            if let Some(name) = &target_name {
                admin_names.retain(|n| n != name);
            }
        }

        self.backend
            .update_admin_lists(&self.meeting_id, admin_ids, admin_names)
            .await?;
        Ok(())
    }

    /// Termination must be observed by all: kick every other known
    /// participant first, close out the row, then hang up ourselves.
    async fn end_meeting(&self) -> anyhow::Result<()> {
        let local_id = self.widget.local_participant_id();
        for participant in self.widget.participants() {
            if Some(&participant.id) == local_id.as_ref() {
                continue;
            }
            if let Err(e) = self
                .widget
                .execute(WidgetCommand::KickParticipant {
                    participant_id: participant.id.clone(),
                })
                .await
            {
                // Keep going; a participant that raced out is fine.
                debug!(participant_id = %participant.id, %e, "kick during end-meeting failed");
            }
        }

        if let Err(e) = self.backend.complete_meeting(&self.meeting_id).await {
            warn!(meeting_id = %self.meeting_id, %e, "failed to mark meeting completed");
        }

        self.widget.execute(WidgetCommand::Hangup).await?;
        Ok(())
    }
}

/// Read-only watcher non-host viewers run over the same action feed the
/// dispatcher consumes: role notifications addressed to this viewer go to
/// the reconciler, and an end-meeting row tears the tab down immediately
/// regardless of host ordering. The host's tab runs the dispatcher instead.
pub struct ParticipantWatcher {
    widget: Arc<dyn ConferenceWidget>,
    ui: Arc<dyn UiSink>,
    reconciler: Arc<RoleReconciler>,
}

impl ParticipantWatcher {
    pub fn new(
        widget: Arc<dyn ConferenceWidget>,
        ui: Arc<dyn UiSink>,
        reconciler: Arc<RoleReconciler>,
    ) -> Self {
        Self {
            widget,
            ui,
            reconciler,
        }
    }

    pub async fn run(&self, mut actions: broadcast::Receiver<QueuedAction>) {
        loop {
            match actions.recv().await {
                Ok(action) => self.handle(&action).await,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    pub async fn handle(&self, action: &QueuedAction) {
        if action.action == ActionType::EndMeeting {
            self.ui
                .toast(ToastLevel::Info, "The meeting has been ended by the host");
            if let Err(e) = self.widget.execute(WidgetCommand::Hangup).await {
                debug!(%e, "hangup after end-meeting failed");
            }
            self.ui.navigate(Route::Home);
            return;
        }

        // Grant/revoke rows addressed to this viewer feed the override;
        // the reconciler owns the resulting toast.
        self.reconciler
            .handle_event(&SessionEvent::ActionRow(action.clone()))
            .await;
    }
}
