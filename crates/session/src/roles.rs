use std::sync::Arc;

use huddle_db::{ActionType, Meeting, QueuedAction};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::events::SessionEvent;
use crate::ui::{ToastLevel, UiSink};
use crate::widget::{ConferenceWidget, WidgetCommand, WidgetEvent, WidgetRole};

/// Manual override layered on top of the other role signals. Once engaged
/// it wins over all of them until a navigation resets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoleOverride {
    #[default]
    Unset,
    ForcedTrue,
    ForcedFalse,
}

/// Structured text message re-broadcast to all endpoints when the local
/// participant's widget role changes. Best-effort convergence help; the
/// meeting row and the action queue stay authoritative.
#[derive(Debug, Serialize, Deserialize)]
pub struct RoleChangedMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub participant_id: String,
    pub role: String,
}

impl RoleChangedMessage {
    pub const KIND: &'static str = "role-changed";

    fn new(participant_id: &str, moderator: bool) -> Self {
        Self {
            kind: Self::KIND.to_string(),
            participant_id: participant_id.to_string(),
            role: if moderator { "moderator" } else { "participant" }.to_string(),
        }
    }
}

#[derive(Default)]
struct Inputs {
    widget_moderator: bool,
    admin_ids: Vec<String>,
    admin_names: Vec<String>,
    override_state: RoleOverride,
    local_participant_id: Option<String>,
    /// Last value surfaced to the viewer; `None` before the first compute.
    announced: Option<bool>,
}

/// Merges three signals into one boolean: "does this viewer currently hold
/// moderator capability". Idempotent under re-delivery of the same fact
/// from any source.
pub struct RoleReconciler {
    is_host: bool,
    normalized_name: String,
    inputs: RwLock<Inputs>,
    ui: Arc<dyn UiSink>,
    widget: Arc<dyn ConferenceWidget>,
    output_tx: watch::Sender<bool>,
}

impl RoleReconciler {
    pub fn new(
        is_host: bool,
        normalized_name: String,
        meeting: &Meeting,
        ui: Arc<dyn UiSink>,
        widget: Arc<dyn ConferenceWidget>,
    ) -> (Arc<Self>, watch::Receiver<bool>) {
        let (output_tx, output_rx) = watch::channel(false);
        let reconciler = Arc::new(Self {
            is_host,
            normalized_name,
            inputs: RwLock::new(Inputs {
                admin_ids: meeting.admin_ids.clone(),
                admin_names: meeting.admin_names.clone(),
                ..Inputs::default()
            }),
            ui,
            widget,
            output_tx,
        });
        reconciler.recompute();
        (reconciler, output_rx)
    }

    pub fn is_moderator(&self) -> bool {
        *self.output_tx.borrow()
    }

    /// Clears the override. Called on navigation, never mid-session.
    pub fn reset_override(&self) {
        self.inputs.write().override_state = RoleOverride::Unset;
        self.recompute();
    }

    pub async fn handle_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Widget(widget_event) => self.handle_widget_event(widget_event).await,
            SessionEvent::MeetingRow(meeting) => self.apply_meeting_row(meeting),
            SessionEvent::ActionRow(action) => self.apply_action_row(action),
            SessionEvent::PollTick => self.sync_from_widget(),
        }
    }

    async fn handle_widget_event(&self, event: &WidgetEvent) {
        match event {
            WidgetEvent::ConferenceJoined {
                local_participant_id,
            } => {
                self.inputs.write().local_participant_id = Some(local_participant_id.clone());
                self.sync_from_widget();
            }
            WidgetEvent::RoleChanged {
                participant_id,
                role,
            } => {
                let is_local = self
                    .inputs
                    .read()
                    .local_participant_id
                    .as_deref()
                    .is_some_and(|local| local == participant_id);
                if !is_local {
                    return;
                }
                let moderator = *role == WidgetRole::Moderator;
                {
                    let mut inputs = self.inputs.write();
                    inputs.widget_moderator = moderator;
                    inputs.override_state = if moderator {
                        RoleOverride::ForcedTrue
                    } else {
                        RoleOverride::ForcedFalse
                    };
                }
                self.recompute();
                self.rebroadcast(participant_id, moderator).await;
            }
            WidgetEvent::EndpointTextReceived { payload, .. } => {
                self.apply_endpoint_text(payload);
            }
            _ => {}
        }
    }

    /// Row-change signal: refresh the moderator id/name lists.
    fn apply_meeting_row(&self, meeting: &Meeting) {
        {
            let mut inputs = self.inputs.write();
            inputs.admin_ids = meeting.admin_ids.clone();
            inputs.admin_names = meeting.admin_names.clone();
        }
        self.recompute();
    }

    /// Queued notification rows addressed to this viewer engage the
    /// override, same as a direct widget event would.
    fn apply_action_row(&self, action: &QueuedAction) {
        let granted = match action.action {
            ActionType::NotifyAdminGranted | ActionType::GrantModerator => true,
            ActionType::NotifyAdminRevoked | ActionType::RevokeModerator => false,
            _ => return,
        };
        let local_id = self.inputs.read().local_participant_id.clone();
        if !action.targets(local_id.as_deref(), &self.normalized_name) {
            return;
        }
        self.apply_notification(granted);
    }

    pub fn apply_notification(&self, granted: bool) {
        self.inputs.write().override_state = if granted {
            RoleOverride::ForcedTrue
        } else {
            RoleOverride::ForcedFalse
        };
        self.recompute();
    }

    /// Safety poll: re-read the local role from the widget's participant
    /// list to catch missed events.
    fn sync_from_widget(&self) {
        let local_id = self.inputs.read().local_participant_id.clone();
        let Some(local_id) = local_id else { return };
        let widget_moderator = self
            .widget
            .participants()
            .iter()
            .find(|p| p.id == local_id)
            .map(|p| p.role == WidgetRole::Moderator);
        if let Some(widget_moderator) = widget_moderator {
            self.inputs.write().widget_moderator = widget_moderator;
        }
        self.recompute();
    }

    fn apply_endpoint_text(&self, payload: &str) {
        let Ok(message) = serde_json::from_str::<RoleChangedMessage>(payload) else {
            return;
        };
        if message.kind != RoleChangedMessage::KIND {
            return;
        }
        let is_local = self
            .inputs
            .read()
            .local_participant_id
            .as_deref()
            .is_some_and(|local| local == message.participant_id);
        if !is_local {
            return;
        }
        self.apply_notification(message.role == "moderator");
    }

    async fn rebroadcast(&self, participant_id: &str, moderator: bool) {
        let message = RoleChangedMessage::new(participant_id, moderator);
        let payload = match serde_json::to_string(&message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(%e, "failed to encode role-changed message");
                return;
            }
        };
        if let Err(e) = self
            .widget
            .execute(WidgetCommand::SendEndpointText {
                to: String::new(),
                payload,
            })
            .await
        {
            debug!(%e, "role-changed rebroadcast failed");
        }
    }

    /// Merge: an engaged override wins; otherwise any of the three
    /// underlying signals grants the capability.
    fn recompute(&self) {
        let (previous, value) = {
            let mut inputs = self.inputs.write();
            let value = match inputs.override_state {
                RoleOverride::ForcedTrue => true,
                RoleOverride::ForcedFalse => false,
                RoleOverride::Unset => {
                    inputs.widget_moderator
                        || self.is_host
                        || inputs
                            .local_participant_id
                            .as_deref()
                            .is_some_and(|id| inputs.admin_ids.iter().any(|a| a == id))
                        || inputs.admin_names.iter().any(|n| n == &self.normalized_name)
                }
            };
            let previous = inputs.announced;
            inputs.announced = Some(value);
            (previous, value)
        };

        if previous == Some(value) {
            return;
        }
        let _ = self.output_tx.send(value);

        match previous {
            // First compute. The host's own bootstrap into moderator status
            // stays quiet; anyone else landing as moderator hears about it.
            None => {
                if value && !self.is_host {
                    self.ui
                        .toast(ToastLevel::Success, "You are a moderator in this meeting");
                }
            }
            Some(_) => {
                if value {
                    self.ui
                        .toast(ToastLevel::Success, "You are now a moderator");
                } else {
                    self.ui
                        .toast(ToastLevel::Info, "Your moderator rights were removed");
                }
            }
        }
    }
}
