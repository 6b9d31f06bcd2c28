//! In-process fakes for the collaborator seams. Used by this crate's tests
//! and available to downstream test code; nothing here talks to a network.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use huddle_db::{ActionStatus, ActionType, Meeting, QueuedAction};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;

use crate::identity::{Identity, IdentityProvider};
use crate::credentials::CredentialIssuer;
use crate::ui::{Route, ToastLevel, UiSink};
use crate::widget::{
    ConferenceWidget, WidgetCommand, WidgetConfig, WidgetError, WidgetEvent, WidgetFactory,
    WidgetParticipant, WidgetRole,
};

/// Scripted widget: records every executed command, lets tests inject
/// events and mutate the participant list.
pub struct FakeWidget {
    commands: Mutex<Vec<WidgetCommand>>,
    events_tx: broadcast::Sender<WidgetEvent>,
    participants: RwLock<Vec<WidgetParticipant>>,
    local_id: RwLock<Option<String>>,
    /// When set, any command whose debug form contains this substring
    /// fails with a simulated widget error.
    fail_matching: Mutex<Option<String>>,
}

impl FakeWidget {
    pub fn new() -> Arc<Self> {
        let (events_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            commands: Mutex::new(Vec::new()),
            events_tx,
            participants: RwLock::new(Vec::new()),
            local_id: RwLock::new(None),
            fail_matching: Mutex::new(None),
        })
    }

    pub fn emit(&self, event: WidgetEvent) {
        let _ = self.events_tx.send(event);
    }

    pub fn join_local(&self, participant_id: &str, display_name: &str, role: WidgetRole) {
        *self.local_id.write() = Some(participant_id.to_string());
        self.participants.write().push(WidgetParticipant {
            id: participant_id.to_string(),
            display_name: display_name.to_string(),
            role,
        });
    }

    pub fn add_participant(&self, participant_id: &str, display_name: &str, role: WidgetRole) {
        self.participants.write().push(WidgetParticipant {
            id: participant_id.to_string(),
            display_name: display_name.to_string(),
            role,
        });
    }

    pub fn remove_participant(&self, participant_id: &str) {
        self.participants.write().retain(|p| p.id != participant_id);
    }

    pub fn set_role(&self, participant_id: &str, role: WidgetRole) {
        let mut participants = self.participants.write();
        if let Some(p) = participants.iter_mut().find(|p| p.id == participant_id) {
            p.role = role;
        }
    }

    pub fn fail_commands_containing(&self, needle: &str) {
        *self.fail_matching.lock() = Some(needle.to_string());
    }

    pub fn clear_failures(&self) {
        *self.fail_matching.lock() = None;
    }

    pub fn executed(&self) -> Vec<WidgetCommand> {
        self.commands.lock().clone()
    }

    pub fn executed_count(&self, predicate: impl Fn(&WidgetCommand) -> bool) -> usize {
        self.commands.lock().iter().filter(|c| predicate(c)).count()
    }
}

#[async_trait]
impl ConferenceWidget for FakeWidget {
    async fn execute(&self, command: WidgetCommand) -> Result<(), WidgetError> {
        let fails = self
            .fail_matching
            .lock()
            .as_ref()
            .is_some_and(|needle| format!("{command:?}").contains(needle.as_str()));
        self.commands.lock().push(command);
        if fails {
            return Err(WidgetError::Command("simulated widget failure".into()));
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.events_tx.subscribe()
    }

    fn participants(&self) -> Vec<WidgetParticipant> {
        self.participants.read().clone()
    }

    fn local_participant_id(&self) -> Option<String> {
        self.local_id.read().clone()
    }
}

/// Factory handing out one shared fake widget.
pub struct FakeWidgetFactory {
    pub widget: Arc<FakeWidget>,
    pub created: AtomicBool,
}

impl FakeWidgetFactory {
    pub fn new(widget: Arc<FakeWidget>) -> Arc<Self> {
        Arc::new(Self {
            widget,
            created: AtomicBool::new(false),
        })
    }
}

impl WidgetFactory for FakeWidgetFactory {
    fn create(&self, _config: WidgetConfig) -> Arc<dyn ConferenceWidget> {
        self.created.store(true, Ordering::SeqCst);
        self.widget.clone()
    }
}

/// Records toasts and navigations instead of showing them.
#[derive(Default)]
pub struct RecordingUi {
    toasts: Mutex<Vec<(ToastLevel, String)>>,
    routes: Mutex<Vec<Route>>,
    loading: AtomicBool,
}

impl RecordingUi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn toasts(&self) -> Vec<(ToastLevel, String)> {
        self.toasts.lock().clone()
    }

    pub fn toast_count(&self, level: ToastLevel, needle: &str) -> usize {
        self.toasts
            .lock()
            .iter()
            .filter(|(l, m)| *l == level && m.contains(needle))
            .count()
    }

    pub fn last_route(&self) -> Option<Route> {
        self.routes.lock().last().cloned()
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }
}

impl UiSink for RecordingUi {
    fn toast(&self, level: ToastLevel, message: &str) {
        self.toasts.lock().push((level, message.to_string()));
    }

    fn navigate(&self, route: Route) {
        self.routes.lock().push(route);
    }

    fn set_loading(&self, loading: bool) {
        self.loading.store(loading, Ordering::SeqCst);
    }
}

/// Identity provider returning a fixed answer.
pub struct StaticIdentity {
    identity: RwLock<Option<Identity>>,
}

impl StaticIdentity {
    pub fn anonymous() -> Arc<Self> {
        Arc::new(Self {
            identity: RwLock::new(None),
        })
    }

    pub fn signed_in(user_id: &str, display_name: &str) -> Arc<Self> {
        Arc::new(Self {
            identity: RwLock::new(Some(Identity {
                user_id: user_id.to_string(),
                display_name: Some(display_name.to_string()),
            })),
        })
    }

    pub fn set(&self, identity: Option<Identity>) {
        *self.identity.write() = identity;
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current(&self) -> Option<Identity> {
        self.identity.read().clone()
    }
}

/// Credential issuer with scripted behavior.
pub enum IssuerBehavior {
    Token(String),
    Fail,
    /// Never answers; exercises the caller's timeout.
    Hang,
}

pub struct FakeIssuer {
    pub behavior: IssuerBehavior,
}

impl FakeIssuer {
    pub fn token(token: &str) -> Arc<Self> {
        Arc::new(Self {
            behavior: IssuerBehavior::Token(token.to_string()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            behavior: IssuerBehavior::Fail,
        })
    }

    pub fn hanging() -> Arc<Self> {
        Arc::new(Self {
            behavior: IssuerBehavior::Hang,
        })
    }
}

#[async_trait]
impl CredentialIssuer for FakeIssuer {
    async fn issue(&self, _meeting_id: &str, _display_name: &str) -> anyhow::Result<String> {
        match &self.behavior {
            IssuerBehavior::Token(token) => Ok(token.clone()),
            IssuerBehavior::Fail => anyhow::bail!("issuer unavailable"),
            IssuerBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                anyhow::bail!("unreachable")
            }
        }
    }
}

/// Minimal meeting row for tests.
pub fn test_meeting(id: &str) -> Meeting {
    let now = Utc::now();
    Meeting {
        id: id.to_string(),
        name: "Test meeting".to_string(),
        purpose: None,
        scheduled: false,
        scheduled_at: None,
        completed_at: None,
        created_by: "creator".to_string(),
        host_token: "T1".to_string(),
        admin_ids: Vec::new(),
        admin_names: Vec::new(),
        banned_names: Vec::new(),
        whiteboard_open: false,
        host_participant_id: None,
        start_with_audio_muted: false,
        start_with_video_muted: false,
        lobby_enabled: false,
        webinar: false,
        created_at: now,
        updated_at: now,
    }
}

/// Pending action row for tests.
pub fn test_action(id: &str, meeting_id: &str, action: ActionType) -> QueuedAction {
    QueuedAction {
        id: id.to_string(),
        meeting_id: meeting_id.to_string(),
        action,
        target_participant_id: None,
        target_name: None,
        stream: None,
        status: ActionStatus::Pending,
        error: None,
        processed_at: None,
        processed_by: None,
        created_at: Utc::now(),
    }
}
