use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use huddle_config::SessionSettings;
use huddle_db::{Meeting, QueuedAction};
use huddle_services::error::BackendResult;
use huddle_services::tokens::{generate_host_token, generate_meeting_id};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::backend::MeetingBackend;
use crate::credentials::CredentialIssuer;
use crate::dispatcher::{ActionDispatcher, ParticipantWatcher};
use crate::events::SessionEvent;
use crate::identity::IdentityProvider;
use crate::resolver::{SessionDescriptor, SessionResolver};
use crate::roles::RoleReconciler;
use crate::store::SessionStore;
use crate::ui::{Route, ToastLevel, UiSink};
use crate::widget::{ConferenceWidget, WidgetConfig, WidgetEvent, WidgetFactory, WidgetPool};

/// Bounded waits of the session core, converted once from settings.
#[derive(Debug, Clone, Copy)]
pub struct SessionTimings {
    pub settle_delay: Duration,
    pub credential_timeout: Duration,
    pub role_poll_interval: Duration,
    pub widget_ready_timeout: Duration,
    pub widget_pool_grace: Duration,
}

impl SessionTimings {
    pub fn from_settings(settings: &SessionSettings, credential_timeout_ms: u64) -> Self {
        Self {
            settle_delay: Duration::from_millis(settings.settle_delay_ms),
            credential_timeout: Duration::from_millis(credential_timeout_ms),
            role_poll_interval: Duration::from_millis(settings.role_poll_interval_ms),
            widget_ready_timeout: Duration::from_millis(settings.widget_ready_timeout_ms),
            widget_pool_grace: Duration::from_millis(settings.widget_pool_grace_ms),
        }
    }
}

/// Caller-supplied parts of a new meeting; the id, the host secret and the
/// timestamps are generated.
#[derive(Debug, Clone, Default)]
pub struct NewMeeting {
    pub name: String,
    pub purpose: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub start_with_audio_muted: bool,
    pub start_with_video_muted: bool,
    pub lobby_enabled: bool,
    pub webinar: bool,
}

/// One tab's meeting-session wiring: resolver, reconciler, dispatcher and
/// watcher over shared collaborator seams.
pub struct SessionRuntime {
    backend: Arc<dyn MeetingBackend>,
    store: Arc<SessionStore>,
    identity: Arc<dyn IdentityProvider>,
    issuer: Option<Arc<dyn CredentialIssuer>>,
    ui: Arc<dyn UiSink>,
    factory: Arc<dyn WidgetFactory>,
    pool: Arc<WidgetPool>,
    timings: SessionTimings,
}

/// A running session. Dropping it leaks the spawned tasks; call `stop`.
pub struct MeetingSession {
    pub descriptor: SessionDescriptor,
    widget: Arc<dyn ConferenceWidget>,
    reconciler: Arc<RoleReconciler>,
    role_rx: watch::Receiver<bool>,
    tasks: Vec<JoinHandle<()>>,
    pool: Arc<WidgetPool>,
}

impl MeetingSession {
    pub fn is_moderator(&self) -> bool {
        self.reconciler.is_moderator()
    }

    pub fn role_updates(&self) -> watch::Receiver<bool> {
        self.role_rx.clone()
    }

    pub fn widget(&self) -> Arc<dyn ConferenceWidget> {
        self.widget.clone()
    }

    /// Navigation away: cancel the background tasks, clear the role
    /// override, and park the widget for a possible quick return.
    pub fn stop(self) {
        for task in &self.tasks {
            task.abort();
        }
        self.reconciler.reset_override();
        self.pool
            .release(&self.descriptor.meeting_id, self.widget);
    }
}

impl SessionRuntime {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        backend: Arc<dyn MeetingBackend>,
        store: Arc<SessionStore>,
        identity: Arc<dyn IdentityProvider>,
        issuer: Option<Arc<dyn CredentialIssuer>>,
        ui: Arc<dyn UiSink>,
        factory: Arc<dyn WidgetFactory>,
        timings: SessionTimings,
    ) -> Self {
        Self {
            backend,
            store,
            identity,
            issuer,
            ui,
            factory,
            pool: Arc::new(WidgetPool::new(timings.widget_pool_grace)),
            timings,
        }
    }

    /// Creates an instant or scheduled meeting row and keeps the host secret
    /// in the local session store, so a later `start` on this tab resolves
    /// the creator as the host.
    pub async fn create_meeting(&self, params: NewMeeting) -> BackendResult<Meeting> {
        let created_by = self
            .identity
            .current()
            .await
            .map(|i| i.user_id)
            .unwrap_or_else(|| "guest".to_string());

        let now = Utc::now();
        let meeting = Meeting {
            id: generate_meeting_id(),
            name: params.name,
            purpose: params.purpose,
            scheduled: params.scheduled_at.is_some(),
            scheduled_at: params.scheduled_at,
            completed_at: None,
            created_by,
            host_token: generate_host_token(),
            admin_ids: Vec::new(),
            admin_names: Vec::new(),
            banned_names: Vec::new(),
            whiteboard_open: false,
            host_participant_id: None,
            start_with_audio_muted: params.start_with_audio_muted,
            start_with_video_muted: params.start_with_video_muted,
            lobby_enabled: params.lobby_enabled,
            webinar: params.webinar,
            created_at: now,
            updated_at: now,
        };
        let meeting = self.backend.create_meeting(meeting).await?;
        self.store.set_host_token(&meeting.id, &meeting.host_token);
        Ok(meeting)
    }

    /// Resolves the meeting and, when the viewer may enter, wires up the
    /// live session. `None` means a redirect already happened.
    pub async fn start(&self, meeting_id: &str, path: &str) -> Option<MeetingSession> {
        let resolver = SessionResolver::new(
            self.backend.clone(),
            self.store.clone(),
            self.identity.clone(),
            self.issuer.clone(),
            self.ui.clone(),
            self.timings.settle_delay,
            self.timings.credential_timeout,
        );
        let descriptor = resolver.resolve(meeting_id, path).await?;

        self.ui.set_loading(true);
        let loading = Arc::new(AtomicBool::new(true));

        let widget = self
            .pool
            .acquire(meeting_id)
            .unwrap_or_else(|| self.factory.create(widget_config(&descriptor)));

        let (reconciler, role_rx) = RoleReconciler::new(
            descriptor.is_host,
            descriptor.normalized_name.clone(),
            &descriptor.meeting,
            self.ui.clone(),
            widget.clone(),
        );
        let watcher = Arc::new(ParticipantWatcher::new(
            widget.clone(),
            self.ui.clone(),
            reconciler.clone(),
        ));

        let mut tasks = Vec::new();

        // Fallback timer: never leave the viewer on a frozen loading
        // screen if the iframe cannot be confirmed ready.
        {
            let ui = self.ui.clone();
            let loading = loading.clone();
            let timeout = self.timings.widget_ready_timeout;
            tasks.push(tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if loading.swap(false, Ordering::SeqCst) {
                    ui.set_loading(false);
                    ui.toast(
                        ToastLevel::Info,
                        "Still connecting to the conference, hang tight",
                    );
                }
            }));
        }

        tasks.push(tokio::spawn(event_loop(EventLoopContext {
            widget_rx: widget.subscribe(),
            meeting_rx: self.backend.subscribe_meeting(meeting_id),
            action_rx: self.backend.subscribe_actions(meeting_id),
            poll_interval: self.timings.role_poll_interval,
            backend: self.backend.clone(),
            widget: widget.clone(),
            reconciler: reconciler.clone(),
            watcher,
            ui: self.ui.clone(),
            loading,
            meeting_id: meeting_id.to_string(),
            is_host: descriptor.is_host,
        })));

        if descriptor.is_host {
            let dispatcher = ActionDispatcher::new(
                self.backend.clone(),
                widget.clone(),
                meeting_id.to_string(),
            );
            let actions = self.backend.subscribe_actions(meeting_id);
            tasks.push(tokio::spawn(async move {
                dispatcher.run(actions).await;
            }));
        }

        Some(MeetingSession {
            descriptor,
            widget,
            reconciler,
            role_rx,
            tasks,
            pool: self.pool.clone(),
        })
    }
}

struct EventLoopContext {
    widget_rx: broadcast::Receiver<WidgetEvent>,
    meeting_rx: broadcast::Receiver<Meeting>,
    action_rx: broadcast::Receiver<QueuedAction>,
    poll_interval: Duration,
    backend: Arc<dyn MeetingBackend>,
    widget: Arc<dyn ConferenceWidget>,
    reconciler: Arc<RoleReconciler>,
    watcher: Arc<ParticipantWatcher>,
    ui: Arc<dyn UiSink>,
    loading: Arc<AtomicBool>,
    meeting_id: String,
    is_host: bool,
}

/// The tab's single inbound queue: widget events, row changes, action rows
/// and the safety tick all funnel through here.
async fn event_loop(mut ctx: EventLoopContext) {
    let mut ticker = tokio::time::interval(ctx.poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            event = ctx.widget_rx.recv() => {
                match event {
                    Ok(event) => {
                        if !handle_widget_event(&mut ctx, event).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            row = ctx.meeting_rx.recv() => {
                match row {
                    Ok(meeting) => {
                        ctx.reconciler
                            .handle_event(&SessionEvent::MeetingRow(meeting))
                            .await;
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            action = ctx.action_rx.recv() => {
                match action {
                    // The host's dispatcher owns action rows; the watcher
                    // runs for non-host viewers only.
                    Ok(action) if !ctx.is_host => ctx.watcher.handle(&action).await,
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ticker.tick() => {
                ctx.reconciler.handle_event(&SessionEvent::PollTick).await;
                match ctx.backend.fetch_meeting(&ctx.meeting_id).await {
                    Ok(Some(meeting)) => {
                        ctx.reconciler
                            .handle_event(&SessionEvent::MeetingRow(meeting))
                            .await;
                    }
                    Ok(None) => {}
                    Err(e) => debug!(meeting_id = %ctx.meeting_id, %e, "safety poll failed"),
                }
            }
        }
    }
}

/// Returns false when the session should tear down.
async fn handle_widget_event(ctx: &mut EventLoopContext, event: WidgetEvent) -> bool {
    match &event {
        WidgetEvent::IframeReady | WidgetEvent::ConferenceJoined { .. } => {
            // Second checkpoint: joining always clears the loading state,
            // even if the ready event never fired.
            if ctx.loading.swap(false, Ordering::SeqCst) {
                ctx.ui.set_loading(false);
            }
        }
        _ => {}
    }

    match &event {
        WidgetEvent::ConferenceJoined {
            local_participant_id,
        } => {
            if ctx.is_host {
                if let Err(e) = ctx
                    .backend
                    .set_host_participant(&ctx.meeting_id, Some(local_participant_id))
                    .await
                {
                    warn!(meeting_id = %ctx.meeting_id, %e, "failed to record host participant");
                }
            }
        }
        WidgetEvent::ParticipantKicked { participant_id } => {
            let local = ctx.widget.local_participant_id();
            if local.as_deref() == Some(participant_id.as_str()) {
                ctx.ui
                    .toast(ToastLevel::Info, "You were removed from the meeting");
                ctx.ui.navigate(Route::Home);
                return false;
            }
        }
        WidgetEvent::ConferenceTerminated | WidgetEvent::ReadyToClose => {
            ctx.ui.navigate(Route::Home);
            return false;
        }
        _ => {}
    }

    ctx.reconciler
        .handle_event(&SessionEvent::Widget(event))
        .await;
    true
}

/// Widget construction parameters derived from the meeting row. Webinar
/// mode restricts the toolbar for non-moderators.
fn widget_config(descriptor: &SessionDescriptor) -> WidgetConfig {
    let meeting = &descriptor.meeting;
    WidgetConfig {
        room: meeting.id.clone(),
        display_name: descriptor.display_name.clone(),
        password: None,
        start_with_audio_muted: meeting.start_with_audio_muted,
        start_with_video_muted: meeting.start_with_video_muted,
        prejoin_enabled: meeting.lobby_enabled,
        noise_suppression: true,
        toolbar_buttons: toolbar_buttons(meeting, descriptor.is_host),
        credential: descriptor.credential.clone(),
    }
}

fn toolbar_buttons(meeting: &Meeting, is_host: bool) -> Vec<String> {
    let mut buttons = vec![
        "microphone".to_string(),
        "camera".to_string(),
        "chat".to_string(),
        "raisehand".to_string(),
        "tileview".to_string(),
        "hangup".to_string(),
    ];
    if !meeting.webinar || is_host {
        buttons.push("desktop".to_string());
        buttons.push("whiteboard".to_string());
    }
    if is_host {
        buttons.push("recording".to_string());
        buttons.push("livestreaming".to_string());
        buttons.push("mute-everyone".to_string());
        buttons.push("security".to_string());
    }
    buttons
}
