use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetRole {
    Moderator,
    Participant,
}

#[derive(Debug, Clone)]
pub struct WidgetParticipant {
    pub id: String,
    pub display_name: String,
    pub role: WidgetRole,
}

/// Recording target for the widget's recording commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingTarget {
    File,
    Stream {
        rtmp_url: Option<String>,
        stream_key: Option<String>,
    },
}

/// Commands of the embedded widget's command API, one variant per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetCommand {
    KickParticipant { participant_id: String },
    MuteParticipant { participant_id: String },
    MuteEveryone,
    GrantModerator { participant_id: String },
    RevokeModerator { participant_id: String },
    StartRecording { target: RecordingTarget },
    StopRecording { target: RecordingTarget },
    Hangup,
    SetDisplayName { name: String },
    /// `to` empty means broadcast to every endpoint.
    SendEndpointText { to: String, payload: String },
    ToggleWhiteboard,
    ToggleLobby { enabled: bool },
}

/// Events the widget emits. Mirrors the widget's event subscription surface.
#[derive(Debug, Clone)]
pub enum WidgetEvent {
    IframeReady,
    ConferenceJoined { local_participant_id: String },
    ConferenceLeft,
    ConferenceTerminated,
    RoleChanged { participant_id: String, role: WidgetRole },
    ParticipantKicked { participant_id: String },
    ReadyToClose,
    EndpointTextReceived { from: String, payload: String },
    RecordingStatusChanged { active: bool },
}

#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("widget command failed: {0}")]
    Command(String),
    #[error("widget disposed")]
    Disposed,
}

/// Construction parameters for a widget instance: room name, display name,
/// password, start-muted flags, prejoin behavior and the optional signed
/// credential a recognized host carries.
#[derive(Debug, Clone)]
pub struct WidgetConfig {
    pub room: String,
    pub display_name: String,
    pub password: Option<String>,
    pub start_with_audio_muted: bool,
    pub start_with_video_muted: bool,
    pub prejoin_enabled: bool,
    pub noise_suppression: bool,
    pub toolbar_buttons: Vec<String>,
    pub credential: Option<String>,
}

/// The embedded conferencing widget, seen from this side of the iframe.
/// One instance per tab; never shared across tabs.
#[async_trait]
pub trait ConferenceWidget: Send + Sync {
    async fn execute(&self, command: WidgetCommand) -> Result<(), WidgetError>;
    fn subscribe(&self) -> broadcast::Receiver<WidgetEvent>;
    /// Live participant list as the widget currently reports it.
    fn participants(&self) -> Vec<WidgetParticipant>;
    fn local_participant_id(&self) -> Option<String>;
}

/// Constructs widget instances. The production factory wraps the embedded
/// iframe; tests plug in fakes.
pub trait WidgetFactory: Send + Sync {
    fn create(&self, config: WidgetConfig) -> Arc<dyn ConferenceWidget>;
}

struct PooledWidget {
    widget: Arc<dyn ConferenceWidget>,
    reaper: JoinHandle<()>,
}

/// Best-effort pool keeping one widget instance per room alive across a
/// brief unmount (visibility change, quick re-navigation) so the viewer
/// does not pay a full reconnect.
pub struct WidgetPool {
    entries: Arc<DashMap<String, PooledWidget>>,
    grace: Duration,
}

impl WidgetPool {
    pub fn new(grace: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            grace,
        }
    }

    /// Parks a widget for its room. After the grace period the instance is
    /// dropped and told to hang up.
    pub fn release(&self, room: &str, widget: Arc<dyn ConferenceWidget>) {
        let entries = self.entries.clone();
        let room_key = room.to_string();
        let grace = self.grace;
        let reaper = tokio::spawn({
            let entries = entries.clone();
            let room_key = room_key.clone();
            async move {
                tokio::time::sleep(grace).await;
                if let Some((_, pooled)) = entries.remove(&room_key) {
                    debug!(room = %room_key, "widget grace period expired");
                    let _ = pooled.widget.execute(WidgetCommand::Hangup).await;
                }
            }
        });

        // A newer instance for the same room replaces the parked one.
        if let Some(previous) = self.entries.insert(room_key, PooledWidget { widget, reaper }) {
            previous.reaper.abort();
        }
    }

    /// Reclaims a parked widget, cancelling its reaper.
    pub fn acquire(&self, room: &str) -> Option<Arc<dyn ConferenceWidget>> {
        let (_, pooled) = self.entries.remove(room)?;
        pooled.reaper.abort();
        debug!(room, "reusing pooled widget");
        Some(pooled.widget)
    }

    pub fn pooled_count(&self) -> usize {
        self.entries.len()
    }
}
