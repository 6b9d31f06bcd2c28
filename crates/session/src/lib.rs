//! Meeting-session core: resolving who the viewer is, reconciling their
//! effective role from three independent signals, and dispatching queued
//! administrative actions through the embedded conferencing widget.
//!
//! Everything external sits behind a seam: the widget, the hosted row
//! store, the credential issuer, the UI surface and the client-side
//! session store are all traits (or plain structs) that tests replace
//! with in-process fakes.

pub mod backend;
pub mod credentials;
pub mod dispatcher;
pub mod events;
pub mod identity;
pub mod lifecycle;
pub mod resolver;
pub mod roles;
pub mod store;
pub mod testkit;
pub mod ui;
pub mod widget;

pub use backend::{MeetingBackend, MemoryBackend, SupabaseMeetingBackend};
pub use dispatcher::{ActionDispatcher, ParticipantWatcher};
pub use events::SessionEvent;
pub use lifecycle::{MeetingSession, NewMeeting, SessionRuntime};
pub use resolver::{SessionDescriptor, SessionResolver};
pub use roles::{RoleOverride, RoleReconciler};
pub use store::SessionStore;
pub use ui::{Route, ToastLevel, UiSink};
pub use widget::{
    ConferenceWidget, WidgetCommand, WidgetConfig, WidgetError, WidgetEvent, WidgetParticipant,
    WidgetPool, WidgetRole,
};
