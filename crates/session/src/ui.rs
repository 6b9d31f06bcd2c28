use std::fmt;

/// Client-side navigation targets the core can redirect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Role-appropriate landing route for signed-in viewers.
    Home,
    /// Denial landing page (bad meeting, banned name).
    Denied,
    /// Guest-entry route carrying the meeting id.
    GuestEntry { meeting_id: String },
    Meeting { meeting_id: String },
    Webinar { meeting_id: String },
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => write!(f, "/"),
            Route::Denied => write!(f, "/denied"),
            Route::GuestEntry { meeting_id } => write!(f, "/guest/{meeting_id}"),
            Route::Meeting { meeting_id } => write!(f, "/meeting/{meeting_id}"),
            Route::Webinar { meeting_id } => write!(f, "/meeting/webinar/{meeting_id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Sink for everything the core surfaces to the viewer. Every failure path
/// ends in a toast or a navigation, never a panic.
pub trait UiSink: Send + Sync {
    fn toast(&self, level: ToastLevel, message: &str);
    fn navigate(&self, route: Route);
    fn set_loading(&self, loading: bool);
}
