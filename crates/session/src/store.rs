use std::collections::HashMap;

use parking_lot::RwLock;

/// Typed session-context store: host tokens keyed by meeting id, the guest
/// flag and the chosen display name. Replaces ad hoc browser storage with
/// explicit accessors that tests can pre-seed.
#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    host_tokens: HashMap<String, String>,
    display_name: Option<String>,
    guest: bool,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host_token(&self, meeting_id: &str) -> Option<String> {
        self.inner.read().host_tokens.get(meeting_id).cloned()
    }

    pub fn set_host_token(&self, meeting_id: &str, token: &str) {
        self.inner
            .write()
            .host_tokens
            .insert(meeting_id.to_string(), token.to_string());
    }

    pub fn clear_host_token(&self, meeting_id: &str) {
        self.inner.write().host_tokens.remove(meeting_id);
    }

    pub fn display_name(&self) -> Option<String> {
        self.inner.read().display_name.clone()
    }

    pub fn set_display_name(&self, name: &str) {
        self.inner.write().display_name = Some(name.to_string());
    }

    pub fn is_guest(&self) -> bool {
        self.inner.read().guest
    }

    pub fn set_guest(&self, guest: bool) {
        self.inner.write().guest = guest;
    }
}
