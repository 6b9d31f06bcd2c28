use async_trait::async_trait;

/// The authenticated viewer, as far as the session core needs to know.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub display_name: Option<String>,
}

/// Auth-session accessor. `current` reflects whatever the hosted auth
/// collaborator believes right now; the resolver handles the settle window
/// where this briefly reads `None` after a reload.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current(&self) -> Option<Identity>;
}
