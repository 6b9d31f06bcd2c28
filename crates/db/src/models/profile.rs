use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile row kept in sync with the hosted auth user of the same id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub display_name: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default = "bool_true")]
    pub is_active: bool,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub const TABLE: &'static str = "profiles";
}

fn default_role() -> String {
    "user".to_string()
}

fn bool_true() -> bool {
    true
}
