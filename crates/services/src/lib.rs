pub mod error;
pub mod metrics;
pub mod names;
pub mod realtime;
pub mod supabase;
pub mod tokens;

pub use error::{BackendError, BackendResult};
pub use realtime::RealtimeHub;
pub use supabase::SupabaseClient;
