mod meeting;
mod profile;
mod queued_action;

pub use meeting::Meeting;
pub use profile::Profile;
pub use queued_action::{ActionStatus, ActionType, QueuedAction, StreamParams};
