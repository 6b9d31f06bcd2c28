use huddle_db::{Meeting, QueuedAction};

use crate::widget::WidgetEvent;

/// Inbound event for one tab's session loop. All three sources funnel into
/// a single queue so the reconciler never cares how a fact arrived.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Widget(WidgetEvent),
    MeetingRow(Meeting),
    ActionRow(QueuedAction),
    /// Fixed-interval safety tick; a correctness backstop for missed events,
    /// not the primary mechanism.
    PollTick,
}
