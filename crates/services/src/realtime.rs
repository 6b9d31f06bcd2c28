use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use huddle_db::{ActionStatus, Meeting, QueuedAction};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::supabase::SupabaseClient;

const FEED_CAPACITY: usize = 64;

/// Senders for one watched meeting.
struct Feed {
    meeting_tx: broadcast::Sender<Meeting>,
    action_tx: broadcast::Sender<QueuedAction>,
    worker: JoinHandle<()>,
}

/// Polling-backed change feed over the hosted tables. One worker per watched
/// meeting diffs the meeting row on `updated_at` and picks up pending action
/// rows it has not seen, fanning both out on broadcast channels. This is the
/// transport behind the realtime subscription seam; subscribers must treat
/// delivery order as best-effort.
pub struct RealtimeHub {
    client: Arc<SupabaseClient>,
    feeds: DashMap<String, Feed>,
    poll_interval: Duration,
}

impl RealtimeHub {
    pub fn new(client: Arc<SupabaseClient>, poll_interval: Duration) -> Self {
        Self {
            client,
            feeds: DashMap::new(),
            poll_interval,
        }
    }

    /// Subscribes to row changes for a meeting, spawning the polling worker
    /// on first use.
    pub fn subscribe(
        &self,
        meeting_id: &str,
    ) -> (broadcast::Receiver<Meeting>, broadcast::Receiver<QueuedAction>) {
        if let Some(feed) = self.feeds.get(meeting_id) {
            return (feed.meeting_tx.subscribe(), feed.action_tx.subscribe());
        }

        let (meeting_tx, meeting_rx) = broadcast::channel(FEED_CAPACITY);
        let (action_tx, action_rx) = broadcast::channel(FEED_CAPACITY);

        let worker = tokio::spawn(poll_loop(
            self.client.clone(),
            meeting_id.to_string(),
            meeting_tx.clone(),
            action_tx.clone(),
            self.poll_interval,
        ));

        self.feeds.insert(
            meeting_id.to_string(),
            Feed {
                meeting_tx,
                action_tx,
                worker,
            },
        );
        (meeting_rx, action_rx)
    }

    /// Stops the worker for a meeting. Outstanding receivers see channel
    /// closure.
    pub fn unwatch(&self, meeting_id: &str) {
        if let Some((_, feed)) = self.feeds.remove(meeting_id) {
            feed.worker.abort();
        }
    }

    pub fn watched_count(&self) -> usize {
        self.feeds.len()
    }
}

impl Drop for RealtimeHub {
    fn drop(&mut self) {
        for feed in self.feeds.iter() {
            feed.worker.abort();
        }
    }
}

async fn poll_loop(
    client: Arc<SupabaseClient>,
    meeting_id: String,
    meeting_tx: broadcast::Sender<Meeting>,
    action_tx: broadcast::Sender<QueuedAction>,
    poll_interval: Duration,
) {
    let meetings_table = client.settings.meetings_table.clone();
    let actions_table = client.settings.actions_table.clone();
    let mut last_updated_at = None;
    let mut seen_actions: HashSet<String> = HashSet::new();
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match client
            .select_one::<Meeting>(&meetings_table, &[("id", format!("eq.{meeting_id}"))])
            .await
        {
            Ok(Some(meeting)) => {
                if last_updated_at != Some(meeting.updated_at) {
                    last_updated_at = Some(meeting.updated_at);
                    debug!(meeting_id, "meeting row changed");
                    let _ = meeting_tx.send(meeting);
                }
            }
            Ok(None) => {}
            Err(e) => warn!(meeting_id, %e, "meeting poll failed"),
        }

        match client
            .select::<QueuedAction>(
                &actions_table,
                &[
                    ("meeting_id", format!("eq.{meeting_id}")),
                    ("status", "eq.pending".to_string()),
                ],
            )
            .await
        {
            Ok(actions) => {
                for action in actions {
                    if action.status != ActionStatus::Pending {
                        continue;
                    }
                    if seen_actions.insert(action.id.clone()) {
                        let _ = action_tx.send(action);
                    }
                }
            }
            Err(e) => warn!(meeting_id, %e, "action poll failed"),
        }
    }
}
