use axum::{Json, extract::State};
use serde_json::Value;

use crate::{error::ApiError, response, state::AppState};

pub async fn stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let profiles = &state.settings.supabase.profiles_table;
    let meetings = &state.settings.supabase.meetings_table;

    let users = state.supabase.count(profiles, &[]).await?;
    let active_users = state
        .supabase
        .count(profiles, &[("is_active", "eq.true".to_string())])
        .await?;
    let total_meetings = state.supabase.count(meetings, &[]).await?;
    let completed_meetings = state
        .supabase
        .count(meetings, &[("completed_at", "not.is.null".to_string())])
        .await?;

    Ok(response::ok(serde_json::json!({
        "users": users,
        "activeUsers": active_users,
        "meetings": total_meetings,
        "completedMeetings": completed_meetings,
    })))
}

/// Latest sample set from the metrics poller. 404 when no endpoint is
/// configured; an empty array until the first successful poll.
pub async fn metrics(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let samples = state
        .metrics
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("Metrics are not configured".to_string()))?
        .borrow()
        .clone();
    Ok(response::ok(samples))
}
