use axum::{
    Json,
    extract::{Query, State},
};
use huddle_db::{Meeting, PaginatedResult, PaginationParams};
use serde_json::Value;

use crate::{error::ApiError, response, state::AppState};

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Value>, ApiError> {
    let (items, total) = state
        .supabase
        .select_page::<Meeting>(
            &state.settings.supabase.meetings_table,
            &[],
            "created_at.desc",
            &params,
        )
        .await?;
    Ok(response::ok(PaginatedResult::new(items, total, &params)))
}
