use axum::{
    Json,
    extract::{Path, Query, State},
};
use huddle_db::{PaginatedResult, PaginationParams, Profile};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::{error::ApiError, response, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub display_name: Option<String>,
    pub role: Option<String>,
    pub avatar_url: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Value>, ApiError> {
    let (items, total) = state
        .supabase
        .select_page::<Profile>(
            &state.settings.supabase.profiles_table,
            &[],
            "created_at.desc",
            &params,
        )
        .await?;
    Ok(response::ok(PaginatedResult::new(items, total, &params)))
}

/// Auth user first, profile row second. A failed profile insert compensates
/// with a best-effort auth-user deletion so no orphaned login remains.
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(ApiError::BadRequest("A valid email is required".to_string()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    if req.display_name.trim().is_empty() {
        return Err(ApiError::BadRequest("Display name is required".to_string()));
    }

    let auth_user = state
        .supabase
        .create_auth_user(&req.email, &req.password, &req.display_name)
        .await?;

    let row = serde_json::json!({
        "id": auth_user.id,
        "email": req.email,
        "display_name": req.display_name,
        "role": req.role.as_deref().unwrap_or("user"),
        "is_active": true,
    });
    let profile = state
        .supabase
        .insert::<Value, Profile>(&state.settings.supabase.profiles_table, &row)
        .await;

    match profile {
        Ok(profile) => {
            info!(user_id = %profile.id, "user created");
            Ok(response::ok(profile))
        }
        Err(e) => {
            warn!(user_id = %auth_user.id, %e, "profile insert failed, compensating");
            state
                .supabase
                .delete_auth_user_best_effort(&auth_user.id)
                .await;
            Err(e.into())
        }
    }
}

pub async fn update(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut patch = serde_json::Map::new();
    if let Some(display_name) = &req.display_name {
        if display_name.trim().is_empty() {
            return Err(ApiError::BadRequest("Display name cannot be empty".to_string()));
        }
        patch.insert("display_name".into(), serde_json::json!(display_name));
    }
    if let Some(role) = &req.role {
        patch.insert("role".into(), serde_json::json!(role));
    }
    if let Some(avatar_url) = &req.avatar_url {
        patch.insert("avatar_url".into(), serde_json::json!(avatar_url));
    }
    if patch.is_empty() {
        return Err(ApiError::BadRequest("Nothing to update".to_string()));
    }
    patch.insert("updated_at".into(), serde_json::json!(chrono::Utc::now()));

    state
        .supabase
        .update(
            &state.settings.supabase.profiles_table,
            &[("id", format!("eq.{user_id}"))],
            &Value::Object(patch),
        )
        .await?;

    let profile = fetch_profile(&state, &user_id).await?;

    // Keep the login's display name in step with the profile.
    if let Some(display_name) = &req.display_name {
        if let Err(e) = state
            .supabase
            .update_auth_user(
                &user_id,
                &serde_json::json!({ "user_metadata": { "display_name": display_name } }),
            )
            .await
        {
            warn!(user_id, %e, "auth metadata update failed");
        }
    }

    Ok(response::ok(profile))
}

pub async fn enable(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    set_active(&state, &user_id, true).await
}

pub async fn disable(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    set_active(&state, &user_id, false).await
}

/// The ban on the auth side is the enforcement; the profile flag is what
/// the admin UI lists. The ban goes first so a half-applied change errs on
/// the locked-out side.
async fn set_active(
    state: &AppState,
    user_id: &str,
    active: bool,
) -> Result<Json<Value>, ApiError> {
    state.supabase.set_auth_user_banned(user_id, !active).await?;
    state
        .supabase
        .update(
            &state.settings.supabase.profiles_table,
            &[("id", format!("eq.{user_id}"))],
            &serde_json::json!({ "is_active": active, "updated_at": chrono::Utc::now() }),
        )
        .await?;
    info!(user_id, active, "user activation changed");

    let profile = fetch_profile(state, user_id).await?;
    Ok(response::ok(profile))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    // Make sure the target exists before touching the auth side.
    fetch_profile(&state, &user_id).await?;

    state.supabase.delete_auth_user(&user_id).await?;
    state
        .supabase
        .delete(
            &state.settings.supabase.profiles_table,
            &[("id", format!("eq.{user_id}"))],
        )
        .await?;
    info!(user_id, "user deleted");

    Ok(response::ok(serde_json::json!({ "id": user_id })))
}

async fn fetch_profile(state: &AppState, user_id: &str) -> Result<Profile, ApiError> {
    state
        .supabase
        .select_one::<Profile>(
            &state.settings.supabase.profiles_table,
            &[("id", format!("eq.{user_id}"))],
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}
