pub mod error;
pub mod response;
pub mod routes;
pub mod state;

use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderValue, Method, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
};
use state::AppState;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let allowed = state.settings.app.cors_origins.clone();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .is_ok_and(|origin| origin_allowed(origin, &allowed))
        }))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let user_routes = Router::new()
        .route("/", get(routes::users::list))
        .route("/", post(routes::users::create))
        .route("/{user_id}", put(routes::users::update))
        .route("/{user_id}", delete(routes::users::remove))
        .route("/{user_id}/enable", patch(routes::users::enable))
        .route("/{user_id}/disable", patch(routes::users::disable));

    let meeting_routes = Router::new().route("/", get(routes::meetings::list));

    let dashboard_routes = Router::new()
        .route("/stats", get(routes::dashboard::stats))
        .route("/metrics", get(routes::dashboard::metrics));

    Router::new()
        .route("/health", get(health_check))
        .nest("/users", user_routes)
        .nest("/meetings", meeting_routes)
        .nest("/dashboard", dashboard_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn_with_state(state.clone(), cors_guard))
        .with_state(state)
}

/// Browser callers from a disallowed origin get an explicit 403 instead of
/// a silently header-less preflight answer.
async fn cors_guard(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());
    if let Some(origin) = origin {
        if !origin_allowed(origin, &state.settings.app.cors_origins) {
            return error::ApiError::Forbidden("Origin not allowed".to_string()).into_response();
        }
    }
    next.run(req).await
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Any localhost origin passes (any port, http or https); everything else
/// must be on the configured allow-list.
fn origin_allowed(origin: &str, allowed: &[String]) -> bool {
    if allowed.iter().any(|a| a == origin) {
        return true;
    }
    let host = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"));
    let Some(host) = host else { return false };
    let host = host.split(':').next().unwrap_or(host);
    host == "localhost" || host == "127.0.0.1"
}
