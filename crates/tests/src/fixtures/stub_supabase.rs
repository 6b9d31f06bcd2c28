//! In-process stand-in for the hosted backend. Implements the slices of
//! the PostgREST row surface and the admin auth surface the front door
//! actually calls, over plain in-memory JSON rows.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

#[derive(Default)]
pub struct StubSupabase {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    auth_users: Mutex<HashMap<String, Value>>,
    /// When set, the next row insert into `profiles` fails with a 500.
    pub fail_next_profile_insert: AtomicBool,
}

impl StubSupabase {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_row(&self, table: &str, row: Value) {
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn seed_auth_user(&self, id: &str, email: &str) {
        self.auth_users.lock().unwrap().insert(
            id.to_string(),
            json!({ "id": id, "email": email, "banned_until": null }),
        );
    }

    pub fn auth_user(&self, id: &str) -> Option<Value> {
        self.auth_users.lock().unwrap().get(id).cloned()
    }

    pub fn auth_user_count(&self) -> usize {
        self.auth_users.lock().unwrap().len()
    }
}

/// Binds the stub on a random port and returns its base URL.
pub async fn serve(stub: Arc<StubSupabase>) -> String {
    let app = Router::new()
        .route("/auth/v1/admin/users", post(create_auth_user))
        .route(
            "/auth/v1/admin/users/{user_id}",
            put(update_auth_user).delete(delete_auth_user),
        )
        .route(
            "/rest/v1/{table}",
            get(select_rows)
                .post(insert_row)
                .patch(patch_rows)
                .delete(delete_rows),
        )
        .route("/metrics/query", get(metrics_query))
        .with_state(stub);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub port");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn create_auth_user(
    State(stub): State<Arc<StubSupabase>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let id = uuid::Uuid::new_v4().to_string();
    let user = json!({
        "id": id,
        "email": body.get("email").cloned().unwrap_or(Value::Null),
        "banned_until": null,
    });
    stub.auth_users
        .lock()
        .unwrap()
        .insert(id, user.clone());
    Json(user)
}

async fn update_auth_user(
    State(stub): State<Arc<StubSupabase>>,
    Path(user_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut users = stub.auth_users.lock().unwrap();
    let Some(user) = users.get_mut(&user_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if let Some(duration) = body.get("ban_duration").and_then(Value::as_str) {
        user["banned_until"] = if duration == "none" {
            Value::Null
        } else {
            json!("2999-01-01T00:00:00Z")
        };
    }
    Json(user.clone()).into_response()
}

async fn delete_auth_user(
    State(stub): State<Arc<StubSupabase>>,
    Path(user_id): Path<String>,
) -> StatusCode {
    match stub.auth_users.lock().unwrap().remove(&user_id) {
        Some(_) => StatusCode::OK,
        None => StatusCode::NOT_FOUND,
    }
}

async fn select_rows(
    State(stub): State<Arc<StubSupabase>>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let rows: Vec<Value> = stub
        .rows(&table)
        .into_iter()
        .filter(|row| row_matches(row, &query))
        .collect();
    let total = rows.len();

    let (from, to) = range_bounds(&headers, total);
    let page: Vec<Value> = rows
        .into_iter()
        .skip(from)
        .take(to.saturating_sub(from) + 1)
        .collect();

    let mut resp = Json(page).into_response();
    resp.headers_mut().insert(
        "content-range",
        format!("{from}-{to}/{total}").parse().unwrap(),
    );
    resp
}

async fn insert_row(
    State(stub): State<Arc<StubSupabase>>,
    Path(table): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if table == "profiles" && stub.fail_next_profile_insert.swap(false, Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "simulated insert failure" })),
        )
            .into_response();
    }

    let mut row = body;
    if let Some(obj) = row.as_object_mut() {
        let now = chrono::Utc::now().to_rfc3339();
        obj.entry("created_at".to_string())
            .or_insert_with(|| json!(now.clone()));
        obj.entry("updated_at".to_string())
            .or_insert_with(|| json!(now));
    }
    stub.seed_row(&table, row.clone());
    (StatusCode::CREATED, Json(json!([row]))).into_response()
}

async fn patch_rows(
    State(stub): State<Arc<StubSupabase>>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(patch): Json<Value>,
) -> StatusCode {
    let mut tables = stub.tables.lock().unwrap();
    let rows = tables.entry(table).or_default();
    for row in rows.iter_mut().filter(|r| row_matches(r, &query)) {
        if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
        }
    }
    StatusCode::NO_CONTENT
}

async fn delete_rows(
    State(stub): State<Arc<StubSupabase>>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> StatusCode {
    let mut tables = stub.tables.lock().unwrap();
    let rows = tables.entry(table).or_default();
    rows.retain(|r| !row_matches(r, &query));
    StatusCode::NO_CONTENT
}

/// Applies the PostgREST operator filters present in the query string.
/// `select` and `order` are not filters and are ignored.
fn row_matches(row: &Value, query: &HashMap<String, String>) -> bool {
    query.iter().all(|(key, op)| {
        if key == "select" || key == "order" {
            return true;
        }
        let field = row.get(key).unwrap_or(&Value::Null);
        if let Some(expected) = op.strip_prefix("eq.") {
            match field {
                Value::String(s) => s == expected,
                Value::Bool(b) => expected.parse::<bool>() == Ok(*b),
                Value::Number(n) => n.to_string() == expected,
                _ => false,
            }
        } else if op == "is.null" {
            field.is_null()
        } else if op == "not.is.null" {
            !field.is_null()
        } else {
            true
        }
    })
}

/// Canned vector-result answer for the metrics instant-query surface.
async fn metrics_query(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let expr = query.get("query").cloned().unwrap_or_default();
    Json(json!({
        "status": "success",
        "data": {
            "resultType": "vector",
            "result": [
                {
                    "metric": { "__name__": expr, "instance": "stub" },
                    "value": [1700000000.0, "1"],
                }
            ],
        },
    }))
}

fn range_bounds(headers: &HeaderMap, total: usize) -> (usize, usize) {
    let parsed = headers
        .get("range")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let (from, to) = v.split_once('-')?;
            Some((from.parse::<usize>().ok()?, to.parse::<usize>().ok()?))
        });
    match parsed {
        Some((from, to)) => (from, to),
        None => (0, total.saturating_sub(1)),
    }
}
