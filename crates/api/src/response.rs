use axum::Json;
use serde::Serialize;
use serde_json::{Value, json};

/// The `{ success, data, error }` envelope every endpoint answers with.
pub fn ok<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": data,
        "error": null,
    }))
}
