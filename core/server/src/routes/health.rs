use axum::Json;
use serde_json::{json, Value};

pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "Ping.." }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
