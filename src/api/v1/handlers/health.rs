/*
 * Responsibility
 * - GET /health (疎通用、認証なし)
 * - key set / policy engine には触れない (依存先が落ちていても 200)
 */
use axum::Json;
use serde_json::{Value, json};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
