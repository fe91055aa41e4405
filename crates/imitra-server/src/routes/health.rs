use axum::{Json, extract::State};
use chrono::Utc;
use serde_json::{Value, json};

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "time": Utc::now(),
        "classifier": if state.classifier.has_generator() { "ai" } else { "keyword" },
        "gateway": state.gateway.is_enabled(),
        "push_subscribers": state.hub.subscriber_count(),
    }))
}
