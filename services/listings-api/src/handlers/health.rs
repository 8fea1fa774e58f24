use crate::state::AppState;
use crate::SERVICE_VERSION;
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": SERVICE_VERSION,
        "listings": state.store.len(),
        "subscribers": state.registry.len(),
    }))
}
