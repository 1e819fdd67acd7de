//! Health endpoint

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

/// GET /health
///
/// Reports which optional components came up at startup.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "module": "plant-server",
        "version": env!("CARGO_PKG_VERSION"),
        "classifier": state.classifier.is_some(),
        "labels": state.classifier.as_ref().map(|c| c.labels().len()).unwrap_or(0),
        "species": state.species.len(),
        "identity": state.verifier.is_some(),
        "users": state.users.is_some(),
    }))
}
