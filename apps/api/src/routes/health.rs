use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a status object with service version and open session counts.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "review-api",
        "sessions": {
            "reviews": state.sessions.reviews.count().await,
            "keywords": state.sessions.keywords.count().await,
        }
    }))
}
