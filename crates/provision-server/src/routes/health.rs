use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /api/health: liveness plus whether a cycle is in flight.
pub async fn health(State(app): State<AppState>) -> Json<serde_json::Value> {
    let running = app.cycles().running().map(|r| r.id.clone());
    Json(serde_json::json!({
        "status": "ok",
        "project": app.config.project.name,
        "running_cycle": running,
    }))
}
