use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/config: the configuration the server loaded at startup.
///
/// Read-only; edit `.provision/config.yaml` and restart to change it.
pub async fn get_config(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(serde_json::to_value(app.config.as_ref())?))
}
