use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use provision_core::model::Campaign;
use provision_core::ProvisionError;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/campaigns
pub async fn list_campaigns(State(app): State<AppState>) -> Result<Json<Vec<Campaign>>, AppError> {
    let db = app.db.clone();
    let list = tokio::task::spawn_blocking(move || db.list_campaigns())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(list))
}

/// GET /api/campaigns/{id}
pub async fn get_campaign(
    State(app): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Campaign>, AppError> {
    let db = app.db.clone();
    let campaign = tokio::task::spawn_blocking(move || db.get_campaign(id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    campaign
        .map(Json)
        .ok_or_else(|| ProvisionError::CampaignNotFound(id).into())
}

/// POST /api/campaigns
pub async fn add_campaign(
    State(app): State<AppState>,
    Json(campaign): Json<Campaign>,
) -> Result<(StatusCode, Json<Campaign>), AppError> {
    let db = app.db.clone();
    let stored = campaign.clone();
    tokio::task::spawn_blocking(move || db.add_campaign(&stored))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok((StatusCode::CREATED, Json(campaign)))
}
