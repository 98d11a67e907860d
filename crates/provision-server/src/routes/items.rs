use std::collections::HashSet;

use axum::extract::State;
use axum::Json;
use provision_core::content::FsContentRepository;
use provision_core::model::WorkItem;
use provision_core::work_items::WorkItemSource;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/items/next: the pair a fresh cycle would take first, or null
/// when nothing is eligible or the content repository cannot be read.
pub async fn next_item(State(app): State<AppState>) -> Result<Json<Option<WorkItem>>, AppError> {
    let content_root = app.config.content_root(&app.root);
    let item = tokio::task::spawn_blocking(move || {
        let repo = FsContentRepository::new(content_root);
        WorkItemSource::new(&repo).next_eligible_work_item(&HashSet::new())
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))?;
    Ok(Json(item))
}
