use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use provision_core::model::{Credential, NewCredential};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// Credential as exposed over HTTP. The secret is never included.
#[derive(Debug, Serialize)]
pub struct CredentialView {
    pub id: u64,
    pub login: String,
    pub assigned_campaign: Option<u64>,
    pub annotation: Option<String>,
    pub egress: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Credential> for CredentialView {
    fn from(c: Credential) -> Self {
        Self {
            id: c.id,
            login: c.login,
            assigned_campaign: c.assigned_campaign,
            annotation: c.annotation,
            egress: c.egress,
            assigned_at: c.assigned_at,
            created_at: c.created_at,
        }
    }
}

/// GET /api/credentials
pub async fn list_credentials(
    State(app): State<AppState>,
) -> Result<Json<Vec<CredentialView>>, AppError> {
    let db = app.db.clone();
    let list = tokio::task::spawn_blocking(move || db.list_credentials())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(list.into_iter().map(CredentialView::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct AddCredentialBody {
    pub login: String,
    pub secret: String,
    #[serde(default)]
    pub egress: Option<String>,
}

/// POST /api/credentials
pub async fn add_credential(
    State(app): State<AppState>,
    Json(body): Json<AddCredentialBody>,
) -> Result<(StatusCode, Json<CredentialView>), AppError> {
    if let Some(name) = &body.egress {
        if app.config.driver.proxy(name).is_none() {
            return Err(AppError::bad_request(format!(
                "egress '{name}' is not defined under driver.proxies"
            )));
        }
    }
    let db = app.db.clone();
    let created = tokio::task::spawn_blocking(move || {
        db.add_credential(NewCredential {
            login: body.login,
            secret: body.secret,
            egress: body.egress,
        })
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok((StatusCode::CREATED, Json(created.into())))
}
