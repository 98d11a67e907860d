use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use provision_core::error::ProvisionError;

// ---------------------------------------------------------------------------
// Internal sentinels for explicit statuses
// ---------------------------------------------------------------------------

/// Carries an explicit HTTP status through the `anyhow::Error` chain.
#[derive(Debug)]
struct StatusError(StatusCode, String);

impl std::fmt::Display for StatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.1)
    }
}

impl std::error::Error for StatusError {}

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(StatusError(StatusCode::BAD_REQUEST, msg.into()).into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self(StatusError(StatusCode::CONFLICT, msg.into()).into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(StatusError(StatusCode::NOT_FOUND, msg.into()).into())
    }
}

fn status_for(e: &ProvisionError) -> StatusCode {
    match e {
        ProvisionError::NotInitialized | ProvisionError::InvalidInput { .. } => {
            StatusCode::BAD_REQUEST
        }
        ProvisionError::CredentialNotFound(_) | ProvisionError::CampaignNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        ProvisionError::CampaignExists(_) | ProvisionError::AlreadyAssigned { .. } => {
            StatusCode::CONFLICT
        }
        ProvisionError::Driver(_) | ProvisionError::ContentRepository(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ProvisionError::Store(_)
        | ProvisionError::Io(_)
        | ProvisionError::Yaml(_)
        | ProvisionError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if let Some(s) = self.0.downcast_ref::<StatusError>() {
            s.0
        } else if let Some(e) = self.0.downcast_ref::<ProvisionError>() {
            status_for(e)
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
