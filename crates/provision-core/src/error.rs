use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("not initialized: run 'provision init'")]
    NotInitialized,

    #[error("credential not found: {0}")]
    CredentialNotFound(u64),

    #[error("campaign not found: {0}")]
    CampaignNotFound(u64),

    #[error("campaign already exists: {0}")]
    CampaignExists(u64),

    #[error("credential {credential_id} is already assigned to campaign {campaign_id}")]
    AlreadyAssigned { credential_id: u64, campaign_id: u64 },

    #[error("invalid value for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("store error: {0}")]
    Store(String),

    #[error("content repository error: {0}")]
    ContentRepository(String),

    #[error("session driver error: {0}")]
    Driver(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ProvisionError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
