//! Records read and written by the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type CredentialId = u64;
pub type CampaignId = u64;

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// A login that can be bound to exactly one campaign.
///
/// `assigned_campaign` is `None` while the credential is free. It is written
/// once, by [`crate::store::ProvisionDb::commit_assignment`], and never reset.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: CredentialId,
    pub login: String,
    pub secret: String,
    #[serde(default)]
    pub assigned_campaign: Option<CampaignId>,
    /// Locality used by the assignment that claimed this credential.
    #[serde(default)]
    pub annotation: Option<String>,
    /// Name of a proxy under `driver.proxies`.
    #[serde(default)]
    pub egress: Option<String>,
    #[serde(default)]
    pub assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Credential {
    pub fn is_free(&self) -> bool {
        self.assigned_campaign.is_none()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("login", &self.login)
            .field("secret", &"<redacted>")
            .field("assigned_campaign", &self.assigned_campaign)
            .field("annotation", &self.annotation)
            .field("egress", &self.egress)
            .field("assigned_at", &self.assigned_at)
            .finish()
    }
}

/// Input for registering a new credential; the store assigns the id.
#[derive(Clone)]
pub struct NewCredential {
    pub login: String,
    pub secret: String,
    pub egress: Option<String>,
}

// ---------------------------------------------------------------------------
// Campaign
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    /// URL of the site the remote project is created for.
    pub target_site: String,
}

// ---------------------------------------------------------------------------
// WorkItem
// ---------------------------------------------------------------------------

/// One (campaign, locality) pair with its phrases. Derived on every run,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkItem {
    pub campaign_id: CampaignId,
    pub locality: String,
    pub phrases: Vec<String>,
}

impl WorkItem {
    pub fn key(&self) -> WorkKey {
        WorkKey {
            campaign_id: self.campaign_id,
            locality: self.locality.clone(),
        }
    }
}

/// Identity of a work item, used to track what a cycle already attempted.
///
/// Ordering is (campaign id, locality), the order items are enumerated in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkKey {
    pub campaign_id: CampaignId,
    pub locality: String,
}

impl WorkKey {
    pub fn new(campaign_id: CampaignId, locality: impl Into<String>) -> Self {
        Self {
            campaign_id,
            locality: locality.into(),
        }
    }
}

impl fmt::Display for WorkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.campaign_id, self.locality)
    }
}
