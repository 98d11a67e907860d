//! The credential pool and campaign catalog seams used by the cycle controller.
//!
//! `ProvisionDb` is the production implementation of both; tests supply
//! in-memory versions.

use crate::error::Result;
use crate::model::{Campaign, CampaignId, Credential, CredentialId};
use crate::store::ProvisionDb;

/// Allocation and durable commit of exclusive-use credentials.
///
/// There is no `release`: a credential whose attempt fails is
/// never written, so it stays free.
pub trait CredentialPool {
    /// One credential with no assigned campaign, or `None` when the pool is
    /// exhausted.
    fn acquire_free(&self) -> Result<Option<Credential>>;

    /// Atomically record that `credential_id` now owns `campaign_id`.
    fn commit_assignment(
        &self,
        credential_id: CredentialId,
        campaign_id: CampaignId,
        locality: &str,
    ) -> Result<()>;
}

/// Read-only lookup of campaign records.
pub trait CampaignCatalog {
    fn campaign(&self, id: CampaignId) -> Result<Option<Campaign>>;
}

impl CredentialPool for ProvisionDb {
    fn acquire_free(&self) -> Result<Option<Credential>> {
        self.first_free_credential()
    }

    fn commit_assignment(
        &self,
        credential_id: CredentialId,
        campaign_id: CampaignId,
        locality: &str,
    ) -> Result<()> {
        ProvisionDb::commit_assignment(self, credential_id, campaign_id, locality).map(|_| ())
    }
}

impl CampaignCatalog for ProvisionDb {
    fn campaign(&self, id: CampaignId) -> Result<Option<Campaign>> {
        self.get_campaign(id)
    }
}
