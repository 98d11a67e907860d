//! Persistent storage for credentials and campaigns using redb.
//!
//! # Table design
//!
//! Two tables, both keyed by the record id as `u64`:
//! ```text
//! credentials: id -> JSON-encoded Credential
//! campaigns:   id -> JSON-encoded Campaign
//! ```
//!
//! redb orders `u64` keys numerically, so a forward scan of `credentials`
//! visits credentials in ascending id order. That gives `first_free_credential`
//! a stable answer for any given snapshot of the database.
//!
//! Every mutation is a single write transaction. `commit_assignment` reads,
//! checks and rewrites one credential inside one transaction and aborts it on
//! any refusal, so an assignment is either fully written or not at all.

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableTable, TableDefinition};
use tracing::{debug, info};

use crate::error::{ProvisionError, Result};
use crate::model::{Campaign, CampaignId, Credential, CredentialId, NewCredential};

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

const CREDENTIALS: TableDefinition<u64, &[u8]> = TableDefinition::new("credentials");
const CAMPAIGNS: TableDefinition<u64, &[u8]> = TableDefinition::new("campaigns");

fn db_err(e: impl std::fmt::Display) -> ProvisionError {
    ProvisionError::Store(e.to_string())
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(db_err)
}

// ---------------------------------------------------------------------------
// ProvisionDb
// ---------------------------------------------------------------------------

/// Durable store for [`Credential`] and [`Campaign`] records.
pub struct ProvisionDb {
    db: Database,
}

impl std::fmt::Debug for ProvisionDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisionDb").finish_non_exhaustive()
    }
}

impl ProvisionDb {
    /// Open or create the database at `path`, creating both tables.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(db_err)?;
        let wt = db.begin_write().map_err(db_err)?;
        wt.open_table(CREDENTIALS).map_err(db_err)?;
        wt.open_table(CAMPAIGNS).map_err(db_err)?;
        wt.commit().map_err(db_err)?;
        Ok(Self { db })
    }

    // -----------------------------------------------------------------------
    // Credentials
    // -----------------------------------------------------------------------

    /// Register a credential. Ids are assigned sequentially starting at 1.
    pub fn add_credential(&self, new: NewCredential) -> Result<Credential> {
        if new.login.trim().is_empty() {
            return Err(ProvisionError::invalid("login", "must not be empty"));
        }
        let wt = self.db.begin_write().map_err(db_err)?;
        let credential = {
            let mut table = wt.open_table(CREDENTIALS).map_err(db_err)?;
            let next_id = match table.last().map_err(db_err)? {
                Some((k, _)) => k.value() + 1,
                None => 1,
            };
            let credential = Credential {
                id: next_id,
                login: new.login,
                secret: new.secret,
                assigned_campaign: None,
                annotation: None,
                egress: new.egress,
                assigned_at: None,
                created_at: Utc::now(),
            };
            let value = serde_json::to_vec(&credential)?;
            table
                .insert(credential.id, value.as_slice())
                .map_err(db_err)?;
            credential
        };
        wt.commit().map_err(db_err)?;
        debug!(credential_id = credential.id, "credential added");
        Ok(credential)
    }

    pub fn get_credential(&self, id: CredentialId) -> Result<Option<Credential>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(CREDENTIALS).map_err(db_err)?;
        match table.get(id).map_err(db_err)? {
            Some(v) => Ok(Some(decode(v.value())?)),
            None => Ok(None),
        }
    }

    /// All credentials in ascending id order.
    pub fn list_credentials(&self) -> Result<Vec<Credential>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(CREDENTIALS).map_err(db_err)?;
        let mut result = Vec::new();
        for entry in table.iter().map_err(db_err)? {
            let (_, v) = entry.map_err(db_err)?;
            result.push(decode(v.value())?);
        }
        Ok(result)
    }

    /// The lowest-id credential whose `assigned_campaign` is unset.
    pub fn first_free_credential(&self) -> Result<Option<Credential>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(CREDENTIALS).map_err(db_err)?;
        for entry in table.iter().map_err(db_err)? {
            let (_, v) = entry.map_err(db_err)?;
            let credential: Credential = decode(v.value())?;
            if credential.is_free() {
                return Ok(Some(credential));
            }
        }
        Ok(None)
    }

    /// Bind `credential_id` to `campaign_id`, recording `locality` as the
    /// annotation, in one write transaction.
    ///
    /// Refuses (and rolls back) when the credential does not exist or is
    /// already assigned.
    pub fn commit_assignment(
        &self,
        credential_id: CredentialId,
        campaign_id: CampaignId,
        locality: &str,
    ) -> Result<Credential> {
        let wt = self.db.begin_write().map_err(db_err)?;
        let outcome = {
            let mut table = wt.open_table(CREDENTIALS).map_err(db_err)?;
            let existing = table
                .get(credential_id)
                .map_err(db_err)?
                .map(|v| v.value().to_vec());
            match existing {
                None => Err(ProvisionError::CredentialNotFound(credential_id)),
                Some(bytes) => {
                    let mut credential: Credential = decode(&bytes)?;
                    if let Some(owner) = credential.assigned_campaign {
                        Err(ProvisionError::AlreadyAssigned {
                            credential_id,
                            campaign_id: owner,
                        })
                    } else {
                        credential.assigned_campaign = Some(campaign_id);
                        credential.annotation = Some(locality.to_string());
                        credential.assigned_at = Some(Utc::now());
                        let value = serde_json::to_vec(&credential)?;
                        table
                            .insert(credential_id, value.as_slice())
                            .map_err(db_err)?;
                        Ok(credential)
                    }
                }
            }
        };

        match outcome {
            Ok(credential) => {
                wt.commit().map_err(db_err)?;
                info!(
                    credential_id,
                    campaign_id,
                    locality = %locality,
                    "assignment committed"
                );
                Ok(credential)
            }
            Err(e) => {
                wt.abort().map_err(db_err)?;
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Campaigns
    // -----------------------------------------------------------------------

    /// Register a campaign under its external id.
    pub fn add_campaign(&self, campaign: &Campaign) -> Result<()> {
        if campaign.target_site.trim().is_empty() {
            return Err(ProvisionError::invalid("target_site", "must not be empty"));
        }
        let value = serde_json::to_vec(campaign)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        let exists = {
            let mut table = wt.open_table(CAMPAIGNS).map_err(db_err)?;
            let exists = table.get(campaign.id).map_err(db_err)?.is_some();
            if !exists {
                table
                    .insert(campaign.id, value.as_slice())
                    .map_err(db_err)?;
            }
            exists
        };
        if exists {
            wt.abort().map_err(db_err)?;
            return Err(ProvisionError::CampaignExists(campaign.id));
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    pub fn get_campaign(&self, id: CampaignId) -> Result<Option<Campaign>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(CAMPAIGNS).map_err(db_err)?;
        match table.get(id).map_err(db_err)? {
            Some(v) => Ok(Some(decode(v.value())?)),
            None => Ok(None),
        }
    }

    /// All campaigns in ascending id order.
    pub fn list_campaigns(&self) -> Result<Vec<Campaign>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(CAMPAIGNS).map_err(db_err)?;
        let mut result = Vec::new();
        for entry in table.iter().map_err(db_err)? {
            let (_, v) = entry.map_err(db_err)?;
            result.push(decode(v.value())?);
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
