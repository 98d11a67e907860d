//! Deterministic enumeration of (campaign, locality) work items.
//!
//! Campaigns are visited in ascending numeric id order and localities in
//! ascending lexicographic order, so two runs over the same repository see
//! items in the same sequence.

use std::collections::HashSet;

use tracing::{debug, error, warn};

use crate::content::ContentRepository;
use crate::error::Result;
use crate::model::{CampaignId, WorkItem, WorkKey};

pub struct WorkItemSource<'a, R: ContentRepository> {
    repo: &'a R,
}

impl<'a, R: ContentRepository> WorkItemSource<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    /// Campaign ids sorted ascending, duplicates removed.
    pub fn list_eligible_campaigns(&self) -> Result<Vec<CampaignId>> {
        let mut ids = self.repo.list_accessible_campaigns()?;
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    /// Locality names for one campaign, sorted ascending.
    pub fn list_localities(&self, campaign_id: CampaignId) -> Result<Vec<String>> {
        let mut names = self.repo.list_localities(campaign_id)?;
        names.sort();
        names.dedup();
        Ok(names)
    }

    pub fn list_phrases(&self, campaign_id: CampaignId, locality: &str) -> Result<Vec<String>> {
        self.repo.list_phrases(campaign_id, locality)
    }

    /// First item in enumeration order whose key is not in `excluded` and
    /// whose phrase list is non-empty. A locality whose phrases cannot be
    /// read is logged and skipped; failures to list campaigns or localities
    /// propagate.
    pub fn try_next_eligible(&self, excluded: &HashSet<WorkKey>) -> Result<Option<WorkItem>> {
        for campaign_id in self.list_eligible_campaigns()? {
            for locality in self.list_localities(campaign_id)? {
                let key = WorkKey::new(campaign_id, locality.as_str());
                if excluded.contains(&key) {
                    continue;
                }
                let phrases = match self.list_phrases(campaign_id, &locality) {
                    Ok(phrases) => phrases,
                    Err(e) => {
                        warn!(item = %key, error = %e, "skipping unreadable locality");
                        continue;
                    }
                };
                if phrases.is_empty() {
                    debug!(item = %key, "skipping locality with no phrases");
                    continue;
                }
                return Ok(Some(WorkItem {
                    campaign_id,
                    locality,
                    phrases,
                }));
            }
        }
        Ok(None)
    }

    /// Like [`Self::try_next_eligible`], but a repository failure is logged
    /// and reported as "no item".
    pub fn next_eligible_work_item(&self, excluded: &HashSet<WorkKey>) -> Option<WorkItem> {
        match self.try_next_eligible(excluded) {
            Ok(item) => item,
            Err(e) => {
                error!(error = %e, "content repository unavailable");
                None
            }
        }
    }
}
