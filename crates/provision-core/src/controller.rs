//! The cycle controller: pairs free credentials with eligible work items
//! until the pool, the work, or the iteration cap runs out.
//!
//! Per iteration:
//!
//! ```text
//! acquire free credential ──none──▶ stop (PoolExhausted)
//!        │
//! next unattempted work item ──none──▶ stop (WorkExhausted)
//!        │
//! mark item attempted
//!        │
//! run configuration workflow
//!        │
//! completed? ──yes──▶ commit assignment (a storage fault is logged, not fatal)
//!        │
//! pause `delay`
//! ```
//!
//! A credential is only written after a completed workflow, so a failed
//! attempt leaves it free for the next iteration.

use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::content::ContentRepository;
use crate::error::{ProvisionError, Result};
use crate::model::{CredentialId, WorkItem, WorkKey};
use crate::pool::{CampaignCatalog, CredentialPool};
use crate::resilience::retrying;
use crate::session::SessionDriver;
use crate::work_items::WorkItemSource;
use crate::workflow::{ConfigurationWorkflow, Stage, WorkflowOutcome};

// ---------------------------------------------------------------------------
// Settings and report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CycleSettings {
    /// Pause after every iteration, whatever its outcome.
    pub delay: Duration,
    /// `None` runs until the pool or the work is exhausted.
    pub max_total_iterations: Option<u32>,
    pub content_attempts: u32,
    pub content_backoff: Duration,
}

impl CycleSettings {
    /// Content retry settings from `config`, with an already validated delay
    /// and no iteration cap.
    pub fn new(config: &Config, delay: Duration) -> Self {
        Self {
            delay,
            max_total_iterations: None,
            content_attempts: config.cycle.content_attempts,
            content_backoff: config.cycle.content_backoff(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    IterationCap,
    PoolExhausted,
    WorkExhausted,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::IterationCap => "iteration_cap",
            StopReason::PoolExhausted => "pool_exhausted",
            StopReason::WorkExhausted => "work_exhausted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum IterationResult {
    Assigned,
    Aborted { stage: Stage, reason: String },
    BootstrapFailed { reason: String },
    /// The workflow completed but the assignment could not be stored.
    CommitFailed { reason: String },
    /// The work item names a campaign the catalog does not know.
    CampaignMissing,
}

#[derive(Debug, Clone, Serialize)]
pub struct IterationRecord {
    pub iteration: u32,
    pub credential_id: CredentialId,
    pub item: WorkKey,
    #[serde(flatten)]
    pub result: IterationResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub iterations: u32,
    pub stop_reason: StopReason,
    pub records: Vec<IterationRecord>,
}

impl CycleReport {
    fn count(&self, pred: impl Fn(&IterationResult) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.result)).count()
    }

    pub fn assigned(&self) -> usize {
        self.count(|r| matches!(r, IterationResult::Assigned))
    }

    pub fn commit_failures(&self) -> usize {
        self.count(|r| matches!(r, IterationResult::CommitFailed { .. }))
    }

    /// Iterations whose workflow did not complete.
    pub fn failed(&self) -> usize {
        self.count(|r| {
            matches!(
                r,
                IterationResult::Aborted { .. } | IterationResult::BootstrapFailed { .. }
            )
        })
    }
}

// ---------------------------------------------------------------------------
// CycleController
// ---------------------------------------------------------------------------

pub struct CycleController<'a, P, C, R, D>
where
    P: CredentialPool,
    C: CampaignCatalog,
    R: ContentRepository,
    D: SessionDriver,
{
    pool: &'a P,
    catalog: &'a C,
    source: WorkItemSource<'a, R>,
    workflow: ConfigurationWorkflow<'a, D>,
    settings: CycleSettings,
}

impl<'a, P, C, R, D> CycleController<'a, P, C, R, D>
where
    P: CredentialPool,
    C: CampaignCatalog,
    R: ContentRepository,
    D: SessionDriver,
{
    pub fn new(
        pool: &'a P,
        catalog: &'a C,
        content: &'a R,
        driver: &'a D,
        config: &'a Config,
        settings: CycleSettings,
    ) -> Self {
        Self {
            pool,
            catalog,
            source: WorkItemSource::new(content),
            workflow: ConfigurationWorkflow::new(driver, config),
            settings,
        }
    }

    /// Run one cycle to completion.
    ///
    /// Each work item is attempted at most once per call. Errors from the
    /// credential pool or the catalog end the cycle; everything else is
    /// recorded and the cycle moves on.
    pub fn run(&self) -> Result<CycleReport> {
        let started_at = Utc::now();
        let mut attempted: HashSet<WorkKey> = HashSet::new();
        let mut records = Vec::new();
        let mut iterations = 0u32;

        info!(
            cap = ?self.settings.max_total_iterations,
            delay = ?self.settings.delay,
            "cycle started"
        );

        let stop_reason = loop {
            if let Some(cap) = self.settings.max_total_iterations {
                if iterations >= cap {
                    break StopReason::IterationCap;
                }
            }

            let Some(credential) = self.pool.acquire_free()? else {
                info!("no free credentials remain");
                break StopReason::PoolExhausted;
            };

            let Some(item) = self.next_item(&attempted) else {
                info!("no unattempted work items remain");
                break StopReason::WorkExhausted;
            };

            iterations += 1;
            let key = item.key();
            attempted.insert(key.clone());
            info!(
                iteration = iterations,
                credential_id = credential.id,
                item = %key,
                "iteration started"
            );

            let result = match self.catalog.campaign(item.campaign_id)? {
                Some(campaign) => {
                    let run = self.workflow.run(&credential, &campaign, &item);
                    self.settle(credential.id, &item, run.outcome)
                }
                None => {
                    warn!(item = %key, "campaign not in catalog, skipping");
                    IterationResult::CampaignMissing
                }
            };

            records.push(IterationRecord {
                iteration: iterations,
                credential_id: credential.id,
                item: key,
                result,
            });

            if !self.settings.delay.is_zero() {
                thread::sleep(self.settings.delay);
            }
        };

        let report = CycleReport {
            started_at,
            finished_at: Utc::now(),
            iterations,
            stop_reason,
            records,
        };
        info!(
            iterations = report.iterations,
            assigned = report.assigned(),
            failed = report.failed(),
            commit_failures = report.commit_failures(),
            stop_reason = ?report.stop_reason,
            "cycle finished"
        );
        Ok(report)
    }

    /// Next eligible item, retrying the content lookup on repository errors.
    /// An unavailable repository reads as no more work.
    fn next_item(&self, attempted: &HashSet<WorkKey>) -> Option<WorkItem> {
        let mut found = None;
        let reachable = retrying(
            "content lookup",
            self.settings.content_attempts,
            self.settings.content_backoff,
            || match self.source.try_next_eligible(attempted) {
                Ok(item) => {
                    found = item;
                    true
                }
                Err(e) => {
                    warn!(error = %e, "content lookup failed");
                    false
                }
            },
        );
        if !reachable {
            error!("content repository unavailable");
        }
        found
    }

    fn settle(
        &self,
        credential_id: CredentialId,
        item: &WorkItem,
        outcome: WorkflowOutcome,
    ) -> IterationResult {
        match outcome {
            WorkflowOutcome::Completed => {
                match self
                    .pool
                    .commit_assignment(credential_id, item.campaign_id, &item.locality)
                {
                    Ok(()) => IterationResult::Assigned,
                    Err(e) => {
                        error!(
                            credential_id,
                            item = %item.key(),
                            error = %e,
                            "assignment commit failed after external configuration was applied"
                        );
                        IterationResult::CommitFailed {
                            reason: e.to_string(),
                        }
                    }
                }
            }
            WorkflowOutcome::Aborted { stage, reason } => {
                IterationResult::Aborted { stage, reason }
            }
            WorkflowOutcome::BootstrapFailed { reason } => {
                IterationResult::BootstrapFailed { reason }
            }
        }
    }
}

/// Resolve the iteration cap a control surface asked for against the
/// configured ceiling. An absent request runs up to the ceiling.
pub fn effective_cap(requested: Option<u32>, ceiling: u32) -> u32 {
    requested.map_or(ceiling, |r| r.min(ceiling))
}

/// Validate a requested inter-iteration delay in seconds.
pub fn delay_from_secs(seconds: f64) -> Result<Duration> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ProvisionError::invalid(
            "delay",
            format!("must be a finite, non-negative number of seconds (got {seconds})"),
        ));
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| ProvisionError::invalid("delay", format!("{seconds} seconds: {e}")))
}
