//! The configuration workflow: one credential, one work item, one session.
//!
//! Stages run strictly in [`Stage::ORDER`]. The first stage that does not
//! succeed ends the run as [`WorkflowOutcome::Aborted`]; later stages are
//! never attempted. However the run ends, the session is logged out
//! (best effort) and closed before [`ConfigurationWorkflow::run`] returns,
//! and also if it unwinds.

mod keywords;
mod plan;
mod runner;

pub use keywords::sanitize_keywords;
pub use plan::{stage_plan, StageDescriptor, StepAction, StepDescriptor, SuccessCheck};

use std::fmt;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{Config, ResilienceConfig, SelectorConfig};
use crate::model::{Campaign, Credential, WorkItem};
use crate::resilience::{act_with_fallback, wait_for_actionable, StepOutcome};
use crate::session::{ElementAction, Locator, Session, SessionDriver, SessionOptions};
use runner::StepRunner;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Authenticating,
    ProjectSetup,
    LocalityEntry,
    KeywordEntry,
    TrackingStart,
}

impl Stage {
    pub const ORDER: [Stage; 5] = [
        Stage::Authenticating,
        Stage::ProjectSetup,
        Stage::LocalityEntry,
        Stage::KeywordEntry,
        Stage::TrackingStart,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Authenticating => "authenticating",
            Stage::ProjectSetup => "project_setup",
            Stage::LocalityEntry => "locality_entry",
            Stage::KeywordEntry => "keyword_entry",
            Stage::TrackingStart => "tracking_start",
        }
    }

    /// The stage after this one, or `None` after `TrackingStart`.
    pub fn next(self) -> Option<Stage> {
        let idx = Self::ORDER.iter().position(|s| *s == self)?;
        Self::ORDER.get(idx + 1).copied()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkflowOutcome {
    Completed,
    Aborted { stage: Stage, reason: String },
    /// No session could be opened; no stage was entered.
    BootstrapFailed { reason: String },
}

impl WorkflowOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, WorkflowOutcome::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowRun {
    pub outcome: WorkflowOutcome,
    /// Stages that succeeded, in the order they ran.
    pub stages_completed: Vec<Stage>,
}

// ---------------------------------------------------------------------------
// ConfigurationWorkflow
// ---------------------------------------------------------------------------

pub struct ConfigurationWorkflow<'a, D: SessionDriver> {
    driver: &'a D,
    config: &'a Config,
}

impl<'a, D: SessionDriver> ConfigurationWorkflow<'a, D> {
    pub fn new(driver: &'a D, config: &'a Config) -> Self {
        Self { driver, config }
    }

    /// Drive one credential through every stage for `item`.
    ///
    /// Never commits anything; the caller decides what a completed run means
    /// for the credential.
    pub fn run(
        &self,
        credential: &Credential,
        campaign: &Campaign,
        item: &WorkItem,
    ) -> WorkflowRun {
        let options = self.session_options(credential);
        let session = match self.driver.open(&options) {
            Ok(Some(session)) => session,
            Ok(None) => return bootstrap_failed("driver refused to open a session".into()),
            Err(e) => return bootstrap_failed(e.to_string()),
        };
        let mut guard = SessionGuard {
            session,
            selectors: &self.config.selectors,
            resilience: &self.config.resilience,
        };

        let runner = StepRunner::new(&self.config.resilience);
        let mut stages_completed = Vec::new();
        let mut outcome = WorkflowOutcome::Completed;
        for stage in stage_plan(self.config, credential, campaign, item) {
            info!(
                credential_id = credential.id,
                item = %item.key(),
                stage = %stage.stage,
                "entering stage"
            );
            match runner.run_stage(&mut guard.session, &stage) {
                StepOutcome::Success => stages_completed.push(stage.stage),
                StepOutcome::Transient(reason) | StepOutcome::Fatal(reason) => {
                    warn!(
                        credential_id = credential.id,
                        item = %item.key(),
                        stage = %stage.stage,
                        %reason,
                        "workflow aborted"
                    );
                    outcome = WorkflowOutcome::Aborted {
                        stage: stage.stage,
                        reason,
                    };
                    break;
                }
            }
        }
        drop(guard);

        if outcome.is_completed() {
            info!(credential_id = credential.id, item = %item.key(), "workflow completed");
        }
        WorkflowRun {
            outcome,
            stages_completed,
        }
    }

    fn session_options(&self, credential: &Credential) -> SessionOptions {
        let driver = &self.config.driver;
        let proxy = credential.egress.as_deref().and_then(|name| {
            let proxy = driver.proxy(name).cloned();
            if proxy.is_none() {
                warn!(
                    credential_id = credential.id,
                    egress = name,
                    "egress proxy not configured, connecting directly"
                );
            }
            proxy
        });
        let user_agent = driver.user_agents.choose(&mut rand::thread_rng()).cloned();
        SessionOptions {
            start_url: driver.login_url.clone(),
            proxy,
            user_agent,
        }
    }
}

fn bootstrap_failed(reason: String) -> WorkflowRun {
    warn!(%reason, "session bootstrap failed");
    WorkflowRun {
        outcome: WorkflowOutcome::BootstrapFailed { reason },
        stages_completed: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Teardown
// ---------------------------------------------------------------------------

/// Owns the open session; logs out and closes it when dropped.
struct SessionGuard<'c, S: Session> {
    session: S,
    selectors: &'c SelectorConfig,
    resilience: &'c ResilienceConfig,
}

impl<S: Session> Drop for SessionGuard<'_, S> {
    fn drop(&mut self) {
        logout(&mut self.session, self.selectors, self.resilience);
        match self.session.close() {
            Ok(()) => debug!("session closed"),
            Err(e) => warn!(error = %e, "failed to close session"),
        }
    }
}

fn logout<S: Session>(session: &mut S, selectors: &SelectorConfig, resilience: &ResilienceConfig) {
    let steps = [
        ("account menu", selectors.account_menu.as_str()),
        ("logout", selectors.logout_button.as_str()),
    ];
    for (label, css) in steps {
        let locator = Locator::css(css);
        let handle = match wait_for_actionable(
            session,
            &locator,
            resilience.element_timeout(),
            resilience.poll_interval(),
        ) {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                debug!(control = label, "logout control not present, skipping logout");
                return;
            }
            Err(e) => {
                warn!(control = label, error = %e, "logout failed");
                return;
            }
        };
        match act_with_fallback(session, &handle, &ElementAction::Click, label) {
            Ok(true) => {}
            Ok(false) => {
                warn!(control = label, "logout control could not be clicked");
                return;
            }
            Err(e) => {
                warn!(control = label, error = %e, "logout failed");
                return;
            }
        }
    }
    debug!("logged out");
}
