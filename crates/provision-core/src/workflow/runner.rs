use std::thread;

use tracing::debug;

use super::plan::{StageDescriptor, StepAction, StepDescriptor, SuccessCheck};
use crate::config::ResilienceConfig;
use crate::resilience::{
    act_with_fallback, retry_step, wait_for_actionable, wait_for_url, wait_for_visible,
    StepOutcome,
};
use crate::session::{ElementAction, Session};

/// Executes stage descriptors against a session.
///
/// Each step gets `step_attempts` tries. Missing or blocked controls are
/// transient; a success check that never holds is fatal, since its wait was
/// already bounded.
pub(crate) struct StepRunner<'c> {
    resilience: &'c ResilienceConfig,
}

impl<'c> StepRunner<'c> {
    pub(crate) fn new(resilience: &'c ResilienceConfig) -> Self {
        Self { resilience }
    }

    pub(crate) fn run_stage<S: Session>(
        &self,
        session: &mut S,
        stage: &StageDescriptor,
    ) -> StepOutcome {
        for step in &stage.steps {
            let label = format!("{}/{}", stage.stage, step.label);
            let outcome = retry_step(
                &label,
                self.resilience.step_attempts,
                self.resilience.step_backoff(),
                |attempt| {
                    debug!(step = %label, attempt, "running step");
                    self.attempt(session, step)
                },
            );
            if !outcome.is_success() {
                return outcome;
            }
        }
        StepOutcome::Success
    }

    fn attempt<S: Session>(&self, session: &mut S, step: &StepDescriptor) -> StepOutcome {
        let poll = self.resilience.poll_interval();
        let handle = match wait_for_actionable(
            session,
            &step.locator,
            self.resilience.element_timeout(),
            poll,
        ) {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                return StepOutcome::Transient(format!(
                    "{} control '{}' never became actionable",
                    step.label, step.locator
                ))
            }
            Err(e) => return e.into(),
        };

        let acted = match &step.action {
            StepAction::Fill(text) => {
                act_with_fallback(session, &handle, &ElementAction::Fill(text.clone()), step.label)
            }
            StepAction::Click => {
                act_with_fallback(session, &handle, &ElementAction::Click, step.label)
            }
            StepAction::Keys(keys) => session.press_keys(&handle, keys).map(|()| true),
        };
        match acted {
            Ok(true) => {}
            Ok(false) => {
                return StepOutcome::Transient(format!("{} action was blocked", step.label));
            }
            Err(e) => return e.into(),
        }

        self.check(session, step)
    }

    fn check<S: Session>(&self, session: &mut S, step: &StepDescriptor) -> StepOutcome {
        let poll = self.resilience.poll_interval();
        let observed = match &step.check {
            SuccessCheck::None => return StepOutcome::Success,
            SuccessCheck::Settle(pause) => {
                if !pause.is_zero() {
                    thread::sleep(*pause);
                }
                return StepOutcome::Success;
            }
            SuccessCheck::UrlContains { marker, timeout } => {
                wait_for_url(session, marker, *timeout, poll).map(|ok| {
                    (ok, format!("url never contained '{marker}' within {timeout:?}"))
                })
            }
            SuccessCheck::Visible { locator, timeout } => {
                wait_for_visible(session, locator, *timeout, poll)
                    .map(|ok| (ok, format!("'{locator}' never became visible within {timeout:?}")))
            }
        };
        match observed {
            Ok((true, _)) => StepOutcome::Success,
            Ok((false, reason)) => StepOutcome::Fatal(format!("{}: {reason}", step.label)),
            Err(e) => e.into(),
        }
    }
}
