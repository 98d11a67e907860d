//! Bounded waiting and retry primitives.
//!
//! Everything here polls. Each wait checks its condition at least once, even
//! with a zero timeout, and then at `poll` intervals until the deadline.
//! Transient [`DriverError`]s are absorbed and reported as "not ready";
//! faults propagate to the caller.

use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::session::{
    ActMode, DriverError, DriverResult, ElementAction, ElementHandle, Locator, Session,
};

/// Result of one attempt at a workflow step or stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum StepOutcome {
    Success,
    /// Worth another attempt.
    Transient(String),
    /// Retrying cannot help.
    Fatal(String),
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success)
    }
}

impl From<DriverError> for StepOutcome {
    fn from(e: DriverError) -> Self {
        if e.is_transient() {
            StepOutcome::Transient(e.to_string())
        } else {
            StepOutcome::Fatal(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

fn poll_until<F>(timeout: Duration, poll: Duration, mut check: F) -> DriverResult<bool>
where
    F: FnMut() -> DriverResult<bool>,
{
    let started = Instant::now();
    loop {
        match check() {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(e) if e.is_transient() => debug!(error = %e, "condition not ready"),
            Err(e) => return Err(e),
        }
        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Ok(false);
        }
        thread::sleep(poll.min(timeout - elapsed));
    }
}

/// Wait until `locator` resolves to an element that is displayed and enabled.
///
/// Returns `Ok(None)` when the timeout elapses first.
pub fn wait_for_actionable<S: Session>(
    session: &mut S,
    locator: &Locator,
    timeout: Duration,
    poll: Duration,
) -> DriverResult<Option<ElementHandle>> {
    let mut found = None;
    let ready = poll_until(timeout, poll, || {
        let Some(handle) = session.locate(locator)? else {
            return Ok(false);
        };
        if session.is_interactable(&handle)? {
            found = Some(handle);
            return Ok(true);
        }
        Ok(false)
    })?;
    if !ready {
        debug!(%locator, ?timeout, "element not actionable before timeout");
    }
    Ok(found)
}

/// Wait until `locator` resolves to a displayed element.
pub fn wait_for_visible<S: Session>(
    session: &mut S,
    locator: &Locator,
    timeout: Duration,
    poll: Duration,
) -> DriverResult<bool> {
    poll_until(timeout, poll, || match session.locate(locator)? {
        Some(handle) => session.is_visible(&handle),
        None => Ok(false),
    })
}

/// Wait until the session's current URL contains `marker`.
pub fn wait_for_url<S: Session>(
    session: &mut S,
    marker: &str,
    timeout: Duration,
    poll: Duration,
) -> DriverResult<bool> {
    poll_until(timeout, poll, || Ok(session.current_url()?.contains(marker)))
}

// ---------------------------------------------------------------------------
// Acting
// ---------------------------------------------------------------------------

/// Perform `action` directly; if that is blocked by a transient condition,
/// try once more through the programmatic path.
///
/// `Ok(false)` means both paths failed transiently. Faults propagate.
pub fn act_with_fallback<S: Session>(
    session: &mut S,
    handle: &ElementHandle,
    action: &ElementAction,
    label: &str,
) -> DriverResult<bool> {
    let first = match session.act(handle, action, ActMode::Direct) {
        Ok(()) => return Ok(true),
        Err(e) if e.is_transient() => e,
        Err(e) => return Err(e),
    };
    warn!(
        step = label,
        action = action.name(),
        error = %first,
        "direct action blocked, using programmatic fallback"
    );
    match session.act(handle, action, ActMode::Programmatic) {
        Ok(()) => Ok(true),
        Err(e) if e.is_transient() => {
            warn!(step = label, action = action.name(), error = %e, "programmatic fallback failed");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Retrying
// ---------------------------------------------------------------------------

/// Run `op` up to `attempts` times (at least once), sleeping `backoff`
/// between attempts. Stops early on `Success` or `Fatal`; returns the last
/// outcome otherwise.
pub fn retry_step<F>(label: &str, attempts: u32, backoff: Duration, mut op: F) -> StepOutcome
where
    F: FnMut(u32) -> StepOutcome,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        let outcome = op(attempt);
        match &outcome {
            StepOutcome::Success | StepOutcome::Fatal(_) => return outcome,
            StepOutcome::Transient(reason) => {
                warn!(step = label, attempt, attempts, %reason, "attempt failed");
                if attempt >= attempts {
                    return outcome;
                }
            }
        }
        if !backoff.is_zero() {
            thread::sleep(backoff);
        }
        attempt += 1;
    }
}

/// Boolean form of [`retry_step`]: `true` as soon as `op` succeeds.
pub fn retrying<F>(label: &str, attempts: u32, backoff: Duration, mut op: F) -> bool
where
    F: FnMut() -> bool,
{
    retry_step(label, attempts, backoff, |_| {
        if op() {
            StepOutcome::Success
        } else {
            StepOutcome::Transient("operation reported failure".into())
        }
    })
    .is_success()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSession, Script};

    const POLL: Duration = Duration::from_millis(1);

    #[test]
    fn actionable_found_immediately() {
        let mut s = FakeSession::new(Script::default().element("#go"));
        let h = wait_for_actionable(&mut s, &Locator::css("#go"), Duration::ZERO, POLL).unwrap();
        assert!(h.is_some());
    }

    #[test]
    fn actionable_times_out_as_none() {
        let mut s = FakeSession::new(Script::default());
        let missing = Locator::css("#missing");
        let h = wait_for_actionable(&mut s, &missing, Duration::from_millis(5), POLL).unwrap();
        assert!(h.is_none());
    }

    #[test]
    fn actionable_waits_for_element_to_appear() {
        let mut s = FakeSession::new(Script::default().element_after("#late", 3));
        let h = wait_for_actionable(&mut s, &Locator::css("#late"), Duration::from_secs(2), POLL)
            .unwrap();
        assert!(h.is_some());
    }

    #[test]
    fn unbounded_timeout_still_polls() {
        let mut s = FakeSession::new(Script::default().element_after("#late", 3));
        let h = wait_for_actionable(&mut s, &Locator::css("#late"), Duration::MAX, POLL).unwrap();
        assert!(h.is_some());
    }

    #[test]
    fn disabled_element_is_not_actionable() {
        let mut s = FakeSession::new(Script::default().disabled("#off"));
        let h = wait_for_actionable(&mut s, &Locator::css("#off"), Duration::from_millis(5), POLL)
            .unwrap();
        assert!(h.is_none());
    }

    #[test]
    fn fault_during_wait_propagates() {
        let mut s = FakeSession::new(Script::default().fault_on_locate("#boom"));
        let r = wait_for_actionable(&mut s, &Locator::css("#boom"), Duration::from_secs(1), POLL);
        assert!(matches!(r, Err(DriverError::Fault(_))));
    }

    #[test]
    fn fallback_used_when_direct_is_obstructed() {
        let mut s = FakeSession::new(Script::default().element("#btn").obstructed("#btn"));
        let h = s.locate(&Locator::css("#btn")).unwrap().unwrap();
        assert!(act_with_fallback(&mut s, &h, &ElementAction::Click, "test").unwrap());
        assert_eq!(
            s.actions(),
            vec![
                ("#btn".to_string(), ElementAction::Click, ActMode::Direct),
                ("#btn".to_string(), ElementAction::Click, ActMode::Programmatic),
            ]
        );
    }

    #[test]
    fn fallback_failure_reports_false() {
        let mut s = FakeSession::new(Script::default().element("#btn").blocked("#btn"));
        let h = s.locate(&Locator::css("#btn")).unwrap().unwrap();
        assert!(!act_with_fallback(&mut s, &h, &ElementAction::Click, "test").unwrap());
    }

    #[test]
    fn retrying_stops_on_first_success() {
        let mut calls = 0;
        let ok = retrying("op", 5, Duration::ZERO, || {
            calls += 1;
            calls == 2
        });
        assert!(ok);
        assert_eq!(calls, 2);
    }

    #[test]
    fn retrying_gives_up_after_attempts() {
        let mut calls = 0;
        let ok = retrying("op", 3, Duration::ZERO, || {
            calls += 1;
            false
        });
        assert!(!ok);
        assert_eq!(calls, 3);
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let mut calls = 0;
        retrying("op", 0, Duration::ZERO, || {
            calls += 1;
            false
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn fatal_outcome_short_circuits() {
        let mut calls = 0;
        let outcome = retry_step("op", 5, Duration::ZERO, |_| {
            calls += 1;
            StepOutcome::Fatal("no".into())
        });
        assert_eq!(outcome, StepOutcome::Fatal("no".into()));
        assert_eq!(calls, 1);
    }

    #[test]
    fn url_marker_wait() {
        let mut s = FakeSession::new(Script::default().url("https://app.example/dashboard"));
        assert!(wait_for_url(&mut s, "/dashboard", Duration::ZERO, POLL).unwrap());
        assert!(!wait_for_url(&mut s, "/nowhere", Duration::ZERO, POLL).unwrap());
    }
}
