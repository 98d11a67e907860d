//! Declarative description of each stage: which control to wait for, what to
//! do with it, and how to tell that it worked.

use std::time::Duration;

use tracing::warn;

use super::keywords::sanitize_keywords;
use super::Stage;
use crate::config::Config;
use crate::model::{Campaign, Credential, WorkItem};
use crate::session::{Key, Locator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    Fill(String),
    Click,
    Keys(Vec<Key>),
}

/// Post-action condition a step must observe before it counts as done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessCheck {
    None,
    UrlContains { marker: String, timeout: Duration },
    Visible { locator: Locator, timeout: Duration },
    /// Give the remote side time to persist before moving on.
    Settle(Duration),
}

#[derive(Debug, Clone)]
pub struct StepDescriptor {
    pub label: &'static str,
    pub locator: Locator,
    pub action: StepAction,
    pub check: SuccessCheck,
}

impl StepDescriptor {
    fn new(label: &'static str, css: &str, action: StepAction) -> Self {
        Self {
            label,
            locator: Locator::css(css),
            action,
            check: SuccessCheck::None,
        }
    }

    fn then(mut self, check: SuccessCheck) -> Self {
        self.check = check;
        self
    }
}

#[derive(Debug, Clone)]
pub struct StageDescriptor {
    pub stage: Stage,
    pub steps: Vec<StepDescriptor>,
}

/// Build the five stages for one credential and work item, in order.
pub fn stage_plan(
    config: &Config,
    credential: &Credential,
    campaign: &Campaign,
    item: &WorkItem,
) -> Vec<StageDescriptor> {
    let sel = &config.selectors;
    let res = &config.resilience;

    let keywords = sanitize_keywords(&item.phrases);
    if keywords.is_empty() {
        warn!(item = %item.key(), "keyword list is empty after sanitizing");
    }

    vec![
        StageDescriptor {
            stage: Stage::Authenticating,
            steps: vec![
                StepDescriptor::new(
                    "identity",
                    &sel.login_identity,
                    StepAction::Fill(credential.login.clone()),
                ),
                StepDescriptor::new(
                    "secret",
                    &sel.login_secret,
                    StepAction::Fill(credential.secret.clone()),
                ),
                StepDescriptor::new("submit", &sel.login_submit, StepAction::Click).then(
                    SuccessCheck::UrlContains {
                        marker: sel.post_login_url_marker.clone(),
                        timeout: res.login_timeout(),
                    },
                ),
            ],
        },
        StageDescriptor {
            stage: Stage::ProjectSetup,
            steps: vec![
                StepDescriptor::new(
                    "target site",
                    &sel.project_site_field,
                    StepAction::Fill(campaign.target_site.clone()),
                ),
                StepDescriptor::new("start project", &sel.project_start_button, StepAction::Click)
                    .then(SuccessCheck::Visible {
                        locator: Locator::css(&sel.project_landmark),
                        timeout: res.landmark_timeout(),
                    }),
            ],
        },
        StageDescriptor {
            stage: Stage::LocalityEntry,
            steps: vec![
                StepDescriptor::new(
                    "locality",
                    &sel.locality_field,
                    StepAction::Fill(item.locality.clone()),
                )
                .then(SuccessCheck::Visible {
                    locator: Locator::css(&sel.locality_suggestions),
                    timeout: res.suggestion_timeout(),
                }),
                StepDescriptor::new(
                    "first suggestion",
                    &sel.locality_field,
                    StepAction::Keys(vec![Key::ArrowDown, Key::Enter]),
                ),
                StepDescriptor::new(
                    "business name",
                    &sel.business_name_field,
                    StepAction::Fill(campaign.name.clone()),
                ),
            ],
        },
        StageDescriptor {
            stage: Stage::KeywordEntry,
            steps: vec![StepDescriptor::new(
                "keywords",
                &sel.keyword_textarea,
                StepAction::Fill(keywords),
            )],
        },
        StageDescriptor {
            stage: Stage::TrackingStart,
            steps: vec![StepDescriptor::new(
                "begin tracking",
                &sel.begin_tracking_button,
                StepAction::Click,
            )
            .then(SuccessCheck::Settle(res.settle()))],
        },
    ]
}
