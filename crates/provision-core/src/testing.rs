//! In-memory stand-ins for the browser, the content repository and the
//! credential pool, used by unit tests across the crate.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use crate::config::{Config, SelectorConfig};
use crate::content::ContentRepository;
use crate::error::{ProvisionError, Result};
use crate::model::{Campaign, CampaignId, Credential, CredentialId};
use crate::pool::{CampaignCatalog, CredentialPool};
use crate::session::{
    ActMode, DriverError, DriverResult, ElementAction, ElementHandle, Key, Locator, Session,
    SessionDriver, SessionOptions,
};

/// Config with timeouts and backoffs small enough for unit tests.
pub fn fast_config() -> Config {
    let mut config = Config::new("test");
    config.driver.login_url = "https://app.example/login".into();
    config.resilience.poll_interval_ms = 1;
    config.resilience.element_timeout_secs = 0;
    config.resilience.step_attempts = 2;
    config.resilience.step_backoff_ms = 0;
    config.resilience.login_timeout_secs = 0;
    config.resilience.landmark_timeout_secs = 0;
    config.resilience.suggestion_timeout_secs = 0;
    config.resilience.settle_ms = 0;
    config.cycle.delay_seconds = 0.0;
    config.cycle.content_backoff_ms = 0;
    config
}

// ---------------------------------------------------------------------------
// Scripted browser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct FakeElement {
    appear_after: u32,
    enabled: bool,
    direct_blocked: bool,
    programmatic_blocked: bool,
}

impl Default for FakeElement {
    fn default() -> Self {
        Self {
            appear_after: 0,
            enabled: true,
            direct_blocked: false,
            programmatic_blocked: false,
        }
    }
}

/// Describes how the fake remote UI behaves. Elements not listed are absent.
#[derive(Debug, Clone, Default)]
pub struct Script {
    elements: HashMap<String, FakeElement>,
    locate_faults: Vec<String>,
    navigations: HashMap<String, String>,
    refused_values: Vec<String>,
    url: String,
    close_fails: bool,
}

impl Script {
    /// Every control the workflow touches is present, and submitting the
    /// login form lands on the post-login URL.
    pub fn happy_path(selectors: &SelectorConfig) -> Self {
        let mut script = Self::default().url("https://app.example/login");
        for (name, css) in selectors.entries() {
            if name == "post_login_url_marker" {
                continue;
            }
            script = script.element(css);
        }
        let landing = format!("https://app.example{}", selectors.post_login_url_marker);
        script.navigates(&selectors.login_submit, &landing)
    }

    pub fn element(mut self, css: &str) -> Self {
        self.elements.entry(css.to_string()).or_default();
        self
    }

    /// Present only from the `n`th locate call onward.
    pub fn element_after(mut self, css: &str, n: u32) -> Self {
        self.elements.entry(css.to_string()).or_default().appear_after = n;
        self
    }

    pub fn disabled(mut self, css: &str) -> Self {
        self.elements.entry(css.to_string()).or_default().enabled = false;
        self
    }

    /// Direct input is intercepted; the programmatic path works.
    pub fn obstructed(mut self, css: &str) -> Self {
        self.elements.entry(css.to_string()).or_default().direct_blocked = true;
        self
    }

    /// Both delivery paths fail transiently.
    pub fn blocked(mut self, css: &str) -> Self {
        let el = self.elements.entry(css.to_string()).or_default();
        el.direct_blocked = true;
        el.programmatic_blocked = true;
        self
    }

    pub fn without(mut self, css: &str) -> Self {
        self.elements.remove(css);
        self
    }

    pub fn fault_on_locate(mut self, css: &str) -> Self {
        self.locate_faults.push(css.to_string());
        self
    }

    /// Clicking `css` moves the session to `url`.
    pub fn navigates(mut self, css: &str, url: &str) -> Self {
        self.navigations.insert(css.to_string(), url.to_string());
        self
    }

    /// Any fill with exactly this text is rejected on both delivery paths.
    pub fn refuse_value(mut self, text: &str) -> Self {
        self.refused_values.push(text.to_string());
        self
    }

    pub fn url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    /// Teardown goes wrong: the logout controls are gone and `close` errors.
    pub fn broken_teardown(self, selectors: &SelectorConfig) -> Self {
        let mut script = self
            .without(&selectors.account_menu)
            .without(&selectors.logout_button);
        script.close_fails = true;
        script
    }
}

/// Everything the fake sessions observed, shared with the test.
#[derive(Debug, Default)]
pub struct Journal {
    pub opened: Vec<SessionOptions>,
    pub actions: Vec<(String, ElementAction, ActMode)>,
    pub keys: Vec<(String, Vec<Key>)>,
    pub closed: u32,
}

pub struct FakeSession {
    script: Script,
    url: String,
    locates: HashMap<String, u32>,
    journal: Arc<Mutex<Journal>>,
}

impl FakeSession {
    pub fn new(script: Script) -> Self {
        Self::with_journal(script, Arc::default())
    }

    fn with_journal(script: Script, journal: Arc<Mutex<Journal>>) -> Self {
        Self {
            url: script.url.clone(),
            script,
            locates: HashMap::new(),
            journal,
        }
    }

    fn journal(&self) -> MutexGuard<'_, Journal> {
        self.journal.lock().unwrap()
    }

    pub fn actions(&self) -> Vec<(String, ElementAction, ActMode)> {
        self.journal().actions.clone()
    }

    fn lookup(&self, handle: &ElementHandle) -> DriverResult<&FakeElement> {
        self.script
            .elements
            .get(&handle.0)
            .ok_or_else(|| DriverError::Stale(handle.0.clone()))
    }
}

impl Session for FakeSession {
    fn locate(&mut self, locator: &Locator) -> DriverResult<Option<ElementHandle>> {
        let css = locator.as_str();
        if self.script.locate_faults.iter().any(|f| f == css) {
            return Err(DriverError::Fault(format!("locate {css} exploded")));
        }
        let seen = self.locates.entry(css.to_string()).or_insert(0);
        *seen += 1;
        let seen = *seen;
        Ok(self
            .script
            .elements
            .get(css)
            .filter(|el| seen > el.appear_after)
            .map(|_| ElementHandle(css.to_string())))
    }

    fn is_interactable(&mut self, handle: &ElementHandle) -> DriverResult<bool> {
        Ok(self.lookup(handle)?.enabled)
    }

    fn is_visible(&mut self, handle: &ElementHandle) -> DriverResult<bool> {
        self.lookup(handle).map(|_| true)
    }

    fn act(
        &mut self,
        handle: &ElementHandle,
        action: &ElementAction,
        mode: ActMode,
    ) -> DriverResult<()> {
        let el = self.lookup(handle)?.clone();
        self.journal()
            .actions
            .push((handle.0.clone(), action.clone(), mode));
        if let ElementAction::Fill(text) = action {
            if self.script.refused_values.contains(text) {
                return Err(DriverError::NotInteractable(format!("{} refused input", handle.0)));
            }
        }
        let blocked = match mode {
            ActMode::Direct => el.direct_blocked,
            ActMode::Programmatic => el.programmatic_blocked,
        };
        if blocked {
            return Err(DriverError::Obstructed(handle.0.clone()));
        }
        if *action == ElementAction::Click {
            if let Some(url) = self.script.navigations.get(&handle.0) {
                self.url = url.clone();
            }
        }
        Ok(())
    }

    fn press_keys(&mut self, handle: &ElementHandle, keys: &[Key]) -> DriverResult<()> {
        self.lookup(handle)?;
        self.journal().keys.push((handle.0.clone(), keys.to_vec()));
        Ok(())
    }

    fn current_url(&mut self) -> DriverResult<String> {
        Ok(self.url.clone())
    }

    fn close(&mut self) -> DriverResult<()> {
        self.journal().closed += 1;
        if self.script.close_fails {
            return Err(DriverError::Fault("invalid session id".into()));
        }
        Ok(())
    }
}

/// Opens [`FakeSession`]s that all follow one script and share one journal.
pub struct FakeDriver {
    script: Script,
    journal: Arc<Mutex<Journal>>,
    refuse: bool,
}

impl FakeDriver {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            journal: Arc::default(),
            refuse: false,
        }
    }

    /// Every `open` returns `Ok(None)`.
    pub fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    pub fn journal(&self) -> MutexGuard<'_, Journal> {
        self.journal.lock().unwrap()
    }

    /// Values filled into `css`, across all sessions, in order.
    pub fn fills_of(&self, css: &str) -> Vec<String> {
        self.journal()
            .actions
            .iter()
            .filter(|(target, _, mode)| target == css && *mode == ActMode::Direct)
            .filter_map(|(_, action, _)| match action {
                ElementAction::Fill(text) => Some(text.clone()),
                ElementAction::Click => None,
            })
            .collect()
    }
}

impl SessionDriver for FakeDriver {
    type Session = FakeSession;

    fn open(&self, options: &SessionOptions) -> DriverResult<Option<FakeSession>> {
        self.journal().opened.push(options.clone());
        if self.refuse {
            return Ok(None);
        }
        Ok(Some(FakeSession::with_journal(
            self.script.clone(),
            Arc::clone(&self.journal),
        )))
    }
}

// ---------------------------------------------------------------------------
// Content repository
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemoryContent {
    campaigns: BTreeMap<CampaignId, BTreeMap<String, Vec<String>>>,
    unavailable: bool,
}

impl MemoryContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, campaign_id: CampaignId, locality: &str, phrases: &[&str]) -> Self {
        self.campaigns.entry(campaign_id).or_default().insert(
            locality.to_string(),
            phrases.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    pub fn with_campaign(mut self, campaign_id: CampaignId) -> Self {
        self.campaigns.entry(campaign_id).or_default();
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    fn check(&self) -> Result<()> {
        if self.unavailable {
            return Err(ProvisionError::ContentRepository("repository offline".into()));
        }
        Ok(())
    }
}

impl ContentRepository for MemoryContent {
    /// Reverse order, so callers that forget to sort are caught.
    fn list_accessible_campaigns(&self) -> Result<Vec<CampaignId>> {
        self.check()?;
        Ok(self.campaigns.keys().rev().copied().collect())
    }

    fn list_localities(&self, campaign_id: CampaignId) -> Result<Vec<String>> {
        self.check()?;
        Ok(self
            .campaigns
            .get(&campaign_id)
            .map(|l| l.keys().rev().cloned().collect())
            .unwrap_or_default())
    }

    fn list_phrases(&self, campaign_id: CampaignId, locality: &str) -> Result<Vec<String>> {
        self.check()?;
        Ok(self
            .campaigns
            .get(&campaign_id)
            .and_then(|l| l.get(locality))
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Pool and catalog
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryPool {
    credentials: Mutex<Vec<Credential>>,
    campaigns: Vec<Campaign>,
    failing_commits: bool,
}

impl MemoryPool {
    pub fn with_credentials(count: u64) -> Self {
        let credentials = (1..=count)
            .map(|id| Credential {
                id,
                login: format!("user{id}@example.com"),
                secret: format!("secret-{id}"),
                assigned_campaign: None,
                annotation: None,
                egress: None,
                assigned_at: None,
                created_at: Utc::now(),
            })
            .collect();
        Self {
            credentials: Mutex::new(credentials),
            ..Self::default()
        }
    }

    pub fn with_campaign(mut self, id: CampaignId, name: &str) -> Self {
        self.campaigns.push(Campaign {
            id,
            name: name.to_string(),
            target_site: format!("https://site{id}.example"),
        });
        self
    }

    pub fn failing_commits(mut self) -> Self {
        self.failing_commits = true;
        self
    }

    pub fn credential(&self, id: CredentialId) -> Option<Credential> {
        self.credentials
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub fn assigned(&self) -> Vec<(CredentialId, CampaignId)> {
        self.credentials
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| c.assigned_campaign.map(|camp| (c.id, camp)))
            .collect()
    }
}

impl CredentialPool for MemoryPool {
    fn acquire_free(&self) -> Result<Option<Credential>> {
        Ok(self
            .credentials
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.is_free())
            .cloned())
    }

    fn commit_assignment(
        &self,
        credential_id: CredentialId,
        campaign_id: CampaignId,
        locality: &str,
    ) -> Result<()> {
        if self.failing_commits {
            return Err(ProvisionError::Store("disk full".into()));
        }
        let mut credentials = self.credentials.lock().unwrap();
        let cred = credentials
            .iter_mut()
            .find(|c| c.id == credential_id)
            .ok_or(ProvisionError::CredentialNotFound(credential_id))?;
        if let Some(existing) = cred.assigned_campaign {
            return Err(ProvisionError::AlreadyAssigned {
                credential_id,
                campaign_id: existing,
            });
        }
        cred.assigned_campaign = Some(campaign_id);
        cred.annotation = Some(locality.to_string());
        cred.assigned_at = Some(Utc::now());
        Ok(())
    }
}

impl CampaignCatalog for MemoryPool {
    fn campaign(&self, id: CampaignId) -> Result<Option<Campaign>> {
        Ok(self.campaigns.iter().find(|c| c.id == id).cloned())
    }
}
