use crate::error::{ProvisionError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use webdriver_client::{Browser, ProxySettings};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// CycleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Pause between iterations when the caller does not supply one.
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: f64,
    /// Hard ceiling on iterations per cycle, enforced by the control surface.
    #[serde(default = "default_ceiling")]
    pub max_iterations_ceiling: u32,
    /// How many times a failing content lookup is retried before the cycle
    /// treats the work source as exhausted.
    #[serde(default = "default_content_attempts")]
    pub content_attempts: u32,
    #[serde(default = "default_content_backoff_ms")]
    pub content_backoff_ms: u64,
}

fn default_delay_seconds() -> f64 {
    2.0
}

fn default_ceiling() -> u32 {
    50
}

fn default_content_attempts() -> u32 {
    3
}

fn default_content_backoff_ms() -> u64 {
    500
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            delay_seconds: default_delay_seconds(),
            max_iterations_ceiling: default_ceiling(),
            content_attempts: default_content_attempts(),
            content_backoff_ms: default_content_backoff_ms(),
        }
    }
}

impl CycleConfig {
    pub fn content_backoff(&self) -> Duration {
        Duration::from_millis(self.content_backoff_ms)
    }
}

// ---------------------------------------------------------------------------
// ResilienceConfig
// ---------------------------------------------------------------------------

/// Timeouts and retry budgets shared by every workflow stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_element_timeout_secs")]
    pub element_timeout_secs: u64,
    #[serde(default = "default_step_attempts")]
    pub step_attempts: u32,
    #[serde(default = "default_step_backoff_ms")]
    pub step_backoff_ms: u64,
    #[serde(default = "default_login_timeout_secs")]
    pub login_timeout_secs: u64,
    #[serde(default = "default_landmark_timeout_secs")]
    pub landmark_timeout_secs: u64,
    #[serde(default = "default_suggestion_timeout_secs")]
    pub suggestion_timeout_secs: u64,
    /// Stabilization pause after tracking starts.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_element_timeout_secs() -> u64 {
    15
}

fn default_step_attempts() -> u32 {
    3
}

fn default_step_backoff_ms() -> u64 {
    1000
}

fn default_login_timeout_secs() -> u64 {
    30
}

fn default_landmark_timeout_secs() -> u64 {
    30
}

fn default_suggestion_timeout_secs() -> u64 {
    10
}

fn default_settle_ms() -> u64 {
    3000
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            element_timeout_secs: default_element_timeout_secs(),
            step_attempts: default_step_attempts(),
            step_backoff_ms: default_step_backoff_ms(),
            login_timeout_secs: default_login_timeout_secs(),
            landmark_timeout_secs: default_landmark_timeout_secs(),
            suggestion_timeout_secs: default_suggestion_timeout_secs(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl ResilienceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    pub fn step_backoff(&self) -> Duration {
        Duration::from_millis(self.step_backoff_ms)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    pub fn landmark_timeout(&self) -> Duration {
        Duration::from_secs(self.landmark_timeout_secs)
    }

    pub fn suggestion_timeout(&self) -> Duration {
        Duration::from_secs(self.suggestion_timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

// ---------------------------------------------------------------------------
// DriverConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// WebDriver remote end (chromedriver, geckodriver, Selenium Grid).
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    /// Page the session opens on; the login form must be reachable here.
    #[serde(default)]
    pub login_url: String,
    #[serde(default)]
    pub browser: Browser,
    #[serde(default)]
    pub headless: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Pool of user agents; one is drawn per session.
    #[serde(default)]
    pub user_agents: Vec<String>,
    /// Named network egress options. A credential's `egress` field refers to
    /// one of these keys.
    #[serde(default)]
    pub proxies: BTreeMap<String, ProxySettings>,
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            login_url: String::new(),
            browser: Browser::default(),
            headless: false,
            request_timeout_secs: default_request_timeout_secs(),
            user_agents: Vec::new(),
            proxies: BTreeMap::new(),
        }
    }
}

impl DriverConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn proxy(&self, name: &str) -> Option<&ProxySettings> {
        self.proxies.get(name)
    }
}

// ---------------------------------------------------------------------------
// SelectorConfig
// ---------------------------------------------------------------------------

/// CSS selectors for every control the workflow touches on the remote UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub login_identity: String,
    pub login_secret: String,
    pub login_submit: String,
    /// Substring of the URL shown after a successful login.
    pub post_login_url_marker: String,
    pub project_site_field: String,
    pub project_start_button: String,
    /// Element that appears once the project has been created.
    pub project_landmark: String,
    pub locality_field: String,
    pub locality_suggestions: String,
    pub business_name_field: String,
    pub keyword_textarea: String,
    pub begin_tracking_button: String,
    pub account_menu: String,
    pub logout_button: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            login_identity: "input[name='email']".into(),
            login_secret: "input[type='password']".into(),
            login_submit: "button[type='submit']".into(),
            post_login_url_marker: "/dashboard".into(),
            project_site_field: "input[name='website']".into(),
            project_start_button: "button.start-project".into(),
            project_landmark: ".project-setup".into(),
            locality_field: "input[name='location']".into(),
            locality_suggestions: ".pac-container .pac-item".into(),
            business_name_field: "input[name='business_name']".into(),
            keyword_textarea: "textarea[name='keywords']".into(),
            begin_tracking_button: "button.start-tracking".into(),
            account_menu: ".account-menu".into(),
            logout_button: "a.logout".into(),
        }
    }
}

impl SelectorConfig {
    /// `(name, selector)` pairs, used for validation and diagnostics.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("login_identity", &self.login_identity),
            ("login_secret", &self.login_secret),
            ("login_submit", &self.login_submit),
            ("post_login_url_marker", &self.post_login_url_marker),
            ("project_site_field", &self.project_site_field),
            ("project_start_button", &self.project_start_button),
            ("project_landmark", &self.project_landmark),
            ("locality_field", &self.locality_field),
            ("locality_suggestions", &self.locality_suggestions),
            ("business_name_field", &self.business_name_field),
            ("keyword_textarea", &self.keyword_textarea),
            ("begin_tracking_button", &self.begin_tracking_button),
            ("account_menu", &self.account_menu),
            ("logout_button", &self.logout_button),
        ]
    }
}

// ---------------------------------------------------------------------------
// ContentConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Directory of the filesystem content repository.
    #[serde(default = "default_content_root")]
    pub root: PathBuf,
}

fn default_content_root() -> PathBuf {
    PathBuf::from(paths::CONTENT_DIR)
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            root: default_content_root(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub resilience: ResilienceConfig,
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub content: ContentConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
            },
            cycle: CycleConfig::default(),
            resilience: ResilienceConfig::default(),
            driver: DriverConfig::default(),
            selectors: SelectorConfig::default(),
            content: ContentConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(ProvisionError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn content_root(&self, root: &Path) -> PathBuf {
        paths::content_root(root, &self.content.root)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut push = |level: WarnLevel, message: String| {
            warnings.push(ConfigWarning { level, message });
        };

        if self.driver.login_url.trim().is_empty() {
            push(
                WarnLevel::Error,
                "driver.login_url is empty; sessions have nowhere to open".into(),
            );
        }

        for (name, selector) in self.selectors.entries() {
            if selector.trim().is_empty() {
                push(WarnLevel::Error, format!("selectors.{name} is empty"));
            }
        }

        if self.resilience.step_attempts == 0 {
            push(
                WarnLevel::Error,
                "resilience.step_attempts is 0; no stage can ever succeed".into(),
            );
        }

        if self.cycle.max_iterations_ceiling == 0 {
            push(
                WarnLevel::Warning,
                "cycle.max_iterations_ceiling is 0; every cycle stops immediately".into(),
            );
        }

        if Duration::try_from_secs_f64(self.cycle.delay_seconds).is_err() {
            push(
                WarnLevel::Error,
                format!(
                    "cycle.delay_seconds must be a non-negative number of seconds \
                     that fits a duration (got {})",
                    self.cycle.delay_seconds
                ),
            );
        }

        if self.driver.user_agents.is_empty() {
            push(
                WarnLevel::Warning,
                "driver.user_agents is empty; the browser default will be used".into(),
            );
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
