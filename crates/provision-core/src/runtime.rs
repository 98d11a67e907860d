//! Wires the production pieces together for one cycle: the redb store as
//! pool and catalog, the filesystem content repository and the WebDriver
//! session driver.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{Config, WarnLevel};
use crate::content::FsContentRepository;
use crate::controller::{
    delay_from_secs, effective_cap, CycleController, CycleReport, CycleSettings,
};
use crate::driver::WebDriverSessionDriver;
use crate::error::{ProvisionError, Result};
use crate::store::ProvisionDb;

/// What a control surface asked for. Absent fields fall back to config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleRequest {
    #[serde(default)]
    pub delay_seconds: Option<f64>,
    #[serde(default)]
    pub max_total_iterations: Option<u32>,
}

impl CycleRequest {
    /// Apply the configured ceiling and validate the delay.
    pub fn resolve(&self, config: &Config) -> Result<CycleSettings> {
        let delay = delay_from_secs(self.delay_seconds.unwrap_or(config.cycle.delay_seconds))?;
        let mut settings = CycleSettings::new(config, delay);
        settings.max_total_iterations = Some(effective_cap(
            self.max_total_iterations,
            config.cycle.max_iterations_ceiling,
        ));
        Ok(settings)
    }
}

/// Run one cycle for the project rooted at `root`.
pub fn run_cycle(
    root: &Path,
    config: &Config,
    db: &ProvisionDb,
    settings: CycleSettings,
) -> Result<CycleReport> {
    let mut blocking = Vec::new();
    for warning in config.validate() {
        match warning.level {
            WarnLevel::Error => blocking.push(warning.message),
            WarnLevel::Warning => warn!(message = %warning.message, "config warning"),
        }
    }
    if !blocking.is_empty() {
        return Err(ProvisionError::invalid("config", blocking.join("; ")));
    }

    let content = FsContentRepository::new(config.content_root(root));
    let driver = WebDriverSessionDriver::from_config(&config.driver)?;
    CycleController::new(db, db, &content, &driver, config, settings).run()
}
