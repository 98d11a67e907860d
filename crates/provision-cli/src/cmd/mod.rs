pub mod campaign;
pub mod config;
pub mod credential;
pub mod init;
pub mod items;
pub mod run;
pub mod serve;

use anyhow::Context;
use provision_core::{config::Config, paths, store::ProvisionDb};
use std::path::Path;

/// Load config, failing with a hint when the project is not initialized.
pub fn load_config(root: &Path) -> anyhow::Result<Config> {
    Config::load(root).context("failed to load config")
}

pub fn open_db(root: &Path) -> anyhow::Result<ProvisionDb> {
    load_config(root)?;
    let path = paths::db_path(root);
    ProvisionDb::open(&path).with_context(|| format!("failed to open {}", path.display()))
}
