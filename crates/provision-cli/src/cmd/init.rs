use anyhow::Context;
use provision_core::{config::Config, io, paths, store::ProvisionDb};
use std::path::Path;

use crate::output::print_json;

pub fn run(root: &Path, name: Option<&str>, json: bool) -> anyhow::Result<()> {
    let project_name = name.map(str::to_string).unwrap_or_else(|| {
        root.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    });

    let mut created = Vec::new();

    let config_path = paths::config_path(root);
    let config = if config_path.exists() {
        Config::load(root).context("failed to load existing config.yaml")?
    } else {
        let cfg = Config::new(&project_name);
        cfg.save(root).context("failed to write config.yaml")?;
        created.push(paths::CONFIG_FILE.to_string());
        cfg
    };

    let content = config.content_root(root);
    if !content.is_dir() {
        std::fs::create_dir_all(&content)
            .with_context(|| format!("failed to create {}", content.display()))?;
        created.push(config.content.root.display().to_string());
    }

    let db_path = paths::db_path(root);
    if !db_path.exists() {
        ProvisionDb::open(&db_path).context("failed to create database")?;
        created.push(paths::DB_FILE.to_string());
    }

    io::ensure_gitignore_entry(root, paths::DB_FILE).context("failed to update .gitignore")?;

    if json {
        print_json(&serde_json::json!({
            "root": root.display().to_string(),
            "project": config.project.name,
            "created": created,
        }))?;
        return Ok(());
    }

    println!("Initialized provision in: {}", root.display());
    if created.is_empty() {
        println!("  nothing to do; already initialized");
    }
    for path in &created {
        println!("  created: {path}");
    }
    if config.driver.login_url.is_empty() {
        println!("\nNext: set driver.login_url in {}", paths::CONFIG_FILE);
    }
    Ok(())
}
