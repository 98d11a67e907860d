use anyhow::Context;
use clap::Subcommand;
use provision_core::model::NewCredential;
use std::path::Path;

use super::{load_config, open_db};
use crate::output::{or_dash, print_json, print_table};

#[derive(Subcommand)]
pub enum CredentialSubcommand {
    /// Register a credential in the pool
    Add {
        #[arg(long)]
        login: String,
        #[arg(long, env = "PROVISION_SECRET", hide_env_values = true)]
        secret: String,
        /// Named proxy from driver.proxies
        #[arg(long)]
        egress: Option<String>,
    },
    /// List credentials and their assignments
    List {
        /// Only credentials that are still free
        #[arg(long)]
        free: bool,
    },
}

pub fn run(root: &Path, subcmd: CredentialSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        CredentialSubcommand::Add {
            login,
            secret,
            egress,
        } => add(root, login, secret, egress, json),
        CredentialSubcommand::List { free } => list(root, free, json),
    }
}

fn add(
    root: &Path,
    login: String,
    secret: String,
    egress: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    if let Some(name) = &egress {
        let config = load_config(root)?;
        if config.driver.proxy(name).is_none() {
            anyhow::bail!("egress '{name}' is not defined under driver.proxies");
        }
    }
    let db = open_db(root)?;
    let credential = db
        .add_credential(NewCredential {
            login,
            secret,
            egress,
        })
        .context("failed to add credential")?;

    if json {
        print_json(&serde_json::json!({
            "id": credential.id,
            "login": credential.login,
            "egress": credential.egress,
        }))?;
    } else {
        println!("Added credential {} ({}).", credential.id, credential.login);
    }
    Ok(())
}

fn list(root: &Path, free_only: bool, json: bool) -> anyhow::Result<()> {
    let db = open_db(root)?;
    let credentials: Vec<_> = db
        .list_credentials()
        .context("failed to list credentials")?
        .into_iter()
        .filter(|c| !free_only || c.is_free())
        .collect();

    if json {
        let items: Vec<serde_json::Value> = credentials
            .iter()
            .map(|c| {
                serde_json::json!({
                    "id": c.id,
                    "login": c.login,
                    "assigned_campaign": c.assigned_campaign,
                    "annotation": c.annotation,
                    "egress": c.egress,
                    "assigned_at": c.assigned_at,
                })
            })
            .collect();
        return print_json(&items);
    }

    if credentials.is_empty() {
        println!("No credentials.");
        return Ok(());
    }

    let rows = credentials
        .iter()
        .map(|c| {
            vec![
                c.id.to_string(),
                c.login.clone(),
                or_dash(c.assigned_campaign),
                or_dash(c.annotation.as_deref()),
                or_dash(c.egress.as_deref()),
            ]
        })
        .collect();
    print_table(&["ID", "LOGIN", "CAMPAIGN", "LOCALITY", "EGRESS"], rows);
    Ok(())
}
