use anyhow::Context;
use clap::Subcommand;
use provision_core::model::Campaign;
use std::path::Path;

use super::open_db;
use crate::output::{print_json, print_table};

#[derive(Subcommand)]
pub enum CampaignSubcommand {
    /// Register a campaign
    Add {
        /// Campaign id; matches the directory name in the content repository
        #[arg(long)]
        id: u64,
        /// Business name entered during setup
        #[arg(long)]
        name: String,
        /// Site URL the remote project is created for
        #[arg(long)]
        site: String,
    },
    /// List campaigns
    List,
}

pub fn run(root: &Path, subcmd: CampaignSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        CampaignSubcommand::Add { id, name, site } => add(root, id, name, site, json),
        CampaignSubcommand::List => list(root, json),
    }
}

fn add(root: &Path, id: u64, name: String, site: String, json: bool) -> anyhow::Result<()> {
    let db = open_db(root)?;
    let campaign = Campaign {
        id,
        name,
        target_site: site,
    };
    db.add_campaign(&campaign)
        .with_context(|| format!("failed to add campaign {id}"))?;

    if json {
        print_json(&campaign)?;
    } else {
        println!("Added campaign {} ({}).", campaign.id, campaign.name);
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let db = open_db(root)?;
    let campaigns = db.list_campaigns().context("failed to list campaigns")?;

    if json {
        return print_json(&campaigns);
    }
    if campaigns.is_empty() {
        println!("No campaigns.");
        return Ok(());
    }
    let rows = campaigns
        .iter()
        .map(|c| vec![c.id.to_string(), c.name.clone(), c.target_site.clone()])
        .collect();
    print_table(&["ID", "NAME", "SITE"], rows);
    Ok(())
}
