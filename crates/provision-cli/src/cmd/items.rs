use anyhow::Context;
use provision_core::{content::FsContentRepository, work_items::WorkItemSource};
use std::collections::HashSet;
use std::path::Path;

use super::load_config;
use crate::output::{print_json, print_table};

pub fn run(root: &Path, limit: Option<usize>, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let repo = FsContentRepository::new(config.content_root(root));
    let source = WorkItemSource::new(&repo);

    // Walk the source the way a cycle does: each taken key is excluded
    // before asking for the next one.
    let mut seen = HashSet::new();
    let mut items = Vec::new();
    while limit.map_or(true, |n| items.len() < n) {
        let Some(item) = source
            .try_next_eligible(&seen)
            .context("failed to read content repository")?
        else {
            break;
        };
        seen.insert(item.key());
        items.push(item);
    }

    if json {
        return print_json(&items);
    }
    if items.is_empty() {
        println!("No eligible work items under {}.", repo.root().display());
        return Ok(());
    }
    let rows = items
        .iter()
        .map(|i| {
            vec![
                i.campaign_id.to_string(),
                i.locality.clone(),
                i.phrases.len().to_string(),
            ]
        })
        .collect();
    print_table(&["CAMPAIGN", "LOCALITY", "PHRASES"], rows);
    Ok(())
}
