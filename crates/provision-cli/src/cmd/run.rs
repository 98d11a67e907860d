use anyhow::Context;
use provision_core::{controller::CycleReport, runtime};
use std::path::Path;

use super::{load_config, open_db};
use crate::output::print_json;

pub fn run(root: &Path, delay: Option<f64>, max: Option<u32>, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let request = runtime::CycleRequest {
        delay_seconds: delay,
        max_total_iterations: max,
    };
    let settings = request.resolve(&config)?;
    let db = open_db(root)?;

    let report = runtime::run_cycle(root, &config, &db, settings).context("cycle failed")?;

    if json {
        return print_json(&report);
    }
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &CycleReport) {
    let elapsed = report.finished_at - report.started_at;
    println!(
        "Cycle finished after {} iteration(s) in {}s ({}).",
        report.iterations,
        elapsed.num_seconds(),
        report.stop_reason.as_str()
    );
    println!("  assigned:        {}", report.assigned());
    println!("  failed:          {}", report.failed());
    if report.commit_failures() > 0 {
        println!("  commit failures: {}", report.commit_failures());
    }
}
