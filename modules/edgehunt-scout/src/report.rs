//! End-of-run summary table.

use std::path::Path;

use console::style;
use edgehunt_common::RunRecord;
use tracing::error;

use crate::store;

const TITLE: &str = "Edge Case Discovery Summary";

/// Render the summary table for the given rows.
pub fn format_summary(records: &[RunRecord], found: usize) -> String {
    let header = format!(
        "{:<6} {:<30} {:>8} {:>6}  {}",
        "Iter.", "Scenario", "TTC (s)", "Score", "Status"
    );

    let mut out = String::new();
    out.push_str(&format!("{}\n", style(format!("{TITLE} (Found: {found})")).bold()));
    out.push_str(&format!("{}\n", style(&header).cyan()));
    out.push_str(&format!("{}\n", "-".repeat(header.len() + 16)));

    for r in records {
        let scenario = format!("S:{} O:{} C:{}", r.ego_speed, r.lateral_offset, r.road_condition);
        let row = format!(
            "{:<6} {:<30} {:>8} {:>6.2}  {}",
            r.iteration,
            scenario,
            format_ttc(r.min_ttc),
            r.score,
            r.status
        );
        let styled = if r.score > 0.0 {
            style(row).red()
        } else {
            style(row).green().dim()
        };
        out.push_str(&format!("{styled}\n"));
    }
    out
}

fn format_ttc(ttc: f64) -> String {
    format!("{ttc:.2}")
}

/// Print the summary read back from the experiment log. A missing or
/// unreadable log is reported and the table skipped.
pub fn print_summary(log_path: &Path, found: usize) {
    if !log_path.exists() {
        error!(path = %log_path.display(), "Experiment log not found; skipping summary");
        return;
    }
    match store::read_log(log_path) {
        Ok(records) => println!("\n{}", format_summary(&records, found)),
        Err(e) => error!(path = %log_path.display(), error = %format!("{e:#}"), "Could not read experiment log"),
    }
}
