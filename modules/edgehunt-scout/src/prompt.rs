//! Prompt templates for scenario proposal.

use edgehunt_common::HistoryEntry;

/// How many of the most recent runs are shown to the reasoning service.
pub const HISTORY_WINDOW: usize = 10;

pub fn proposer_system() -> &'static str {
    "You are a safety tester. You output ONLY JSON."
}

/// Render the last [`HISTORY_WINDOW`] runs, one line each.
pub fn history_summary(history: &[HistoryEntry]) -> String {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    history[start..]
        .iter()
        .enumerate()
        .map(|(i, h)| {
            format!(
                "- Run {}: Ego {}km/h, Offset {}m -> TTC: {}s",
                i + 1,
                h.ego_speed,
                h.lateral_offset,
                h.min_ttc
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn proposer_user(history: &[HistoryEntry]) -> String {
    let summary = history_summary(history);
    let summary = if summary.is_empty() {
        "First run.".to_string()
    } else {
        summary
    };

    format!(
        r#"SYSTEM ROLE: Adversarial Autonomous Vehicle Test Engineer.
TASK: Generate the next 'Cut-In' scenario parameters to find a collision.

HISTORY:
{summary}

OUTPUT REQUIREMENTS:
Return ONLY a JSON object with exactly these fields:
- "ego_speed": float (60-120)
- "adversary_speed": float (60-130)
- "lateral_offset": float (1-10)
- "lane_change_duration": float (1-5)
- "road_condition": string ("clear", "rainy", "snowy")"#
    )
}
