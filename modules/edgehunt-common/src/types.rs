use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sentinel min-TTC meaning "no close approach observed".
pub const NO_APPROACH_TTC: f64 = 999.0;

// --- Scenario ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadCondition {
    Clear,
    Rainy,
    Snowy,
}

impl RoadCondition {
    pub const ALL: [RoadCondition; 3] = [RoadCondition::Clear, RoadCondition::Rainy, RoadCondition::Snowy];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoadCondition::Clear => "clear",
            RoadCondition::Rainy => "rainy",
            RoadCondition::Snowy => "snowy",
        }
    }
}

impl std::fmt::Display for RoadCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoadCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clear" => Ok(RoadCondition::Clear),
            "rainy" => Ok(RoadCondition::Rainy),
            "snowy" => Ok(RoadCondition::Snowy),
            other => Err(format!("unknown road condition: {other}")),
        }
    }
}

/// Parameters of one cut-in scenario. Built fresh each iteration and consumed
/// by exactly one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParameters {
    /// km/h
    pub ego_speed: f64,
    /// km/h
    pub adversary_speed: f64,
    /// metres
    pub lateral_offset: f64,
    /// seconds
    pub lane_change_duration: f64,
    pub road_condition: RoadCondition,
}

// --- Telemetry & evaluation ---

/// Outcome of a single simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Seconds; [`NO_APPROACH_TTC`] when the vehicles never closed in.
    pub min_ttc: f64,
    pub collision: bool,
    /// Simulated seconds covered by the run.
    pub duration: f64,
}

impl Telemetry {
    pub fn no_approach(duration: f64) -> Self {
        Self {
            min_ttc: NO_APPROACH_TTC,
            collision: false,
            duration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskStatus {
    Safe,
    CriticalNearMiss,
    CatastrophicCollision,
}

impl RiskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskStatus::Safe => "SAFE",
            RiskStatus::CriticalNearMiss => "CRITICAL_NEAR_MISS",
            RiskStatus::CatastrophicCollision => "CATASTROPHIC_COLLISION",
        }
    }
}

impl std::fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SAFE" => Ok(RiskStatus::Safe),
            "CRITICAL_NEAR_MISS" => Ok(RiskStatus::CriticalNearMiss),
            "CATASTROPHIC_COLLISION" => Ok(RiskStatus::CatastrophicCollision),
            other => Err(format!("unknown risk status: {other}")),
        }
    }
}

/// Normalized failure score (0.0 = safe, 1.0 = collision) with its label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub score: f64,
    pub status: RiskStatus,
}

impl EvaluationResult {
    /// Any nonzero score counts as a discovered failure.
    pub fn is_failure(&self) -> bool {
        self.score > 0.0
    }
}

// --- Search history ---

/// Feedback row handed to the proposer on every subsequent call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub ego_speed: f64,
    pub adversary_speed: f64,
    pub lateral_offset: f64,
    pub lane_change_duration: f64,
    pub min_ttc: f64,
    pub score: f64,
}

impl HistoryEntry {
    pub fn from_run(params: &ScenarioParameters, telemetry: &Telemetry, score: f64) -> Self {
        Self {
            ego_speed: params.ego_speed,
            adversary_speed: params.adversary_speed,
            lateral_offset: params.lateral_offset,
            lane_change_duration: params.lane_change_duration,
            min_ttc: telemetry.min_ttc,
            score,
        }
    }
}

/// One row of the experiment log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// 1-based.
    pub iteration: u32,
    pub ego_speed: f64,
    pub lateral_offset: f64,
    pub road_condition: RoadCondition,
    pub min_ttc: f64,
    pub score: f64,
    pub status: RiskStatus,
}

impl RunRecord {
    pub fn new(
        iteration: u32,
        params: &ScenarioParameters,
        telemetry: &Telemetry,
        evaluation: &EvaluationResult,
    ) -> Self {
        Self {
            iteration,
            ego_speed: params.ego_speed,
            lateral_offset: params.lateral_offset,
            road_condition: params.road_condition,
            min_ttc: telemetry.min_ttc,
            score: evaluation.score,
            status: evaluation.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn road_condition_parses_case_insensitively() {
        assert_eq!("Rainy".parse::<RoadCondition>(), Ok(RoadCondition::Rainy));
        assert_eq!(" snowy ".parse::<RoadCondition>(), Ok(RoadCondition::Snowy));
        assert!("icy".parse::<RoadCondition>().is_err());
    }

    #[test]
    fn risk_status_round_trips_through_label() {
        for status in [
            RiskStatus::Safe,
            RiskStatus::CriticalNearMiss,
            RiskStatus::CatastrophicCollision,
        ] {
            assert_eq!(status.as_str().parse::<RiskStatus>(), Ok(status));
        }
        assert_eq!(
            serde_json::to_string(&RiskStatus::CriticalNearMiss).unwrap(),
            "\"CRITICAL_NEAR_MISS\""
        );
    }

    #[test]
    fn history_entry_copies_params_and_outcome() {
        let params = ScenarioParameters {
            ego_speed: 100.0,
            adversary_speed: 110.0,
            lateral_offset: 2.0,
            lane_change_duration: 1.5,
            road_condition: RoadCondition::Rainy,
        };
        let telemetry = Telemetry {
            min_ttc: 0.9,
            collision: false,
            duration: 15.0,
        };
        let entry = HistoryEntry::from_run(&params, &telemetry, 0.4);
        assert_eq!(entry.ego_speed, 100.0);
        assert_eq!(entry.adversary_speed, 110.0);
        assert_eq!(entry.lane_change_duration, 1.5);
        assert_eq!(entry.min_ttc, 0.9);
        assert_eq!(entry.score, 0.4);
    }

    #[test]
    fn no_approach_uses_sentinel() {
        let t = Telemetry::no_approach(15.0);
        assert_eq!(t.min_ttc, NO_APPROACH_TTC);
        assert!(!t.collision);
    }
}
