//! Risk evaluator — maps run telemetry to a normalized failure score.

use edgehunt_common::{EvaluationResult, RiskStatus, Telemetry};
use tracing::info;

pub const DEFAULT_CRITICAL_TTC: f64 = 1.5;

/// Scores telemetry against a critical time-to-collision threshold.
///
/// - collision → `1.0`, `CATASTROPHIC_COLLISION` (regardless of TTC)
/// - `min_ttc < threshold` → `1 - min_ttc / threshold`, `CRITICAL_NEAR_MISS`
/// - otherwise → `0.0`, `SAFE`
#[derive(Debug, Clone, Copy)]
pub struct RiskEvaluator {
    critical_ttc: f64,
}

impl RiskEvaluator {
    pub fn new(critical_ttc: f64) -> Self {
        Self { critical_ttc }
    }

    pub fn critical_ttc(&self) -> f64 {
        self.critical_ttc
    }

    pub fn evaluate(&self, telemetry: &Telemetry) -> EvaluationResult {
        info!(
            min_ttc = telemetry.min_ttc,
            collision = telemetry.collision,
            "Evaluating run"
        );

        if telemetry.collision {
            return EvaluationResult {
                score: 1.0,
                status: RiskStatus::CatastrophicCollision,
            };
        }

        if telemetry.min_ttc < self.critical_ttc {
            // Keep near misses strictly below a collision's score.
            let ttc = telemetry.min_ttc.max(0.0);
            let score = (1.0 - ttc / self.critical_ttc).min(1.0 - f64::EPSILON);
            return EvaluationResult {
                score,
                status: RiskStatus::CriticalNearMiss,
            };
        }

        EvaluationResult {
            score: 0.0,
            status: RiskStatus::Safe,
        }
    }
}

impl Default for RiskEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_CRITICAL_TTC)
    }
}
