//! Time-to-collision from sampled vehicle poses.
//!
//! Coordinates are road-aligned: `x` along the lane (direction of travel),
//! `y` across it. Vehicles are treated as axis-aligned boxes.

use edgehunt_common::{Telemetry, NO_APPROACH_TTC};
use serde::{Deserialize, Serialize};

/// Bumper-to-bumper length used for gap and overlap checks (m).
pub const VEHICLE_LENGTH: f64 = 4.5;
/// Body width used for the overlap check (m).
pub const VEHICLE_WIDTH: f64 = 2.0;
/// Lateral distance under which both vehicles share a lane (m).
pub const LANE_WIDTH: f64 = 3.5;
/// Smallest TTC reported without an actual collision.
pub const MIN_REPORTED_TTC: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    #[serde(default)]
    pub vy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    /// Simulation time (s).
    pub t: f64,
    pub ego: Pose,
    pub adversary: Pose,
}

impl TrajectorySample {
    fn dx(&self) -> f64 {
        self.adversary.x - self.ego.x
    }

    fn dy(&self) -> f64 {
        self.adversary.y - self.ego.y
    }

    /// Bodies overlap in both axes.
    pub fn is_contact(&self) -> bool {
        self.dx().abs() < VEHICLE_LENGTH && self.dy().abs() < VEHICLE_WIDTH
    }

    /// Seconds until the longitudinal gap closes at the current relative
    /// speed. `None` when the vehicles are in different lanes or separating.
    pub fn time_to_collision(&self) -> Option<f64> {
        if self.dy().abs() >= LANE_WIDTH {
            return None;
        }

        let dx = self.dx();
        let closing_speed = if dx >= 0.0 {
            self.ego.vx - self.adversary.vx
        } else {
            self.adversary.vx - self.ego.vx
        };
        if closing_speed <= 0.0 {
            return None;
        }

        let gap = (dx.abs() - VEHICLE_LENGTH).max(0.0);
        Some(gap / closing_speed)
    }
}

/// Reduce a sampled trajectory to run telemetry.
///
/// `engine_collision` is the engine's own collision flag; contact between
/// the sampled boxes also counts.
pub fn telemetry_from_samples(samples: &[TrajectorySample], engine_collision: bool) -> Telemetry {
    let collision = engine_collision || samples.iter().any(TrajectorySample::is_contact);

    let min_ttc = samples
        .iter()
        .filter_map(TrajectorySample::time_to_collision)
        .fold(None, |acc: Option<f64>, ttc| Some(acc.map_or(ttc, |m| m.min(ttc))))
        .map(|ttc| ((ttc * 100.0).round() / 100.0).max(MIN_REPORTED_TTC))
        .unwrap_or(NO_APPROACH_TTC);

    let duration = match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => (last.t - first.t).max(0.0),
        _ => 0.0,
    };

    Telemetry {
        min_ttc,
        collision,
        duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: f64, ego_x: f64, ego_vx: f64, adv_x: f64, adv_y: f64, adv_vx: f64) -> TrajectorySample {
        TrajectorySample {
            t,
            ego: Pose { x: ego_x, y: 0.0, vx: ego_vx, vy: 0.0 },
            adversary: Pose { x: adv_x, y: adv_y, vx: adv_vx, vy: 0.0 },
        }
    }

    #[test]
    fn ttc_is_gap_over_closing_speed() {
        // 24.5 m centre distance -> 20 m gap, closing at 10 m/s.
        let s = sample(0.0, 0.0, 30.0, 24.5, 0.5, 20.0);
        assert_eq!(s.time_to_collision(), Some(2.0));
    }

    #[test]
    fn adjacent_lane_or_separating_has_no_ttc() {
        assert_eq!(sample(0.0, 0.0, 30.0, 20.0, 3.6, 10.0).time_to_collision(), None);
        assert_eq!(sample(0.0, 0.0, 20.0, 20.0, 0.0, 25.0).time_to_collision(), None);
    }

    #[test]
    fn adversary_behind_closing_in_counts() {
        let s = sample(0.0, 0.0, 20.0, -14.5, 0.0, 25.0);
        assert_eq!(s.time_to_collision(), Some(2.0));
    }

    #[test]
    fn cut_in_trajectory_reduces_to_minimum_ttc() {
        let samples = vec![
            sample(0.0, 0.0, 30.0, 40.0, 3.5, 25.0), // still in the next lane
            sample(1.0, 30.0, 30.0, 65.0, 2.0, 25.0), // 30.5 m gap / 5 -> 6.1
            sample(2.0, 60.0, 30.0, 85.0, 0.5, 20.0), // 20.5 m gap / 10 -> 2.05
            sample(3.0, 90.0, 28.0, 105.0, 0.0, 20.0), // 10.5 m gap / 8 -> 1.3125
        ];
        let telemetry = telemetry_from_samples(&samples, false);
        assert_eq!(telemetry.min_ttc, 1.31);
        assert!(!telemetry.collision);
        assert_eq!(telemetry.duration, 3.0);
    }

    #[test]
    fn contact_is_a_collision() {
        let samples = vec![
            sample(0.0, 0.0, 30.0, 10.0, 0.0, 20.0),
            sample(0.5, 15.0, 30.0, 18.0, 0.5, 20.0),
        ];
        let telemetry = telemetry_from_samples(&samples, false);
        assert!(telemetry.collision);
        assert_eq!(telemetry.min_ttc, MIN_REPORTED_TTC);
    }

    #[test]
    fn empty_trajectory_reports_no_approach() {
        let telemetry = telemetry_from_samples(&[], false);
        assert_eq!(telemetry.min_ttc, NO_APPROACH_TTC);
        assert!(!telemetry.collision);
        assert_eq!(telemetry.duration, 0.0);

        assert!(telemetry_from_samples(&[], true).collision);
    }
}
