//! Heuristic stand-in backend: fakes cut-in physics from three scenario
//! parameters so the search loop can run without a simulator.

use std::time::Duration;

use async_trait::async_trait;
use edgehunt_common::Telemetry;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::backend::{BackendState, SimulatorBackend};
use crate::error::{Result, SimError};
use crate::extract::ScenarioExtract;

const BASELINE_TTC: f64 = 5.0;
const MIN_TTC: f64 = 0.1;
const COLLISION_TTC: f64 = 0.3;
const JITTER: f64 = 1.0;
const RUN_DURATION_SECS: f64 = 15.0;
const DEFAULT_RUN_DELAY: Duration = Duration::from_millis(500);

/// Risk-to-TTC mapping. Higher speed, a shorter lane change and a smaller
/// lateral offset all lower the estimate; `jitter` is added before clamping.
pub fn estimate_min_ttc(
    ego_speed_kmh: f64,
    lateral_offset: f64,
    lane_change_duration: f64,
    jitter: f64,
) -> f64 {
    let ego_speed_mps = ego_speed_kmh / 3.6;
    let aggressiveness = 1.0 / lane_change_duration;
    let risk = (ego_speed_mps * aggressiveness) / (lateral_offset + 1.0);
    f64::max(MIN_TTC, BASELINE_TTC - risk + jitter)
}

/// Telemetry for one heuristic run. Collision is decided on the unrounded
/// estimate; only the reported min TTC is rounded.
fn telemetry_for(extract: &ScenarioExtract, jitter: f64) -> Telemetry {
    let raw_ttc = estimate_min_ttc(
        extract.ego_speed_or_default(),
        extract.lateral_offset_or_default(),
        extract.lane_change_duration_or_default(),
        jitter,
    );
    Telemetry {
        min_ttc: round2(raw_ttc),
        collision: raw_ttc < COLLISION_TTC,
        duration: RUN_DURATION_SECS,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub struct HeuristicSimulator {
    state: BackendState,
    loaded: Option<ScenarioExtract>,
    rng: StdRng,
    run_delay: Duration,
}

impl HeuristicSimulator {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Reproducible jitter sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            state: BackendState::Disconnected,
            loaded: None,
            rng,
            run_delay: DEFAULT_RUN_DELAY,
        }
    }

    /// Simulated processing time per run (zero in tests).
    pub fn with_run_delay(mut self, delay: Duration) -> Self {
        self.run_delay = delay;
        self
    }
}

impl Default for HeuristicSimulator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SimulatorBackend for HeuristicSimulator {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn state(&self) -> BackendState {
        self.state
    }

    async fn connect(&mut self) -> Result<()> {
        if self.state == BackendState::Disconnected {
            info!("Initializing heuristic simulator");
            self.state = BackendState::Connected;
        }
        Ok(())
    }

    async fn load_scenario(&mut self, document: &str) -> Result<()> {
        if self.state == BackendState::Disconnected {
            self.connect().await?;
        }

        let extract = ScenarioExtract::from_document(document);
        info!(
            ego_speed = extract.ego_speed_or_default(),
            lateral_offset = extract.lateral_offset_or_default(),
            lane_change_duration = extract.lane_change_duration_or_default(),
            "Heuristic scenario loaded"
        );
        self.loaded = Some(extract);
        self.state = BackendState::ScenarioLoaded;
        Ok(())
    }

    async fn run_simulation(&mut self) -> Result<Telemetry> {
        let extract = match (self.state, self.loaded.take()) {
            (BackendState::ScenarioLoaded, Some(extract)) => extract,
            _ => return Err(SimError::NoScenarioLoaded),
        };

        if !self.run_delay.is_zero() {
            tokio::time::sleep(self.run_delay).await;
        }

        let jitter = self.rng.random_range(-JITTER..=JITTER);
        let telemetry = telemetry_for(&extract, jitter);

        debug!(
            min_ttc = telemetry.min_ttc,
            collision = telemetry.collision,
            jitter,
            "Heuristic run complete"
        );
        self.state = BackendState::Connected;

        Ok(telemetry)
    }

    async fn cleanup(&mut self) {
        if self.state == BackendState::Disconnected && self.loaded.is_none() {
            debug!("Heuristic simulator already clean");
            return;
        }
        self.loaded = None;
        self.state = BackendState::Disconnected;
        info!("Heuristic simulator cleanup complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC_TEMPLATE: &str = r#"<ParameterDeclaration name="EgoVehicleSpeed" value="{speed}"/>
<ParameterDeclaration name="CutInLateralOffset" value="2.0"/>
<ParameterDeclaration name="LaneChangeDuration" value="1.5"/>"#;

    fn doc(speed: f64) -> String {
        DOC_TEMPLATE.replace("{speed}", &format!("{speed:.1}"))
    }

    fn fast_sim(seed: u64) -> HeuristicSimulator {
        HeuristicSimulator::with_seed(seed).with_run_delay(Duration::ZERO)
    }

    #[test]
    fn estimate_matches_reference_formula() {
        // 90 km/h = 25 m/s, aggressiveness 0.5, offset 4 -> risk 2.5
        let ttc = estimate_min_ttc(90.0, 4.0, 2.0, 0.0);
        assert!((ttc - 2.5).abs() < 1e-9);
        // Clamped at the floor.
        assert_eq!(estimate_min_ttc(120.0, 1.0, 1.0, -1.0), MIN_TTC);
    }

    #[test]
    fn estimate_is_monotone_in_each_risk_factor() {
        for jitter in [-1.0, 0.0, 0.7] {
            let mut previous = f64::INFINITY;
            for speed in (40..=140).step_by(5) {
                let ttc = estimate_min_ttc(speed as f64, 3.0, 2.0, jitter);
                assert!(ttc <= previous, "speed {speed} raised ttc");
                previous = ttc;
            }
        }
        assert!(estimate_min_ttc(100.0, 1.0, 2.0, 0.0) <= estimate_min_ttc(100.0, 5.0, 2.0, 0.0));
        assert!(estimate_min_ttc(100.0, 3.0, 1.0, 0.0) <= estimate_min_ttc(100.0, 3.0, 4.0, 0.0));
    }

    #[tokio::test]
    async fn same_seed_increasing_speed_never_increases_ttc() {
        let mut previous = f64::INFINITY;
        for speed in [60.0, 75.0, 90.0, 105.0, 120.0] {
            let mut sim = fast_sim(7);
            sim.connect().await.unwrap();
            sim.load_scenario(&doc(speed)).await.unwrap();
            let telemetry = sim.run_simulation().await.unwrap();
            assert!(telemetry.min_ttc <= previous);
            previous = telemetry.min_ttc;
        }
    }

    #[tokio::test]
    async fn telemetry_respects_collision_rule() {
        let mut sim = fast_sim(1);
        for _ in 0..50 {
            sim.load_scenario(&doc(118.0)).await.unwrap();
            let t = sim.run_simulation().await.unwrap();
            assert!(t.min_ttc >= MIN_TTC);
            if t.collision {
                assert!(t.min_ttc <= COLLISION_TTC);
            } else {
                assert!(t.min_ttc >= COLLISION_TTC);
            }
            assert_eq!(t.duration, RUN_DURATION_SECS);
        }
    }

    #[test]
    fn collision_is_decided_before_rounding() {
        // 90 km/h, offset 4, 1 s lane change -> risk 5.0, so ttc == jitter.
        let extract = ScenarioExtract {
            ego_speed: Some(90.0),
            lateral_offset: Some(4.0),
            lane_change_duration: Some(1.0),
        };

        let t = telemetry_for(&extract, 0.297);
        assert_eq!(t.min_ttc, 0.3);
        assert!(t.collision);

        let t = telemetry_for(&extract, 0.3005);
        assert_eq!(t.min_ttc, 0.3);
        assert!(!t.collision);

        let t = telemetry_for(&extract, 0.2949);
        assert_eq!(t.min_ttc, 0.29);
        assert!(t.collision);
    }

    #[tokio::test]
    async fn run_without_load_is_an_error() {
        let mut sim = fast_sim(1);
        sim.connect().await.unwrap();
        assert!(matches!(
            sim.run_simulation().await,
            Err(SimError::NoScenarioLoaded)
        ));

        sim.load_scenario(&doc(80.0)).await.unwrap();
        sim.run_simulation().await.unwrap();
        // The scenario is consumed by the run.
        assert!(matches!(
            sim.run_simulation().await,
            Err(SimError::NoScenarioLoaded)
        ));
    }

    #[tokio::test]
    async fn lifecycle_transitions() {
        let mut sim = fast_sim(3);
        assert_eq!(sim.state(), BackendState::Disconnected);

        // Implicit connect on load.
        sim.load_scenario(&doc(80.0)).await.unwrap();
        assert_eq!(sim.state(), BackendState::ScenarioLoaded);

        sim.run_simulation().await.unwrap();
        assert_eq!(sim.state(), BackendState::Connected);

        sim.load_scenario(&doc(80.0)).await.unwrap();
        sim.cleanup().await;
        assert_eq!(sim.state(), BackendState::Disconnected);
        sim.cleanup().await;
        assert_eq!(sim.state(), BackendState::Disconnected);
        assert!(matches!(
            sim.run_simulation().await,
            Err(SimError::NoScenarioLoaded)
        ));
    }
}
