//! Scenario proposer — asks a reasoning service for the next cut-in
//! parameters and falls back to a local risk-biased sampler on any failure.

use std::ops::RangeInclusive;
use std::time::Duration;

use async_trait::async_trait;
use edgehunt_common::{HistoryEntry, RoadCondition, ScenarioParameters};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::prompt;
use crate::reasoning::ReasoningClient;

// Documented parameter ranges for reasoned proposals.
pub const EGO_SPEED_RANGE: RangeInclusive<f64> = 60.0..=120.0;
pub const ADVERSARY_SPEED_RANGE: RangeInclusive<f64> = 60.0..=130.0;
pub const LATERAL_OFFSET_RANGE: RangeInclusive<f64> = 1.0..=10.0;
pub const LANE_CHANGE_DURATION_RANGE: RangeInclusive<f64> = 1.0..=5.0;

// Narrower, deliberately riskier ranges for the fallback sampler.
pub const FALLBACK_EGO_SPEED: RangeInclusive<f64> = 90.0..=110.0;
pub const FALLBACK_ADVERSARY_SPEED: RangeInclusive<f64> = 100.0..=120.0;
pub const FALLBACK_LATERAL_OFFSET: RangeInclusive<f64> = 1.5..=3.5;
pub const FALLBACK_LANE_CHANGE_DURATION: RangeInclusive<f64> = 1.0..=2.5;
pub const FALLBACK_ROAD_CONDITION: RoadCondition = RoadCondition::Rainy;

// Per-field defaults for partially valid responses.
const DEFAULT_EGO_SPEED: f64 = 80.0;
const DEFAULT_LATERAL_OFFSET: f64 = 5.0;
const DEFAULT_ADVERSARY_SPEED: f64 = 85.0;
const DEFAULT_LANE_CHANGE_DURATION: f64 = 3.0;
const DEFAULT_ROAD_CONDITION: RoadCondition = RoadCondition::Clear;

pub const DEFAULT_REASONING_TIMEOUT: Duration = Duration::from_secs(30);

/// Produces the next scenario from the accumulated history.
#[async_trait]
pub trait ScenarioProposer: Send {
    async fn propose(&mut self, history: &[HistoryEntry]) -> ScenarioParameters;
}

/// Why a reasoned proposal was discarded.
#[derive(Debug, Error)]
pub enum ProposalError {
    #[error("no reasoning client configured")]
    Unconfigured,

    #[error("reasoning call timed out after {0:?}")]
    Timeout(Duration),

    #[error("reasoning call failed: {0}")]
    Reasoning(#[from] ai_client::AiError),

    #[error("field {field} is invalid: {value}")]
    InvalidField { field: &'static str, value: String },
}

// ---------------------------------------------------------------------------
// Fallback sampler
// ---------------------------------------------------------------------------

/// Uniform sampler over the fallback ranges.
pub struct FallbackSampler {
    rng: StdRng,
}

impl FallbackSampler {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn sample(&mut self) -> ScenarioParameters {
        ScenarioParameters {
            ego_speed: self.rng.random_range(FALLBACK_EGO_SPEED),
            adversary_speed: self.rng.random_range(FALLBACK_ADVERSARY_SPEED),
            lateral_offset: self.rng.random_range(FALLBACK_LATERAL_OFFSET),
            lane_change_duration: self.rng.random_range(FALLBACK_LANE_CHANGE_DURATION),
            road_condition: FALLBACK_ROAD_CONDITION,
        }
    }
}

impl Default for FallbackSampler {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

/// Decode a reasoning response into parameters.
///
/// Missing fields take their defaults; present but unusable fields reject the
/// whole response. Out-of-range numbers are clamped into the documented range.
pub fn decode_proposal(response: &Map<String, Value>) -> Result<ScenarioParameters, ProposalError> {
    Ok(ScenarioParameters {
        ego_speed: number_field(response, "ego_speed", DEFAULT_EGO_SPEED, EGO_SPEED_RANGE)?,
        adversary_speed: number_field(
            response,
            "adversary_speed",
            DEFAULT_ADVERSARY_SPEED,
            ADVERSARY_SPEED_RANGE,
        )?,
        lateral_offset: number_field(
            response,
            "lateral_offset",
            DEFAULT_LATERAL_OFFSET,
            LATERAL_OFFSET_RANGE,
        )?,
        lane_change_duration: number_field(
            response,
            "lane_change_duration",
            DEFAULT_LANE_CHANGE_DURATION,
            LANE_CHANGE_DURATION_RANGE,
        )?,
        road_condition: condition_field(response)?,
    })
}

fn number_field(
    response: &Map<String, Value>,
    field: &'static str,
    default: f64,
    range: RangeInclusive<f64>,
) -> Result<f64, ProposalError> {
    let value = match response.get(field) {
        None | Some(Value::Null) => return Ok(default),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    let value = value
        .filter(|v| v.is_finite())
        .ok_or_else(|| ProposalError::InvalidField {
            field,
            value: response[field].to_string(),
        })?;

    let clamped = value.clamp(*range.start(), *range.end());
    if clamped != value {
        warn!(field, value, clamped, "Proposed value outside documented range");
    }
    Ok(clamped)
}

fn condition_field(response: &Map<String, Value>) -> Result<RoadCondition, ProposalError> {
    match response.get("road_condition") {
        None | Some(Value::Null) => Ok(DEFAULT_ROAD_CONDITION),
        Some(Value::String(s)) => s.parse().map_err(|_| ProposalError::InvalidField {
            field: "road_condition",
            value: s.clone(),
        }),
        Some(other) => Err(ProposalError::InvalidField {
            field: "road_condition",
            value: other.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Reasoning proposer
// ---------------------------------------------------------------------------

/// Proposer backed by an external reasoning service, with a local fallback.
pub struct ReasoningProposer<R> {
    reasoner: Option<R>,
    timeout: Duration,
    fallback: FallbackSampler,
    fallbacks_used: u32,
}

impl<R: ReasoningClient> ReasoningProposer<R> {
    /// `reasoner = None` runs in fallback-only mode.
    pub fn new(reasoner: Option<R>) -> Self {
        if reasoner.is_none() {
            warn!("No reasoning client configured; proposals will use the fallback sampler");
        }
        Self {
            reasoner,
            timeout: DEFAULT_REASONING_TIMEOUT,
            fallback: FallbackSampler::new(),
            fallbacks_used: 0,
        }
    }

    /// Upper bound on a single reasoning call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackSampler) -> Self {
        self.fallback = fallback;
        self
    }

    /// How many proposals came from the fallback sampler so far.
    pub fn fallbacks_used(&self) -> u32 {
        self.fallbacks_used
    }

    /// One reasoned proposal, or the reason it could not be produced.
    pub async fn try_reasoned(&self, history: &[HistoryEntry]) -> Result<ScenarioParameters, ProposalError> {
        let reasoner = self.reasoner.as_ref().ok_or(ProposalError::Unconfigured)?;

        info!(
            model = reasoner.model(),
            history = history.len(),
            "Requesting scenario from reasoning service"
        );

        let system = prompt::proposer_system();
        let user = prompt::proposer_user(history);
        let response = tokio::time::timeout(self.timeout, reasoner.complete_json(system, &user))
            .await
            .map_err(|_| ProposalError::Timeout(self.timeout))??;

        decode_proposal(&response)
    }
}

#[async_trait]
impl<R: ReasoningClient> ScenarioProposer for ReasoningProposer<R> {
    async fn propose(&mut self, history: &[HistoryEntry]) -> ScenarioParameters {
        match self.try_reasoned(history).await {
            Ok(params) => {
                info!(
                    ego_speed = params.ego_speed,
                    adversary_speed = params.adversary_speed,
                    lateral_offset = params.lateral_offset,
                    lane_change_duration = params.lane_change_duration,
                    road_condition = %params.road_condition,
                    "Reasoned scenario proposal"
                );
                params
            }
            Err(e) => {
                if !matches!(e, ProposalError::Unconfigured) {
                    warn!(error = %e, "Reasoning proposal failed, falling back to random sampling");
                }
                self.fallbacks_used += 1;
                let params = self.fallback.sample();
                info!(
                    ego_speed = params.ego_speed,
                    lateral_offset = params.lateral_offset,
                    lane_change_duration = params.lane_change_duration,
                    "Fallback scenario proposal"
                );
                params
            }
        }
    }
}
