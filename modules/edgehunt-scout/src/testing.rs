// Test mocks for the edge-case search.
//
// One mock per trait boundary:
// - ScriptedSimulator (SimulatorBackend) — telemetry replayed from a queue
// - ScriptedProposer (ScenarioProposer) — fixed parameter sequence
// - CannedReasoner / FailingReasoner / StalledReasoner (ReasoningClient)
// - MemoryRecorder (RunRecorder) — rows and artifacts kept in memory

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ai_client::AiError;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

use edgehunt_common::{
    HistoryEntry, RoadCondition, RunRecord, ScenarioParameters, Telemetry, NO_APPROACH_TTC,
};
use edgehunt_sim::{BackendState, SimError, SimulatorBackend};

use crate::proposer::ScenarioProposer;
use crate::reasoning::ReasoningClient;
use crate::store::RunRecorder;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn params(ego_speed: f64, lateral_offset: f64) -> ScenarioParameters {
    ScenarioParameters {
        ego_speed,
        adversary_speed: 100.0,
        lateral_offset,
        lane_change_duration: 2.0,
        road_condition: RoadCondition::Clear,
    }
}

pub fn safe_run() -> Telemetry {
    Telemetry::no_approach(15.0)
}

pub fn near_miss(min_ttc: f64) -> Telemetry {
    Telemetry {
        min_ttc,
        collision: false,
        duration: 15.0,
    }
}

pub fn collision() -> Telemetry {
    Telemetry {
        min_ttc: 0.1,
        collision: true,
        duration: 15.0,
    }
}

// ---------------------------------------------------------------------------
// ScriptedSimulator
// ---------------------------------------------------------------------------

/// Replays queued telemetry, one entry per run. Runs past the end of the
/// script report no close approach.
pub struct ScriptedSimulator {
    script: VecDeque<Telemetry>,
    state: BackendState,
    refuse_connect: bool,
    fail_on_run: Option<usize>,
    pub documents: Vec<String>,
    pub connects: usize,
    pub runs: usize,
    pub cleanups: usize,
}

impl ScriptedSimulator {
    pub fn new(script: Vec<Telemetry>) -> Self {
        Self {
            script: script.into(),
            state: BackendState::Disconnected,
            refuse_connect: false,
            fail_on_run: None,
            documents: Vec::new(),
            connects: 0,
            runs: 0,
            cleanups: 0,
        }
    }

    /// `connect` fails with a connection error.
    pub fn unreachable(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    /// The nth run (1-based) fails with an engine error.
    pub fn failing_on_run(mut self, n: usize) -> Self {
        self.fail_on_run = Some(n);
        self
    }
}

#[async_trait]
impl SimulatorBackend for ScriptedSimulator {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn state(&self) -> BackendState {
        self.state
    }

    async fn connect(&mut self) -> edgehunt_sim::Result<()> {
        self.connects += 1;
        if self.refuse_connect {
            return Err(SimError::Connection("scripted refusal".into()));
        }
        self.state = BackendState::Connected;
        Ok(())
    }

    async fn load_scenario(&mut self, document: &str) -> edgehunt_sim::Result<()> {
        if self.state == BackendState::Disconnected {
            self.connect().await?;
        }
        self.documents.push(document.to_string());
        self.state = BackendState::ScenarioLoaded;
        Ok(())
    }

    async fn run_simulation(&mut self) -> edgehunt_sim::Result<Telemetry> {
        if self.state != BackendState::ScenarioLoaded {
            return Err(SimError::NoScenarioLoaded);
        }
        self.runs += 1;
        self.state = BackendState::Connected;
        if self.fail_on_run == Some(self.runs) {
            return Err(SimError::Engine {
                status: 500,
                message: "scripted failure".into(),
            });
        }
        Ok(self.script.pop_front().unwrap_or(Telemetry {
            min_ttc: NO_APPROACH_TTC,
            collision: false,
            duration: 15.0,
        }))
    }

    async fn cleanup(&mut self) {
        self.cleanups += 1;
        self.state = BackendState::Disconnected;
    }
}

// ---------------------------------------------------------------------------
// ScriptedProposer
// ---------------------------------------------------------------------------

/// Cycles through fixed parameters and records the history length it saw.
pub struct ScriptedProposer {
    script: Vec<ScenarioParameters>,
    next: usize,
    pub seen_history: Vec<Vec<HistoryEntry>>,
}

impl ScriptedProposer {
    pub fn new(script: Vec<ScenarioParameters>) -> Self {
        assert!(!script.is_empty(), "scripted proposer needs at least one entry");
        Self {
            script,
            next: 0,
            seen_history: Vec::new(),
        }
    }
}

#[async_trait]
impl ScenarioProposer for ScriptedProposer {
    async fn propose(&mut self, history: &[HistoryEntry]) -> ScenarioParameters {
        self.seen_history.push(history.to_vec());
        let params = self.script[self.next % self.script.len()];
        self.next += 1;
        params
    }
}

// ---------------------------------------------------------------------------
// Reasoners
// ---------------------------------------------------------------------------

/// Returns queued JSON responses in order and keeps every user prompt.
pub struct CannedReasoner {
    responses: Mutex<VecDeque<Value>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl CannedReasoner {
    pub fn new(responses: Vec<Value>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle on the prompts received so far.
    pub fn prompts(&self) -> Arc<Mutex<Vec<String>>> {
        self.prompts.clone()
    }
}

#[async_trait]
impl ReasoningClient for CannedReasoner {
    fn model(&self) -> &str {
        "canned"
    }

    async fn complete_json(&self, _system: &str, user: &str) -> Result<Map<String, Value>, AiError> {
        self.prompts.lock().unwrap().push(user.to_string());
        match self.responses.lock().unwrap().pop_front() {
            Some(Value::Object(map)) => Ok(map),
            Some(other) => Err(AiError::Parse(format!("not an object: {other}"))),
            None => Err(AiError::EmptyResponse),
        }
    }
}

/// Always fails as if the service were unreachable.
pub struct FailingReasoner;

#[async_trait]
impl ReasoningClient for FailingReasoner {
    fn model(&self) -> &str {
        "failing"
    }

    async fn complete_json(&self, _system: &str, _user: &str) -> Result<Map<String, Value>, AiError> {
        Err(AiError::Network("connection refused".into()))
    }
}

/// Never answers within any reasonable timeout.
pub struct StalledReasoner;

#[async_trait]
impl ReasoningClient for StalledReasoner {
    fn model(&self) -> &str {
        "stalled"
    }

    async fn complete_json(&self, _system: &str, _user: &str) -> Result<Map<String, Value>, AiError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(AiError::Timeout)
    }
}

// ---------------------------------------------------------------------------
// MemoryRecorder
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryRecorder {
    pub rows: Vec<RunRecord>,
    pub edge_cases: Vec<(u32, f64, String)>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunRecorder for MemoryRecorder {
    fn record_run(&mut self, record: &RunRecord) -> Result<()> {
        self.rows.push(record.clone());
        Ok(())
    }

    fn save_edge_case(&mut self, iteration: u32, score: f64, document: &str) -> Result<PathBuf> {
        self.edge_cases.push((iteration, score, document.to_string()));
        Ok(PathBuf::from(crate::store::edge_case_file_name(iteration, score)))
    }
}
