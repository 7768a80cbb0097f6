// Simulator backend capability and the construction-time backend choice.
//
// Lifecycle per instance:
//   Disconnected -> Connected -> ScenarioLoaded -> (run) -> Connected
// `cleanup` is legal from any state and returns to Disconnected.

use async_trait::async_trait;
use edgehunt_common::{Config, Telemetry};

use crate::engine::EngineSimulator;
use crate::error::Result;
use crate::heuristic::HeuristicSimulator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    Disconnected,
    Connected,
    ScenarioLoaded,
}

#[async_trait]
pub trait SimulatorBackend: Send {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    fn state(&self) -> BackendState;

    /// Establish readiness. A `SimError::Connection` here is fatal to the run.
    async fn connect(&mut self) -> Result<()>;

    /// Stage a scenario document. Connects once first when disconnected.
    async fn load_scenario(&mut self, document: &str) -> Result<()>;

    /// Execute the loaded scenario and return its telemetry.
    async fn run_simulation(&mut self) -> Result<Telemetry>;

    /// Release everything held across the run. Idempotent.
    async fn cleanup(&mut self);
}

/// The two interchangeable backends, chosen once at construction.
pub enum Simulator {
    Heuristic(HeuristicSimulator),
    Engine(EngineSimulator),
}

impl Simulator {
    pub fn from_config(config: &Config) -> Self {
        if config.use_mock_backend {
            let sim = match config.seed {
                Some(seed) => HeuristicSimulator::with_seed(seed),
                None => HeuristicSimulator::new(),
            };
            Simulator::Heuristic(sim)
        } else {
            Simulator::Engine(EngineSimulator::new(
                &config.backend_host,
                config.backend_port,
                config.backend_timeout(),
                config.data_dir.clone(),
            ))
        }
    }
}

#[async_trait]
impl SimulatorBackend for Simulator {
    fn name(&self) -> &'static str {
        match self {
            Simulator::Heuristic(s) => s.name(),
            Simulator::Engine(s) => s.name(),
        }
    }

    fn state(&self) -> BackendState {
        match self {
            Simulator::Heuristic(s) => s.state(),
            Simulator::Engine(s) => s.state(),
        }
    }

    async fn connect(&mut self) -> Result<()> {
        match self {
            Simulator::Heuristic(s) => s.connect().await,
            Simulator::Engine(s) => s.connect().await,
        }
    }

    async fn load_scenario(&mut self, document: &str) -> Result<()> {
        match self {
            Simulator::Heuristic(s) => s.load_scenario(document).await,
            Simulator::Engine(s) => s.load_scenario(document).await,
        }
    }

    async fn run_simulation(&mut self) -> Result<Telemetry> {
        match self {
            Simulator::Heuristic(s) => s.run_simulation().await,
            Simulator::Engine(s) => s.run_simulation().await,
        }
    }

    async fn cleanup(&mut self) {
        match self {
            Simulator::Heuristic(s) => s.cleanup().await,
            Simulator::Engine(s) => s.cleanup().await,
        }
    }
}
