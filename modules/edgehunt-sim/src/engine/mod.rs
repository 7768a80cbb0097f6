//! Real-engine backend: drives a simulator bridge over HTTP and computes
//! telemetry from the trajectory it returns.

pub mod client;
pub mod trajectory;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use edgehunt_common::Telemetry;
use tracing::{error, info, warn};

use crate::backend::{BackendState, SimulatorBackend};
use crate::error::{Result, SimError};
use client::{BridgeClient, WorldInfo};
pub use trajectory::{telemetry_from_samples, Pose, TrajectorySample};

/// A scenario document staged on disk and registered with the engine.
#[derive(Debug)]
struct StagedScenario {
    scenario_id: String,
    path: PathBuf,
}

pub struct EngineSimulator {
    /// `None` when the HTTP client could not be built; `connect` then fails.
    client: Option<BridgeClient>,
    staging_dir: PathBuf,
    state: BackendState,
    world: Option<WorldInfo>,
    staged: Option<StagedScenario>,
    actors: Vec<u64>,
}

impl EngineSimulator {
    pub fn new(host: &str, port: u16, timeout: Duration, staging_dir: PathBuf) -> Self {
        let client = match BridgeClient::new(host, port, timeout) {
            Ok(client) => Some(client),
            Err(e) => {
                error!(error = %e, "Engine client unavailable; connect will fail");
                None
            }
        };

        Self {
            client,
            staging_dir,
            state: BackendState::Disconnected,
            world: None,
            staged: None,
            actors: Vec::new(),
        }
    }

    /// Actors spawned by the engine and not yet destroyed.
    pub fn live_actors(&self) -> &[u64] {
        &self.actors
    }

    fn client(&self) -> Result<&BridgeClient> {
        self.client
            .as_ref()
            .ok_or_else(|| SimError::Connection("engine client unavailable".to_string()))
    }

    async fn stage_document(&self, document: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.staging_dir).await?;
        let name = format!("temp_scenario_{}.xosc", Utc::now().format("%Y%m%d%H%M%S%3f"));
        let path = self.staging_dir.join(name);
        tokio::fs::write(&path, document).await?;
        Ok(path)
    }

    async fn release_staged(&mut self) {
        if let Some(staged) = self.staged.take() {
            remove_staged_file(&staged.path).await;
        }
    }
}

async fn remove_staged_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove staged scenario"),
    }
}

#[async_trait]
impl SimulatorBackend for EngineSimulator {
    fn name(&self) -> &'static str {
        "engine"
    }

    fn state(&self) -> BackendState {
        self.state
    }

    async fn connect(&mut self) -> Result<()> {
        if self.state != BackendState::Disconnected {
            return Ok(());
        }

        let client = self.client()?;
        info!(endpoint = client.base_url(), "Connecting to simulation engine");

        let world = client.world().await.map_err(|e| {
            error!(error = %e, "Failed to connect to simulation engine");
            match e {
                SimError::Connection(_) => e,
                other => SimError::Connection(other.to_string()),
            }
        })?;

        info!(
            map = world.map.as_str(),
            engine_version = world.engine_version.as_deref().unwrap_or("unknown"),
            "Engine connection established"
        );
        self.world = Some(world);
        self.state = BackendState::Connected;
        Ok(())
    }

    async fn load_scenario(&mut self, document: &str) -> Result<()> {
        if self.state == BackendState::Disconnected {
            self.connect().await.map_err(|e| {
                SimError::Connection(format!("engine connection failed during scenario load: {e}"))
            })?;
        }

        // A scenario loaded but never run is superseded.
        self.release_staged().await;

        let path = self.stage_document(document).await?;
        let created = match self.client()?.create_scenario(document).await {
            Ok(created) => created,
            Err(e) => {
                remove_staged_file(&path).await;
                return Err(e);
            }
        };

        info!(
            scenario_id = created.scenario_id.as_str(),
            actors = created.actor_ids.len(),
            path = %path.display(),
            "Scenario staged on engine"
        );

        self.actors.extend(created.actor_ids);
        self.staged = Some(StagedScenario {
            scenario_id: created.scenario_id,
            path,
        });
        self.state = BackendState::ScenarioLoaded;
        Ok(())
    }

    async fn run_simulation(&mut self) -> Result<Telemetry> {
        if self.world.is_none() {
            return Err(SimError::Connection("no connected world".to_string()));
        }
        let staged = match (self.state, self.staged.take()) {
            (BackendState::ScenarioLoaded, Some(staged)) => staged,
            _ => return Err(SimError::NoScenarioLoaded),
        };

        info!(scenario_id = staged.scenario_id.as_str(), "Running scenario on engine");
        let outcome = self.client()?.run_scenario(&staged.scenario_id).await;

        remove_staged_file(&staged.path).await;
        self.state = BackendState::Connected;

        let run = outcome?;
        if run.samples.is_empty() {
            warn!(
                scenario_id = staged.scenario_id.as_str(),
                "Engine returned an empty trajectory"
            );
        }

        let telemetry = telemetry_from_samples(&run.samples, run.collision);
        info!(
            min_ttc = telemetry.min_ttc,
            collision = telemetry.collision,
            samples = run.samples.len(),
            "Engine run complete"
        );
        Ok(telemetry)
    }

    async fn cleanup(&mut self) {
        self.release_staged().await;

        if !self.actors.is_empty() {
            let actors = std::mem::take(&mut self.actors);
            match self.client() {
                Ok(client) => match client.destroy_actors(&actors).await {
                    Ok(()) => info!(actors = actors.len(), "Destroyed engine actors"),
                    Err(e) => warn!(error = %e, actors = actors.len(), "Failed to destroy engine actors"),
                },
                Err(e) => warn!(error = %e, "Cannot destroy actors without an engine client"),
            }
        }

        if self.state != BackendState::Disconnected {
            info!("Engine cleanup complete");
        }
        self.world = None;
        self.state = BackendState::Disconnected;
    }
}
