//! Search orchestrator — the closed propose → simulate → evaluate loop.

use std::path::PathBuf;

use anyhow::{Context, Result};
use edgehunt_common::{HistoryEntry, RunRecord};
use edgehunt_sim::{BackendState, SimulatorBackend};
use tracing::{info, info_span, warn, Instrument};

use crate::evaluator::RiskEvaluator;
use crate::proposer::ScenarioProposer;
use crate::store::RunRecorder;
use crate::template::ScenarioTemplate;

/// Result of a completed search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub iterations_run: u32,
    pub discoveries: usize,
    pub artifacts: Vec<PathBuf>,
}

/// Owns the backend, proposer and recorder for one search run.
pub struct EdgeCaseSearch<B, P, R> {
    backend: B,
    proposer: P,
    recorder: R,
    evaluator: RiskEvaluator,
    template: ScenarioTemplate,
    max_iterations: u32,
    history: Vec<HistoryEntry>,
    discoveries: usize,
    artifacts: Vec<PathBuf>,
    iterations_run: u32,
}

impl<B, P, R> EdgeCaseSearch<B, P, R>
where
    B: SimulatorBackend,
    P: ScenarioProposer,
    R: RunRecorder,
{
    pub fn new(backend: B, proposer: P, recorder: R, evaluator: RiskEvaluator, max_iterations: u32) -> Self {
        Self {
            backend,
            proposer,
            recorder,
            evaluator,
            template: ScenarioTemplate::builtin(),
            max_iterations,
            history: Vec::new(),
            discoveries: 0,
            artifacts: Vec::new(),
            iterations_run: 0,
        }
    }

    pub fn with_template(mut self, template: ScenarioTemplate) -> Self {
        self.template = template;
        self
    }

    /// Connect if needed, run every iteration, then release the backend once.
    ///
    /// A connection failure returns before any iteration. A backend failure
    /// inside an iteration aborts the remaining iterations; partial results
    /// stay readable through the accessors.
    pub async fn run(&mut self) -> Result<SearchOutcome> {
        info!(
            backend = self.backend.name(),
            max_iterations = self.max_iterations,
            critical_ttc = self.evaluator.critical_ttc(),
            "Starting edge case search"
        );

        if self.backend.state() == BackendState::Disconnected {
            self.connect().await?;
        }

        let result = self.iterate().await;

        self.backend.cleanup().await;

        match &result {
            Ok(()) => info!(
                iterations = self.iterations_run,
                discoveries = self.discoveries,
                "Search complete"
            ),
            Err(e) => warn!(
                iterations = self.iterations_run,
                discoveries = self.discoveries,
                error = %format!("{e:#}"),
                "Search aborted"
            ),
        }
        result?;

        Ok(SearchOutcome {
            iterations_run: self.iterations_run,
            discoveries: self.discoveries,
            artifacts: self.artifacts.clone(),
        })
    }

    /// Establish the backend connection ahead of [`run`](Self::run).
    pub async fn connect(&mut self) -> Result<()> {
        self.backend
            .connect()
            .await
            .context("Could not connect to the simulator")?;
        info!(backend = self.backend.name(), "Simulator connected");
        Ok(())
    }

    async fn iterate(&mut self) -> Result<()> {
        for iteration in 1..=self.max_iterations {
            let span = info_span!("iteration", iteration, of = self.max_iterations);
            self.step(iteration).instrument(span).await?;
            self.iterations_run = iteration;
        }
        Ok(())
    }

    async fn step(&mut self, iteration: u32) -> Result<()> {
        let params = self.proposer.propose(&self.history).await;
        let document = self.template.render(&params)?;

        self.backend
            .load_scenario(&document)
            .await
            .with_context(|| format!("loading scenario for iteration {iteration}"))?;
        let telemetry = self
            .backend
            .run_simulation()
            .await
            .with_context(|| format!("running iteration {iteration}"))?;

        let evaluation = self.evaluator.evaluate(&telemetry);

        self.history
            .push(HistoryEntry::from_run(&params, &telemetry, evaluation.score));
        self.recorder
            .record_run(&RunRecord::new(iteration, &params, &telemetry, &evaluation))?;

        if evaluation.is_failure() {
            let path = self
                .recorder
                .save_edge_case(iteration, evaluation.score, &document)?;
            self.discoveries += 1;
            self.artifacts.push(path);
            info!(
                score = evaluation.score,
                status = %evaluation.status,
                min_ttc = telemetry.min_ttc,
                "Edge case found"
            );
        } else {
            info!(min_ttc = telemetry.min_ttc, "Safe run, continuing search");
        }
        Ok(())
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn discoveries(&self) -> usize {
        self.discoveries
    }

    pub fn iterations_run(&self) -> u32 {
        self.iterations_run
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn proposer(&self) -> &P {
        &self.proposer
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }
}
