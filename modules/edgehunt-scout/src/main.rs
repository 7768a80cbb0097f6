use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ai_client::OpenAi;
use edgehunt_common::{Config, ConfigError};
use edgehunt_scout::{
    report, DiskRecorder, EdgeCaseSearch, FallbackSampler, ReasoningProposer, RiskEvaluator,
    ScenarioTemplate,
};
use edgehunt_sim::Simulator;

/// Closed-loop search for cut-in scenarios that break the ego vehicle.
#[derive(Parser, Debug)]
#[command(name = "edgehunt", version)]
struct Cli {
    /// Number of search iterations
    #[arg(long)]
    iterations: Option<u32>,

    /// Use the heuristic simulator
    #[arg(long, conflicts_with = "engine")]
    mock: bool,

    /// Use the real engine bridge
    #[arg(long)]
    engine: bool,

    /// Engine bridge host
    #[arg(long)]
    host: Option<String>,

    /// Engine bridge port
    #[arg(long)]
    port: Option<u16>,

    /// Reasoning model name
    #[arg(long)]
    model: Option<String>,

    /// Critical time-to-collision threshold (s)
    #[arg(long)]
    threshold: Option<f64>,

    /// Directory for logs, results and staged scenarios
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Custom scenario template
    #[arg(long)]
    template: Option<PathBuf>,

    /// Seed for the fallback sampler and heuristic jitter
    #[arg(long)]
    seed: Option<u64>,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if let Some(n) = self.iterations {
            config.max_iterations = n;
        }
        if self.mock {
            config.use_mock_backend = true;
        }
        if self.engine {
            config.use_mock_backend = false;
        }
        if let Some(host) = self.host {
            config.backend_host = host;
        }
        if let Some(port) = self.port {
            config.backend_port = port;
        }
        if let Some(model) = self.model {
            config.reasoning_model_name = model;
        }
        if let Some(threshold) = self.threshold {
            config.critical_ttc_threshold = threshold;
        }
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(path) = self.template {
            config.template_path = Some(path);
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
    }
}

/// Layer CLI flags over the environment, then range-check the result.
fn effective_config(cli: Cli, mut config: Config) -> Result<Config, ConfigError> {
    cli.apply(&mut config);
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("edgehunt=info,ai_client=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = effective_config(cli, Config::parse_env()?)?;
    config.log_redacted();

    let template = match &config.template_path {
        Some(path) => ScenarioTemplate::from_path(path)?,
        None => ScenarioTemplate::builtin(),
    };

    let reasoner = config.openai_api_key.as_ref().map(|key| {
        OpenAi::new(key.clone(), config.reasoning_model_name.clone())
            .with_timeout(config.reasoning_timeout())
    });
    let fallback = match config.seed {
        Some(seed) => FallbackSampler::with_seed(seed),
        None => FallbackSampler::new(),
    };
    let proposer = ReasoningProposer::new(reasoner)
        .with_timeout(config.reasoning_timeout())
        .with_fallback(fallback);

    let recorder = DiskRecorder::create(&config.data_dir)?;
    let log_path = recorder.log_path().to_path_buf();

    let mut search = EdgeCaseSearch::new(
        Simulator::from_config(&config),
        proposer,
        recorder,
        RiskEvaluator::new(config.critical_ttc_threshold),
        config.max_iterations,
    )
    .with_template(template);

    if let Err(e) = search.connect().await {
        error!(error = %format!("{e:#}"), "Could not connect to the simulator. Exiting.");
        return Err(e);
    }

    let result = search.run().await;
    report::print_summary(&log_path, search.discoveries());

    let outcome = result?;
    info!(
        iterations = outcome.iterations_run,
        discoveries = outcome.discoveries,
        fallbacks = search.proposer().fallbacks_used(),
        "Edge case search finished"
    );
    Ok(())
}
