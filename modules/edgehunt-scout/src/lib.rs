pub mod evaluator;
pub mod prompt;
pub mod proposer;
pub mod reasoning;
pub mod report;
pub mod search;
pub mod store;
pub mod template;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use evaluator::RiskEvaluator;
pub use proposer::{FallbackSampler, ReasoningProposer, ScenarioProposer};
pub use reasoning::ReasoningClient;
pub use search::{EdgeCaseSearch, SearchOutcome};
pub use store::{DiskRecorder, RunRecorder};
pub use template::{ScenarioTemplate, TemplateError};
