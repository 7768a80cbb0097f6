//! Simulator backends for the edge-case search.
//!
//! One four-operation capability ([`SimulatorBackend`]) with two
//! implementations: a heuristic stand-in and an adapter for a real engine
//! reached through an HTTP bridge.

pub mod backend;
pub mod engine;
pub mod error;
pub mod extract;
pub mod heuristic;

pub use backend::{BackendState, Simulator, SimulatorBackend};
pub use engine::EngineSimulator;
pub use error::{Result, SimError};
pub use extract::ScenarioExtract;
pub use heuristic::{estimate_min_ttc, HeuristicSimulator};
