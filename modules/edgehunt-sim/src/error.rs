use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    /// The backend could not be reached. Fatal to the whole search.
    #[error("Connection error: {0}")]
    Connection(String),

    /// `run_simulation` was called without a loaded scenario.
    #[error("No scenario loaded before run_simulation call")]
    NoScenarioLoaded,

    #[error("Engine error (status {status}): {message}")]
    Engine { status: u16, message: String },

    #[error("Engine did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Staging error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    pub fn is_connection(&self) -> bool {
        matches!(self, SimError::Connection(_))
    }
}
