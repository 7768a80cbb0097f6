use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key} has an invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{key} must be {requirement}")]
    OutOfRange {
        key: &'static str,
        requirement: &'static str,
    },
}
