use crate::Continous;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MdpError>;

#[derive(Error, Debug)]
pub enum MdpError {
    /// Bellman max over an empty action set is undefined.
    #[error("State {0} has no available actions")]
    InvalidState(String),

    #[error("Value iteration did not converge within {sweeps} sweeps (last delta {delta})")]
    NonConvergence { sweeps: usize, delta: Continous },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("State {0} is missing from the value table")]
    MissingValue(String),

    /// NaN or infinite rewards, initial values or backups.
    #[error("Non-finite value {value} for state {state}")]
    NonFiniteValue { state: String, value: Continous },

    #[error("Invalid distribution: {0}")]
    InvalidDistribution(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for MdpError {
    fn from(err: serde_json::Error) -> Self {
        MdpError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for MdpError {
    fn from(err: toml::ser::Error) -> Self {
        MdpError::Serialization(err.to_string())
    }
}
