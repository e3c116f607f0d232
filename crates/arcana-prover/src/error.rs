//! prover service errors

use arcana_circuit::CircuitError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProverError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProverError {
    /// the witness does not satisfy the statement, or the backend failed
    #[error(transparent)]
    Circuit(#[from] CircuitError),

    #[error("job cancelled")]
    Cancelled,

    /// the blocking worker panicked or was aborted
    #[error("worker failed: {0}")]
    Worker(String),

    #[error("prover service closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(&'static str),

    #[error(transparent)]
    Setup(#[from] CircuitError),
}
