//! error types for arcana-circuit

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CircuitError>;

/// failures while building, checking or proving a statement
///
/// everything here is a proof-time failure: the witness cannot satisfy the
/// circuit, so no proof is ever produced
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CircuitError {
    #[error("constraint {index} unsatisfied in scope `{scope}`")]
    Unsatisfied { index: usize, scope: &'static str },

    #[error("witness has {got} wires, circuit expects {expected}")]
    WitnessLength { expected: usize, got: usize },

    #[error("constant wire must equal one")]
    ConstantWire,

    #[error("poseidon arity {0} unsupported (1..=7)")]
    UnsupportedArity(usize),

    #[error("{what} out of range: {value} >= {bound}")]
    OutOfRange {
        what: &'static str,
        value: u64,
        bound: u64,
    },

    #[error("invalid rarity thresholds: {0}")]
    InvalidThresholds(&'static str),

    #[error("invalid secret key: not below the subgroup order")]
    InvalidSecretKey,

    #[error("invalid deck: {0}")]
    InvalidDeck(&'static str),

    #[error("note kind mismatch: expected {expected}")]
    NoteKind { expected: &'static str },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("proof backend: {0}")]
    Backend(String),

    #[error("no proving key for {0}")]
    MissingKey(&'static str),
}
