//! ledger rejections and reason codes

use arcana_circuit::{field, CircuitKind, Fr};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// a submission the ledger refused
///
/// these are expected outcomes, never retried: once a nullifier or draw
/// index is marked used the mark is permanent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("commitment {} already registered", field::to_hex(.0))]
    AlreadyExists(Fr),

    #[error("commitment {} not found", field::to_hex(.0))]
    NotFound(Fr),

    #[error("commitment {} already spent", field::to_hex(.0))]
    AlreadySpent(Fr),

    #[error("nullifier {} already used", field::to_hex(.0))]
    NullifierUsed(Fr),

    #[error("commitment {} is a persistent resource", field::to_hex(.0))]
    NotConsumable(Fr),

    #[error("game {} already has a deck", field::to_hex(.0))]
    DeckAlreadyRegistered(Fr),

    #[error("game {} has no deck", field::to_hex(.0))]
    DeckNotRegistered(Fr),

    #[error("deck commitment does not match game {}", field::to_hex(.0))]
    DeckMismatch(Fr),

    #[error("card {index} of game {} already drawn", field::to_hex(.game_id))]
    AlreadyDrawn { game_id: Fr, index: u8 },

    #[error("draw index {0} out of range")]
    IndexOutOfRange(u64),

    #[error("{0} proof rejected")]
    InvalidProof(CircuitKind),

    #[error("malformed {kind} public inputs: {reason}")]
    MalformedPublicInputs {
        kind: CircuitKind,
        reason: &'static str,
    },
}

/// stable, user-facing rejection reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    AlreadyExists,
    NotFound,
    AlreadySpent,
    NullifierUsed,
    NotConsumable,
    DeckAlreadyRegistered,
    DeckNotRegistered,
    DeckMismatch,
    AlreadyDrawn,
    IndexOutOfRange,
    InvalidProof,
    MalformedPublicInputs,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::AlreadyExists => "already_exists",
            ReasonCode::NotFound => "not_found",
            ReasonCode::AlreadySpent => "already_spent",
            ReasonCode::NullifierUsed => "nullifier_used",
            ReasonCode::NotConsumable => "not_consumable",
            ReasonCode::DeckAlreadyRegistered => "deck_already_registered",
            ReasonCode::DeckNotRegistered => "deck_not_registered",
            ReasonCode::DeckMismatch => "deck_mismatch",
            ReasonCode::AlreadyDrawn => "already_drawn",
            ReasonCode::IndexOutOfRange => "index_out_of_range",
            ReasonCode::InvalidProof => "invalid_proof",
            ReasonCode::MalformedPublicInputs => "malformed_public_inputs",
        }
    }
}

impl core::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LedgerError {
    pub fn reason(&self) -> ReasonCode {
        match self {
            LedgerError::AlreadyExists(_) => ReasonCode::AlreadyExists,
            LedgerError::NotFound(_) => ReasonCode::NotFound,
            LedgerError::AlreadySpent(_) => ReasonCode::AlreadySpent,
            LedgerError::NullifierUsed(_) => ReasonCode::NullifierUsed,
            LedgerError::NotConsumable(_) => ReasonCode::NotConsumable,
            LedgerError::DeckAlreadyRegistered(_) => ReasonCode::DeckAlreadyRegistered,
            LedgerError::DeckNotRegistered(_) => ReasonCode::DeckNotRegistered,
            LedgerError::DeckMismatch(_) => ReasonCode::DeckMismatch,
            LedgerError::AlreadyDrawn { .. } => ReasonCode::AlreadyDrawn,
            LedgerError::IndexOutOfRange(_) => ReasonCode::IndexOutOfRange,
            LedgerError::InvalidProof(_) => ReasonCode::InvalidProof,
            LedgerError::MalformedPublicInputs { .. } => ReasonCode::MalformedPublicInputs,
        }
    }
}

/// failures loading a ledger config
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes_stable() {
        let err = LedgerError::AlreadyDrawn {
            game_id: Fr::from(7u64),
            index: 0,
        };
        assert_eq!(err.reason().as_str(), "already_drawn");
        assert_eq!(
            serde_json::to_string(&LedgerError::NullifierUsed(Fr::from(1u64)).reason()).unwrap(),
            "\"nullifier_used\""
        );
    }

    #[test]
    fn test_messages_name_the_key() {
        let msg = LedgerError::NotFound(Fr::from(255u64)).to_string();
        assert!(msg.contains(&field::to_hex(&Fr::from(255u64))));
    }
}
