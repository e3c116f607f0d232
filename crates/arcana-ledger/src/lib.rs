//! Ledger state machine for arcana
//!
//! Tracks the lifecycle of note commitments, used nullifiers and drawn deck
//! indices. Proofs come in through the `submit_*` methods, are checked
//! against a [`Verifier`](arcana_circuit::Verifier), and only then is the
//! matching transition applied atomically per key.
//!
//! ```
//! use arcana_circuit::{AttestationBackend, NoteCommitment, Nullifier, Fr};
//! use arcana_ledger::{CommitmentState, Ledger, LedgerConfig};
//!
//! let ledger = Ledger::new(AttestationBackend::new([0u8; 32]), &LedgerConfig::default());
//! ledger.register(NoteCommitment(Fr::from(1u64))).unwrap();
//! ledger
//!     .spend(NoteCommitment(Fr::from(1u64)), NoteCommitment(Fr::from(2u64)), Nullifier(Fr::from(3u64)))
//!     .unwrap();
//! assert_eq!(ledger.get_state(Fr::from(1u64)), CommitmentState::Spent);
//! ```

pub mod config;
pub mod error;
pub mod ledger;
pub mod state;
mod store;

pub use config::LedgerConfig;
pub use error::{ConfigError, LedgerError, ReasonCode, Result};
pub use ledger::{Ledger, LedgerStats, Transition};
pub use state::{CommitmentState, DeckRecord, GameRecord, NoteRecord, Resource};
