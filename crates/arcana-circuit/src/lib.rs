//! Private game assets as BN254 constraint systems
//!
//! Every state change in an arcana game is a statement proven in zero
//! knowledge and verified by the ledger against public inputs only:
//!
//! - **Transfer**: move a fungible asset note to a new owner
//! - **Trade**: move an item note, optionally bound to a payment commitment
//! - **Rarity roll**: VRF output of an owner key, mapped to a rarity tier
//! - **Loot box**: spend a box note and mint an item whose tier comes from the VRF
//! - **Shuffle**: commit to a deck whose order is fixed by a private seed
//! - **Draw**: reveal a commitment to one card of a committed deck
//!
//! ## Architecture
//!
//! - `constraint`: R1CS builder with scoped constraints and a checker
//! - `poseidon` / `gadgets` / `keys`: the primitives every statement uses
//! - `note` / `vrf` / `deck` / `shuffle`: native values and their gadgets
//! - `circuits`: the six statements behind one [`Statement`] trait
//! - `proof`: the [`ProofSystem`] / [`Verifier`] seam with an attestation
//!   backend and (feature `groth16`) a Groth16 backend
//!
//! ## Example
//!
//! ```
//! use arcana_circuit::{AttestationBackend, Keypair, Note, ProofSystem, Statement, TransferStatement, Verifier, CircuitKind, Fr};
//!
//! let mut rng = rand::thread_rng();
//! let alice = Keypair::generate(&mut rng);
//! let bob = Keypair::generate(&mut rng);
//!
//! let note = Note::asset(alice.pk, Fr::from(42u64), Fr::from(1u64), &mut rng);
//! let statement = TransferStatement::new(note.clone(), alice.sk, note.transfer_to(bob.pk, &mut rng)).unwrap();
//!
//! let backend = AttestationBackend::random(&mut rng);
//! let proof = backend.prove_statement(&statement).unwrap();
//! assert!(backend.verify(CircuitKind::Transfer, &statement.public_inputs(), &proof));
//! ```

pub mod circuits;
pub mod constraint;
pub mod deck;
pub mod error;
pub mod field;
pub mod gadgets;
#[cfg(feature = "groth16")]
pub mod groth16;
pub mod keys;
pub mod note;
pub mod poseidon;
pub mod proof;
pub mod shuffle;
pub mod vrf;

pub use circuits::{
    payment_commitment, CircuitKind, DrawPublic, DrawStatement, LootBoxPublic, LootBoxStatement,
    RarityPublic, RarityStatement, ShufflePublic, ShuffleStatement, Statement, TradePublic,
    TradeStatement, TransferPublic, TransferStatement,
};
pub use constraint::{Circuit, CircuitBuilder, LinearCombination, WireId, Witness};
pub use deck::{Deck, DeckCommitment, DECK_SIZE};
pub use error::{CircuitError, Result};
pub use field::Fr;
#[cfg(feature = "groth16")]
pub use groth16::Groth16Backend;
pub use keys::{Keypair, PublicKey, SecretKey};
pub use note::{EncryptedPayload, Note, NoteCommitment, NoteFields, Nullifier};
pub use proof::{AttestationBackend, Proof, ProofSystem, Verifier};
pub use vrf::{Thresholds, RARITY_TIERS};
