//! resource records
//!
//! notes and decks share the commitment namespace but follow different
//! lifecycles, so they are separate variants: a note is consumed once, a
//! deck persists and only its indices are marked.

use arcana_circuit::{DeckCommitment, EncryptedPayload, Fr, DECK_SIZE};
use serde::{Deserialize, Serialize};

/// externally visible commitment state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentState {
    Invalid,
    Valid,
    Spent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    pub spent: bool,
    /// opaque recipient ciphertext, no role in validity
    pub payload: Option<EncryptedPayload>,
}

impl NoteRecord {
    pub fn new(payload: Option<EncryptedPayload>) -> Self {
        Self { spent: false, payload }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeckRecord {
    pub game_id: Fr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Consumable(NoteRecord),
    Persistent(DeckRecord),
}

impl Resource {
    pub fn state(&self) -> CommitmentState {
        match self {
            Resource::Consumable(note) if note.spent => CommitmentState::Spent,
            Resource::Consumable(_) | Resource::Persistent(_) => CommitmentState::Valid,
        }
    }
}

/// a game's standing deck and which indices have been drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRecord {
    pub deck: DeckCommitment,
    drawn: u64,
}

impl GameRecord {
    pub fn new(deck: DeckCommitment) -> Self {
        Self { deck, drawn: 0 }
    }

    pub fn is_drawn(&self, index: u8) -> bool {
        (index as usize) < DECK_SIZE && self.drawn & (1 << index) != 0
    }

    /// false if already drawn
    pub fn mark(&mut self, index: u8) -> bool {
        debug_assert!((index as usize) < DECK_SIZE);
        let bit = 1u64 << index;
        let fresh = self.drawn & bit == 0;
        self.drawn |= bit;
        fresh
    }

    pub fn num_drawn(&self) -> u32 {
        self.drawn.count_ones()
    }
}
