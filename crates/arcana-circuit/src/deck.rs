//! persistent deck: ordered cards plus a salt, committed by a hash chain
//!
//! ```text
//! h_0  = Poseidon(cards[0], cards[1])
//! h_i  = Poseidon(h_{i-1}, cards[i+1])      i = 1..50
//! deck = Poseidon(h_50, salt)
//! ```
//!
//! the chain is order-sensitive: swapping any two cards changes the
//! commitment. decks are never spent, individual indices are drawn instead.

use serde::{Deserialize, Serialize};

use crate::constraint::{CircuitBuilder, LinearCombination, WireId};
use crate::field::{self, Fr};
use crate::poseidon;
use crate::shuffle;
use crate::{CircuitError, Result};

/// cards in a standard deck
pub const DECK_SIZE: usize = 52;

/// commitment to an ordered deck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeckCommitment(#[serde(with = "crate::field::serde_hex")] pub Fr);

impl DeckCommitment {
    pub fn to_hex(&self) -> String {
        field::to_hex(&self.0)
    }
}

/// an ordered permutation of 0..52 with its salt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    cards: [u8; DECK_SIZE],
    salt: Fr,
}

impl Deck {
    /// accept only a permutation of 0..52
    pub fn from_cards(cards: [u8; DECK_SIZE], salt: Fr) -> Result<Self> {
        if !is_permutation(&cards) {
            return Err(CircuitError::InvalidDeck("not a permutation of 0..52"));
        }
        Ok(Self { cards, salt })
    }

    /// the deck produced by shuffling the identity order with `seed`
    pub fn shuffled(seed: Fr, salt: Fr) -> Self {
        Self {
            cards: shuffle::shuffle(seed),
            salt,
        }
    }

    pub fn cards(&self) -> &[u8; DECK_SIZE] {
        &self.cards
    }

    pub fn salt(&self) -> Fr {
        self.salt
    }

    pub fn card(&self, index: usize) -> Result<u8> {
        self.cards
            .get(index)
            .copied()
            .ok_or(CircuitError::OutOfRange {
                what: "draw index",
                value: index as u64,
                bound: DECK_SIZE as u64,
            })
    }

    pub fn card_fields(&self) -> [Fr; DECK_SIZE] {
        self.cards.map(|c| Fr::from(c as u64))
    }

    pub fn commit(&self) -> DeckCommitment {
        commit(&self.card_fields(), self.salt)
    }
}

/// every value 0..52 appears exactly once
pub fn is_permutation(cards: &[u8]) -> bool {
    let mut seen = [false; DECK_SIZE];
    cards.len() == DECK_SIZE
        && cards.iter().all(|&c| {
            let c = c as usize;
            c < DECK_SIZE && !core::mem::replace(&mut seen[c], true)
        })
}

/// recursive chain commitment
pub fn commit(cards: &[Fr; DECK_SIZE], salt: Fr) -> DeckCommitment {
    let mut h = poseidon::hash([cards[0], cards[1]]);
    for card in &cards[2..] {
        h = poseidon::hash([h, *card]);
    }
    DeckCommitment(poseidon::hash([h, salt]))
}

/// `Poseidon(card, index, game_id, hand_salt)`
pub fn draw_commitment(card: u8, index: u8, game_id: Fr, hand_salt: Fr) -> Fr {
    poseidon::hash([
        Fr::from(card as u64),
        Fr::from(index as u64),
        game_id,
        hand_salt,
    ])
}

/// in-circuit chain commitment over card linear combinations
pub fn commit_gadget(
    builder: &mut CircuitBuilder,
    cards: &[LinearCombination],
    salt: impl Into<LinearCombination>,
) -> WireId {
    debug_assert_eq!(cards.len(), DECK_SIZE);
    let mut h = poseidon::hash_gadget(builder, [cards[0].clone(), cards[1].clone()]);
    for card in &cards[2..] {
        h = poseidon::hash_gadget(builder, [h.into(), card.clone()]);
    }
    poseidon::hash_gadget(builder, [h.into(), salt.into()])
}
