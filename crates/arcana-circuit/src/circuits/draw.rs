//! draw one card from a committed deck
//!
//! public: `[deck_commitment, game_id, draw_index, draw_commitment]`
//!
//! no nullifier: the deck persists and the ledger refuses a second draw of
//! the same `(game_id, draw_index)`.

use serde::{Deserialize, Serialize};

use super::{CircuitKind, Statement};
use crate::constraint::{lc, CircuitBuilder, LinearCombination};
use crate::deck::{self, Deck, DeckCommitment, DECK_SIZE};
use crate::field::Fr;
use crate::gadgets;
use crate::poseidon;
use crate::{CircuitError, Result};

/// bits covering a card value or index below 52
const INDEX_BITS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawPublic {
    pub deck_commitment: DeckCommitment,
    #[serde(with = "crate::field::serde_hex")]
    pub game_id: Fr,
    pub draw_index: u8,
    #[serde(with = "crate::field::serde_hex")]
    pub draw_commitment: Fr,
}

impl DrawPublic {
    pub fn to_field_vec(&self) -> Vec<Fr> {
        vec![
            self.deck_commitment.0,
            self.game_id,
            Fr::from(self.draw_index as u64),
            self.draw_commitment,
        ]
    }
}

#[derive(Debug, Clone)]
pub struct DrawStatement {
    pub public: DrawPublic,
    pub deck: Deck,
    pub hand_salt: Fr,
}

impl DrawStatement {
    pub fn new(deck: Deck, game_id: Fr, draw_index: u8, hand_salt: Fr) -> Result<Self> {
        let card = deck.card(draw_index as usize)?;
        Ok(Self {
            public: DrawPublic {
                deck_commitment: deck.commit(),
                game_id,
                draw_index,
                draw_commitment: deck::draw_commitment(card, draw_index, game_id, hand_salt),
            },
            deck,
            hand_salt,
        })
    }

    /// the drawn card, known only to the drawer
    pub fn card(&self) -> Result<u8> {
        self.deck.card(self.public.draw_index as usize)
    }
}

impl Statement for DrawStatement {
    fn kind(&self) -> CircuitKind {
        CircuitKind::Draw
    }

    fn public_inputs(&self) -> Vec<Fr> {
        self.public.to_field_vec()
    }

    fn synthesize(&self, b: &mut CircuitBuilder) {
        let p = &self.public;
        let deck_commitment = b.add_public(p.deck_commitment.0);
        let game_id = b.add_public(p.game_id);
        let index = b.add_public(Fr::from(p.draw_index as u64));
        let draw_commitment = b.add_public(p.draw_commitment);

        let cards: Vec<LinearCombination> = self
            .deck
            .card_fields()
            .iter()
            .map(|c| lc(b.add_witness(*c)))
            .collect();
        let salt = b.add_witness(self.deck.salt());
        let hand_salt = b.add_witness(self.hand_salt);

        b.scoped("deck commitment", |b| {
            let h = deck::commit_gadget(b, &cards, salt);
            b.assert_eq(h, deck_commitment);
        });
        b.scoped("draw index", |b| {
            gadgets::assert_bits(b, index, INDEX_BITS);
            gadgets::assert_lt_const(b, index, DECK_SIZE as u64);
        });
        let card = b.scoped("card", |b| {
            let card = gadgets::select(b, &cards, index);
            gadgets::assert_bits(b, card, INDEX_BITS);
            gadgets::assert_lt_const(b, card, DECK_SIZE as u64);
            card
        });
        b.scoped("draw commitment", |b| {
            let h = poseidon::hash_gadget(b, [lc(card), lc(index), lc(game_id), lc(hand_salt)]);
            b.assert_eq(h, draw_commitment);
        });
    }
}

/// reject indices outside the deck before building anything
pub fn check_index(index: u64) -> Result<u8> {
    if index >= DECK_SIZE as u64 {
        return Err(CircuitError::OutOfRange {
            what: "draw index",
            value: index,
            bound: DECK_SIZE as u64,
        });
    }
    Ok(index as u8)
}
