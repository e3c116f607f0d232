//! verifiable shuffle of a fresh deck
//!
//! public: `[game_id, seed_commitment, deck_commitment]`
//!
//! the seed and deck salt stay private. the circuit binds the seed through
//! `seed_commitment = Poseidon(seed, game_id)`, replays all 51 fisher-yates
//! swaps from the identity order, checks the claimed cards against the
//! result and commits them.

use serde::{Deserialize, Serialize};

use super::{CircuitKind, Statement};
use crate::constraint::{lc, CircuitBuilder, LinearCombination};
use crate::deck::{self, Deck, DeckCommitment, DECK_SIZE};
use crate::field::Fr;
use crate::poseidon;
use crate::shuffle::shuffle_gadget;

/// `Poseidon(seed, game_id)`
pub fn seed_commitment(seed: Fr, game_id: Fr) -> Fr {
    poseidon::hash([seed, game_id])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShufflePublic {
    #[serde(with = "crate::field::serde_hex")]
    pub game_id: Fr,
    #[serde(with = "crate::field::serde_hex")]
    pub seed_commitment: Fr,
    pub deck_commitment: DeckCommitment,
}

impl ShufflePublic {
    pub fn to_field_vec(&self) -> Vec<Fr> {
        vec![self.game_id, self.seed_commitment, self.deck_commitment.0]
    }
}

#[derive(Debug, Clone)]
pub struct ShuffleStatement {
    pub public: ShufflePublic,
    pub seed: Fr,
    pub deck_salt: Fr,
    /// claimed card order, checked against the replayed shuffle
    pub cards: [u8; DECK_SIZE],
}

impl ShuffleStatement {
    pub fn new(game_id: Fr, seed: Fr, deck_salt: Fr) -> Self {
        let deck = Deck::shuffled(seed, deck_salt);
        Self {
            public: ShufflePublic {
                game_id,
                seed_commitment: seed_commitment(seed, game_id),
                deck_commitment: deck.commit(),
            },
            seed,
            deck_salt,
            cards: *deck.cards(),
        }
    }

    /// the shuffled deck, for later draws
    pub fn deck(&self) -> Deck {
        Deck::shuffled(self.seed, self.deck_salt)
    }
}

impl Statement for ShuffleStatement {
    fn kind(&self) -> CircuitKind {
        CircuitKind::Shuffle
    }

    fn public_inputs(&self) -> Vec<Fr> {
        self.public.to_field_vec()
    }

    fn synthesize(&self, b: &mut CircuitBuilder) {
        let p = &self.public;
        let game_id = b.add_public(p.game_id);
        let committed_seed = b.add_public(p.seed_commitment);
        let deck_commitment = b.add_public(p.deck_commitment.0);

        let seed = b.add_witness(self.seed);
        let salt = b.add_witness(self.deck_salt);
        let cards: Vec<LinearCombination> = self
            .cards
            .iter()
            .map(|c| lc(b.add_witness(Fr::from(*c as u64))))
            .collect();

        b.scoped("seed commitment", |b| {
            let h = poseidon::hash_gadget(b, [lc(seed), lc(game_id)]);
            b.assert_eq(h, committed_seed);
        });
        b.scoped("shuffle", |b| {
            let replayed = shuffle_gadget(b, seed);
            for (claimed, expected) in cards.iter().zip(replayed) {
                b.assert_eq(claimed.clone(), expected);
            }
        });
        b.scoped("deck commitment", |b| {
            let h = deck::commit_gadget(b, &cards, salt);
            b.assert_eq(h, deck_commitment);
        });
    }
}
