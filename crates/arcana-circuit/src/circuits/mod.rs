//! statement circuits
//!
//! every statement holds its public inputs next to the private witness.
//! `new` constructors compute honest public values natively; synthesis
//! allocates the public wires first (in the declared order) and then emits
//! the constraints that tie the witness to them. a statement whose public
//! values disagree with its witness fails to build, naming the scope of the
//! first broken constraint.

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::constraint::{Circuit, CircuitBuilder, Witness};
use crate::field::{self, Fr};
use crate::keys::Keypair;
use crate::note::Note;
use crate::vrf::Thresholds;
use crate::Result;

pub mod draw;
pub mod lootbox;
pub mod rarity;
pub mod shuffle;
pub mod trade;
pub mod transfer;

pub use draw::{DrawPublic, DrawStatement};
pub use lootbox::{LootBoxPublic, LootBoxStatement};
pub use rarity::{RarityPublic, RarityStatement};
pub use shuffle::{ShufflePublic, ShuffleStatement};
pub use trade::{payment_commitment, TradePublic, TradeStatement};
pub use transfer::{TransferPublic, TransferStatement};

/// names a statement so verifiers can pick the matching key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitKind {
    Transfer,
    Trade,
    RarityRoll,
    LootBox,
    Shuffle,
    Draw,
}

impl CircuitKind {
    pub const ALL: [CircuitKind; 6] = [
        CircuitKind::Transfer,
        CircuitKind::Trade,
        CircuitKind::RarityRoll,
        CircuitKind::LootBox,
        CircuitKind::Shuffle,
        CircuitKind::Draw,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitKind::Transfer => "transfer",
            CircuitKind::Trade => "trade",
            CircuitKind::RarityRoll => "rarity_roll",
            CircuitKind::LootBox => "loot_box",
            CircuitKind::Shuffle => "shuffle",
            CircuitKind::Draw => "draw",
        }
    }

    /// length of the public input vector
    pub fn num_public(&self) -> usize {
        match self {
            CircuitKind::Transfer => 5,
            CircuitKind::Trade => 5,
            CircuitKind::RarityRoll => 5 + crate::vrf::RARITY_TIERS,
            CircuitKind::LootBox => 7 + crate::vrf::RARITY_TIERS,
            CircuitKind::Shuffle => 3,
            CircuitKind::Draw => 4,
        }
    }

    /// stable tag mixed into attestations
    pub fn tag(&self) -> u8 {
        match self {
            CircuitKind::Transfer => 1,
            CircuitKind::Trade => 2,
            CircuitKind::RarityRoll => 3,
            CircuitKind::LootBox => 4,
            CircuitKind::Shuffle => 5,
            CircuitKind::Draw => 6,
        }
    }
}

impl core::fmt::Display for CircuitKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// a provable statement
pub trait Statement: Send + Sync {
    fn kind(&self) -> CircuitKind;

    /// public inputs in declared order
    fn public_inputs(&self) -> Vec<Fr>;

    /// allocate wires and emit constraints
    fn synthesize(&self, builder: &mut CircuitBuilder);

    /// synthesize and check every constraint
    fn build(&self) -> Result<(Circuit, Witness)> {
        let mut builder = CircuitBuilder::new();
        self.synthesize(&mut builder);
        let (circuit, witness) = builder.finalize()?;
        debug_assert_eq!(witness.public_inputs(), self.public_inputs());
        tracing::debug!(
            kind = %self.kind(),
            constraints = circuit.constraints.len(),
            "statement built"
        );
        Ok((circuit, witness))
    }
}

impl<S: Statement + ?Sized> Statement for Box<S> {
    fn kind(&self) -> CircuitKind {
        (**self).kind()
    }

    fn public_inputs(&self) -> Vec<Fr> {
        (**self).public_inputs()
    }

    fn synthesize(&self, builder: &mut CircuitBuilder) {
        (**self).synthesize(builder)
    }
}

/// an honest instance of `kind` with random values
///
/// circuit shape does not depend on witness values, so a sample is enough to
/// run circuit-specific setup or benchmarks
pub fn sample<R: RngCore + CryptoRng>(kind: CircuitKind, rng: &mut R) -> Result<Box<dyn Statement>> {
    let owner = Keypair::generate(rng);
    let recipient = Keypair::generate(rng);
    let game_id = Fr::from(7u64);
    Ok(match kind {
        CircuitKind::Transfer => {
            let old = Note::asset(owner.pk, field::random(rng), Fr::from(1u64), rng);
            let new = old.transfer_to(recipient.pk, rng);
            Box::new(TransferStatement::new(old, owner.sk, new)?)
        }
        CircuitKind::Trade => {
            let old = Note::item(
                owner.pk,
                field::random(rng),
                Fr::from(2u64),
                field::random(rng),
                game_id,
                rng,
            );
            let new = old.transfer_to(recipient.pk, rng);
            Box::new(TradeStatement::new(
                old,
                owner.sk,
                new,
                100,
                Fr::from(1u64),
                field::random(rng),
            )?)
        }
        CircuitKind::RarityRoll => Box::new(RarityStatement::new(
            owner.sk,
            field::random(rng),
            Thresholds::default(),
        )),
        CircuitKind::LootBox => {
            let box_note = Note::asset(owner.pk, field::random(rng), game_id, rng);
            Box::new(LootBoxStatement::new(
                box_note,
                owner.sk,
                field::random(rng),
                Thresholds::default(),
                field::random(rng),
            )?)
        }
        CircuitKind::Shuffle => Box::new(ShuffleStatement::new(
            game_id,
            field::random(rng),
            field::random(rng),
        )),
        CircuitKind::Draw => {
            let deck = crate::deck::Deck::shuffled(field::random(rng), field::random(rng));
            Box::new(DrawStatement::new(deck, game_id, 0, field::random(rng))?)
        }
    })
}
