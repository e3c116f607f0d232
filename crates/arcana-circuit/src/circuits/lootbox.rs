//! loot box opening
//!
//! public: `[box_commitment, nullifier, game_id, seed, vrf_output, tier, item_commitment, t_0..t_3]`
//!
//! spends the box note (an asset note with `asset_id = box_id` and
//! `context = game_id`) and mints an item note for the same owner:
//! `item_id = box_id`, `item_type = tier`, `attributes = vrf_output`,
//! `game_id` preserved.

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use super::rarity::roll_constraints;
use super::{CircuitKind, Statement};
use crate::constraint::{lc, CircuitBuilder, LinearCombination};
use crate::field::{self, Fr};
use crate::keys::{prove_ownership, SecretKey};
use crate::note::{nullify_gadget, FieldVars, Note, NoteCommitment, NoteFields, NoteVar, Nullifier};
use crate::poseidon;
use crate::vrf::{self, Thresholds};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootBoxPublic {
    pub box_commitment: NoteCommitment,
    pub nullifier: Nullifier,
    #[serde(with = "crate::field::serde_hex")]
    pub game_id: Fr,
    #[serde(with = "crate::field::serde_hex")]
    pub seed: Fr,
    #[serde(with = "crate::field::serde_hex")]
    pub vrf_output: Fr,
    pub tier: u64,
    pub item_commitment: NoteCommitment,
    pub thresholds: Thresholds,
}

impl LootBoxPublic {
    pub fn to_field_vec(&self) -> Vec<Fr> {
        let mut out = vec![
            self.box_commitment.0,
            self.nullifier.0,
            self.game_id,
            self.seed,
            self.vrf_output,
            Fr::from(self.tier),
            self.item_commitment.0,
        ];
        out.extend(self.thresholds.to_fields());
        out
    }
}

#[derive(Debug, Clone)]
pub struct LootBoxStatement {
    pub public: LootBoxPublic,
    pub box_note: Note,
    pub sk: SecretKey,
    pub item_salt: Fr,
}

impl LootBoxStatement {
    pub fn new(
        box_note: Note,
        sk: SecretKey,
        seed: Fr,
        thresholds: Thresholds,
        item_salt: Fr,
    ) -> Result<Self> {
        let (_, game_id) = box_note.as_asset()?;
        let vrf_output = vrf::vrf(&sk, seed);
        let tier = vrf::rarity(&vrf_output, &thresholds);
        let mut statement = Self {
            public: LootBoxPublic {
                box_commitment: box_note.commit(),
                nullifier: box_note.nullifier(&sk),
                game_id,
                seed,
                vrf_output,
                tier,
                item_commitment: NoteCommitment(Fr::from(0u64)),
                thresholds,
            },
            box_note,
            sk,
            item_salt,
        };
        statement.public.item_commitment = statement.item_note().commit();
        Ok(statement)
    }

    /// open with a fresh item salt
    pub fn open<R: RngCore + CryptoRng>(
        box_note: Note,
        sk: SecretKey,
        seed: Fr,
        thresholds: Thresholds,
        rng: &mut R,
    ) -> Result<Self> {
        Self::new(box_note, sk, seed, thresholds, field::random(rng))
    }

    /// the item note minted by this opening
    pub fn item_note(&self) -> Note {
        Note::new(
            self.box_note.owner,
            NoteFields::Item {
                item_id: self.box_note.primary_id(),
                item_type: Fr::from(self.public.tier),
                attributes: self.public.vrf_output,
                game_id: self.public.game_id,
            },
            self.item_salt,
        )
    }
}

impl Statement for LootBoxStatement {
    fn kind(&self) -> CircuitKind {
        CircuitKind::LootBox
    }

    fn public_inputs(&self) -> Vec<Fr> {
        self.public.to_field_vec()
    }

    fn synthesize(&self, b: &mut CircuitBuilder) {
        let p = &self.public;
        let box_commitment = b.add_public(p.box_commitment.0);
        let nullifier = b.add_public(p.nullifier.0);
        let game_id = b.add_public(p.game_id);
        let seed = b.add_public(p.seed);
        let vrf_output = b.add_public(p.vrf_output);
        let tier = b.add_public(Fr::from(p.tier));
        let item_commitment = b.add_public(p.item_commitment.0);
        let thresholds = p.thresholds.to_fields().map(|t| b.add_public(t));

        let boxed = NoteVar::alloc(b, &self.box_note);
        let sk = b.add_witness(self.sk.to_field());
        let item_salt = b.add_witness(self.item_salt);

        b.scoped("box commitment", |b| boxed.assert_commitment(b, box_commitment));
        prove_ownership(b, boxed.owner_x, boxed.owner_y, sk);
        b.scoped("nullifier", |b| {
            let n = nullify_gadget(b, boxed.primary_id(), boxed.salt, sk);
            b.assert_eq(n, nullifier);
        });
        b.scoped("box game", |b| match boxed.fields {
            FieldVars::Asset([_, context]) => b.assert_eq(context, game_id),
            // a box is an asset note: unsatisfiable
            FieldVars::Item(_) => b.assert_const(LinearCombination::zero(), Fr::from(1u64)),
        });
        roll_constraints(b, sk, seed, vrf_output, tier, &thresholds);
        b.scoped("item commitment", |b| {
            let item = poseidon::hash_gadget(
                b,
                [
                    lc(boxed.owner_x),
                    lc(boxed.owner_y),
                    lc(boxed.primary_id()),
                    lc(tier),
                    lc(vrf_output),
                    lc(game_id),
                    lc(item_salt),
                ],
            );
            b.assert_eq(item, item_commitment);
        });
    }
}
