//! notes, commitments and nullifiers
//!
//! a note binds an owner key, a handful of asset fields and a fresh salt:
//!
//! - asset note (5 inputs): `Poseidon(owner.x, owner.y, asset_id, context, salt)`
//! - item note (7 inputs): `Poseidon(owner.x, owner.y, item_id, item_type, attributes, game_id, salt)`
//!
//! spending a note reveals `Poseidon(primary_id, salt, sk)`. only the holder
//! knows both the salt and sk, and a given note has exactly one nullifier.

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::constraint::{lc, CircuitBuilder, LinearCombination, WireId};
use crate::field::{self, Fr};
use crate::keys::{PublicKey, SecretKey};
use crate::poseidon;
use crate::{CircuitError, Result};

/// commitment to a note (published on the ledger)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NoteCommitment(#[serde(with = "crate::field::serde_hex")] pub Fr);

/// single-use spend tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Nullifier(#[serde(with = "crate::field::serde_hex")] pub Fr);

impl NoteCommitment {
    pub fn to_hex(&self) -> String {
        field::to_hex(&self.0)
    }
}

impl Nullifier {
    pub fn to_hex(&self) -> String {
        field::to_hex(&self.0)
    }
}

/// ciphertext delivered to a note's recipient
///
/// opaque to this crate: it has no role in proof validity and is carried
/// next to the commitment as metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload(pub Vec<u8>);

impl EncryptedPayload {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// asset-specific note fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoteFields {
    /// nft or loot box: `context` is the collection or game id
    Asset {
        #[serde(with = "crate::field::serde_hex")]
        asset_id: Fr,
        #[serde(with = "crate::field::serde_hex")]
        context: Fr,
    },
    /// tradeable game item whose type and attributes survive transfers
    Item {
        #[serde(with = "crate::field::serde_hex")]
        item_id: Fr,
        #[serde(with = "crate::field::serde_hex")]
        item_type: Fr,
        #[serde(with = "crate::field::serde_hex")]
        attributes: Fr,
        #[serde(with = "crate::field::serde_hex")]
        game_id: Fr,
    },
}

impl NoteFields {
    /// identifier fed into the nullifier
    pub fn primary_id(&self) -> Fr {
        match self {
            NoteFields::Asset { asset_id, .. } => *asset_id,
            NoteFields::Item { item_id, .. } => *item_id,
        }
    }

    /// fields in commitment order
    pub fn to_vec(&self) -> Vec<Fr> {
        match *self {
            NoteFields::Asset { asset_id, context } => vec![asset_id, context],
            NoteFields::Item {
                item_id,
                item_type,
                attributes,
                game_id,
            } => vec![item_id, item_type, attributes, game_id],
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NoteFields::Asset { .. } => "asset",
            NoteFields::Item { .. } => "item",
        }
    }
}

/// a note (the private preimage of a commitment)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub owner: PublicKey,
    pub fields: NoteFields,
    #[serde(with = "crate::field::serde_hex")]
    pub salt: Fr,
}

impl Note {
    pub fn new(owner: PublicKey, fields: NoteFields, salt: Fr) -> Self {
        Self { owner, fields, salt }
    }

    /// asset note with a fresh salt
    pub fn asset<R: RngCore + CryptoRng>(
        owner: PublicKey,
        asset_id: Fr,
        context: Fr,
        rng: &mut R,
    ) -> Self {
        Self::new(owner, NoteFields::Asset { asset_id, context }, field::random(rng))
    }

    /// item note with a fresh salt
    pub fn item<R: RngCore + CryptoRng>(
        owner: PublicKey,
        item_id: Fr,
        item_type: Fr,
        attributes: Fr,
        game_id: Fr,
        rng: &mut R,
    ) -> Self {
        Self::new(
            owner,
            NoteFields::Item {
                item_id,
                item_type,
                attributes,
                game_id,
            },
            field::random(rng),
        )
    }

    pub fn commit(&self) -> NoteCommitment {
        commit(&self.owner, &self.fields, self.salt)
    }

    pub fn primary_id(&self) -> Fr {
        self.fields.primary_id()
    }

    pub fn nullifier(&self, sk: &SecretKey) -> Nullifier {
        nullify(self.primary_id(), self.salt, sk)
    }

    /// same fields and a new owner and salt
    pub fn transfer_to<R: RngCore + CryptoRng>(&self, owner: PublicKey, rng: &mut R) -> Self {
        Self::new(owner, self.fields, field::random(rng))
    }

    pub fn as_asset(&self) -> Result<(Fr, Fr)> {
        match self.fields {
            NoteFields::Asset { asset_id, context } => Ok((asset_id, context)),
            _ => Err(CircuitError::NoteKind { expected: "asset" }),
        }
    }

    pub fn as_item(&self) -> Result<(Fr, Fr, Fr, Fr)> {
        match self.fields {
            NoteFields::Item {
                item_id,
                item_type,
                attributes,
                game_id,
            } => Ok((item_id, item_type, attributes, game_id)),
            _ => Err(CircuitError::NoteKind { expected: "item" }),
        }
    }
}

/// `Poseidon(owner.x, owner.y, fields..., salt)`
pub fn commit(owner: &PublicKey, fields: &NoteFields, salt: Fr) -> NoteCommitment {
    let h = match *fields {
        NoteFields::Asset { asset_id, context } => {
            poseidon::hash([owner.x, owner.y, asset_id, context, salt])
        }
        NoteFields::Item {
            item_id,
            item_type,
            attributes,
            game_id,
        } => poseidon::hash([owner.x, owner.y, item_id, item_type, attributes, game_id, salt]),
    };
    NoteCommitment(h)
}

/// `Poseidon(id, salt, sk)`
pub fn nullify(id: Fr, salt: Fr, sk: &SecretKey) -> Nullifier {
    Nullifier(poseidon::hash([id, salt, sk.to_field()]))
}

/// note fields as private wires, in commitment order
#[derive(Debug, Clone, Copy)]
pub enum FieldVars {
    Asset([WireId; 2]),
    Item([WireId; 4]),
}

/// note preimage allocated as private wires
#[derive(Debug, Clone, Copy)]
pub struct NoteVar {
    pub owner_x: WireId,
    pub owner_y: WireId,
    pub fields: FieldVars,
    pub salt: WireId,
}

impl NoteVar {
    pub fn alloc(builder: &mut CircuitBuilder, note: &Note) -> Self {
        let owner_x = builder.add_witness(note.owner.x);
        let owner_y = builder.add_witness(note.owner.y);
        let fields = match note.fields {
            NoteFields::Asset { asset_id, context } => FieldVars::Asset([
                builder.add_witness(asset_id),
                builder.add_witness(context),
            ]),
            NoteFields::Item {
                item_id,
                item_type,
                attributes,
                game_id,
            } => FieldVars::Item([
                builder.add_witness(item_id),
                builder.add_witness(item_type),
                builder.add_witness(attributes),
                builder.add_witness(game_id),
            ]),
        };
        let salt = builder.add_witness(note.salt);
        Self {
            owner_x,
            owner_y,
            fields,
            salt,
        }
    }

    pub fn primary_id(&self) -> WireId {
        match self.fields {
            FieldVars::Asset([id, _]) => id,
            FieldVars::Item([id, ..]) => id,
        }
    }

    /// recompute the commitment
    pub fn commit(&self, builder: &mut CircuitBuilder) -> WireId {
        let (x, y, salt) = (lc(self.owner_x), lc(self.owner_y), lc(self.salt));
        match self.fields {
            FieldVars::Asset([a, b]) => poseidon::hash_gadget(builder, [x, y, lc(a), lc(b), salt]),
            FieldVars::Item([a, b, c, d]) => {
                poseidon::hash_gadget(builder, [x, y, lc(a), lc(b), lc(c), lc(d), salt])
            }
        }
    }

    /// recompute the commitment and bind it to `expected`
    pub fn assert_commitment(
        &self,
        builder: &mut CircuitBuilder,
        expected: impl Into<LinearCombination>,
    ) {
        let c = self.commit(builder);
        builder.assert_eq(c, expected);
    }
}

/// in-circuit `Poseidon(id, salt, sk)`
pub fn nullify_gadget(
    builder: &mut CircuitBuilder,
    id: impl Into<LinearCombination>,
    salt: impl Into<LinearCombination>,
    sk: impl Into<LinearCombination>,
) -> WireId {
    poseidon::hash_gadget(builder, [id.into(), salt.into(), sk.into()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Keypair;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use std::collections::HashSet;

    #[test]
    fn test_commit_recompute() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let kp = Keypair::generate(&mut rng);
        let note = Note::asset(kp.pk, Fr::from(9u64), Fr::from(1u64), &mut rng);
        assert_eq!(note.commit(), commit(&note.owner, &note.fields, note.salt));
    }

    #[test]
    fn test_salt_hides_identical_notes() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let kp = Keypair::generate(&mut rng);
        let a = Note::asset(kp.pk, Fr::from(9u64), Fr::from(1u64), &mut rng);
        let b = Note::asset(kp.pk, Fr::from(9u64), Fr::from(1u64), &mut rng);
        assert_ne!(a.commit(), b.commit());
        assert_ne!(a.nullifier(&kp.sk), b.nullifier(&kp.sk));
    }

    #[test]
    fn test_nullifier_needs_secret() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let owner = Keypair::generate(&mut rng);
        let other = Keypair::generate(&mut rng);
        let note = Note::asset(owner.pk, Fr::from(1u64), Fr::from(2u64), &mut rng);
        assert_ne!(note.nullifier(&owner.sk), note.nullifier(&other.sk));
        assert_eq!(note.nullifier(&owner.sk), note.nullifier(&owner.sk));
    }

    #[test]
    fn test_nullifiers_distinct_over_sample() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let kp = Keypair::generate(&mut rng);
        let mut seen = HashSet::new();
        for id in 0..200u64 {
            let note = Note::item(
                kp.pk,
                Fr::from(id),
                Fr::from(1u64),
                Fr::from(2u64),
                Fr::from(3u64),
                &mut rng,
            );
            assert!(seen.insert(note.nullifier(&kp.sk)));
        }
    }

    #[test]
    fn test_gadgets_match_native() {
        let mut rng = ChaCha20Rng::seed_from_u64(6);
        let kp = Keypair::generate(&mut rng);
        for note in [
            Note::asset(kp.pk, Fr::from(7u64), Fr::from(8u64), &mut rng),
            Note::item(kp.pk, Fr::from(1u64), Fr::from(2u64), Fr::from(3u64), Fr::from(4u64), &mut rng),
        ] {
            let mut builder = CircuitBuilder::new();
            let var = NoteVar::alloc(&mut builder, &note);
            let c = var.commit(&mut builder);
            assert_eq!(builder.value(c), note.commit().0);

            let sk = builder.add_witness(kp.sk.to_field());
            let n = nullify_gadget(&mut builder, var.primary_id(), var.salt, sk);
            assert_eq!(builder.value(n), note.nullifier(&kp.sk).0);
            assert!(builder.finalize().is_ok());
        }
    }

    #[test]
    fn test_kind_accessors() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let kp = Keypair::generate(&mut rng);
        let note = Note::asset(kp.pk, Fr::from(1u64), Fr::from(2u64), &mut rng);
        assert!(note.as_asset().is_ok());
        assert_eq!(note.as_item(), Err(CircuitError::NoteKind { expected: "item" }));
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let kp = Keypair::generate(&mut rng);
        let note = Note::asset(kp.pk, Fr::from(1u64), Fr::from(2u64), &mut rng);
        let json = serde_json::to_string(&note).unwrap();
        assert_eq!(serde_json::from_str::<Note>(&json).unwrap(), note);
    }
}
