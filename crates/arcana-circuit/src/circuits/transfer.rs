//! asset note transfer
//!
//! public: `[old_commitment, new_commitment, asset_id, context, nullifier]`
//!
//! proves, in order: the old note opens to old_commitment, the spender holds
//! the owner key, the nullifier is derived from the old note, the new note
//! opens to new_commitment, and both notes carry the public asset id and
//! context.

use ark_ff::One;
use serde::{Deserialize, Serialize};

use super::{CircuitKind, Statement};
use crate::constraint::{CircuitBuilder, LinearCombination};
use crate::field::Fr;
use crate::keys::{prove_ownership, SecretKey};
use crate::note::{nullify_gadget, FieldVars, Note, NoteCommitment, NoteVar, Nullifier};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPublic {
    pub old_commitment: NoteCommitment,
    pub new_commitment: NoteCommitment,
    #[serde(with = "crate::field::serde_hex")]
    pub asset_id: Fr,
    #[serde(with = "crate::field::serde_hex")]
    pub context: Fr,
    pub nullifier: Nullifier,
}

impl TransferPublic {
    pub fn to_field_vec(&self) -> Vec<Fr> {
        vec![
            self.old_commitment.0,
            self.new_commitment.0,
            self.asset_id,
            self.context,
            self.nullifier.0,
        ]
    }
}

#[derive(Debug, Clone)]
pub struct TransferStatement {
    pub public: TransferPublic,
    pub old: Note,
    pub new: Note,
    pub sk: SecretKey,
}

impl TransferStatement {
    /// spend `old` (owned by `sk`) into `new`
    pub fn new(old: Note, sk: SecretKey, new: Note) -> Result<Self> {
        let (asset_id, context) = old.as_asset()?;
        new.as_asset()?;
        Ok(Self {
            public: TransferPublic {
                old_commitment: old.commit(),
                new_commitment: new.commit(),
                asset_id,
                context,
                nullifier: old.nullifier(&sk),
            },
            old,
            new,
            sk,
        })
    }
}

impl Statement for TransferStatement {
    fn kind(&self) -> CircuitKind {
        CircuitKind::Transfer
    }

    fn public_inputs(&self) -> Vec<Fr> {
        self.public.to_field_vec()
    }

    fn synthesize(&self, b: &mut CircuitBuilder) {
        let p = &self.public;
        let old_commitment = b.add_public(p.old_commitment.0);
        let new_commitment = b.add_public(p.new_commitment.0);
        let asset_id = b.add_public(p.asset_id);
        let context = b.add_public(p.context);
        let nullifier = b.add_public(p.nullifier.0);

        let old = NoteVar::alloc(b, &self.old);
        let new = NoteVar::alloc(b, &self.new);
        let sk = b.add_witness(self.sk.to_field());

        b.scoped("old commitment", |b| old.assert_commitment(b, old_commitment));
        prove_ownership(b, old.owner_x, old.owner_y, sk);
        b.scoped("nullifier", |b| {
            let n = nullify_gadget(b, old.primary_id(), old.salt, sk);
            b.assert_eq(n, nullifier);
        });
        b.scoped("new commitment", |b| new.assert_commitment(b, new_commitment));
        b.scoped("asset identity", |b| {
            for note in [&old, &new] {
                match note.fields {
                    FieldVars::Asset([id, ctx]) => {
                        b.assert_eq(id, asset_id);
                        b.assert_eq(ctx, context);
                    }
                    // item notes carry no asset identity: unsatisfiable
                    FieldVars::Item(_) => b.assert_const(LinearCombination::zero(), Fr::one()),
                }
            }
        });
    }
}
