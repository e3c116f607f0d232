//! item trade with payment or gift
//!
//! public: `[old_commitment, new_commitment, nullifier, payment_commitment, game_id]`
//!
//! the item's id, type, attributes and game survive the trade unchanged.
//! payment is expressed without branching:
//!
//! ```text
//! is_gift = IsZero(price)
//! payment_commitment == (1 - is_gift) * Poseidon(seller.x, seller.y, price, token, payment_salt)
//! ```
//!
//! so a gift publishes a zero payment commitment and a sale publishes the
//! seller's payment note.

use ark_ff::{One, Zero};
use serde::{Deserialize, Serialize};

use super::{CircuitKind, Statement};
use crate::constraint::{lc, CircuitBuilder, LinearCombination};
use crate::field::Fr;
use crate::gadgets;
use crate::keys::{prove_ownership, PublicKey, SecretKey};
use crate::note::{nullify_gadget, FieldVars, Note, NoteCommitment, NoteVar, Nullifier};
use crate::poseidon;
use crate::Result;

/// prices are 64-bit amounts
pub const PRICE_BITS: usize = 64;

/// zero for a gift, the seller's payment note otherwise
pub fn payment_commitment(seller: &PublicKey, price: u64, token: Fr, salt: Fr) -> Fr {
    if price == 0 {
        return Fr::zero();
    }
    poseidon::hash([seller.x, seller.y, Fr::from(price), token, salt])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePublic {
    pub old_commitment: NoteCommitment,
    pub new_commitment: NoteCommitment,
    pub nullifier: Nullifier,
    #[serde(with = "crate::field::serde_hex")]
    pub payment_commitment: Fr,
    #[serde(with = "crate::field::serde_hex")]
    pub game_id: Fr,
}

impl TradePublic {
    pub fn to_field_vec(&self) -> Vec<Fr> {
        vec![
            self.old_commitment.0,
            self.new_commitment.0,
            self.nullifier.0,
            self.payment_commitment,
            self.game_id,
        ]
    }

    pub fn is_gift(&self) -> bool {
        self.payment_commitment.is_zero()
    }
}

#[derive(Debug, Clone)]
pub struct TradeStatement {
    pub public: TradePublic,
    pub old: Note,
    pub new: Note,
    pub sk: SecretKey,
    pub price: u64,
    pub payment_token: Fr,
    pub payment_salt: Fr,
}

impl TradeStatement {
    /// sell (or gift, with price 0) item note `old` as `new`
    pub fn new(
        old: Note,
        sk: SecretKey,
        new: Note,
        price: u64,
        payment_token: Fr,
        payment_salt: Fr,
    ) -> Result<Self> {
        let (_, _, _, game_id) = old.as_item()?;
        new.as_item()?;
        Ok(Self {
            public: TradePublic {
                old_commitment: old.commit(),
                new_commitment: new.commit(),
                nullifier: old.nullifier(&sk),
                payment_commitment: payment_commitment(&old.owner, price, payment_token, payment_salt),
                game_id,
            },
            old,
            new,
            sk,
            price,
            payment_token,
            payment_salt,
        })
    }
}

impl Statement for TradeStatement {
    fn kind(&self) -> CircuitKind {
        CircuitKind::Trade
    }

    fn public_inputs(&self) -> Vec<Fr> {
        self.public.to_field_vec()
    }

    fn synthesize(&self, b: &mut CircuitBuilder) {
        let p = &self.public;
        let old_commitment = b.add_public(p.old_commitment.0);
        let new_commitment = b.add_public(p.new_commitment.0);
        let nullifier = b.add_public(p.nullifier.0);
        let payment = b.add_public(p.payment_commitment);
        let game_id = b.add_public(p.game_id);

        let old = NoteVar::alloc(b, &self.old);
        let new = NoteVar::alloc(b, &self.new);
        let sk = b.add_witness(self.sk.to_field());
        let price = b.add_witness(Fr::from(self.price));
        let token = b.add_witness(self.payment_token);
        let payment_salt = b.add_witness(self.payment_salt);

        b.scoped("old commitment", |b| old.assert_commitment(b, old_commitment));
        prove_ownership(b, old.owner_x, old.owner_y, sk);
        b.scoped("nullifier", |b| {
            let n = nullify_gadget(b, old.primary_id(), old.salt, sk);
            b.assert_eq(n, nullifier);
        });
        b.scoped("new commitment", |b| new.assert_commitment(b, new_commitment));
        b.scoped("item identity", |b| match (old.fields, new.fields) {
            (FieldVars::Item(before), FieldVars::Item(after)) => {
                for (x, y) in before.iter().zip(after.iter()) {
                    b.assert_eq(*x, *y);
                }
                b.assert_eq(before[3], game_id);
            }
            // asset notes are not tradeable items: unsatisfiable
            _ => b.assert_const(LinearCombination::zero(), Fr::one()),
        });
        b.scoped("payment", |b| {
            gadgets::assert_bits(b, price, PRICE_BITS);
            let is_gift = gadgets::is_zero(b, price);
            let owed = poseidon::hash_gadget(
                b,
                [lc(old.owner_x), lc(old.owner_y), lc(price), lc(token), lc(payment_salt)],
            );
            b.assert_mul(
                LinearCombination::constant(Fr::one()) - lc(is_gift),
                owed,
                payment,
            );
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Keypair;
    use crate::CircuitError;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn setup(price: u64) -> (TradeStatement, Keypair, ChaCha20Rng) {
        let mut rng = ChaCha20Rng::seed_from_u64(200);
        let seller = Keypair::generate(&mut rng);
        let buyer = Keypair::generate(&mut rng);
        let old = Note::item(
            seller.pk,
            Fr::from(1001u64),
            Fr::from(3u64),
            Fr::from(0xabcdu64),
            Fr::from(7u64),
            &mut rng,
        );
        let new = old.transfer_to(buyer.pk, &mut rng);
        let statement =
            TradeStatement::new(old, seller.sk, new, price, Fr::from(1u64), Fr::from(99u64)).unwrap();
        (statement, buyer, rng)
    }

    fn failing_scope(statement: &TradeStatement) -> &'static str {
        match statement.build() {
            Err(CircuitError::Unsatisfied { scope, .. }) => scope,
            other => panic!("expected unsatisfied, got {other:?}"),
        }
    }

    #[test]
    fn test_sale() {
        let (statement, _, _) = setup(250);
        assert!(!statement.public.is_gift());
        assert!(statement.build().is_ok());
    }

    #[test]
    fn test_gift_has_zero_payment() {
        let (statement, _, _) = setup(0);
        assert!(statement.public.is_gift());
        assert!(statement.build().is_ok());
    }

    #[test]
    fn test_sale_cannot_claim_gift() {
        let (mut statement, _, _) = setup(250);
        statement.public.payment_commitment = Fr::zero();
        assert_eq!(failing_scope(&statement), "payment");
    }

    #[test]
    fn test_gift_cannot_claim_payment() {
        let (mut statement, _, _) = setup(0);
        statement.public.payment_commitment = Fr::from(5u64);
        assert_eq!(failing_scope(&statement), "payment");
    }

    #[test]
    fn test_attributes_preserved() {
        let (statement, buyer, mut rng) = setup(10);
        let (item_id, item_type, _, game_id) = statement.old.as_item().unwrap();
        let upgraded = Note::item(buyer.pk, item_id, item_type, Fr::from(0xffffu64), game_id, &mut rng);
        let statement = TradeStatement {
            public: TradePublic {
                new_commitment: upgraded.commit(),
                ..statement.public
            },
            new: upgraded,
            ..statement
        };
        assert_eq!(failing_scope(&statement), "item identity");
    }

    #[test]
    fn test_game_id_is_public() {
        let (mut statement, _, _) = setup(10);
        statement.public.game_id = Fr::from(8u64);
        assert_eq!(failing_scope(&statement), "item identity");
    }

    #[test]
    fn test_buyer_cannot_spend() {
        let (mut statement, buyer, _) = setup(10);
        statement.sk = buyer.sk;
        assert_eq!(failing_scope(&statement), "ownership");
    }
}
