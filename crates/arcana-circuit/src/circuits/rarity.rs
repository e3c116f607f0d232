//! rarity roll: ownership, vrf evaluation and tier selection
//!
//! public: `[owner.x, owner.y, seed, vrf_output, tier, t_0..t_3]`

use serde::{Deserialize, Serialize};

use super::{CircuitKind, Statement};
use crate::constraint::{CircuitBuilder, WireId};
use crate::field::Fr;
use crate::keys::{prove_ownership, PublicKey, SecretKey};
use crate::vrf::{self, Thresholds, RARITY_TIERS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RarityPublic {
    pub owner: PublicKey,
    #[serde(with = "crate::field::serde_hex")]
    pub seed: Fr,
    #[serde(with = "crate::field::serde_hex")]
    pub vrf_output: Fr,
    pub tier: u64,
    pub thresholds: Thresholds,
}

impl RarityPublic {
    pub fn to_field_vec(&self) -> Vec<Fr> {
        let mut out = vec![
            self.owner.x,
            self.owner.y,
            self.seed,
            self.vrf_output,
            Fr::from(self.tier),
        ];
        out.extend(self.thresholds.to_fields());
        out
    }
}

#[derive(Debug, Clone)]
pub struct RarityStatement {
    pub public: RarityPublic,
    pub sk: SecretKey,
}

impl RarityStatement {
    pub fn new(sk: SecretKey, seed: Fr, thresholds: Thresholds) -> Self {
        let vrf_output = vrf::vrf(&sk, seed);
        Self {
            public: RarityPublic {
                owner: sk.public_key(),
                seed,
                vrf_output,
                tier: vrf::rarity(&vrf_output, &thresholds),
                thresholds,
            },
            sk,
        }
    }
}

/// shared by the rarity and loot-box circuits: vrf binding, threshold
/// validity and tier derivation
pub(crate) fn roll_constraints(
    b: &mut CircuitBuilder,
    sk: WireId,
    seed: WireId,
    vrf_output: WireId,
    tier: WireId,
    thresholds: &[WireId; RARITY_TIERS],
) {
    b.scoped("vrf", |b| {
        let out = vrf::vrf_gadget(b, sk, seed);
        b.assert_eq(out, vrf_output);
    });
    vrf::assert_thresholds(b, thresholds);
    let derived = vrf::rarity_gadget(b, vrf_output, thresholds);
    b.scoped("tier", |b| b.assert_eq(derived, tier));
}

impl Statement for RarityStatement {
    fn kind(&self) -> CircuitKind {
        CircuitKind::RarityRoll
    }

    fn public_inputs(&self) -> Vec<Fr> {
        self.public.to_field_vec()
    }

    fn synthesize(&self, b: &mut CircuitBuilder) {
        let p = &self.public;
        let owner_x = b.add_public(p.owner.x);
        let owner_y = b.add_public(p.owner.y);
        let seed = b.add_public(p.seed);
        let vrf_output = b.add_public(p.vrf_output);
        let tier = b.add_public(Fr::from(p.tier));
        let thresholds = p.thresholds.to_fields().map(|t| b.add_public(t));

        let sk = b.add_witness(self.sk.to_field());

        prove_ownership(b, owner_x, owner_y, sk);
        roll_constraints(b, sk, seed, vrf_output, tier, &thresholds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Keypair;
    use crate::CircuitError;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn failing_scope(statement: &RarityStatement) -> &'static str {
        match statement.build() {
            Err(CircuitError::Unsatisfied { scope, .. }) => scope,
            other => panic!("expected unsatisfied, got {other:?}"),
        }
    }

    fn statement() -> (RarityStatement, Keypair) {
        let mut rng = ChaCha20Rng::seed_from_u64(300);
        let kp = Keypair::generate(&mut rng);
        let other = Keypair::generate(&mut rng);
        (RarityStatement::new(kp.sk, Fr::from(555u64), Thresholds::default()), other)
    }

    #[test]
    fn test_honest_roll() {
        let (statement, _) = statement();
        assert!(statement.public.tier < RARITY_TIERS as u64);
        assert!(statement.build().is_ok());
    }

    #[test]
    fn test_claimed_tier_must_match() {
        let (mut statement, _) = statement();
        statement.public.tier = (statement.public.tier + 1) % RARITY_TIERS as u64;
        assert_eq!(failing_scope(&statement), "tier");
    }

    #[test]
    fn test_vrf_output_must_match() {
        let (mut statement, _) = statement();
        statement.public.vrf_output += Fr::from(1u64);
        assert_eq!(failing_scope(&statement), "vrf");
    }

    #[test]
    fn test_other_key_rejected() {
        let (mut statement, other) = statement();
        statement.sk = other.sk;
        assert_eq!(failing_scope(&statement), "ownership");
    }

    #[test]
    fn test_unordered_thresholds_rejected() {
        let (mut statement, _) = statement();
        statement.public.thresholds = Thresholds::new_unchecked([500, 100, 2000, 10_000]);
        statement.public.tier = statement
            .public
            .thresholds
            .select_tier(vrf::roll(&statement.public.vrf_output));
        assert_eq!(failing_scope(&statement), "thresholds");
    }

    #[test]
    fn test_open_thresholds_rejected() {
        let (mut statement, _) = statement();
        statement.public.thresholds = Thresholds::new_unchecked([100, 500, 2000, 9000]);
        assert_eq!(failing_scope(&statement), "thresholds");
    }
}
