//! owner keys on baby jubjub and the ownership gadget
//!
//! the curve's base field is the bn254 scalar field, so public key
//! coordinates are native circuit values. secret keys live in the prime
//! subgroup's scalar field and are embedded into `Fr` for hashing.

use ark_ec::{twisted_edwards::TECurveConfig, AffineRepr, CurveGroup};
use ark_ed_on_bn254::{EdwardsAffine, EdwardsConfig, EdwardsProjective, Fr as SubgroupScalar};
use ark_ff::{BigInteger, Field, One, PrimeField, UniformRand, Zero};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::constraint::{lc, CircuitBuilder, LinearCombination, WireId};
use crate::field::Fr;
use crate::gadgets::assert_bits_le_const;
use crate::{CircuitError, Result};

/// bits needed for a subgroup scalar
pub const SK_BITS: usize = 251;

/// secret spending scalar, always below the subgroup order
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SecretKey(SubgroupScalar);

impl core::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

impl SecretKey {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(SubgroupScalar::rand(rng))
    }

    /// accept a field element only if it is a canonical subgroup scalar
    pub fn from_field(x: Fr) -> Result<Self> {
        SubgroupScalar::from_bigint(x.into_bigint())
            .map(Self)
            .ok_or(CircuitError::InvalidSecretKey)
    }

    /// the scalar embedded in the circuit field (exact, since l < p)
    pub fn to_field(&self) -> Fr {
        Fr::from_le_bytes_mod_order(&self.0.into_bigint().to_bytes_le())
    }

    pub fn public_key(&self) -> PublicKey {
        derive_pubkey(self)
    }
}

/// point on baby jubjub, pk = sk * G
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    #[serde(with = "crate::field::serde_hex")]
    pub x: Fr,
    #[serde(with = "crate::field::serde_hex")]
    pub y: Fr,
}

impl PublicKey {
    /// true if (x, y) satisfies the curve equation
    pub fn is_on_curve(&self) -> bool {
        EdwardsAffine::new_unchecked(self.x, self.y).is_on_curve()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Keypair {
    pub sk: SecretKey,
    pub pk: PublicKey,
}

impl Keypair {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::from_secret(SecretKey::random(rng))
    }

    pub fn from_secret(sk: SecretKey) -> Self {
        Self { sk, pk: derive_pubkey(&sk) }
    }
}

/// fixed-base scalar multiplication of the generator
pub fn derive_pubkey(sk: &SecretKey) -> PublicKey {
    let point = (EdwardsAffine::generator() * sk.0).into_affine();
    PublicKey { x: point.x, y: point.y }
}

/// 2^i * G for i in 0..SK_BITS
fn generator_powers() -> &'static [(Fr, Fr)] {
    static POWERS: OnceLock<Vec<(Fr, Fr)>> = OnceLock::new();
    POWERS.get_or_init(|| {
        let mut base: EdwardsProjective = EdwardsAffine::generator().into_group();
        let mut out = Vec::with_capacity(SK_BITS);
        for _ in 0..SK_BITS {
            let affine = base.into_affine();
            out.push((affine.x, affine.y));
            base = base + base;
        }
        out
    })
}

/// point with linear-combination coordinates
#[derive(Debug, Clone)]
pub struct PointVar {
    pub x: LinearCombination,
    pub y: LinearCombination,
}

impl PointVar {
    pub fn identity() -> Self {
        Self {
            x: LinearCombination::zero(),
            y: LinearCombination::constant(Fr::one()),
        }
    }
}

/// complete twisted edwards addition, 6 MUL constraints
///
/// beta = x1 y2, gamma = y1 x2, delta = (y1 - a x1)(x2 + y2), tau = beta gamma
/// x3 (1 + d tau) = beta + gamma
/// y3 (1 - d tau) = delta + a beta - gamma
pub fn add_points(builder: &mut CircuitBuilder, p: &PointVar, q: &PointVar) -> (WireId, WireId) {
    let a = EdwardsConfig::COEFF_A;
    let d = EdwardsConfig::COEFF_D;
    let one = || LinearCombination::constant(Fr::one());

    let beta = builder.mul(p.x.clone(), q.y.clone());
    let gamma = builder.mul(p.y.clone(), q.x.clone());
    let delta = builder.mul(p.y.clone() - p.x.clone() * a, q.x.clone() + q.y.clone());
    let tau = builder.mul(beta, gamma);

    let x_num = lc(beta) + lc(gamma);
    let x_den = one() + lc(tau) * d;
    let y_num = lc(delta) + lc(beta) * a - lc(gamma);
    let y_den = one() - lc(tau) * d;

    let x3 = {
        let v = builder.eval(&x_num) * builder.eval(&x_den).inverse().unwrap_or_else(Fr::zero);
        builder.add_witness(v)
    };
    let y3 = {
        let v = builder.eval(&y_num) * builder.eval(&y_den).inverse().unwrap_or_else(Fr::zero);
        builder.add_witness(v)
    };
    builder.assert_mul(x3, x_den, x_num);
    builder.assert_mul(y3, y_den, y_num);
    (x3, y3)
}

/// derive `sk * G` in-circuit from a secret wire
///
/// sk is decomposed into 251 bits and bounded by l - 1: without the bound
/// sk + l would produce the same key while feeding a different value into
/// every hash that consumes sk. each bit picks `2^i G` or the identity with a
/// selection that is linear in the bit, so only the additions cost constraints.
pub fn derive_pubkey_gadget(builder: &mut CircuitBuilder, sk: WireId) -> (WireId, WireId) {
    let bits = builder.decompose(sk, SK_BITS);
    let mut bound = (SubgroupScalar::MODULUS).to_bits_le();
    bound.truncate(SK_BITS);
    // MODULUS - 1: the modulus is odd so clearing bit 0 subtracts one
    bound[0] = false;
    assert_bits_le_const(builder, &bits, &bound);

    let mut acc: Option<PointVar> = None;
    for (bit, (px, py)) in bits.iter().zip(generator_powers()) {
        let selected = PointVar {
            x: lc(*bit) * *px,
            y: LinearCombination::constant(Fr::one()) + lc(*bit) * (*py - Fr::one()),
        };
        acc = Some(match acc {
            None => selected,
            Some(acc) => {
                let (x, y) = add_points(builder, &acc, &selected);
                PointVar { x: lc(x), y: lc(y) }
            }
        });
    }
    let acc = acc.unwrap_or_else(PointVar::identity);
    (builder.materialize(acc.x), builder.materialize(acc.y))
}

/// assert that `sk` is the secret behind `pk`
pub fn prove_ownership(
    builder: &mut CircuitBuilder,
    pk_x: impl Into<LinearCombination>,
    pk_y: impl Into<LinearCombination>,
    sk: WireId,
) {
    let pk_x = pk_x.into();
    let pk_y = pk_y.into();
    builder.scoped("ownership", |b| {
        let (x, y) = derive_pubkey_gadget(b, sk);
        b.assert_eq(x, pk_x);
        b.assert_eq(y, pk_y);
    });
}
