//! bn254 scalar field helpers
//!
//! every hash, key and identifier in arcana is an element of the bn254 scalar
//! field. arithmetic wraps modulo p, so anything resembling integer logic
//! (bit extraction, comparisons, division) has to go through the helpers here
//! natively and through the matching gadgets in [`crate::gadgets`] in-circuit.

use ark_ff::{BigInteger, PrimeField};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::UniformRand;
use rand::{CryptoRng, RngCore};

pub use ark_bn254::Fr;

use crate::{CircuitError, Result};

/// number of bits in the canonical representation of an element
pub const FIELD_BITS: usize = 254;

/// p - 1, the largest canonical element
pub fn max_element() -> Fr {
    -Fr::from(1u64)
}

/// uniformly random field element
pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Fr {
    Fr::rand(rng)
}

/// canonical little-endian bits (254 of them)
pub fn to_bits_le(x: &Fr) -> Vec<bool> {
    let mut bits = x.into_bigint().to_bits_le();
    bits.truncate(FIELD_BITS);
    bits
}

/// the low `n` bits of the canonical representation, `n <= 64`
pub fn low_bits(x: &Fr, n: u32) -> u64 {
    debug_assert!(n <= 64);
    let limb = x.into_bigint().as_ref()[0];
    if n == 64 {
        limb
    } else {
        limb & ((1u64 << n) - 1)
    }
}

/// interpret an element as u64, failing if it does not fit
pub fn to_u64(x: &Fr) -> Option<u64> {
    let big = x.into_bigint();
    let limbs = big.as_ref();
    if limbs[1..].iter().any(|&l| l != 0) {
        return None;
    }
    Some(limbs[0])
}

/// 32-byte canonical little-endian encoding
pub fn to_bytes(x: &Fr) -> [u8; 32] {
    let mut out = [0u8; 32];
    let bytes = x.into_bigint().to_bytes_le();
    out[..bytes.len()].copy_from_slice(&bytes);
    out
}

/// decode a canonical 32-byte little-endian encoding
pub fn from_bytes(bytes: &[u8; 32]) -> Result<Fr> {
    Fr::deserialize_compressed(&bytes[..])
        .map_err(|_| CircuitError::Encoding("non-canonical field element".into()))
}

/// lowercase hex of the canonical encoding
pub fn to_hex(x: &Fr) -> String {
    hex::encode(to_bytes(x))
}

pub fn from_hex(s: &str) -> Result<Fr> {
    let raw = hex::decode(s).map_err(|e| CircuitError::Encoding(e.to_string()))?;
    let bytes: [u8; 32] = raw
        .try_into()
        .map_err(|_| CircuitError::Encoding("expected 32 bytes".into()))?;
    from_bytes(&bytes)
}

/// serde adapter: field elements travel as canonical hex strings
pub mod serde_hex {
    use super::Fr;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(x: &Fr, s: S) -> core::result::Result<S::Ok, S::Error> {
        s.serialize_str(&super::to_hex(x))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> core::result::Result<Fr, D::Error> {
        let s = String::deserialize(d)?;
        super::from_hex(&s).map_err(D::Error::custom)
    }
}

/// serde adapter for vectors of field elements
pub mod serde_hex_vec {
    use super::Fr;
    use serde::{de::Error, Deserialize, Deserializer, Serializer, ser::SerializeSeq};

    pub fn serialize<S: Serializer>(xs: &[Fr], s: S) -> core::result::Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(xs.len()))?;
        for x in xs {
            seq.serialize_element(&super::to_hex(x))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> core::result::Result<Vec<Fr>, D::Error> {
        let raw = Vec::<String>::deserialize(d)?;
        raw.iter()
            .map(|s| super::from_hex(s).map_err(D::Error::custom))
            .collect()
    }
}

/// serialize into any writer using ark's canonical encoding
pub fn write_canonical<W: std::io::Write>(x: &Fr, w: W) -> Result<()> {
    x.serialize_compressed(w)
        .map_err(|e| CircuitError::Encoding(e.to_string()))
}
