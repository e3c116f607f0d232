//! poseidon vrf and rarity tier selection
//!
//! `vrf(sk, seed) = Poseidon(sk, seed)`. the output is reduced to a roll in
//! `0..10000` via its low 14 bits and a witnessed quotient/remainder, then
//! compared against four ascending thresholds.
//!
//! the holder can evaluate the vrf locally before opening a box: rolls are
//! unpredictable to everyone else but not to the key owner.

use serde::{Deserialize, Serialize};

use crate::constraint::{lc, CircuitBuilder, LinearCombination, WireId};
use crate::field::{self, Fr};
use crate::gadgets;
use crate::keys::SecretKey;
use crate::poseidon;
use crate::{CircuitError, Result};

/// number of rarity tiers
pub const RARITY_TIERS: usize = 4;

/// rolls are uniform-ish over 0..ROLL_RANGE
pub const ROLL_RANGE: u64 = 10_000;

/// bits taken from the vrf output before reduction
pub const ROLL_BITS: usize = 14;

/// `Poseidon(sk, seed)`
pub fn vrf(sk: &SecretKey, seed: Fr) -> Fr {
    poseidon::hash([sk.to_field(), seed])
}

/// low 14 bits of the output reduced mod 10000
pub fn roll(vrf_output: &Fr) -> u64 {
    field::low_bits(vrf_output, ROLL_BITS as u32) % ROLL_RANGE
}

/// ascending tier thresholds closing at 10000
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds([u64; RARITY_TIERS]);

impl Thresholds {
    pub fn new(values: [u64; RARITY_TIERS]) -> Result<Self> {
        if values.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CircuitError::InvalidThresholds("not strictly increasing"));
        }
        if values[RARITY_TIERS - 1] != ROLL_RANGE {
            return Err(CircuitError::InvalidThresholds("last threshold must be 10000"));
        }
        Ok(Self(values))
    }

    /// unchecked, for building deliberately broken statements
    pub fn new_unchecked(values: [u64; RARITY_TIERS]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> [u64; RARITY_TIERS] {
        self.0
    }

    pub fn to_fields(&self) -> [Fr; RARITY_TIERS] {
        self.0.map(Fr::from)
    }

    /// index of the first threshold strictly above `roll`
    pub fn select_tier(&self, roll: u64) -> u64 {
        self.0.iter().filter(|t| **t <= roll).count() as u64
    }
}

impl Default for Thresholds {
    /// 1% / 4% / 15% / 80%
    fn default() -> Self {
        Self([100, 500, 2000, ROLL_RANGE])
    }
}

/// tier for a vrf output under `thresholds`
pub fn rarity(vrf_output: &Fr, thresholds: &Thresholds) -> u64 {
    thresholds.select_tier(roll(vrf_output))
}

/// in-circuit vrf
pub fn vrf_gadget(
    builder: &mut CircuitBuilder,
    sk: impl Into<LinearCombination>,
    seed: impl Into<LinearCombination>,
) -> WireId {
    poseidon::hash_gadget(builder, [sk.into(), seed.into()])
}

/// enforce strictly increasing thresholds that close at 10000
pub fn assert_thresholds(builder: &mut CircuitBuilder, thresholds: &[WireId; RARITY_TIERS]) {
    builder.scoped("thresholds", |b| {
        for t in thresholds {
            gadgets::assert_bits(b, *t, ROLL_BITS);
        }
        for pair in thresholds.windows(2) {
            let lt = gadgets::less_than(b, pair[0], pair[1], ROLL_BITS);
            b.assert_const(lt, Fr::from(1u64));
        }
        b.assert_const(thresholds[RARITY_TIERS - 1], Fr::from(ROLL_RANGE));
    });
}

/// derive the tier wire from a vrf output wire
///
/// thresholds must already be range-checked (see [`assert_thresholds`])
pub fn rarity_gadget(
    builder: &mut CircuitBuilder,
    vrf_output: WireId,
    thresholds: &[WireId; RARITY_TIERS],
) -> WireId {
    builder.scoped("rarity", |b| {
        let low = gadgets::low_bits(b, vrf_output, ROLL_BITS);
        // 14 bits < 2 * 10000, so the quotient is a single bit
        let (_, r) = gadgets::div_rem_const(b, low, ROLL_RANGE, 1);
        let tier = thresholds
            .iter()
            .fold(LinearCombination::zero(), |acc, t| {
                let below = gadgets::less_than(b, r, *t, ROLL_BITS);
                acc + LinearCombination::constant_u64(1) - lc(below)
            });
        b.materialize(tier.compact())
    })
}
