//! reusable constraint gadgets
//!
//! field arithmetic wraps mod p, so every integer-flavoured operation here
//! (bit extraction, comparison, division by a constant) witnesses its result
//! and then re-verifies it with algebraic identities plus explicit range
//! checks. none of these gadgets trust the prover's assignment.

use ark_ff::{BigInteger, Field, One, PrimeField, Zero};

use crate::constraint::{bits_lc, lc, CircuitBuilder, LinearCombination, WireId};
use crate::field::{self, Fr, FIELD_BITS};

/// 1 if x == 0 else 0
///
/// x * inv = 1 - out, x * out = 0
pub fn is_zero(builder: &mut CircuitBuilder, x: impl Into<LinearCombination>) -> WireId {
    let x = x.into();
    let value = builder.eval(&x);
    let inv = builder.add_witness(value.inverse().unwrap_or_else(Fr::zero));
    let out = builder.add_witness(if value.is_zero() { Fr::one() } else { Fr::zero() });
    builder.assert_mul(
        x.clone(),
        inv,
        LinearCombination::constant(Fr::one()) - lc(out),
    );
    builder.assert_mul(x, out, LinearCombination::zero());
    out
}

/// 1 if a == b else 0
pub fn is_equal(
    builder: &mut CircuitBuilder,
    a: impl Into<LinearCombination>,
    b: impl Into<LinearCombination>,
) -> WireId {
    is_zero(builder, a.into() - b.into())
}

/// range check: `x < 2^n`, returns the little-endian bits
pub fn assert_bits(
    builder: &mut CircuitBuilder,
    x: impl Into<LinearCombination>,
    n: usize,
) -> Vec<WireId> {
    debug_assert!(n < FIELD_BITS);
    builder.decompose(x, n)
}

/// enforce that the integer encoded by `bits` (little-endian) is at most
/// `constant`
///
/// walks from the most significant bit keeping two flags: `eq` (prefix equals
/// the constant's prefix) and `lt` (prefix already strictly smaller). one MUL
/// constraint per bit, then `lt + eq == 1`.
pub fn assert_bits_le_const(builder: &mut CircuitBuilder, bits: &[WireId], constant: &[bool]) {
    debug_assert_eq!(bits.len(), constant.len());
    let one = || LinearCombination::constant(Fr::one());
    let mut eq = one();
    let mut lt = LinearCombination::zero();

    for (bit, c) in bits.iter().zip(constant).rev() {
        let t = builder.mul(eq.clone(), *bit);
        if *c {
            // constant bit 1: a zero bit here makes us strictly smaller
            lt = lt + eq - lc(t);
            eq = lc(t);
        } else {
            // constant bit 0: a one bit here while equal overshoots
            eq = eq - lc(t);
        }
        lt = lt.compact();
        eq = eq.compact();
    }
    builder.assert_eq(lt + eq, one());
}

/// canonical 254-bit decomposition
///
/// a plain 254-bit decomposition admits aliases (x + p still fits in 254
/// bits for small x), so the bits are additionally bounded by p - 1
pub fn to_bits_strict(builder: &mut CircuitBuilder, x: impl Into<LinearCombination>) -> Vec<WireId> {
    let bits = builder.decompose(x, FIELD_BITS);
    let bound = field::to_bits_le(&field::max_element());
    assert_bits_le_const(builder, &bits, &bound);
    bits
}

/// wire holding the low `n` bits of x, taken from its canonical encoding
pub fn low_bits(builder: &mut CircuitBuilder, x: impl Into<LinearCombination>, n: usize) -> WireId {
    let bits = to_bits_strict(builder, x);
    builder.materialize(bits_lc(&bits[..n]))
}

/// 1 if a < b else 0, for a and b already known to be below 2^n
///
/// decomposes a + 2^n - b into n + 1 bits; the top bit is set iff a >= b
pub fn less_than(
    builder: &mut CircuitBuilder,
    a: impl Into<LinearCombination>,
    b: impl Into<LinearCombination>,
    n: usize,
) -> WireId {
    let shift = Fr::from(2u64).pow([n as u64]);
    let diff = a.into() + LinearCombination::constant(shift) - b.into();
    let bits = builder.decompose(diff, n + 1);
    builder.materialize(LinearCombination::constant(Fr::one()) - lc(bits[n]))
}

/// bits needed to represent `value`
pub fn bit_width(value: u64) -> usize {
    (64 - value.leading_zeros() as usize).max(1)
}

/// enforce `x < bound` for an x already range-checked to a few bits
///
/// decomposes bound - 1 - x; an x at or above the bound wraps to a value
/// near p that cannot be decomposed
pub fn assert_lt_const(builder: &mut CircuitBuilder, x: impl Into<LinearCombination>, bound: u64) {
    debug_assert!(bound > 0);
    let n = bit_width(bound - 1);
    let gap = LinearCombination::constant(Fr::from(bound - 1)) - x.into();
    builder.decompose(gap, n);
}

/// quotient and remainder of x by a constant divisor
///
/// witnesses (q, r), then enforces q * d + r == x, q < 2^q_bits, r < 2^n and
/// r <= d - 1. with both bounds in place q * d + r stays far below p, so the
/// identity holds over the integers and the pair is unique.
pub fn div_rem_const(
    builder: &mut CircuitBuilder,
    x: impl Into<LinearCombination>,
    divisor: u64,
    q_bits: usize,
) -> (WireId, WireId) {
    debug_assert!(divisor > 0);
    let x = x.into();
    let value = field::to_u64(&builder.eval(&x)).unwrap_or(u64::MAX);
    let q = builder.add_witness(Fr::from(value / divisor));
    let r = builder.add_witness(Fr::from(value % divisor));

    if q_bits == 1 {
        builder.assert_boolean(q);
    } else {
        builder.decompose(q, q_bits);
    }
    builder.decompose(r, bit_width(divisor - 1));
    assert_lt_const(builder, r, divisor);
    builder.assert_eq(lc(q) * Fr::from(divisor) + lc(r), x);
    (q, r)
}

/// one-hot selectors for `index` over positions 0..n
///
/// sel_k = IsZero(index - k) and sum(sel) == 1, which also proves index < n
pub fn selectors(
    builder: &mut CircuitBuilder,
    index: impl Into<LinearCombination>,
    n: usize,
) -> Vec<WireId> {
    let index = index.into();
    let sels: Vec<WireId> = (0..n)
        .map(|k| {
            is_equal(
                builder,
                index.clone(),
                LinearCombination::constant_u64(k as u64),
            )
        })
        .collect();
    let sum = sels
        .iter()
        .fold(LinearCombination::zero(), |acc, s| acc + lc(*s));
    builder.assert_const(sum, Fr::one());
    sels
}

/// sum(sel_k * values_k) for precomputed selectors
pub fn select_with(
    builder: &mut CircuitBuilder,
    sels: &[WireId],
    values: &[LinearCombination],
) -> WireId {
    debug_assert_eq!(sels.len(), values.len());
    let sum = sels
        .iter()
        .zip(values)
        .fold(LinearCombination::zero(), |acc, (s, v)| {
            acc + lc(builder.mul(*s, v.clone()))
        });
    builder.materialize(sum)
}

/// variable-index read: values[index], linear cost in values.len()
pub fn select(
    builder: &mut CircuitBuilder,
    values: &[LinearCombination],
    index: impl Into<LinearCombination>,
) -> WireId {
    let sels = selectors(builder, index, values.len());
    select_with(builder, &sels, values)
}

/// `p - 1` bits, exposed for tests that want to build their own bound
pub fn modulus_minus_one_bits() -> Vec<bool> {
    let mut bits = (-Fr::one()).into_bigint().to_bits_le();
    bits.truncate(FIELD_BITS);
    bits
}
