//! poseidon hash over the bn254 scalar field, native and as a gadget
//!
//! ## design choices
//!
//! - fixed-arity compression: width t = k + 1 for k inputs (k in 1..=7)
//! - capacity element state[0] starts at zero, inputs fill state[1..]
//! - output is state[0] after the permutation
//! - s-box: x^5 (gcd(5, p - 1) = 1 for bn254)
//! - rounds: 4 full + partial + 4 full, partial counts follow the
//!   128-bit security table for alpha = 5
//! - mds: cauchy matrix M[i][j] = 1 / (i + t + j)
//!
//! ## constraint cost
//!
//! each s-box costs 3 MUL constraints (x^2, x^4, x^5).
//! round constants and the mds mix are linear and therefore free:
//! the gadget carries the state as linear combinations between s-boxes.
//! for arity 2: (8 * 3 + 57) * 3 = 243 MUL constraints per hash
//!
//! native and gadget evaluation share the same parameter set and the same
//! round schedule, so the gadget's output wire always carries the native hash.

use ark_ff::{Field, PrimeField, Zero};
use std::sync::OnceLock;

use crate::constraint::{CircuitBuilder, LinearCombination, WireId};
use crate::field::Fr;
use crate::{CircuitError, Result};

/// largest supported number of inputs
pub const MAX_ARITY: usize = 7;

/// full rounds (split evenly before and after the partial rounds)
pub const FULL_ROUNDS: usize = 8;

/// partial rounds for t = 2..=8
const PARTIAL_ROUNDS: [usize; MAX_ARITY] = [56, 57, 56, 60, 60, 63, 64];

/// nothing-up-my-sleeve domain for round constant generation
const RC_DOMAIN: &[u8] = b"arcana.poseidon.rc.v1";

/// poseidon parameters for one state width
#[derive(Debug, Clone)]
pub struct PoseidonParams {
    /// state width
    pub width: usize,
    pub full_rounds: usize,
    pub partial_rounds: usize,
    /// round constants, `width` per round
    pub round_constants: Vec<Fr>,
    /// mds matrix (width x width)
    pub mds: Vec<Vec<Fr>>,
}

impl PoseidonParams {
    /// generate parameters for state width `width`
    pub fn new(width: usize) -> Result<Self> {
        if !(2..=MAX_ARITY + 1).contains(&width) {
            return Err(CircuitError::UnsupportedArity(width.saturating_sub(1)));
        }
        let partial_rounds = PARTIAL_ROUNDS[width - 2];
        let rounds = FULL_ROUNDS + partial_rounds;
        Ok(Self {
            width,
            full_rounds: FULL_ROUNDS,
            partial_rounds,
            round_constants: generate_round_constants(width, rounds * width),
            mds: generate_mds_matrix(width),
        })
    }

    pub fn rounds(&self) -> usize {
        self.full_rounds + self.partial_rounds
    }

    fn is_full_round(&self, round: usize) -> bool {
        let half = self.full_rounds / 2;
        round < half || round >= half + self.partial_rounds
    }

    fn constants(&self, round: usize) -> &[Fr] {
        &self.round_constants[round * self.width..(round + 1) * self.width]
    }

    /// native permutation in place
    pub fn permute(&self, state: &mut [Fr]) {
        debug_assert_eq!(state.len(), self.width);
        for round in 0..self.rounds() {
            for (s, c) in state.iter_mut().zip(self.constants(round)) {
                *s += c;
            }
            if self.is_full_round(round) {
                state.iter_mut().for_each(|s| *s = sbox(*s));
            } else {
                state[0] = sbox(state[0]);
            }
            let mixed = self.mix(state);
            state.copy_from_slice(&mixed);
        }
    }

    fn mix(&self, state: &[Fr]) -> Vec<Fr> {
        self.mds
            .iter()
            .map(|row| {
                row.iter()
                    .zip(state)
                    .fold(Fr::zero(), |acc, (m, s)| acc + *m * s)
            })
            .collect()
    }

    /// permutation as constraints over linear-combination state
    pub fn permute_gadget(
        &self,
        builder: &mut CircuitBuilder,
        mut state: Vec<LinearCombination>,
    ) -> Vec<LinearCombination> {
        debug_assert_eq!(state.len(), self.width);
        for round in 0..self.rounds() {
            for (s, c) in state.iter_mut().zip(self.constants(round)) {
                *s = core::mem::take(s) + LinearCombination::constant(*c);
            }
            if self.is_full_round(round) {
                for s in state.iter_mut() {
                    *s = LinearCombination::wire(sbox_gadget(builder, core::mem::take(s)));
                }
            } else {
                state[0] = LinearCombination::wire(sbox_gadget(builder, core::mem::take(&mut state[0])));
            }
            state = self
                .mds
                .iter()
                .map(|row| {
                    row.iter()
                        .zip(&state)
                        .fold(LinearCombination::zero(), |acc, (m, s)| acc + s.clone() * *m)
                        .compact()
                })
                .collect();
        }
        state
    }
}

/// x^5
fn sbox(x: Fr) -> Fr {
    let x2 = x.square();
    x2.square() * x
}

/// x^5 in 3 MUL constraints
fn sbox_gadget(builder: &mut CircuitBuilder, x: LinearCombination) -> WireId {
    let x = x.compact();
    let x2 = builder.mul(x.clone(), x.clone());
    let x4 = builder.mul(x2, x2);
    builder.mul(x4, x)
}

/// generate round constants using SHAKE128 (XOF)
///
/// 64 bytes per constant reduced mod p keeps the bias negligible
fn generate_round_constants(width: usize, count: usize) -> Vec<Fr> {
    use sha3::{
        digest::{ExtendableOutput, Update, XofReader},
        Shake128,
    };

    let mut hasher = Shake128::default();
    hasher.update(RC_DOMAIN);
    hasher.update(&[width as u8]);
    let mut reader = hasher.finalize_xof();

    (0..count)
        .map(|_| {
            let mut chunk = [0u8; 64];
            reader.read(&mut chunk);
            Fr::from_le_bytes_mod_order(&chunk)
        })
        .collect()
}

/// cauchy matrix with x = [0, t) and y = [t, 2t)
///
/// x_i + y_j ranges over [t, 3t - 1], all nonzero and far below p,
/// and the x's and y's are pairwise distinct, so every square submatrix
/// is invertible
fn generate_mds_matrix(width: usize) -> Vec<Vec<Fr>> {
    (0..width)
        .map(|i| {
            (0..width)
                .map(|j| {
                    let denom = Fr::from((i + width + j) as u64);
                    // denom is in [t, 3t) so never zero
                    denom.inverse().unwrap_or_else(Fr::zero)
                })
                .collect()
        })
        .collect()
}

/// cached parameters for every supported arity
fn all_params() -> &'static [PoseidonParams] {
    static PARAMS: OnceLock<Vec<PoseidonParams>> = OnceLock::new();
    PARAMS.get_or_init(|| {
        (1..=MAX_ARITY)
            .filter_map(|arity| PoseidonParams::new(arity + 1).ok())
            .collect()
    })
}

/// parameters for hashing `arity` inputs
pub fn params(arity: usize) -> Result<&'static PoseidonParams> {
    if arity == 0 || arity > MAX_ARITY {
        return Err(CircuitError::UnsupportedArity(arity));
    }
    all_params()
        .get(arity - 1)
        .ok_or(CircuitError::UnsupportedArity(arity))
}

struct Arity<const N: usize>;

impl<const N: usize> Arity<N> {
    const CHECK: () = assert!(N >= 1 && N <= MAX_ARITY, "poseidon arity must be 1..=7");
}

fn fixed_params<const N: usize>() -> &'static PoseidonParams {
    #[allow(clippy::let_unit_value)]
    let () = Arity::<N>::CHECK;
    &all_params()[N - 1]
}

/// hash a fixed number of inputs (arity checked at compile time)
pub fn hash<const N: usize>(inputs: [Fr; N]) -> Fr {
    let params = fixed_params::<N>();
    let mut state = Vec::with_capacity(N + 1);
    state.push(Fr::zero());
    state.extend_from_slice(&inputs);
    params.permute(&mut state);
    state[0]
}

/// hash a runtime-sized input slice
pub fn hash_slice(inputs: &[Fr]) -> Result<Fr> {
    let params = params(inputs.len())?;
    let mut state = Vec::with_capacity(inputs.len() + 1);
    state.push(Fr::zero());
    state.extend_from_slice(inputs);
    params.permute(&mut state);
    Ok(state[0])
}

/// hash gadget: returns a wire holding `hash(inputs)`
pub fn hash_gadget<const N: usize>(
    builder: &mut CircuitBuilder,
    inputs: [LinearCombination; N],
) -> WireId {
    let params = fixed_params::<N>();
    let mut state = Vec::with_capacity(N + 1);
    state.push(LinearCombination::zero());
    state.extend(inputs);
    let out = params.permute_gadget(builder, state);
    builder.materialize(out[0].clone())
}
