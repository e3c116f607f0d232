//! deterministic fisher-yates shuffle, native and as constraints
//!
//! backward variant starting from the identity order. for step = 0..51:
//!
//! ```text
//! i = 51 - step
//! r = Poseidon(seed, step)
//! j = low14(r) mod (i + 1)
//! swap(cards[i], cards[j])
//! ```
//!
//! the prover never picks the permutation: the gadget recomputes every swap
//! target from the seed and every swap with one-hot selectors, so the final
//! order is a function of the seed alone.

use crate::constraint::{lc, CircuitBuilder, LinearCombination, WireId};
use crate::deck::DECK_SIZE;
use crate::field::{self, Fr};
use crate::gadgets;
use crate::poseidon;

/// bits of each step hash used for the swap target
pub const SWAP_BITS: usize = 14;

/// swap target for `step`, in `0..=51 - step`
pub fn swap_index(seed: Fr, step: usize) -> usize {
    let i = DECK_SIZE - 1 - step;
    let r = poseidon::hash([seed, Fr::from(step as u64)]);
    (field::low_bits(&r, SWAP_BITS as u32) % (i as u64 + 1)) as usize
}

/// shuffle the identity deck with `seed`
pub fn shuffle(seed: Fr) -> [u8; DECK_SIZE] {
    let mut cards: [u8; DECK_SIZE] = core::array::from_fn(|k| k as u8);
    for step in 0..DECK_SIZE - 1 {
        let i = DECK_SIZE - 1 - step;
        cards.swap(i, swap_index(seed, step));
    }
    cards
}

/// recompute the shuffle in-circuit, returning the final card order
///
/// per step: one hash, a strict low-bits extraction, a division by the
/// constant i + 1, then an (i + 1)-way multiplexer read of cards[j] and a
/// conditional write of cards[i] into every position k < i.
pub fn shuffle_gadget(builder: &mut CircuitBuilder, seed: WireId) -> Vec<LinearCombination> {
    let mut cards: Vec<LinearCombination> = (0..DECK_SIZE as u64)
        .map(LinearCombination::constant_u64)
        .collect();

    for step in 0..DECK_SIZE - 1 {
        let i = DECK_SIZE - 1 - step;
        let r = poseidon::hash_gadget(
            builder,
            [lc(seed), LinearCombination::constant_u64(step as u64)],
        );
        let low = gadgets::low_bits(builder, r, SWAP_BITS);
        let (_, j) = gadgets::div_rem_const(builder, low, i as u64 + 1, SWAP_BITS);
        let sels = gadgets::selectors(builder, j, i + 1);

        // new cards[i] = cards[j]
        let picked = gadgets::select_with(builder, &sels, &cards[..=i]);

        // new cards[k] = cards[k] + sel_k * (cards[i] - cards[k]) for k < i
        let current_i = cards[i].clone();
        for (k, sel) in sels.iter().enumerate().take(i) {
            let diff = (current_i.clone() - cards[k].clone()).compact();
            let value = builder.value(*sel) * builder.eval(&diff) + builder.eval(&cards[k]);
            let next = builder.add_witness(value);
            builder.assert_mul(*sel, diff, lc(next) - cards[k].clone());
            cards[k] = lc(next);
        }
        cards[i] = lc(picked);
    }

    cards
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::is_permutation;
    use proptest::prelude::*;

    #[test]
    fn test_swap_index_bounds() {
        let seed = Fr::from(123u64);
        for step in 0..DECK_SIZE - 1 {
            assert!(swap_index(seed, step) <= DECK_SIZE - 1 - step);
        }
    }

    #[test]
    fn test_shuffle_deterministic() {
        let seed = Fr::from(42u64);
        assert_eq!(shuffle(seed), shuffle(seed));
        assert_ne!(shuffle(seed), shuffle(Fr::from(43u64)));
    }

    #[test]
    fn test_gadget_matches_native() {
        let seed = Fr::from(2024u64);
        let expected = shuffle(seed);

        let mut builder = CircuitBuilder::new();
        let seed_wire = builder.add_witness(seed);
        let cards = shuffle_gadget(&mut builder, seed_wire);
        let values: Vec<Fr> = cards.iter().map(|c| builder.eval(c)).collect();
        let expected: Vec<Fr> = expected.iter().map(|c| Fr::from(*c as u64)).collect();
        assert_eq!(values, expected);

        let (circuit, _) = builder.finalize().unwrap();
        // tens of thousands of constraints, far more than a note spend
        assert!(circuit.num_mul_constraints() > 20_000);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_shuffle_is_permutation(seed in any::<u64>()) {
            let cards = shuffle(Fr::from(seed));
            prop_assert!(is_permutation(&cards));
        }
    }
}
