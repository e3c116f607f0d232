//! rank-1 constraint system over the bn254 scalar field
//!
//! constraint model:
//! - mul constraints: A * B = C over linear combinations (the cost metric)
//! - eq constraints: A = B (linear, lowered to (A - B) * 1 = 0)
//! - boolean constraints: w * (1 - w) = 0
//! - range decomposition: value = sum(bits[i] * 2^i), bits boolean
//!
//! unlike a bare r1cs, the builder assigns witness values while constraints
//! are emitted, and tags every constraint with the scope that was active.
//! checking a finished circuit therefore tells the prover *which* precondition
//! failed, not just that one did.

use ark_ff::{Field, One, Zero};
use std::collections::BTreeMap;
use std::ops::{Add, Mul, Neg, Sub};

use crate::field::Fr;
use crate::{CircuitError, Result};

/// wire index into witness vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WireId(pub usize);

impl WireId {
    /// wire 0 always carries the constant one
    pub const ONE: WireId = WireId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// sum of coefficient * wire terms
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearCombination {
    pub terms: Vec<(WireId, Fr)>,
}

impl LinearCombination {
    pub fn zero() -> Self {
        Self { terms: Vec::new() }
    }

    pub fn wire(wire: WireId) -> Self {
        Self { terms: vec![(wire, Fr::one())] }
    }

    pub fn constant(value: Fr) -> Self {
        if value.is_zero() {
            return Self::zero();
        }
        Self { terms: vec![(WireId::ONE, value)] }
    }

    pub fn constant_u64(value: u64) -> Self {
        Self::constant(Fr::from(value))
    }

    /// add a term
    pub fn with_term(mut self, wire: WireId, coeff: Fr) -> Self {
        self.terms.push((wire, coeff));
        self
    }

    /// evaluate against witness values
    pub fn evaluate(&self, values: &[Fr]) -> Fr {
        self.terms
            .iter()
            .fold(Fr::zero(), |acc, (wire, coeff)| acc + values[wire.0] * coeff)
    }

    /// merge duplicate wires and drop zero coefficients
    pub fn compact(self) -> Self {
        let mut merged: BTreeMap<WireId, Fr> = BTreeMap::new();
        for (wire, coeff) in self.terms {
            *merged.entry(wire).or_insert_with(Fr::zero) += coeff;
        }
        Self {
            terms: merged.into_iter().filter(|(_, c)| !c.is_zero()).collect(),
        }
    }

    /// the single wire this combination is, if it is exactly `1 * w`
    pub fn as_wire(&self) -> Option<WireId> {
        match self.terms.as_slice() {
            [(wire, coeff)] if coeff.is_one() => Some(*wire),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl From<WireId> for LinearCombination {
    fn from(wire: WireId) -> Self {
        Self::wire(wire)
    }
}

impl From<&WireId> for LinearCombination {
    fn from(wire: &WireId) -> Self {
        Self::wire(*wire)
    }
}

/// shorthand for `LinearCombination::from(wire)`
pub fn lc(wire: WireId) -> LinearCombination {
    LinearCombination::wire(wire)
}

impl Add for LinearCombination {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self.terms.extend(rhs.terms);
        self
    }
}

impl Sub for LinearCombination {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self {
        self.terms
            .extend(rhs.terms.into_iter().map(|(w, c)| (w, -c)));
        self
    }
}

impl Neg for LinearCombination {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            terms: self.terms.into_iter().map(|(w, c)| (w, -c)).collect(),
        }
    }
}

impl Mul<Fr> for LinearCombination {
    type Output = Self;

    fn mul(self, rhs: Fr) -> Self {
        if rhs.is_zero() {
            return Self::zero();
        }
        Self {
            terms: self.terms.into_iter().map(|(w, c)| (w, c * rhs)).collect(),
        }
    }
}

/// constraint types in the circuit
#[derive(Debug, Clone)]
pub enum Constraint {
    /// a * b = c (non-linear, the main cost)
    Mul {
        a: LinearCombination,
        b: LinearCombination,
        c: LinearCombination,
    },

    /// a = b (linear)
    Eq {
        a: LinearCombination,
        b: LinearCombination,
    },

    /// wire in {0, 1}
    Boolean { wire: WireId },

    /// value = sum(bits[i] * 2^i) with every bit boolean
    RangeDecomposed {
        value: LinearCombination,
        bits: Vec<WireId>,
    },
}

impl Constraint {
    /// check if constraint is satisfied by witness
    pub fn check(&self, values: &[Fr]) -> bool {
        match self {
            Constraint::Mul { a, b, c } => {
                a.evaluate(values) * b.evaluate(values) == c.evaluate(values)
            }
            Constraint::Eq { a, b } => a.evaluate(values) == b.evaluate(values),
            Constraint::Boolean { wire } => is_bit(&values[wire.0]),
            Constraint::RangeDecomposed { value, bits } => {
                if !bits.iter().all(|b| is_bit(&values[b.0])) {
                    return false;
                }
                value.evaluate(values) == recompose(bits, values)
            }
        }
    }

    /// lower to r1cs rows (a * b = c)
    pub fn to_r1cs(&self) -> Vec<(LinearCombination, LinearCombination, LinearCombination)> {
        let one = || LinearCombination::constant(Fr::one());
        let boolean = |w: WireId| {
            (
                lc(w),
                one() - lc(w),
                LinearCombination::zero(),
            )
        };
        match self {
            Constraint::Mul { a, b, c } => vec![(a.clone(), b.clone(), c.clone())],
            Constraint::Eq { a, b } => {
                vec![(a.clone() - b.clone(), one(), LinearCombination::zero())]
            }
            Constraint::Boolean { wire } => vec![boolean(*wire)],
            Constraint::RangeDecomposed { value, bits } => {
                let mut rows: Vec<_> = bits.iter().map(|b| boolean(*b)).collect();
                let sum = bits_lc(bits);
                rows.push((value.clone() - sum, one(), LinearCombination::zero()));
                rows
            }
        }
    }

    /// number of r1cs rows this constraint lowers to
    pub fn rows(&self) -> usize {
        match self {
            Constraint::RangeDecomposed { bits, .. } => bits.len() + 1,
            _ => 1,
        }
    }
}

fn is_bit(v: &Fr) -> bool {
    v.is_zero() || v.is_one()
}

fn recompose(bits: &[WireId], values: &[Fr]) -> Fr {
    let mut acc = Fr::zero();
    let mut power = Fr::one();
    for bit in bits {
        acc += values[bit.0] * power;
        power.double_in_place();
    }
    acc
}

/// sum(bits[i] * 2^i) as a linear combination
pub fn bits_lc(bits: &[WireId]) -> LinearCombination {
    let mut out = LinearCombination::zero();
    let mut power = Fr::one();
    for bit in bits {
        out = out.with_term(*bit, power);
        power.double_in_place();
    }
    out
}

/// circuit builder for constructing constraint systems
///
/// public inputs must be allocated before any private wire so that their
/// order in the witness matches the order a verifier receives them in
#[derive(Debug, Clone)]
pub struct CircuitBuilder {
    /// assigned wire values, wire 0 is the constant one
    values: Vec<Fr>,
    /// public input wires in declaration order
    public: Vec<WireId>,
    /// constraints
    constraints: Vec<Constraint>,
    /// scope label per constraint
    scopes: Vec<&'static str>,
    /// label attached to constraints emitted next
    scope: &'static str,
}

impl Default for CircuitBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBuilder {
    pub fn new() -> Self {
        Self {
            values: vec![Fr::one()],
            public: Vec::new(),
            constraints: Vec::new(),
            scopes: Vec::new(),
            scope: "root",
        }
    }

    /// allocate a new private wire holding `value`
    pub fn add_witness(&mut self, value: Fr) -> WireId {
        let id = WireId(self.values.len());
        self.values.push(value);
        id
    }

    /// allocate a new public input wire
    pub fn add_public(&mut self, value: Fr) -> WireId {
        debug_assert_eq!(
            self.values.len(),
            self.public.len() + 1,
            "public inputs must precede private wires"
        );
        let id = self.add_witness(value);
        self.public.push(id);
        id
    }

    /// allocate multiple private wires
    pub fn add_witnesses(&mut self, values: &[Fr]) -> Vec<WireId> {
        values.iter().map(|v| self.add_witness(*v)).collect()
    }

    /// value currently assigned to a wire
    pub fn value(&self, wire: WireId) -> Fr {
        self.values[wire.0]
    }

    /// evaluate a linear combination against current assignment
    pub fn eval(&self, lc: &LinearCombination) -> Fr {
        lc.evaluate(&self.values)
    }

    /// run `f` with constraints labelled `scope`
    pub fn scoped<R>(&mut self, scope: &'static str, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = core::mem::replace(&mut self.scope, scope);
        let out = f(self);
        self.scope = previous;
        out
    }

    pub fn current_scope(&self) -> &'static str {
        self.scope
    }

    /// add a constraint under the current scope
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
        self.scopes.push(self.scope);
    }

    /// assert a * b = c
    pub fn assert_mul(
        &mut self,
        a: impl Into<LinearCombination>,
        b: impl Into<LinearCombination>,
        c: impl Into<LinearCombination>,
    ) {
        self.add_constraint(Constraint::Mul {
            a: a.into(),
            b: b.into(),
            c: c.into(),
        });
    }

    /// assert a = b
    pub fn assert_eq(&mut self, a: impl Into<LinearCombination>, b: impl Into<LinearCombination>) {
        self.add_constraint(Constraint::Eq {
            a: a.into(),
            b: b.into(),
        });
    }

    /// assert a linear combination equals a constant
    pub fn assert_const(&mut self, a: impl Into<LinearCombination>, value: Fr) {
        self.assert_eq(a, LinearCombination::constant(value));
    }

    /// assert wire in {0, 1}
    pub fn assert_boolean(&mut self, wire: WireId) {
        self.add_constraint(Constraint::Boolean { wire });
    }

    /// allocate `a * b` as a new wire
    pub fn mul(
        &mut self,
        a: impl Into<LinearCombination>,
        b: impl Into<LinearCombination>,
    ) -> WireId {
        let a = a.into();
        let b = b.into();
        let product = self.eval(&a) * self.eval(&b);
        let out = self.add_witness(product);
        self.add_constraint(Constraint::Mul { a, b, c: lc(out) });
        out
    }

    /// allocate a wire equal to a linear combination
    ///
    /// returns the existing wire when the combination already is one
    pub fn materialize(&mut self, combination: LinearCombination) -> WireId {
        if let Some(wire) = combination.as_wire() {
            return wire;
        }
        let value = self.eval(&combination);
        let out = self.add_witness(value);
        self.assert_eq(out, combination);
        out
    }

    /// allocate `n` bit wires decomposing `value` (low bits first)
    ///
    /// the caller guarantees the assigned value fits; if it does not, the
    /// decomposition constraint fails at check time
    pub fn decompose(&mut self, value: impl Into<LinearCombination>, n: usize) -> Vec<WireId> {
        let value = value.into();
        let assigned = crate::field::to_bits_le(&self.eval(&value));
        let bits: Vec<WireId> = (0..n)
            .map(|i| {
                let bit = assigned.get(i).copied().unwrap_or(false);
                self.add_witness(Fr::from(bit as u64))
            })
            .collect();
        self.add_constraint(Constraint::RangeDecomposed {
            value,
            bits: bits.clone(),
        });
        bits
    }

    pub fn num_wires(&self) -> usize {
        self.values.len()
    }

    pub fn num_public(&self) -> usize {
        self.public.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// build the circuit and its witness without checking
    pub fn build(self) -> (Circuit, Witness) {
        let circuit = Circuit {
            num_wires: self.values.len(),
            public: self.public.clone(),
            constraints: self.constraints,
            scopes: self.scopes,
        };
        let witness = Witness {
            values: self.values,
            public: self.public,
        };
        (circuit, witness)
    }

    /// build and check every constraint against the assignment
    pub fn finalize(self) -> Result<(Circuit, Witness)> {
        let (circuit, witness) = self.build();
        circuit.check(&witness)?;
        tracing::debug!(
            wires = circuit.num_wires,
            public = circuit.public.len(),
            constraints = circuit.constraints.len(),
            rows = circuit.num_rows(),
            "circuit finalized"
        );
        Ok((circuit, witness))
    }
}

/// compiled circuit ready for proving
#[derive(Debug, Clone)]
pub struct Circuit {
    pub num_wires: usize,
    pub public: Vec<WireId>,
    pub constraints: Vec<Constraint>,
    pub scopes: Vec<&'static str>,
}

impl Circuit {
    /// check all constraints against witness
    pub fn check(&self, witness: &Witness) -> Result<()> {
        if witness.values.len() != self.num_wires {
            return Err(CircuitError::WitnessLength {
                expected: self.num_wires,
                got: witness.values.len(),
            });
        }
        if !witness.values[0].is_one() {
            return Err(CircuitError::ConstantWire);
        }
        for (index, constraint) in self.constraints.iter().enumerate() {
            if !constraint.check(&witness.values) {
                return Err(CircuitError::Unsatisfied {
                    index,
                    scope: self.scopes[index],
                });
            }
        }
        Ok(())
    }

    pub fn num_public(&self) -> usize {
        self.public.len()
    }

    /// number of mul constraints (main cost metric)
    pub fn num_mul_constraints(&self) -> usize {
        self.constraints
            .iter()
            .filter(|c| matches!(c, Constraint::Mul { .. }))
            .count()
    }

    /// number of r1cs rows after lowering
    pub fn num_rows(&self) -> usize {
        self.constraints.iter().map(Constraint::rows).sum()
    }

    /// scope label of the constraint at `index`
    pub fn scope_of(&self, index: usize) -> Option<&'static str> {
        self.scopes.get(index).copied()
    }
}

/// witness for a circuit execution
#[derive(Debug, Clone)]
pub struct Witness {
    /// wire values
    pub values: Vec<Fr>,
    /// public input wires
    pub public: Vec<WireId>,
}

impl Witness {
    pub fn get(&self, wire: WireId) -> Fr {
        self.values[wire.0]
    }

    /// set wire value (for tampering tests and external witness generators)
    pub fn set(&mut self, wire: WireId, value: Fr) {
        self.values[wire.0] = value;
    }

    /// public inputs in declaration order
    pub fn public_inputs(&self) -> Vec<Fr> {
        self.public.iter().map(|w| self.values[w.0]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_constraint() {
        let mut builder = CircuitBuilder::new();
        let a = builder.add_witness(Fr::from(6u64));
        let b = builder.add_witness(Fr::from(7u64));
        let c = builder.mul(a, b);
        assert_eq!(builder.value(c), Fr::from(42u64));

        let (circuit, mut witness) = builder.build();
        assert!(circuit.check(&witness).is_ok());

        witness.set(c, Fr::from(41u64));
        assert!(matches!(
            circuit.check(&witness),
            Err(CircuitError::Unsatisfied { index: 0, .. })
        ));
    }

    #[test]
    fn test_public_inputs_order() {
        let mut builder = CircuitBuilder::new();
        let x = builder.add_public(Fr::from(3u64));
        let y = builder.add_public(Fr::from(5u64));
        let w = builder.add_witness(Fr::from(15u64));
        builder.assert_mul(x, y, w);

        let (circuit, witness) = builder.finalize().unwrap();
        assert_eq!(circuit.num_public(), 2);
        assert_eq!(witness.public_inputs(), vec![Fr::from(3u64), Fr::from(5u64)]);
    }

    #[test]
    fn test_scope_reported() {
        let mut builder = CircuitBuilder::new();
        let a = builder.add_witness(Fr::from(2u64));
        builder.scoped("first", |b| b.assert_const(a, Fr::from(2u64)));
        builder.scoped("second", |b| b.assert_const(a, Fr::from(3u64)));
        assert_eq!(builder.current_scope(), "root");

        let err = builder.finalize().unwrap_err();
        assert_eq!(err, CircuitError::Unsatisfied { index: 1, scope: "second" });
    }

    #[test]
    fn test_boolean_constraint() {
        let mut builder = CircuitBuilder::new();
        let b = builder.add_witness(Fr::from(2u64));
        builder.assert_boolean(b);
        assert!(builder.finalize().is_err());
    }

    #[test]
    fn test_decompose() {
        let mut builder = CircuitBuilder::new();
        let x = builder.add_witness(Fr::from(0b1101u64));
        let bits = builder.decompose(x, 4);
        let values: Vec<Fr> = bits.iter().map(|b| builder.value(*b)).collect();
        assert_eq!(
            values,
            vec![Fr::one(), Fr::zero(), Fr::one(), Fr::one()]
        );
        assert!(builder.finalize().is_ok());

        // 16 does not fit in 4 bits
        let mut builder = CircuitBuilder::new();
        let x = builder.add_witness(Fr::from(16u64));
        builder.decompose(x, 4);
        assert!(builder.finalize().is_err());
    }

    #[test]
    fn test_lowering_matches_check() {
        let mut builder = CircuitBuilder::new();
        let x = builder.add_witness(Fr::from(9u64));
        let y = builder.mul(x, x);
        builder.assert_eq(y, LinearCombination::constant_u64(81));
        builder.decompose(x, 4);
        let (circuit, witness) = builder.finalize().unwrap();

        for constraint in &circuit.constraints {
            for (a, b, c) in constraint.to_r1cs() {
                assert_eq!(
                    a.evaluate(&witness.values) * b.evaluate(&witness.values),
                    c.evaluate(&witness.values)
                );
            }
        }
        assert_eq!(circuit.num_rows(), 1 + 1 + 5);
    }

    #[test]
    fn test_compact() {
        let w = WireId(3);
        let combined = (lc(w) + lc(w) - lc(WireId(4)) + lc(WireId(4))).compact();
        assert_eq!(combined.terms, vec![(w, Fr::from(2u64))]);
    }

    #[test]
    fn test_witness_length_mismatch() {
        let builder = CircuitBuilder::new();
        let (circuit, mut witness) = builder.build();
        witness.values.push(Fr::zero());
        assert!(matches!(
            circuit.check(&witness),
            Err(CircuitError::WitnessLength { .. })
        ));
    }
}
