//! groth16 over bn254 for the arcana constraint system
//!
//! [`R1csAdapter`] replays a compiled [`Circuit`] into an `ark-relations`
//! constraint system: wire 0 maps to `Variable::One`, public wires to
//! instance variables (in order) and every other wire to a witness variable.
//! keys are generated per [`CircuitKind`] from a sample statement, which works
//! because circuit shape never depends on witness values.

use std::collections::HashMap;

use ark_bn254::Bn254;
use ark_groth16::{prepare_verifying_key, Groth16, PreparedVerifyingKey, ProvingKey};
use ark_relations::r1cs::{
    ConstraintSynthesizer, ConstraintSystemRef, LinearCombination as ArkLc, SynthesisError,
    Variable,
};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
use parking_lot::RwLock;
use rand::{rngs::OsRng, CryptoRng, RngCore};

use crate::circuits::{self, CircuitKind};
use crate::constraint::{Circuit, LinearCombination, Witness};
use crate::field::Fr;
use crate::proof::{Proof, ProofSystem, Verifier};
use crate::{CircuitError, Result};

/// feeds a compiled circuit (and optionally its witness) to arkworks
pub struct R1csAdapter<'a> {
    circuit: &'a Circuit,
    witness: Option<&'a Witness>,
}

impl<'a> R1csAdapter<'a> {
    /// shape only, for key generation
    pub fn setup(circuit: &'a Circuit) -> Self {
        Self { circuit, witness: None }
    }

    pub fn prove(circuit: &'a Circuit, witness: &'a Witness) -> Self {
        Self {
            circuit,
            witness: Some(witness),
        }
    }
}

impl ConstraintSynthesizer<Fr> for R1csAdapter<'_> {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> core::result::Result<(), SynthesisError> {
        let num_public = self.circuit.num_public();
        let value = |i: usize| {
            self.witness
                .map(|w| w.values[i])
                .ok_or(SynthesisError::AssignmentMissing)
        };

        let mut vars = Vec::with_capacity(self.circuit.num_wires);
        vars.push(Variable::One);
        for i in 1..self.circuit.num_wires {
            let var = if i <= num_public {
                cs.new_input_variable(|| value(i))?
            } else {
                cs.new_witness_variable(|| value(i))?
            };
            vars.push(var);
        }

        let convert = |combination: &LinearCombination| {
            ArkLc(
                combination
                    .terms
                    .iter()
                    .map(|(wire, coeff)| (*coeff, vars[wire.0]))
                    .collect(),
            )
        };

        for constraint in &self.circuit.constraints {
            for (a, b, c) in constraint.to_r1cs() {
                cs.enforce_constraint(convert(&a), convert(&b), convert(&c))?;
            }
        }
        Ok(())
    }
}

struct CircuitKeys {
    pk: ProvingKey<Bn254>,
    pvk: PreparedVerifyingKey<Bn254>,
}

/// groth16 prover and verifier with circuit-specific keys
#[derive(Default)]
pub struct Groth16Backend {
    keys: RwLock<HashMap<CircuitKind, CircuitKeys>>,
}

impl core::fmt::Debug for Groth16Backend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let kinds: Vec<CircuitKind> = self.keys.read().keys().copied().collect();
        f.debug_struct("Groth16Backend").field("kinds", &kinds).finish()
    }
}

impl Groth16Backend {
    pub fn new() -> Self {
        Self::default()
    }

    /// run circuit-specific setup for `kind`
    pub fn setup<R: RngCore + CryptoRng>(&self, kind: CircuitKind, rng: &mut R) -> Result<()> {
        let statement = circuits::sample(kind, rng)?;
        let (circuit, _) = statement.build()?;
        if circuit.public.iter().enumerate().any(|(i, w)| w.0 != i + 1) {
            return Err(CircuitError::Backend("public wires must lead the witness".into()));
        }
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(R1csAdapter::setup(&circuit), rng)
            .map_err(|e| CircuitError::Backend(e.to_string()))?;
        let pvk = prepare_verifying_key(&vk);
        tracing::info!(%kind, rows = circuit.num_rows(), "groth16 keys generated");
        self.keys.write().insert(kind, CircuitKeys { pk, pvk });
        Ok(())
    }

    pub fn setup_all<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<()> {
        for kind in CircuitKind::ALL {
            self.setup(kind, rng)?;
        }
        Ok(())
    }

    pub fn has_keys(&self, kind: CircuitKind) -> bool {
        self.keys.read().contains_key(&kind)
    }

    /// serialized verifying key, for handing to an external verifier
    pub fn verifying_key_bytes(&self, kind: CircuitKind) -> Result<Vec<u8>> {
        let keys = self.keys.read();
        let entry = keys.get(&kind).ok_or(CircuitError::MissingKey(kind.as_str()))?;
        let mut out = Vec::new();
        entry
            .pvk
            .vk
            .serialize_compressed(&mut out)
            .map_err(|e| CircuitError::Encoding(e.to_string()))?;
        Ok(out)
    }
}

impl ProofSystem for Groth16Backend {
    fn prove(&self, kind: CircuitKind, circuit: &Circuit, witness: &Witness) -> Result<Proof> {
        circuit.check(witness)?;
        let keys = self.keys.read();
        let entry = keys.get(&kind).ok_or(CircuitError::MissingKey(kind.as_str()))?;
        let proof = Groth16::<Bn254>::prove(&entry.pk, R1csAdapter::prove(circuit, witness), &mut OsRng)
            .map_err(|e| CircuitError::Backend(e.to_string()))?;
        let mut bytes = Vec::new();
        proof
            .serialize_compressed(&mut bytes)
            .map_err(|e| CircuitError::Encoding(e.to_string()))?;
        tracing::debug!(%kind, "groth16 proof generated");
        Ok(Proof::new(kind, bytes))
    }
}

impl Verifier for Groth16Backend {
    fn verify(&self, kind: CircuitKind, public_inputs: &[Fr], proof: &Proof) -> bool {
        if proof.kind != kind || public_inputs.len() != kind.num_public() {
            return false;
        }
        let keys = self.keys.read();
        let Some(entry) = keys.get(&kind) else {
            tracing::warn!(%kind, "no verifying key");
            return false;
        };
        let Ok(decoded) = ark_groth16::Proof::<Bn254>::deserialize_compressed(&proof.bytes[..]) else {
            return false;
        };
        Groth16::<Bn254>::verify_with_processed_vk(&entry.pvk, public_inputs, &decoded).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_relations::r1cs::ConstraintSystem;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_adapter_satisfied() {
        let mut rng = ChaCha20Rng::seed_from_u64(600);
        let statement = circuits::sample(CircuitKind::Transfer, &mut rng).unwrap();
        let (circuit, witness) = statement.build().unwrap();

        let cs = ConstraintSystem::<Fr>::new_ref();
        R1csAdapter::prove(&circuit, &witness)
            .generate_constraints(cs.clone())
            .unwrap();
        assert!(cs.is_satisfied().unwrap());
        assert_eq!(cs.num_instance_variables(), 1 + circuit.num_public());
        assert_eq!(cs.num_constraints(), circuit.num_rows());
    }

    #[test]
    fn test_adapter_detects_tampering() {
        let mut rng = ChaCha20Rng::seed_from_u64(601);
        let statement = circuits::sample(CircuitKind::Draw, &mut rng).unwrap();
        let (circuit, mut witness) = statement.build().unwrap();
        let last = witness.public[3];
        witness.set(last, witness.get(last) + Fr::from(1u64));

        let cs = ConstraintSystem::<Fr>::new_ref();
        R1csAdapter::prove(&circuit, &witness)
            .generate_constraints(cs.clone())
            .unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_missing_key() {
        let mut rng = ChaCha20Rng::seed_from_u64(602);
        let statement = circuits::sample(CircuitKind::Transfer, &mut rng).unwrap();
        let backend = Groth16Backend::new();
        assert_eq!(
            backend.prove_statement(statement.as_ref()),
            Err(CircuitError::MissingKey("transfer"))
        );
    }

    #[test]
    #[ignore = "groth16 setup for a full statement is slow in debug builds"]
    fn test_groth16_roundtrip() {
        let mut rng = ChaCha20Rng::seed_from_u64(603);
        let backend = Groth16Backend::new();
        backend.setup(CircuitKind::Transfer, &mut rng).unwrap();
        let statement = circuits::sample(CircuitKind::Transfer, &mut rng).unwrap();
        let proof = backend.prove_statement(statement.as_ref()).unwrap();
        let inputs = statement.public_inputs();
        assert!(backend.verify(CircuitKind::Transfer, &inputs, &proof));

        let mut tampered = inputs.clone();
        tampered[0] += Fr::from(1u64);
        assert!(!backend.verify(CircuitKind::Transfer, &tampered, &proof));
    }
}
