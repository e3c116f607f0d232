//! proof system seam
//!
//! the ledger only ever asks `verify(kind, public_inputs, proof) -> bool`.
//! two backends sit behind these traits:
//!
//! - [`AttestationBackend`]: a trusted prover that checks the witness
//!   against every constraint and then MACs `(kind, public inputs)` with a
//!   shared key. useful for local development and tests, no setup needed.
//! - [`crate::groth16::Groth16Backend`]: groth16 over bn254 with per-circuit
//!   keys (feature `groth16`).

use blake2::{
    digest::{KeyInit, Mac},
    Blake2sMac256,
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::circuits::{CircuitKind, Statement};
use crate::constraint::{Circuit, Witness};
use crate::field::{self, Fr};
use crate::{CircuitError, Result};

/// an opaque proof tagged with the statement it is for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub kind: CircuitKind,
    #[serde(with = "hex::serde")]
    pub bytes: Vec<u8>,
}

impl Proof {
    pub fn new(kind: CircuitKind, bytes: Vec<u8>) -> Self {
        Self { kind, bytes }
    }
}

/// produces proofs for satisfied circuits
pub trait ProofSystem: Send + Sync {
    fn prove(&self, kind: CircuitKind, circuit: &Circuit, witness: &Witness) -> Result<Proof>;

    /// build, check and prove a statement
    fn prove_statement(&self, statement: &dyn Statement) -> Result<Proof> {
        let (circuit, witness) = statement.build()?;
        self.prove(statement.kind(), &circuit, &witness)
    }
}

/// checks proofs against public inputs
pub trait Verifier: Send + Sync {
    fn verify(&self, kind: CircuitKind, public_inputs: &[Fr], proof: &Proof) -> bool;
}

impl<T: ProofSystem + ?Sized> ProofSystem for std::sync::Arc<T> {
    fn prove(&self, kind: CircuitKind, circuit: &Circuit, witness: &Witness) -> Result<Proof> {
        (**self).prove(kind, circuit, witness)
    }
}

impl<T: Verifier + ?Sized> Verifier for std::sync::Arc<T> {
    fn verify(&self, kind: CircuitKind, public_inputs: &[Fr], proof: &Proof) -> bool {
        (**self).verify(kind, public_inputs, proof)
    }
}

const ATTESTATION_DOMAIN: &[u8] = b"arcana.attestation.v1";

/// keyed attestation backend (trusted prover)
#[derive(Clone)]
pub struct AttestationBackend {
    key: [u8; 32],
}

impl core::fmt::Debug for AttestationBackend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AttestationBackend").finish_non_exhaustive()
    }
}

impl AttestationBackend {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut key = [0u8; 32];
        rng.fill_bytes(&mut key);
        Self::new(key)
    }

    fn mac(&self, kind: CircuitKind, public_inputs: &[Fr]) -> Blake2sMac256 {
        let mut mac = <Blake2sMac256 as KeyInit>::new(&self.key.into());
        mac.update(ATTESTATION_DOMAIN);
        mac.update(&[kind.tag()]);
        mac.update(&(public_inputs.len() as u32).to_le_bytes());
        for x in public_inputs {
            mac.update(&field::to_bytes(x));
        }
        mac
    }
}

impl ProofSystem for AttestationBackend {
    fn prove(&self, kind: CircuitKind, circuit: &Circuit, witness: &Witness) -> Result<Proof> {
        circuit.check(witness)?;
        let public = witness.public_inputs();
        if public.len() != kind.num_public() {
            return Err(CircuitError::Backend(format!(
                "{kind} expects {} public inputs, circuit has {}",
                kind.num_public(),
                public.len()
            )));
        }
        let tag = self.mac(kind, &public).finalize().into_bytes();
        tracing::debug!(%kind, "attestation issued");
        Ok(Proof::new(kind, tag.to_vec()))
    }
}

impl Verifier for AttestationBackend {
    fn verify(&self, kind: CircuitKind, public_inputs: &[Fr], proof: &Proof) -> bool {
        if proof.kind != kind || public_inputs.len() != kind.num_public() {
            return false;
        }
        self.mac(kind, public_inputs).verify_slice(&proof.bytes).is_ok()
    }
}
