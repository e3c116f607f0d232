//! prover configuration and backend selection

use std::path::Path;

use arcana_circuit::{
    AttestationBackend, Circuit, CircuitKind, Fr, Proof, ProofSystem, Verifier, Witness,
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Attestation,
    Groth16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProverConfig {
    /// concurrent proving jobs
    pub workers: usize,
    pub backend: BackendKind,
    /// hex, 32 bytes; a random key is used when absent
    pub attestation_key: Option<String>,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
            backend: BackendKind::default(),
            attestation_key: None,
        }
    }
}

impl ProverConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1"));
        }
        if let Some(key) = &self.attestation_key {
            parse_key(key)?;
        }
        Ok(())
    }

    /// instantiate the configured backend (groth16 runs setup for every circuit)
    pub fn build_backend<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<Backend, ConfigError> {
        match self.backend {
            BackendKind::Attestation => {
                let backend = match &self.attestation_key {
                    Some(key) => AttestationBackend::new(parse_key(key)?),
                    None => AttestationBackend::random(rng),
                };
                Ok(Backend::Attestation(backend))
            }
            #[cfg(feature = "groth16")]
            BackendKind::Groth16 => {
                let backend = arcana_circuit::Groth16Backend::new();
                backend.setup_all(rng)?;
                Ok(Backend::Groth16(std::sync::Arc::new(backend)))
            }
            #[cfg(not(feature = "groth16"))]
            BackendKind::Groth16 => Err(ConfigError::Invalid("built without the groth16 feature")),
        }
    }
}

fn parse_key(key: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = hex::decode(key).map_err(|_| ConfigError::Invalid("attestation key is not hex"))?;
    bytes
        .try_into()
        .map_err(|_| ConfigError::Invalid("attestation key must be 32 bytes"))
}

/// a backend picked at runtime
#[derive(Debug, Clone)]
pub enum Backend {
    Attestation(AttestationBackend),
    #[cfg(feature = "groth16")]
    Groth16(std::sync::Arc<arcana_circuit::Groth16Backend>),
}

impl ProofSystem for Backend {
    fn prove(&self, kind: CircuitKind, circuit: &Circuit, witness: &Witness) -> arcana_circuit::Result<Proof> {
        match self {
            Backend::Attestation(b) => b.prove(kind, circuit, witness),
            #[cfg(feature = "groth16")]
            Backend::Groth16(b) => b.prove(kind, circuit, witness),
        }
    }
}

impl Verifier for Backend {
    fn verify(&self, kind: CircuitKind, public_inputs: &[Fr], proof: &Proof) -> bool {
        match self {
            Backend::Attestation(b) => b.verify(kind, public_inputs, proof),
            #[cfg(feature = "groth16")]
            Backend::Groth16(b) => b.verify(kind, public_inputs, proof),
        }
    }
}
