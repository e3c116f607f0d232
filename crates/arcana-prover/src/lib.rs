//! Background proving service for arcana statements
//!
//! Proof generation is CPU-bound and embarrassingly parallel. This crate
//! schedules it off the async runtime with a bounded number of concurrent
//! jobs, lets callers cancel jobs they no longer need, and proves batches of
//! independent statements on the rayon pool.
//!
//! ```no_run
//! use arcana_circuit::{circuits::sample, AttestationBackend, CircuitKind};
//! use arcana_prover::{ProverConfig, ProverService};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut rng = rand::thread_rng();
//! let service = ProverService::new(AttestationBackend::random(&mut rng), &ProverConfig::default());
//! let job = service.submit(sample(CircuitKind::Shuffle, &mut rng)?);
//! let proof = job.wait().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod service;

pub use config::{Backend, BackendKind, ProverConfig};
pub use error::{ConfigError, ProverError, Result};
pub use service::{ProofJob, ProverService};
