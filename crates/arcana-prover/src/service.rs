//! background proving
//!
//! jobs queue on a semaphore sized to the worker count and run synthesis and
//! proving on the blocking pool, so shuffle proofs never stall the async
//! runtime. cancellation is cooperative: a job cancelled before it gets a
//! worker never runs, one cancelled mid-proof finishes and its proof is
//! dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use arcana_circuit::{CircuitKind, Proof, ProofSystem, Statement};
use rayon::prelude::*;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::config::ProverConfig;
use crate::error::{ProverError, Result};

pub struct ProverService<P> {
    backend: Arc<P>,
    permits: Arc<Semaphore>,
    workers: usize,
    next_id: AtomicU64,
}

impl<P: ProofSystem + 'static> ProverService<P> {
    pub fn new(backend: P, config: &ProverConfig) -> Self {
        Self::with_backend(Arc::new(backend), config)
    }

    pub fn with_backend(backend: Arc<P>, config: &ProverConfig) -> Self {
        let workers = config.workers.max(1);
        Self {
            backend,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
            next_id: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> &Arc<P> {
        &self.backend
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// queue a statement; must be called inside a tokio runtime
    pub fn submit<S: Statement + 'static>(&self, statement: S) -> ProofJob {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let kind = statement.kind();
        let cancelled = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(run_job(
            id,
            Arc::new(statement),
            self.backend.clone(),
            self.permits.clone(),
            cancelled.clone(),
        ));
        tracing::debug!(job = id, %kind, "job queued");
        ProofJob {
            id,
            kind,
            cancelled,
            handle,
        }
    }

    /// prove independent statements on the rayon pool, blocking the caller
    pub fn prove_batch(&self, statements: &[Box<dyn Statement>]) -> Vec<Result<Proof>> {
        statements
            .par_iter()
            .map(|statement| {
                self.backend
                    .prove_statement(statement.as_ref())
                    .map_err(ProverError::from)
            })
            .collect()
    }

    /// refuse new work; queued jobs fail with `Closed`
    pub fn close(&self) {
        self.permits.close();
    }
}

async fn run_job<S, P>(
    id: u64,
    statement: Arc<S>,
    backend: Arc<P>,
    permits: Arc<Semaphore>,
    cancelled: Arc<AtomicBool>,
) -> Result<Proof>
where
    S: Statement + 'static,
    P: ProofSystem + 'static,
{
    let permit = permits.acquire_owned().await.map_err(|_| ProverError::Closed)?;
    if cancelled.load(Ordering::Acquire) {
        tracing::debug!(job = id, "cancelled before start");
        return Err(ProverError::Cancelled);
    }

    let kind = statement.kind();
    tracing::debug!(job = id, %kind, "proving");
    let result = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        backend.prove_statement(&*statement)
    })
    .await
    .map_err(|e| ProverError::Worker(e.to_string()))?;

    if cancelled.load(Ordering::Acquire) {
        tracing::debug!(job = id, "cancelled while running, proof dropped");
        return Err(ProverError::Cancelled);
    }
    match &result {
        Ok(proof) => tracing::info!(job = id, %kind, bytes = proof.bytes.len(), "proof ready"),
        Err(e) => tracing::warn!(job = id, %kind, error = %e, "proving failed"),
    }
    Ok(result?)
}

/// handle to a queued proof
pub struct ProofJob {
    id: u64,
    kind: CircuitKind,
    cancelled: Arc<AtomicBool>,
    handle: JoinHandle<Result<Proof>>,
}

impl ProofJob {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> CircuitKind {
        self.kind
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn wait(self) -> Result<Proof> {
        self.handle
            .await
            .map_err(|e| ProverError::Worker(e.to_string()))?
    }
}

impl core::fmt::Debug for ProofJob {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProofJob")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
