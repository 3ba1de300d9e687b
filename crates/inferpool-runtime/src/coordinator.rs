use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use inferpool_core::{BackendModel, IOName, ModelSignature, Tensor, TensorSpec};
use tracing::{debug, info, warn};

use crate::{ContextPool, InferError, InferenceRequest, InferenceResult, SetupError, Timings};

/// Joint sizing of the outer worker pool and the context pool.
///
/// The worker count and the model's intra-call thread budget are validated
/// together at construction: nested parallelism (workers x intra-op threads
/// beyond the host's units) is rejected outright, while an outer pool that
/// alone exceeds the units is allowed with a warning, since callers may
/// deliberately oversize it to hide latency.
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    pub workers: usize,
    pub contexts: usize,
    pub acquire_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        let workers = available_units();
        Self {
            workers,
            contexts: workers,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

impl CoordinatorConfig {
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            contexts: workers,
            ..Self::default()
        }
    }

    fn validate(&self, intra_threads: usize) -> Result<(), SetupError> {
        if self.workers == 0 {
            return Err(SetupError::NoWorkers);
        }
        if self.contexts == 0 {
            return Err(SetupError::NoContexts);
        }

        let available = available_units();
        if intra_threads > 1 && self.workers * intra_threads > available {
            return Err(SetupError::Oversubscribed {
                workers: self.workers,
                intra_threads,
                available,
            });
        }
        if self.workers > available {
            warn!(
                workers = self.workers,
                available, "worker pool exceeds available execution units"
            );
        }

        Ok(())
    }
}

fn available_units() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// A context wait is worth flagging once it burns half the acquire budget.
fn wait_is_slow(waited: Duration, timeout: Duration) -> bool {
    waited >= timeout / 2
}

/// Top-level inference API over one shared, immutable model handle.
pub struct Coordinator<M: BackendModel> {
    model: Arc<M>,
    pool: ContextPool<M::Context>,
    workers: usize,
    acquire_timeout: Duration,
}

impl<M: BackendModel> Coordinator<M> {
    pub fn new(model: M, config: CoordinatorConfig) -> Result<Self, SetupError> {
        config.validate(model.provider().intra_threads())?;

        let mut contexts = Vec::with_capacity(config.contexts);
        for _ in 0..config.contexts {
            contexts.push(model.create_context()?);
        }

        info!(
            workers = config.workers,
            contexts = config.contexts,
            "coordinator ready"
        );

        Ok(Self {
            model: Arc::new(model),
            pool: ContextPool::new(contexts),
            workers: config.workers,
            acquire_timeout: config.acquire_timeout,
        })
    }

    pub fn signature(&self) -> &ModelSignature {
        self.model.signature()
    }

    pub fn input_signature(&self) -> &[TensorSpec] {
        &self.model.signature().inputs
    }

    pub fn output_signature(&self) -> &[TensorSpec] {
        &self.model.signature().outputs
    }

    /// Run a single request: validate, acquire a context, execute, release.
    /// Validation always precedes dispatch; the context goes back to the
    /// pool on every exit path via the guard.
    pub fn run_one(&self, request: &InferenceRequest) -> Result<InferenceResult, InferError> {
        self.model.signature().validate_inputs(&request.inputs)?;

        let queued_at = Instant::now();
        let mut ctx = self.pool.acquire(self.acquire_timeout)?;
        let waited = queued_at.elapsed();
        if wait_is_slow(waited, self.acquire_timeout) {
            warn!(
                waited_us = waited.as_micros() as u64,
                timeout_us = self.acquire_timeout.as_micros() as u64,
                "slow context acquisition"
            );
        }
        let queued_us = waited.as_micros() as u64;

        let inputs = self.ordered_inputs(request);
        let started = Instant::now();
        let outputs = self.model.execute(&mut ctx, inputs)?;
        let backend_us = started.elapsed().as_micros() as u64;

        Ok(InferenceResult {
            outputs,
            timings: Timings {
                queued_us,
                backend_us,
            },
        })
    }

    /// Run a batch across the fixed worker pool. Workers claim the next
    /// unassigned index from a shared counter and write the outcome into
    /// that index's pre-allocated slot, so `result[i]` corresponds to
    /// `batch[i]` no matter which worker finishes first. A failed slot
    /// holds its error; siblings are unaffected.
    pub fn run_batch(&self, batch: &[InferenceRequest]) -> Vec<Result<InferenceResult, InferError>> {
        if batch.is_empty() {
            return Vec::new();
        }

        let workers = self.workers.min(batch.len());
        debug!(batch = batch.len(), workers, "dispatching batch");

        let slots: Vec<OnceLock<Result<InferenceResult, InferError>>> =
            (0..batch.len()).map(|_| OnceLock::new()).collect();
        let next = AtomicUsize::new(0);

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    if index >= batch.len() {
                        break;
                    }
                    let outcome = self.run_one(&batch[index]);
                    let _ = slots[index].set(outcome);
                });
            }
        });

        slots
            .into_iter()
            .map(|slot| {
                slot.into_inner()
                    .expect("every batch slot is filled before the workers join")
            })
            .collect()
    }

    /// Reorder validated request inputs into signature order for the
    /// backend. Validation guarantees every signature input is present
    /// exactly once.
    fn ordered_inputs(&self, request: &InferenceRequest) -> Vec<(IOName, Tensor)> {
        self.model
            .signature()
            .inputs
            .iter()
            .filter_map(|spec| {
                request
                    .inputs
                    .iter()
                    .find(|(name, _)| name == &spec.name)
                    .map(|(name, tensor)| (name.clone(), tensor.clone()))
            })
            .collect()
    }
}
