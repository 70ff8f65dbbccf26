//! Marshaling channel: one module instance on one worker thread.
//!
//! A [`Channel`] owns a dedicated OS thread; the solver instance is
//! created lazily on that thread when the first job arrives and is
//! reused for every job after it. Callers talk to the worker through a
//! bounded job queue and get their answer over a oneshot reply, so an
//! `invoke` suspends without ever blocking the caller's thread.
//!
//! Invocations on one channel are strictly serialized by the queue:
//! requests issued back-to-back are answered in order, each with its
//! own result. Nothing is dropped, and nothing is multiplexed.

use crate::instance::SolverInstance;
use crate::runtime::SolverRuntime;
use parking_lot::Mutex;
use ravel_core::{Outcome, RavelError, Result, Selector};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};

/// Default depth of the per-channel job queue.
const DEFAULT_QUEUE_DEPTH: usize = 8;

/// Configuration for a marshaling channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Channel name, used for the worker thread and log correlation.
    pub name: String,
    /// Maximum number of queued jobs before senders are backpressured.
    pub queue_depth: usize,
}

impl ChannelConfig {
    /// Create a configuration with the given channel name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }

    /// Set the job queue depth.
    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth.max(1);
        self
    }
}

/// One queued invocation.
struct Job {
    selector: Selector,
    input: String,
    reply: oneshot::Sender<Result<Outcome>>,
}

/// A marshaling channel wrapping one solver module instance.
pub struct Channel {
    name: String,
    job_tx: mpsc::Sender<Job>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Channel {
    /// Spawn a channel for the given module bytes.
    ///
    /// The worker thread starts immediately but the module is neither
    /// compiled nor instantiated until the first job arrives; a failed
    /// initialization is reported to that job and retried on the next.
    pub fn spawn(
        runtime: Arc<SolverRuntime>,
        wasm_bytes: Vec<u8>,
        config: ChannelConfig,
    ) -> Result<Self> {
        let (job_tx, job_rx) = mpsc::channel(config.queue_depth);
        let name = config.name.clone();
        let thread_name = format!("ravel-{name}");
        let worker = std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || worker_loop(runtime, wasm_bytes, config.name, job_rx))
            .map_err(|e| RavelError::ChannelClosed {
                channel: format!("{name}: failed to spawn worker: {e}"),
            })?;

        Ok(Self {
            name,
            job_tx,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Run one computation on this channel's module instance.
    ///
    /// Suspends at two points: queue admission (backpressure when the
    /// queue is full) and the worker's reply. A dead worker surfaces
    /// as [`RavelError::ChannelClosed`] rather than hanging forever.
    pub async fn invoke(&self, selector: Selector, input: impl Into<String>) -> Result<Outcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = Job {
            selector,
            input: input.into(),
            reply: reply_tx,
        };

        self.job_tx
            .send(job)
            .await
            .map_err(|_| RavelError::ChannelClosed {
                channel: self.name.clone(),
            })?;

        reply_rx.await.map_err(|_| RavelError::ChannelClosed {
            channel: self.name.clone(),
        })?
    }

    /// The channel's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Close the job queue and wait for the worker to drain and exit.
    pub fn shutdown(self) {
        let Self {
            name,
            job_tx,
            worker,
        } = self;
        drop(job_tx);
        if let Some(handle) = worker.into_inner() {
            if handle.join().is_err() {
                tracing::error!(channel = %name, "channel worker panicked");
            }
        }
    }

    /// A channel whose worker is already gone, for transport-failure
    /// paths.
    #[cfg(test)]
    pub(crate) fn dead(name: impl Into<String>) -> Self {
        let (job_tx, job_rx) = mpsc::channel(1);
        drop(job_rx);
        Self {
            name: name.into(),
            job_tx,
            worker: Mutex::new(None),
        }
    }
}

/// Worker loop: drain jobs, lazily holding the one instance.
fn worker_loop(
    runtime: Arc<SolverRuntime>,
    wasm_bytes: Vec<u8>,
    name: String,
    mut job_rx: mpsc::Receiver<Job>,
) {
    let mut instance: Option<SolverInstance> = None;

    while let Some(job) = job_rx.blocking_recv() {
        let inst = match ensure_instance(&mut instance, &runtime, &wasm_bytes, &name) {
            Ok(inst) => inst,
            Err(e) => {
                tracing::error!(channel = %name, error = %e, "solver initialization failed");
                let _ = job.reply.send(Err(e));
                continue;
            }
        };

        let result = inst.invoke(job.selector, &job.input);
        if let Err(e) = &result {
            tracing::warn!(channel = %name, selector = %job.selector, error = %e, "invocation failed");
        }
        // A dropped receiver means the caller went away; the result is
        // simply discarded.
        let _ = job.reply.send(result);
    }

    tracing::debug!(channel = %name, "channel worker exiting");
}

/// Create the instance on first use; reuse it afterwards.
fn ensure_instance<'a>(
    slot: &'a mut Option<SolverInstance>,
    runtime: &SolverRuntime,
    wasm_bytes: &[u8],
    name: &str,
) -> Result<&'a mut SolverInstance> {
    if slot.is_none() {
        let module = runtime.compile(name, wasm_bytes)?;
        *slot = Some(SolverInstance::new(runtime, &module, name)?);
    }
    Ok(slot.as_mut().expect("instance just initialized"))
}
