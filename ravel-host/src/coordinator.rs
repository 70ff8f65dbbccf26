//! Dispatch coordinator: fan one request out to two channels.
//!
//! The coordinator owns two [`Channel`]s and turns one logical request
//! (a [`PuzzleIndex`] plus input text) into two concurrent invocations
//! with selectors `2*i` and `2*i + 1`. Each arm reports to the
//! [`Sink`] the moment it settles, in whichever order the arms finish;
//! [`Sink::all_settled`] fires exactly once after both, regardless of
//! their outcomes, and only then does the busy flag clear.
//!
//! There is no retry, no cancellation, and no timeout: an arm, once
//! dispatched, runs to a settled outcome (`Fault` included).

use crate::channel::{Channel, ChannelConfig};
use crate::runtime::SolverRuntime;
use ravel_core::{Arm, Outcome, PuzzleIndex, RavelError, Result, Selector};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Receives per-arm settlement notifications.
///
/// This is the seam toward the UI layer: one sink per request, with
/// `arm_settled` called once per arm and `all_settled` once per
/// request. Calls arrive from the coordinator's task, never
/// concurrently.
pub trait Sink: Send + Sync {
    /// One arm has settled; its outcome will not change.
    fn arm_settled(&self, arm: Arm, outcome: &Outcome);

    /// Both arms have settled. Fired exactly once, after the last
    /// `arm_settled`, regardless of individual outcomes.
    fn all_settled(&self);
}

/// A sink that ignores all notifications.
pub struct NullSink;

impl Sink for NullSink {
    fn arm_settled(&self, _arm: Arm, _outcome: &Outcome) {}
    fn all_settled(&self) {}
}

/// The settled outcomes of both arms of one dual dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairOutcome {
    /// Outcome of the even-selector arm.
    pub first: Outcome,
    /// Outcome of the odd-selector arm.
    pub second: Outcome,
}

impl PairOutcome {
    /// Whether both arms reported success.
    #[must_use]
    pub fn all_success(&self) -> bool {
        self.first.is_success() && self.second.is_success()
    }
}

/// Drives one or two marshaling channels for the caller.
pub struct Coordinator {
    first: Channel,
    second: Channel,
    busy_tx: watch::Sender<bool>,
    in_flight: AtomicBool,
}

impl Coordinator {
    /// Create a coordinator over two already-spawned channels.
    pub fn new(first: Channel, second: Channel) -> Self {
        let (busy_tx, _) = watch::channel(false);
        Self {
            first,
            second,
            busy_tx,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Spawn two channels for the same module bytes and wrap them.
    ///
    /// Both channels share the runtime's engine and compilation cache
    /// but get fully independent instances and linear memories.
    pub fn for_module(runtime: Arc<SolverRuntime>, wasm_bytes: Vec<u8>) -> Result<Self> {
        let first = Channel::spawn(
            Arc::clone(&runtime),
            wasm_bytes.clone(),
            ChannelConfig::new("first"),
        )?;
        let second = Channel::spawn(runtime, wasm_bytes, ChannelConfig::new("second"))?;
        Ok(Self::new(first, second))
    }

    /// Observe the busy flag.
    ///
    /// `true` from dispatch until both arms of the request have
    /// settled. The UI layer uses this to disable controls.
    pub fn busy(&self) -> watch::Receiver<bool> {
        self.busy_tx.subscribe()
    }

    /// Single-channel variant: run one selector and settle the result.
    ///
    /// Traps and transport failures settle as [`Outcome::Fault`].
    pub async fn solve(&self, selector: Selector, input: &str) -> Outcome {
        settle(self.first.invoke(selector, input).await)
    }

    /// Dual dispatch: run both parts of a puzzle concurrently.
    ///
    /// Returns [`RavelError::CoordinatorBusy`] if a dispatch is
    /// already in flight; at most one logical request runs at a time.
    pub async fn solve_pair(
        &self,
        index: PuzzleIndex,
        input: &str,
        sink: &dyn Sink,
    ) -> Result<PairOutcome> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return Err(RavelError::CoordinatorBusy);
        }
        self.busy_tx.send_replace(true);
        // Clears the flags on every exit, including a caller dropping
        // this future mid-flight.
        let _reset = BusyGuard { coordinator: self };

        let (first_selector, second_selector) = index.parts();
        tracing::debug!(
            %index,
            %first_selector,
            %second_selector,
            "dispatching dual solve"
        );

        let first_arm = async {
            let outcome = settle(self.first.invoke(first_selector, input).await);
            sink.arm_settled(Arm::First, &outcome);
            outcome
        };
        let second_arm = async {
            let outcome = settle(self.second.invoke(second_selector, input).await);
            sink.arm_settled(Arm::Second, &outcome);
            outcome
        };

        // Settle-tracking join: waits for both arms no matter how
        // either of them ends.
        let (first, second) = tokio::join!(first_arm, second_arm);

        sink.all_settled();

        Ok(PairOutcome { first, second })
    }

    /// Shut down both channels, draining queued jobs first.
    pub fn shutdown(self) {
        self.first.shutdown();
        self.second.shutdown();
    }
}

/// Resets the coordinator's dispatch state when dropped.
///
/// Held across the whole of `solve_pair`, so the busy flag and the
/// in-flight slot are released after `all_settled` fires, and also
/// when the dispatch future is dropped before settling.
struct BusyGuard<'a> {
    coordinator: &'a Coordinator,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.busy_tx.send_replace(false);
        self.coordinator.in_flight.store(false, Ordering::Release);
    }
}

/// Collapse a host error into a settled fault at the arm boundary.
fn settle(result: Result<Outcome>) -> Outcome {
    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(error = %e, code = e.code(), "arm settled as fault");
            Outcome::from(e)
        }
    }
}
