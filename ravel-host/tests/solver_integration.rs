//! End-to-end tests: channels and coordinator against a real solver
//! module, through the public API only.

mod common;

use common::{fixture_wasm, TRAP_SELECTOR};
use parking_lot::Mutex;
use ravel_host::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn fixture_runtime() -> Arc<SolverRuntime> {
    Arc::new(SolverRuntime::new(RuntimeConfig::testing()).expect("runtime creation"))
}

#[derive(Default)]
struct RecordingSink {
    settled: Mutex<Vec<(Arm, Outcome)>>,
    all_settled_count: AtomicUsize,
}

impl Sink for RecordingSink {
    fn arm_settled(&self, arm: Arm, outcome: &Outcome) {
        self.settled.lock().push((arm, outcome.clone()));
    }

    fn all_settled(&self) {
        self.all_settled_count.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn channel_reports_success_and_failure() {
    let channel = Channel::spawn(fixture_runtime(), fixture_wasm(), ChannelConfig::new("only"))
        .expect("spawn");

    assert_eq!(
        channel.invoke(Selector::new(0), "abc").await.unwrap(),
        Outcome::Success("3".to_string())
    );
    assert_eq!(
        channel.invoke(Selector::new(0), "").await.unwrap(),
        Outcome::Failure("empty input".to_string())
    );

    channel.shutdown();
}

#[tokio::test]
async fn channel_serializes_a_burst_of_requests() {
    let channel = Channel::spawn(
        fixture_runtime(),
        fixture_wasm(),
        ChannelConfig::new("burst").with_queue_depth(4),
    )
    .expect("spawn");

    let inputs = ["a", "ab", "abc", "abcd", "abcde"];
    let futures: Vec<_> = inputs
        .iter()
        .map(|input| channel.invoke(Selector::new(1), *input))
        .collect();
    let outcomes = futures::future::join_all(futures).await;

    for (input, outcome) in inputs.iter().zip(outcomes) {
        assert_eq!(
            outcome.unwrap(),
            Outcome::Success(input.len().to_string()),
            "wrong result for input {input:?}"
        );
    }

    channel.shutdown();
}

#[tokio::test]
async fn arms_run_on_independent_instances() {
    // Both channels are driven from the same module bytes but must not
    // share memory: a trap on one never disturbs the other.
    let coordinator = Coordinator::for_module(fixture_runtime(), fixture_wasm()).expect("build");

    // Puzzle 3 fans out to selectors 6 and 7; 7 traps its instance.
    let sink = RecordingSink::default();
    let pair = coordinator
        .solve_pair(PuzzleIndex::new(3), "abcde", &sink)
        .await
        .expect("dispatch");
    assert_eq!(pair.first, Outcome::Success("5".to_string()));
    assert!(pair.second.is_fault());

    // Both channels keep answering afterwards.
    let pair = coordinator
        .solve_pair(PuzzleIndex::new(1), "ab", &sink)
        .await
        .expect("dispatch after trap");
    assert_eq!(pair.first, Outcome::Success("2".to_string()));
    assert_eq!(pair.second, Outcome::Success("2".to_string()));

    assert_eq!(sink.all_settled_count.load(Ordering::SeqCst), 2);
    coordinator.shutdown();
}

#[tokio::test]
async fn dual_dispatch_updates_sinks_independently() {
    let coordinator = Coordinator::for_module(fixture_runtime(), fixture_wasm()).expect("build");
    let mut busy = coordinator.busy();
    let sink = RecordingSink::default();

    // Puzzle 2 fans out to selectors 4 and 5; the fixture rejects 4.
    let pair = coordinator
        .solve_pair(PuzzleIndex::new(2), "abc", &sink)
        .await
        .expect("dispatch");

    assert_eq!(
        pair.first,
        Outcome::Failure("selector 4 rejected".to_string())
    );
    assert_eq!(pair.second, Outcome::Success("3".to_string()));

    let settled = sink.settled.lock();
    assert_eq!(settled.len(), 2, "each arm settles exactly once");
    drop(settled);
    assert_eq!(sink.all_settled_count.load(Ordering::SeqCst), 1);
    assert!(!*busy.borrow_and_update(), "busy cleared after settlement");

    coordinator.shutdown();
}

#[tokio::test]
async fn trap_selector_faults_single_variant() {
    let coordinator = Coordinator::for_module(fixture_runtime(), fixture_wasm()).expect("build");

    let outcome = coordinator.solve(Selector::new(TRAP_SELECTOR), "abc").await;
    assert!(outcome.is_fault());
    assert!(outcome.message().contains("E003"), "fault carries the trap code");

    // Same channel, next invocation still works.
    let outcome = coordinator.solve(Selector::new(0), "abcd").await;
    assert_eq!(outcome, Outcome::Success("4".to_string()));

    coordinator.shutdown();
}
