//! Cancelling a walk stops its producer within a bounded amount of work.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::query::{steps, walk};
use crate::testing::hub_graph;

const FANOUT: usize = 1000;
const BUFFER: usize = 1;

#[tokio::test]
async fn test_cancel_bounds_emission() {
    let graph = hub_graph("hub", FANOUT, BUFFER);
    let explored = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&explored);

    let mut w = walk(
        &graph,
        "hub",
        vec![steps::out("p").inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })],
    );
    assert!(w.next_path().await.is_some());
    assert!(w.next_path().await.is_some());

    let outcome = w.finish().await;

    assert!(!outcome.completed);
    // Two received, up to BUFFER queued, one blocked in send when cancelled.
    let bound = 2 + BUFFER as u64 + 1;
    assert!(outcome.emitted <= bound, "emitted {}", outcome.emitted);
    assert!(explored.load(Ordering::SeqCst) <= bound + 1);
}

#[tokio::test]
async fn test_collect_up_to_cancels() {
    let graph = hub_graph("hub", FANOUT, BUFFER);
    let paths = walk(&graph, "hub", vec![steps::all_out()])
        .collect_up_to(3)
        .await;
    assert_eq!(paths.len(), 3);
}

#[tokio::test]
async fn test_dropping_walk_cancels() {
    let graph = hub_graph("hub", FANOUT, BUFFER);
    let mut w = walk(&graph, "hub", vec![steps::all_out()]);
    assert!(w.next_path().await.is_some());
    drop(w);

    // The producer stops; a new walk still sees the whole store.
    let all = walk(&graph, "hub", vec![steps::all_out()]).collect().await;
    assert_eq!(all.len(), FANOUT);
}
