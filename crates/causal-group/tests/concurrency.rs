//! Multi-threaded use of causal groups.

use std::sync::{Arc, Barrier};
use std::thread;

use causal_group::causal_types::RejectReason;
use causal_group::mocks::{MockActivation, MockSpike};
use causal_group::CausalGroup;

const THREADS: usize = 8;
const ROUNDS: usize = 200;

#[test]
fn contending_threads_leave_balanced_refcounts() {
    let group = CausalGroup::new(["p1", "p2"]);
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|i| {
            let group = group.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let spike = MockSpike::new(format!("s{i}"), &group).handle();
                let act = MockActivation::builder(format!("a{i}"))
                    .resources(["p1", "p2"])
                    .signals(["done"])
                    .specificity(i as f64)
                    .build();
                barrier.wait();
                for _ in 0..ROUNDS {
                    assert!(act.acquire(&spike, false));
                    let _ = group.lock().consent(&act.handle());
                    assert!(act.release(&spike, RejectReason::Dereferenced));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let guard = group.lock();
    let snapshot = guard.snapshot();
    assert!(snapshot.is_unreferenced());
    assert!(snapshot.causes.is_empty());
    assert!(guard.check_reference_sanity());
}

#[test]
fn merge_while_other_threads_use_the_merged_away_group() {
    let survivor = CausalGroup::new(["p1"]);
    let merged = CausalGroup::new(["p1"]);
    let barrier = Arc::new(Barrier::new(THREADS + 1));

    let workers: Vec<_> = (0..THREADS)
        .map(|i| {
            let merged = merged.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let spike = MockSpike::new(format!("s{i}"), &merged).handle();
                let act = MockActivation::builder(format!("a{i}"))
                    .resources(["p1"])
                    .build();
                barrier.wait();
                for _ in 0..ROUNDS {
                    assert!(act.acquire(&spike, false));
                    assert!(act.release(&spike, RejectReason::Dereferenced));
                }
                // Keep one reference alive across the merge.
                assert!(act.acquire(&spike, false));
                (spike, act)
            })
        })
        .collect();

    barrier.wait();
    survivor.lock().merge(&merged);

    let held: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    assert_eq!(survivor, merged);

    let guard = merged.lock();
    for (spike, act) in &held {
        assert_eq!(guard.refcount("p1", spike, &act.handle()), 1);
    }
    assert_eq!(guard.snapshot().total_refs(), THREADS as u64);
    assert!(guard.check_reference_sanity());
}

#[test]
fn waiter_on_merged_away_lock_retries_on_the_survivor() {
    let survivor = CausalGroup::new(["p1"]);
    let merged = CausalGroup::new(["p1"]);
    let act = MockActivation::builder("x").resources(["p1"]).build();

    let held = merged.lock();
    let waiter = {
        let merged = merged.clone();
        let act = act.clone();
        thread::spawn(move || {
            // Blocks on the old identity until `held` is released.
            let guard = merged.lock();
            guard.activated(&act.handle());
            guard.id()
        })
    };
    survivor.lock().merge(&merged);
    drop(held);

    let seen = waiter.join().unwrap();
    assert_eq!(seen, survivor.id());
    assert!(survivor.lock().available_resources().is_empty());
}

#[test]
fn groups_are_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<CausalGroup>();
    assert_send_sync::<MockActivation>();
    assert_send_sync::<MockSpike>();
}
