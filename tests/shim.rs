// SPDX-License-Identifier: MIT OR Apache-2.0

mod support;

use guided_executor::future::make_ready_future;
use guided_executor::hint::domain_hint;
use guided_executor::{
    ExecutorConfig, GuidedExecutorShim, SubmissionState, TaskFuture, ThreadPriority,
    register_pool, unregister_pool,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use support::{Counting, RecordingObserver, RecordingPool};

#[test]
fn guided_shim_hints_every_submission() {
    let pool = RecordingPool::new("shim-guided");
    let (hint, calls) = Counting::new(domain_hint(|args| Ok(*args.get::<i32>(0)? % 4)));
    let shim = GuidedExecutorShim::with_pool(true, &ExecutorConfig::new("shim-guided"), pool.clone(), hint);
    assert!(shim.is_guided());

    assert_eq!(shim.async_execute(|x: i32| x, (10_i32,)).get().unwrap(), 10);
    let then = shim.then_execute(|p: TaskFuture<i32>| p.get().unwrap() + 1, make_ready_future(7));
    assert_eq!(then.get().unwrap(), 8);

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(pool.localities(), vec![2, 3]);
}

#[test]
fn unguided_shim_never_calls_the_hint() {
    let pool = RecordingPool::new("shim-plain");
    let (hint, calls) = Counting::new(domain_hint(|_| Ok(3)));
    let config = ExecutorConfig::builder("shim-plain")
        .priority(ThreadPriority::High)
        .hp_sync(true)
        .build();
    let shim = GuidedExecutorShim::with_pool(false, &config, pool.clone(), hint);
    assert!(!shim.is_guided());

    let a = shim.async_execute(|x: i32| x * 3, (make_ready_future(2),));
    let b = shim.then_execute_with(
        |p: TaskFuture<i32>, (extra,): (i32,)| p.get().unwrap() + extra,
        make_ready_future(1),
        (10_i32,),
    );
    let c = shim.dataflow_execute(
        |(x, y): (TaskFuture<i32>, TaskFuture<i32>)| x.get().unwrap() * y.get().unwrap(),
        (make_ready_future(4), make_ready_future(5)),
    );
    assert_eq!(a.get().unwrap(), 6);
    assert_eq!(b.get().unwrap(), 11);
    assert_eq!(c.get().unwrap(), 20);

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    //unguided submissions never run inline and never carry a preference
    let descriptors = pool.descriptors();
    assert_eq!(descriptors.len(), 3);
    assert!(descriptors.iter().all(|d| !d.hint().has_preference()));
}

#[test]
fn unguided_lifecycle_skips_the_hint() {
    let pool = RecordingPool::inline("shim-observed");
    let observer = Arc::new(RecordingObserver::default());
    let config = ExecutorConfig::builder("shim-observed")
        .observer(observer.clone())
        .build();
    let shim = GuidedExecutorShim::with_pool(false, &config, pool, domain_hint(|_| Ok(0)));
    shim.async_execute(|| (), ()).get().unwrap();
    assert_eq!(
        observer.states(),
        vec![
            SubmissionState::Created,
            SubmissionState::WaitingOnPredecessors,
            SubmissionState::Dispatched,
            SubmissionState::Completed,
        ]
    );
}

#[test]
fn pools_are_resolved_by_name() {
    let pool = RecordingPool::new("shim-registered");
    register_pool(pool.clone());
    let shim = GuidedExecutorShim::new(true, &ExecutorConfig::new("shim-registered"), domain_hint(|_| Ok(1)));
    assert_eq!(shim.pool().pool_name(), "shim-registered");
    shim.async_execute(|| (), ()).get().unwrap();
    assert_eq!(pool.localities(), vec![1]);
    unregister_pool("shim-registered");
}

#[test]
fn unknown_pools_fall_back_to_threads() {
    let shim = GuidedExecutorShim::new(false, &ExecutorConfig::new("shim-unregistered"), domain_hint(|_| Ok(1)));
    assert_eq!(shim.pool().pool_name(), "shim-unregistered");
    assert_eq!(shim.async_execute(|x: u8| x + 1, (1_u8,)).get().unwrap(), 2);
}
