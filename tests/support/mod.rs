// SPDX-License-Identifier: MIT OR Apache-2.0

//! A pool stub that records every descriptor it receives.

#![allow(dead_code)]

use guided_executor::hint::{HintArgs, HintFunction};
use guided_executor::{
    DispatchDescriptor, DispatchObserver, HintError, LocalityId, Rejected, SubmissionId,
    SubmissionState, ThreadPool, WorkItem,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

#[derive(Debug)]
pub struct RecordingPool {
    name: String,
    descriptors: Mutex<Vec<DispatchDescriptor>>,
    reject: AtomicBool,
    inline: AtomicBool,
}

impl RecordingPool {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(RecordingPool {
            name: name.to_string(),
            descriptors: Mutex::new(Vec::new()),
            reject: AtomicBool::new(false),
            inline: AtomicBool::new(false),
        })
    }

    /// Runs every item on the submitting thread.
    pub fn inline(name: &str) -> Arc<Self> {
        let pool = RecordingPool::new(name);
        pool.inline.store(true, Ordering::SeqCst);
        pool
    }

    pub fn rejecting(name: &str) -> Arc<Self> {
        let pool = RecordingPool::new(name);
        pool.reject.store(true, Ordering::SeqCst);
        pool
    }

    pub fn descriptors(&self) -> Vec<DispatchDescriptor> {
        self.descriptors.lock().clone()
    }

    pub fn localities(&self) -> Vec<i32> {
        self.descriptors
            .lock()
            .iter()
            .map(|d| d.hint().locality().get())
            .collect()
    }
}

impl ThreadPool for RecordingPool {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit(&self, item: WorkItem, descriptor: DispatchDescriptor) -> Result<(), Rejected> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(Rejected::new(item, "queue full"));
        }
        self.descriptors.lock().push(descriptor);
        if self.inline.load(Ordering::SeqCst) {
            item.run();
        } else {
            thread::spawn(move || item.run());
        }
        Ok(())
    }
}

/// Wraps a hint function and counts its invocations.
pub struct Counting<H> {
    inner: H,
    calls: Arc<AtomicUsize>,
}

impl<H> Counting<H> {
    pub fn new(inner: H) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Counting {
                inner,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl<H: HintFunction> HintFunction for Counting<H> {
    fn kind(&self) -> guided_executor::HintKind {
        self.inner.kind()
    }

    fn compute(&self, args: &HintArgs<'_>) -> Result<LocalityId, HintError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.compute(args)
    }
}

#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub transitions: Mutex<Vec<(SubmissionId, SubmissionState)>>,
}

impl RecordingObserver {
    pub fn states(&self) -> Vec<SubmissionState> {
        self.transitions.lock().iter().map(|(_, s)| *s).collect()
    }
}

impl DispatchObserver for RecordingObserver {
    fn on_transition(&self, submission: SubmissionId, state: SubmissionState) {
        self.transitions.lock().push((submission, state));
    }
}
