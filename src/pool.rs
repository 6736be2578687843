//SPDX-License-Identifier: MIT OR Apache-2.0

//! The seam to the thread pool that actually runs work.
//!
//! This crate does not implement a thread pool. A pool is anything that
//! implements [`ThreadPool`]: it receives a [`WorkItem`] together with a
//! [`DispatchDescriptor`] and runs the item on one of its workers, ideally
//! honouring the descriptor's locality hint.
//!
//! [`PoolExecutor`] is the handle executors hold: a pool plus the default
//! priority and stack size every submission through it uses.

use crate::config::{DispatchDescriptor, LaunchMode, StackSize, ThreadPriority};
use crate::error::{DispatchError, panic_message};
use crate::future::{Promise, TaskFuture, promise};
use crate::locality::ScheduleHint;
use crate::observer::SubmissionId;
use std::fmt::{self, Debug};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// A thread pool that accepts work with a placement descriptor.
pub trait ThreadPool: Send + Sync + Debug {
    /// The name the pool is registered under.
    fn name(&self) -> &str;

    /// Queues `item` for execution.
    ///
    /// A pool must accept any locality hint, including `-1` ("no
    /// preference"). On refusal the item is handed back inside [`Rejected`]
    /// and must not have been run.
    fn submit(&self, item: WorkItem, descriptor: DispatchDescriptor) -> Result<(), Rejected>;
}

trait Job: Send {
    fn run(self: Box<Self>);

    fn fail(self: Box<Self>, error: DispatchError);
}

struct BoundCall<F, R> {
    call: F,
    promise: Promise<R>,
}

impl<F, R> Job for BoundCall<F, R>
where
    F: FnOnce() -> R + Send,
    R: Send + Sync,
{
    fn run(self: Box<Self>) {
        let BoundCall { call, promise } = *self;
        match panic::catch_unwind(AssertUnwindSafe(call)) {
            Ok(value) => promise.set_value(value),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::debug!(%message, "work item panicked");
                promise.set_error(DispatchError::Panicked(message));
            }
        }
    }

    fn fail(self: Box<Self>, error: DispatchError) {
        self.promise.set_error(error);
    }
}

/**
A deferred call bound to its arguments.

Running the item satisfies the future that was returned to the submitter.
Dropping it without running fails that future with
[`DispatchError::Abandoned`].
*/
pub struct WorkItem {
    submission: SubmissionId,
    label: &'static str,
    job: Box<dyn Job>,
}

impl WorkItem {
    fn new<F, R>(submission: SubmissionId, label: &'static str, call: F, promise: Promise<R>) -> Self
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        WorkItem {
            submission,
            label,
            job: Box::new(BoundCall { call, promise }),
        }
    }

    pub fn submission(&self) -> SubmissionId {
        self.submission
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Runs the item on the calling thread.
    pub fn run(self) {
        self.job.run();
    }

    fn fail(self, error: DispatchError) {
        self.job.fail(error);
    }
}

impl Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("submission", &self.submission)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// A refused submission, carrying the item back to the caller.
#[derive(Debug)]
pub struct Rejected {
    item: WorkItem,
    reason: String,
}

impl Rejected {
    pub fn new(item: WorkItem, reason: impl Into<String>) -> Self {
        Rejected {
            item,
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn into_item(self) -> WorkItem {
        self.item
    }
}

/**
A handle to a pool with fixed submission defaults.

Cheap to clone; clones share the pool.
*/
#[derive(Clone, Debug)]
pub struct PoolExecutor {
    pool: Arc<dyn ThreadPool>,
    priority: ThreadPriority,
    stack_size: StackSize,
}

impl PoolExecutor {
    pub fn new(pool: Arc<dyn ThreadPool>, priority: ThreadPriority, stack_size: StackSize) -> Self {
        PoolExecutor {
            pool,
            priority,
            stack_size,
        }
    }

    /// Resolves `name` through the pool registry.
    ///
    /// See [`resolve_pool`](crate::registry::resolve_pool) for what happens
    /// when no pool is registered under that name.
    pub fn named(name: &str, priority: ThreadPriority, stack_size: StackSize) -> Self {
        PoolExecutor::new(crate::registry::resolve_pool(name), priority, stack_size)
    }

    pub fn pool_name(&self) -> &str {
        self.pool.name()
    }

    pub fn pool(&self) -> &Arc<dyn ThreadPool> {
        &self.pool
    }

    pub fn priority(&self) -> ThreadPriority {
        self.priority
    }

    pub fn stack_size(&self) -> StackSize {
        self.stack_size
    }

    pub fn descriptor(&self, hint: ScheduleHint, launch: LaunchMode) -> DispatchDescriptor {
        DispatchDescriptor::new(self.priority, self.stack_size, launch, hint)
    }

    /// Submits `call` and returns the future it will satisfy.
    pub fn submit<F, R>(
        &self,
        label: &'static str,
        hint: ScheduleHint,
        launch: LaunchMode,
        call: F,
    ) -> TaskFuture<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        let (promise, future) = promise();
        self.submit_into(promise, SubmissionId::next(), label, hint, launch, call);
        future
    }

    /// Submits `call`, satisfying `promise` with its outcome.
    ///
    /// With [`LaunchMode::Sync`] the call runs on the current thread before
    /// this returns. A pool rejection fails `promise` with
    /// [`DispatchError::Rejected`].
    pub(crate) fn submit_into<F, R>(
        &self,
        promise: Promise<R>,
        submission: SubmissionId,
        label: &'static str,
        hint: ScheduleHint,
        launch: LaunchMode,
        call: F,
    ) where
        F: FnOnce() -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        let item = WorkItem::new(submission, label, call, promise);
        tracing::trace!(
            %submission,
            pool = self.pool.name(),
            %hint,
            priority = %self.priority,
            stack_size = %self.stack_size,
            ?launch,
            "{label}"
        );
        match launch {
            LaunchMode::Sync => item.run(),
            LaunchMode::Async => {
                let descriptor = self.descriptor(hint, launch);
                if let Err(rejected) = self.pool.submit(item, descriptor) {
                    let Rejected { item, reason } = rejected;
                    tracing::warn!(%submission, pool = self.pool.name(), %reason, "submission rejected");
                    item.fail(DispatchError::Rejected {
                        pool: self.pool.name().to_string(),
                        reason,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug, Default)]
    struct Inline {
        seen: Mutex<Vec<DispatchDescriptor>>,
    }

    impl ThreadPool for Inline {
        fn name(&self) -> &str {
            "inline"
        }

        fn submit(&self, item: WorkItem, descriptor: DispatchDescriptor) -> Result<(), Rejected> {
            self.seen.lock().push(descriptor);
            item.run();
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Closed;

    impl ThreadPool for Closed {
        fn name(&self) -> &str {
            "closed"
        }

        fn submit(&self, item: WorkItem, _descriptor: DispatchDescriptor) -> Result<(), Rejected> {
            Err(Rejected::new(item, "shutting down"))
        }
    }

    #[test]
    fn submit_carries_the_descriptor() {
        let pool = Arc::new(Inline::default());
        let exec = PoolExecutor::new(pool.clone(), ThreadPriority::Low, StackSize::Small);
        let hint = ScheduleHint::numa(3.into());
        let f = exec.submit("t", hint, LaunchMode::Async, || 5);
        assert_eq!(f.get().unwrap(), 5);
        let seen = pool.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].hint(), hint);
        assert_eq!(seen[0].priority(), ThreadPriority::Low);
        assert_eq!(seen[0].stack_size(), StackSize::Small);
    }

    #[test]
    fn sync_launch_bypasses_the_pool() {
        let pool = Arc::new(Inline::default());
        let exec = PoolExecutor::new(pool.clone(), ThreadPriority::High, StackSize::Default);
        let f = exec.submit("t", ScheduleHint::NONE, LaunchMode::Sync, || 1);
        assert!(f.is_ready());
        assert!(pool.seen.lock().is_empty());
    }

    #[test]
    fn rejection_fails_the_future() {
        let exec = PoolExecutor::new(Arc::new(Closed), ThreadPriority::Default, StackSize::Default);
        let f = exec.submit("t", ScheduleHint::NONE, LaunchMode::Async, || 1);
        match f.get() {
            Err(DispatchError::Rejected { pool, reason }) => {
                assert_eq!(pool, "closed");
                assert_eq!(reason, "shutting down");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn panics_become_errors() {
        let exec = PoolExecutor::new(Arc::new(Inline::default()), ThreadPriority::Default, StackSize::Default);
        let f = exec.submit("t", ScheduleHint::NONE, LaunchMode::Async, || -> u8 {
            panic!("kaboom")
        });
        assert!(matches!(f.get(), Err(DispatchError::Panicked(m)) if m == "kaboom"));
    }
}
