//SPDX-License-Identifier: MIT OR Apache-2.0

//! An executor that is guided or plain, chosen once at construction.
//!
//! [`GuidedExecutorShim`] exposes the same operations as
//! [`GuidedExecutor`]. When built unguided it submits straight to the pool:
//! no hint is computed, the hint function is never called, and every work
//! item goes out asynchronously with no locality preference.

use crate::args::{Arguments, Invoke};
use crate::config::{ExecutorConfig, LaunchMode};
use crate::error::DispatchError;
use crate::future::{FutureTuple, Predecessor, Readiness, TaskFuture, promise, when_all_ready};
use crate::guided::GuidedExecutor;
use crate::hint::{HintFunction, HintSource};
use crate::locality::ScheduleHint;
use crate::observer::{DispatchObserver, SubmissionState, Tracker};
use crate::pool::{PoolExecutor, ThreadPool};
use std::sync::Arc;

#[derive(Clone, Debug)]
struct Plain {
    pool: PoolExecutor,
    observer: Arc<dyn DispatchObserver>,
}

impl Plain {
    /// Waits for `signals`, then submits whatever `prepare` produces.
    fn schedule<G, C, R>(&self, label: &'static str, signals: Vec<Arc<dyn Readiness>>, prepare: G) -> TaskFuture<R>
    where
        G: FnOnce() -> Result<C, DispatchError> + Send + 'static,
        C: FnOnce() -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        let tracker = Tracker::new(label, &self.observer);
        let (promise, future) = promise();
        tracker.watch(&future);
        tracker.advance(SubmissionState::WaitingOnPredecessors);
        let pool = self.pool.clone();
        when_all_ready(signals, move || match prepare() {
            Ok(call) => {
                tracker.advance(SubmissionState::Dispatched);
                pool.submit_into(
                    promise,
                    tracker.id(),
                    tracker.label(),
                    ScheduleHint::NONE,
                    LaunchMode::Async,
                    call,
                );
            }
            Err(error) => promise.set_error(error),
        });
        future
    }
}

#[derive(Clone, Debug)]
enum Dispatch {
    Guided(GuidedExecutor),
    Plain(Plain),
}

/**
A [`GuidedExecutor`] or a plain pool handle behind one interface.

Whether the shim is guided never changes after construction.
*/
#[derive(Clone, Debug)]
pub struct GuidedExecutorShim {
    dispatch: Dispatch,
}

impl GuidedExecutorShim {
    /// Creates a shim for the pool named by `config`.
    ///
    /// When `guided` is false, `hint` is dropped unused.
    pub fn new(guided: bool, config: &ExecutorConfig, hint: impl HintFunction + 'static) -> Self {
        let pool = crate::registry::resolve_pool(config.pool_name());
        GuidedExecutorShim::with_pool(guided, config, pool, hint)
    }

    pub fn with_pool(
        guided: bool,
        config: &ExecutorConfig,
        pool: Arc<dyn ThreadPool>,
        hint: impl HintFunction + 'static,
    ) -> Self {
        let dispatch = if guided {
            Dispatch::Guided(GuidedExecutor::with_pool(config, pool, hint))
        } else {
            tracing::debug!(pool = pool.name(), "unguided executor created");
            Dispatch::Plain(Plain {
                pool: PoolExecutor::new(pool, config.priority(), config.stack_size()),
                observer: config.observer().clone(),
            })
        };
        GuidedExecutorShim { dispatch }
    }

    pub fn is_guided(&self) -> bool {
        matches!(self.dispatch, Dispatch::Guided(_))
    }

    pub fn pool(&self) -> &PoolExecutor {
        match &self.dispatch {
            Dispatch::Guided(guided) => guided.pool(),
            Dispatch::Plain(plain) => &plain.pool,
        }
    }

    /// See [`GuidedExecutor::async_execute`].
    pub fn async_execute<F, A>(&self, f: F, args: A) -> TaskFuture<F::Output>
    where
        A: Arguments,
        F: Invoke<A::Output>,
    {
        match &self.dispatch {
            Dispatch::Guided(guided) => guided.async_execute(f, args),
            Dispatch::Plain(plain) => {
                let signals = args.readiness();
                plain.schedule("plain async", signals, move || {
                    let values = args.resolve()?;
                    Ok(move || f.invoke(values))
                })
            }
        }
    }

    /// See [`GuidedExecutor::then_execute`].
    ///
    /// Unguided, `f` runs whether or not the predecessor succeeded. Futures
    /// of groups go through [`GuidedExecutorShim::then_execute_all`].
    pub fn then_execute<P, F, R>(&self, f: F, predecessor: P) -> TaskFuture<R>
    where
        P: Predecessor,
        F: FnOnce(P) -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        match &self.dispatch {
            Dispatch::Guided(guided) => guided.then_execute(f, predecessor),
            Dispatch::Plain(plain) => {
                let signals = vec![predecessor.readiness()];
                plain.schedule("plain then", signals, move || Ok(move || f(predecessor)))
            }
        }
    }

    /// See [`GuidedExecutor::then_execute_with`].
    pub fn then_execute_with<P, A, F, R>(&self, f: F, predecessor: P, aux: A) -> TaskFuture<R>
    where
        P: Predecessor,
        A: HintSource + Send + 'static,
        F: FnOnce(P, A) -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        match &self.dispatch {
            Dispatch::Guided(guided) => guided.then_execute_with(f, predecessor, aux),
            Dispatch::Plain(plain) => {
                let signals = vec![predecessor.readiness()];
                plain.schedule("plain then", signals, move || Ok(move || f(predecessor, aux)))
            }
        }
    }

    /// See [`GuidedExecutor::then_execute_all`].
    pub fn then_execute_all<Tup, F, R>(&self, f: F, group: TaskFuture<Tup>) -> TaskFuture<R>
    where
        Tup: FutureTuple,
        F: FnOnce(TaskFuture<Tup>) -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        match &self.dispatch {
            Dispatch::Guided(guided) => guided.then_execute_all(f, group),
            Dispatch::Plain(plain) => {
                let signals = vec![group.readiness()];
                plain.schedule("plain fan-in", signals, move || Ok(move || f(group)))
            }
        }
    }

    /// See [`GuidedExecutor::dataflow_execute`].
    pub fn dataflow_execute<Tup, F, R>(&self, f: F, group: Tup) -> TaskFuture<R>
    where
        Tup: FutureTuple,
        F: FnOnce(Tup) -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        match &self.dispatch {
            Dispatch::Guided(guided) => guided.dataflow_execute(f, group),
            Dispatch::Plain(plain) => {
                let signals = group.readiness();
                plain.schedule("plain dataflow", signals, move || Ok(move || f(group)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchDescriptor;
    use crate::future::make_exceptional_future;
    use crate::hint::domain_hint;
    use crate::pool::{Rejected, WorkItem};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Inline;

    impl ThreadPool for Inline {
        fn name(&self) -> &str {
            "inline"
        }

        fn submit(&self, item: WorkItem, descriptor: DispatchDescriptor) -> Result<(), Rejected> {
            assert_eq!(descriptor.launch(), LaunchMode::Async);
            item.run();
            Ok(())
        }
    }

    #[test]
    fn unguided_never_calls_the_hint() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let config = ExecutorConfig::new("inline");
        let shim = GuidedExecutorShim::with_pool(
            false,
            &config,
            Arc::new(Inline),
            domain_hint(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(0)
            }),
        );
        assert!(!shim.is_guided());
        assert_eq!(shim.async_execute(|x: u8| x, (4_u8,)).get().unwrap(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unguided_then_runs_on_failure() {
        let config = ExecutorConfig::new("inline");
        let shim = GuidedExecutorShim::with_pool(false, &config, Arc::new(Inline), domain_hint(|_| Ok(0)));
        let f = shim.then_execute(
            |p: TaskFuture<u8>| p.get().is_err(),
            make_exceptional_future(DispatchError::msg("x")),
        );
        assert!(f.get().unwrap());
    }
}
