//SPDX-License-Identifier: MIT OR Apache-2.0

/*!
The locality-guided executor.

A [`GuidedExecutor`] wraps a pool handle and one [`HintFunction`]. Every task
submitted through it is held back until its inputs are ready; the inputs are
then lent to the hint function, and the task is submitted to the pool with the
returned locality as its placement hint.

# Examples

```
use guided_executor::{ExecutorConfig, GuidedExecutor};
use guided_executor::hint::domain_hint;

let config = ExecutorConfig::new("guided-doc");
let executor = GuidedExecutor::new(&config, domain_hint(|args| Ok(*args.get::<i32>(0)? % 4)));

let doubled = executor.async_execute(|x: i32| x * 2, (10_i32,));
assert_eq!(doubled.get().unwrap(), 20);
```
*/

use crate::args::{Arguments, Invoke};
use crate::config::{ExecutorConfig, LaunchMode};
use crate::future::{FutureTuple, Predecessor, TaskFuture};
use crate::hint::{HintFunction, HintSource};
use crate::pool::{PoolExecutor, ThreadPool};
use crate::prescheduler::PreScheduler;
use std::fmt::{self, Debug};
use std::sync::Arc;

/**
Submits tasks to a pool with a locality hint computed from their inputs.

The executor is cheap to clone and can be shared between threads; clones share
the pool and the hint function. It holds no per-submission state, so any
number of submissions can be in flight at once.
*/
#[derive(Clone)]
pub struct GuidedExecutor {
    scheduler: PreScheduler,
}

impl GuidedExecutor {
    /// Creates an executor for the pool named by `config`.
    ///
    /// The pool is resolved once, here. See
    /// [`resolve_pool`](crate::registry::resolve_pool).
    pub fn new(config: &ExecutorConfig, hint: impl HintFunction + 'static) -> Self {
        let pool = crate::registry::resolve_pool(config.pool_name());
        GuidedExecutor::with_pool(config, pool, hint)
    }

    /// Creates an executor for `pool`, ignoring `config`'s pool name.
    pub fn with_pool(
        config: &ExecutorConfig,
        pool: Arc<dyn ThreadPool>,
        hint: impl HintFunction + 'static,
    ) -> Self {
        let pool = PoolExecutor::new(pool, config.priority(), config.stack_size());
        tracing::debug!(
            pool = pool.pool_name(),
            priority = %config.priority(),
            stack_size = %config.stack_size(),
            hp_sync = config.hp_sync(),
            "guided executor created"
        );
        GuidedExecutor {
            scheduler: PreScheduler::new(
                pool,
                Arc::new(hint),
                config.hp_sync(),
                config.observer().clone(),
            ),
        }
    }

    pub fn pool(&self) -> &PoolExecutor {
        self.scheduler.pool()
    }

    pub fn hp_sync(&self) -> bool {
        self.scheduler.hp_sync()
    }

    /// How work items leave this executor.
    pub fn launch_mode(&self) -> LaunchMode {
        self.scheduler.launch_mode()
    }

    /**
    Runs `f(args...)` on the pool.

    `args` is a tuple; each element is a plain value or a future. Once every
    future is ready, the unwrapped values are lent to the hint function and
    then moved into `f`.

    If an argument future failed, the result fails with that error and
    neither the hint function nor `f` runs. If the hint function fails, the
    result fails with [`DispatchError::Hint`](crate::DispatchError::Hint)
    and `f` is never submitted.
    */
    pub fn async_execute<F, A>(&self, f: F, args: A) -> TaskFuture<F::Output>
    where
        A: Arguments,
        F: Invoke<A::Output>,
    {
        self.scheduler.schedule_async(f, args)
    }

    /**
    Runs `f(predecessor)` on the pool once `predecessor` succeeded.

    The hint function sees the predecessor's value, peeked without
    retrieving it; `f` receives the predecessor itself and can still
    retrieve the value.

    A failed predecessor fails the result with the same error.

    A future of a group, such as a [`when_all`](crate::when_all) result, goes
    through [`then_execute_all`](GuidedExecutor::then_execute_all) instead, so
    the hint function sees the inner values rather than the group.
    */
    pub fn then_execute<P, F, R>(&self, f: F, predecessor: P) -> TaskFuture<R>
    where
        P: Predecessor,
        F: FnOnce(P) -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        self.scheduler
            .schedule_then(move |p, ()| f(p), predecessor, ())
    }

    /// Like [`GuidedExecutor::then_execute`], with extra arguments.
    ///
    /// The hint function sees `(value, aux...)`; `f` receives
    /// `(predecessor, aux)`.
    pub fn then_execute_with<P, A, F, R>(&self, f: F, predecessor: P, aux: A) -> TaskFuture<R>
    where
        P: Predecessor,
        A: HintSource + Send + 'static,
        F: FnOnce(P, A) -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        self.scheduler.schedule_then(f, predecessor, aux)
    }

    /**
    Runs `f(group)` on the pool, where `group` is a future of a group of
    futures such as the one [`when_all`](crate::when_all) returns.

    The hint function sees every inner value, in order. If `group` itself
    failed, the result fails with the same error. A failed inner future does
    not stop the submission: the task is dispatched without a locality
    preference and the failure surfaces when `f` retrieves that member.
    */
    pub fn then_execute_all<Tup, F, R>(&self, f: F, group: TaskFuture<Tup>) -> TaskFuture<R>
    where
        Tup: FutureTuple,
        F: FnOnce(TaskFuture<Tup>) -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        self.scheduler.schedule_fan_in(f, group)
    }

    /**
    Runs `f(group)` on the pool once every future in `group` is ready.

    The hint function sees every value, in order. Inner failures do not
    short-circuit: the task is dispatched without a locality preference and
    the failure surfaces when `f` retrieves that member.
    */
    pub fn dataflow_execute<Tup, F, R>(&self, f: F, group: Tup) -> TaskFuture<R>
    where
        Tup: FutureTuple,
        F: FnOnce(Tup) -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        self.scheduler.schedule_dataflow(f, group)
    }
}

impl Debug for GuidedExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuidedExecutor")
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DispatchDescriptor, ThreadPriority};
    use crate::error::{DispatchError, HintError};
    use crate::future::{make_exceptional_future, make_ready_future, promise};
    use crate::hint::{core_hint, domain_hint};
    use crate::locality::{LocalityId, ScheduleHint};
    use crate::pool::{Rejected, WorkItem};
    use parking_lot::Mutex;

    #[derive(Debug, Default)]
    struct Inline {
        hints: Mutex<Vec<ScheduleHint>>,
    }

    impl ThreadPool for Inline {
        fn name(&self) -> &str {
            "inline"
        }

        fn submit(&self, item: WorkItem, descriptor: DispatchDescriptor) -> Result<(), Rejected> {
            self.hints.lock().push(descriptor.hint());
            item.run();
            Ok(())
        }
    }

    fn executor(hint: impl HintFunction + 'static) -> (Arc<Inline>, GuidedExecutor) {
        let pool = Arc::new(Inline::default());
        let config = ExecutorConfig::new("inline");
        (pool.clone(), GuidedExecutor::with_pool(&config, pool, hint))
    }

    #[test]
    fn hint_comes_from_the_arguments() {
        let (pool, exec) = executor(domain_hint(|args| Ok(*args.get::<i32>(0)? % 4)));
        let f = exec.async_execute(|x: i32| x + 1, (10_i32,));
        assert_eq!(f.get().unwrap(), 11);
        assert_eq!(*pool.hints.lock(), vec![ScheduleHint::numa(LocalityId::new(2))]);
    }

    #[test]
    fn core_hints_keep_their_kind() {
        let (pool, exec) = executor(core_hint(|_| Ok(5)));
        exec.async_execute(|| (), ()).get().unwrap();
        assert_eq!(*pool.hints.lock(), vec![ScheduleHint::core(LocalityId::new(5))]);
    }

    #[test]
    fn argument_futures_are_awaited() {
        let (pool, exec) = executor(domain_hint(|args| Ok(*args.get::<i32>(1)?)));
        let (p, later) = promise::<i32>();
        let f = exec.async_execute(|a: i32, b: i32| a * b, (3_i32, later));
        assert!(!f.is_ready());
        assert!(pool.hints.lock().is_empty());
        p.set_value(1);
        assert_eq!(f.get().unwrap(), 3);
        assert_eq!(*pool.hints.lock(), vec![ScheduleHint::numa(LocalityId::new(1))]);
    }

    #[test]
    fn then_sees_the_value_and_keeps_it() {
        let (pool, exec) = executor(domain_hint(|args| Ok(*args.get::<i32>(0)? * 2)));
        let f = exec.then_execute(|p: TaskFuture<i32>| p.get().unwrap(), make_ready_future(7));
        assert_eq!(f.get().unwrap(), 7);
        assert_eq!(*pool.hints.lock(), vec![ScheduleHint::numa(LocalityId::new(14))]);
    }

    #[test]
    fn then_with_aux_lends_everything() {
        let (pool, exec) = executor(domain_hint(|args| {
            Ok(*args.get::<i32>(0)? + *args.get::<i32>(1)?)
        }));
        let f = exec.then_execute_with(
            |p: TaskFuture<i32>, (offset,): (i32,)| p.get().unwrap() - offset,
            make_ready_future(5),
            (1_i32,),
        );
        assert_eq!(f.get().unwrap(), 4);
        assert_eq!(*pool.hints.lock(), vec![ScheduleHint::numa(LocalityId::new(6))]);
    }

    #[test]
    fn failed_predecessor_short_circuits() {
        let (pool, exec) = executor(domain_hint(|_| panic!("must not be called")));
        let error = DispatchError::msg("upstream");
        let f = exec.then_execute(|_: TaskFuture<u8>| 0_u8, make_exceptional_future(error.clone()));
        assert!(f.get().unwrap_err().is_same(&error));
        assert!(pool.hints.lock().is_empty());
    }

    #[test]
    fn hint_errors_fail_without_submitting() {
        let (pool, exec) = executor(domain_hint(|_| Err(HintError::custom("no topology"))));
        let f = exec.async_execute(|| 1, ());
        assert!(matches!(
            f.get(),
            Err(DispatchError::Hint(HintError::Custom(m))) if m == "no topology"
        ));
        assert!(pool.hints.lock().is_empty());
    }

    #[test]
    fn hint_panics_are_hint_errors() {
        let (_pool, exec) = executor(domain_hint(|_| panic!("boom")));
        let f = exec.async_execute(|| 1, ());
        assert!(matches!(f.get(), Err(DispatchError::Hint(HintError::Panicked(m))) if m == "boom"));
    }

    #[test]
    fn dataflow_sums_the_group() {
        let (pool, exec) = executor(domain_hint(|args| {
            args.iter()
                .map(|v| v.downcast_ref::<i32>().copied().ok_or(HintError::custom("not i32")))
                .sum()
        }));
        let group = (make_ready_future(1), make_ready_future(2), make_ready_future(3));
        let f = exec.dataflow_execute(
            |(a, b, c): (TaskFuture<i32>, TaskFuture<i32>, TaskFuture<i32>)| {
                a.get().unwrap() + b.get().unwrap() + c.get().unwrap()
            },
            group,
        );
        assert_eq!(f.get().unwrap(), 6);
        assert_eq!(*pool.hints.lock(), vec![ScheduleHint::numa(LocalityId::new(6))]);
    }

    #[test]
    fn dataflow_does_not_short_circuit() {
        let (pool, exec) = executor(domain_hint(|_| panic!("must not be called")));
        let group = vec![make_ready_future(1_u8), make_exceptional_future(DispatchError::msg("bad"))];
        let f = exec.dataflow_execute(
            |group: Vec<TaskFuture<u8>>| group.into_iter().map(|f| f.get().is_ok()).collect::<Vec<_>>(),
            group,
        );
        assert_eq!(f.get().unwrap(), vec![true, false]);
        assert_eq!(*pool.hints.lock(), vec![ScheduleHint::NONE]);
    }

    #[test]
    fn hp_sync_runs_inline() {
        let pool = Arc::new(Inline::default());
        let config = ExecutorConfig::builder("inline")
            .priority(ThreadPriority::High)
            .hp_sync(true)
            .build();
        let exec = GuidedExecutor::with_pool(&config, pool.clone(), domain_hint(|_| Ok(0)));
        assert_eq!(exec.launch_mode(), LaunchMode::Sync);
        let f = exec.async_execute(|| 9, ());
        assert!(f.is_ready());
        assert!(pool.hints.lock().is_empty());
    }
}
