//SPDX-License-Identifier: MIT OR Apache-2.0

/*!
The pre-scheduling step shared by every guided submission.

A guided submission always runs the same three stages:

1. wait, without blocking, until every predecessor is ready
2. lend the ready values to the hint function
3. hand the task to the pool with the computed hint

Stages 2 and 3 run inline on whichever thread readied the last predecessor.
The shape of the predecessors (plain arguments, one future, a future of a
group, a bare group) only changes how stages 1 and 2 find their values.
*/

use crate::args::{Arguments, Invoke};
use crate::config::{LaunchMode, launch_policy};
use crate::error::{DispatchError, HintError, panic_message};
use crate::future::{FutureTuple, Predecessor, Promise, TaskFuture, promise, when_all_ready};
use crate::hint::{HintArgs, HintFunction, HintSource};
use crate::locality::ScheduleHint;
use crate::observer::{DispatchObserver, SubmissionState, Tracker};
use crate::pool::PoolExecutor;
use std::fmt::{self, Debug};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Everything a submission needs once its predecessors are ready.
///
/// Cloned into each pending continuation.
#[derive(Clone)]
pub(crate) struct PreScheduler {
    pool: PoolExecutor,
    hint: Arc<dyn HintFunction>,
    hp_sync: bool,
    observer: Arc<dyn DispatchObserver>,
}

/// Borrows a ready predecessor's value, or clones its error.
///
/// No lock is held while `f` runs.
fn with_ready<P, R>(predecessor: &P, f: impl FnOnce(&P::Value) -> R) -> Result<R, DispatchError>
where
    P: Predecessor,
{
    match predecessor.peek() {
        Some(peek) => match &*peek {
            Ok(value) => Ok(f(value)),
            Err(error) => Err(error.clone()),
        },
        //ready but already taken, e.g. awaited before it was handed over
        None => Err(DispatchError::Retrieved),
    }
}

impl PreScheduler {
    pub(crate) fn new(
        pool: PoolExecutor,
        hint: Arc<dyn HintFunction>,
        hp_sync: bool,
        observer: Arc<dyn DispatchObserver>,
    ) -> Self {
        PreScheduler {
            pool,
            hint,
            hp_sync,
            observer,
        }
    }

    pub(crate) fn pool(&self) -> &PoolExecutor {
        &self.pool
    }

    pub(crate) fn hp_sync(&self) -> bool {
        self.hp_sync
    }

    pub(crate) fn launch_mode(&self) -> LaunchMode {
        launch_policy(self.hp_sync, self.pool.priority())
    }

    fn compute_hint(&self, tracker: &Tracker, args: &HintArgs<'_>) -> Result<ScheduleHint, HintError> {
        let hint = &self.hint;
        let locality = panic::catch_unwind(AssertUnwindSafe(|| hint.compute(args)))
            .map_err(|payload| HintError::Panicked(panic_message(payload.as_ref())))??;
        let hint = self.hint.kind().schedule_hint(locality);
        tracker.hint_computed(hint);
        Ok(hint)
    }

    /// Computes the hint for a group of futures.
    ///
    /// A failed member withholds the values; the group is then dispatched
    /// without a preference and the failure surfaces when the task retrieves
    /// that member.
    fn compute_group_hint<Tup: FutureTuple>(
        &self,
        tracker: &Tracker,
        group: &Tup,
    ) -> Result<ScheduleHint, HintError> {
        match group.with_values(|args| self.compute_hint(tracker, args)) {
            Some(hint) => hint,
            None => {
                tracing::debug!(
                    submission = %tracker.id(),
                    "a predecessor failed; dispatching without a locality preference"
                );
                tracker.hint_computed(ScheduleHint::NONE);
                Ok(ScheduleHint::NONE)
            }
        }
    }

    fn dispatch<F, R>(&self, tracker: Tracker, promise: Promise<R>, hint: ScheduleHint, call: F)
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        tracker.advance(SubmissionState::Dispatched);
        self.pool
            .submit_into(promise, tracker.id(), tracker.label(), hint, self.launch_mode(), call);
    }

    fn finish<F, R>(&self, tracker: Tracker, promise: Promise<R>, hint: Result<ScheduleHint, DispatchError>, call: F)
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        match hint {
            Ok(hint) => self.dispatch(tracker, promise, hint, call),
            Err(error) => {
                tracing::debug!(submission = %tracker.id(), %error, "not dispatched");
                promise.set_error(error);
            }
        }
    }

    fn start<R: Send + Sync + 'static>(&self, label: &'static str) -> (Tracker, Promise<R>, TaskFuture<R>) {
        let tracker = Tracker::new(label, &self.observer);
        let (promise, future) = promise();
        tracker.watch(&future);
        tracker.advance(SubmissionState::WaitingOnPredecessors);
        (tracker, promise, future)
    }

    /// `f(args...)` once every argument future is ready, hinted on the
    /// resolved values.
    pub(crate) fn schedule_async<F, A>(&self, f: F, args: A) -> TaskFuture<F::Output>
    where
        A: Arguments,
        F: Invoke<A::Output>,
    {
        let (tracker, promise, future) = self.start("guided async");
        let this = self.clone();
        when_all_ready(args.readiness(), move || {
            let values = match args.resolve() {
                Ok(values) => values,
                Err(error) => {
                    tracing::debug!(submission = %tracker.id(), %error, "argument failed");
                    promise.set_error(error);
                    return;
                }
            };
            let hint = {
                let mut hint_args = HintArgs::new();
                values.push_into(&mut hint_args);
                this.compute_hint(&tracker, &hint_args)
            };
            this.finish(tracker, promise, hint.map_err(DispatchError::from), move || {
                f.invoke(values)
            });
        });
        future
    }

    /// `f(predecessor, aux)` once `predecessor` succeeded, hinted on
    /// `(value, aux...)`.
    ///
    /// A failed predecessor fails the result with the same error; neither
    /// the hint function nor `f` runs.
    pub(crate) fn schedule_then<P, A, F, R>(&self, f: F, predecessor: P, aux: A) -> TaskFuture<R>
    where
        P: Predecessor,
        A: HintSource + Send + 'static,
        F: FnOnce(P, A) -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        let (tracker, promise, future) = self.start("guided then");
        let this = self.clone();
        when_all_ready(vec![predecessor.readiness()], move || {
            let hint = with_ready(&predecessor, |value| {
                let mut hint_args = HintArgs::new();
                hint_args.push(value);
                aux.push_into(&mut hint_args);
                this.compute_hint(&tracker, &hint_args)
            })
            .and_then(|hint| hint.map_err(DispatchError::from));
            this.finish(tracker, promise, hint, move || f(predecessor, aux));
        });
        future
    }

    /// `f(group)` once `group` and every future inside it are ready, hinted
    /// on the inner values.
    ///
    /// Only a failure of `group` itself short-circuits.
    pub(crate) fn schedule_fan_in<Tup, F, R>(&self, f: F, group: TaskFuture<Tup>) -> TaskFuture<R>
    where
        Tup: FutureTuple,
        F: FnOnce(TaskFuture<Tup>) -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        let (tracker, promise, future) = self.start("guided fan-in");
        let this = self.clone();
        when_all_ready(vec![group.readiness()], move || {
            let inner = match with_ready(&group, |members: &Tup| members.readiness()) {
                Ok(inner) => inner,
                Err(error) => {
                    tracing::debug!(submission = %tracker.id(), %error, "predecessor failed");
                    promise.set_error(error);
                    return;
                }
            };
            when_all_ready(inner, move || {
                let hint = with_ready(&group, |members| this.compute_group_hint(&tracker, members))
                    .and_then(|hint| hint.map_err(DispatchError::from));
                this.finish(tracker, promise, hint, move || f(group));
            });
        });
        future
    }

    /// `f(group)` once every future in `group` is ready, hinted on their
    /// values.
    pub(crate) fn schedule_dataflow<Tup, F, R>(&self, f: F, group: Tup) -> TaskFuture<R>
    where
        Tup: FutureTuple,
        F: FnOnce(Tup) -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        let (tracker, promise, future) = self.start("guided dataflow");
        let this = self.clone();
        when_all_ready(group.readiness(), move || {
            let hint = this.compute_group_hint(&tracker, &group).map_err(DispatchError::from);
            this.finish(tracker, promise, hint, move || f(group));
        });
        future
    }
}

impl Debug for PreScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreScheduler")
            .field("pool", &self.pool.pool_name())
            .field("hint_kind", &self.hint.kind())
            .field("hp_sync", &self.hp_sync)
            .finish_non_exhaustive()
    }
}
