//SPDX-License-Identifier: MIT OR Apache-2.0

//! A small future/continuation runtime with non-consuming reads.
//!
//! A [`TaskFuture`] is the read side of a reference-counted result cell; the
//! [`Promise`] is the write side. The cell has two accessors:
//!
//! - [`TaskFuture::peek`] borrows a ready result without finalizing it. Any
//!   number of peeks may happen before the value is retrieved.
//! - [`TaskFuture::get`] (or `.await`) retrieves the result and finalizes the
//!   cell.
//!
//! This split is what lets a hint be computed from a predecessor's value while
//! the very same predecessor is still handed, untouched, to the task that
//! consumes it.
//!
//! Continuations registered with [`TaskFuture::on_ready`] run inline on the
//! thread that satisfies the promise, or immediately if the future is already
//! ready. [`when_all`] combines a fixed set of futures into one.
//!
//! # Examples
//!
//! ```
//! use guided_executor::future::promise;
//!
//! let (promise, future) = promise::<i32>();
//! promise.set_value(7);
//!
//! // Peeking leaves the value in place.
//! assert_eq!(future.peek().unwrap().value(), Some(&7));
//! assert_eq!(future.get().unwrap(), 7);
//! ```

mod tuple;

pub use tuple::{FutureTuple, when_all};

use crate::error::DispatchError;
use atomic_waker::AtomicWaker;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::ops::Deref;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

/// The outcome stored in a satisfied future.
pub type Outcome<T> = Result<T, DispatchError>;

pub(crate) type Continuation = Box<dyn FnOnce(bool) + Send>;

enum Slot<T> {
    Pending,
    //peeks hold clones of the Arc, so reading never needs the lock
    Ready(Arc<Outcome<T>>),
    Retrieved,
}

impl<T> Slot<T> {
    /// Moves a ready outcome out, leaving `Retrieved` behind.
    ///
    /// Returns `None` while pending.
    fn take(&mut self) -> Option<Outcome<T>> {
        match std::mem::replace(self, Slot::Retrieved) {
            Slot::Ready(outcome) => Some(
                Arc::try_unwrap(outcome)
                    .unwrap_or_else(|_| unreachable!("a peek outlived the future it borrows")),
            ),
            Slot::Retrieved => Some(Err(DispatchError::Retrieved)),
            Slot::Pending => {
                *self = Slot::Pending;
                None
            }
        }
    }
}

struct Inner<T> {
    slot: Slot<T>,
    continuations: Vec<Continuation>,
}

struct Shared<T> {
    inner: Mutex<Inner<T>>,
    ready: Condvar,
    waker: AtomicWaker,
}

impl<T> Shared<T> {
    fn new() -> Self {
        Shared {
            inner: Mutex::new(Inner {
                slot: Slot::Pending,
                continuations: Vec::new(),
            }),
            ready: Condvar::new(),
            waker: AtomicWaker::new(),
        }
    }

    fn complete(&self, outcome: Outcome<T>) {
        let succeeded = outcome.is_ok();
        let continuations = {
            let mut inner = self.inner.lock();
            match inner.slot {
                Slot::Pending => {}
                Slot::Ready(_) | Slot::Retrieved => panic!("future already satisfied"),
            }
            inner.slot = Slot::Ready(Arc::new(outcome));
            std::mem::take(&mut inner.continuations)
        };
        self.ready.notify_all();
        self.waker.wake();
        for continuation in continuations {
            continuation(succeeded);
        }
    }

    fn subscribe(&self, continuation: Continuation) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let succeeded = match &inner.slot {
            Slot::Ready(outcome) => outcome.is_ok(),
            Slot::Pending => {
                inner.continuations.push(continuation);
                return;
            }
            //the outcome is gone; whoever reads it next gets `Retrieved`
            Slot::Retrieved => false,
        };
        drop(guard);
        continuation(succeeded);
    }

    fn is_ready(&self) -> bool {
        !matches!(self.inner.lock().slot, Slot::Pending)
    }

    fn wait(&self) -> MutexGuard<'_, Inner<T>> {
        let mut inner = self.inner.lock();
        while matches!(inner.slot, Slot::Pending) {
            self.ready.wait(&mut inner);
        }
        inner
    }

    fn peek(&self) -> Option<Peek<'_, T>> {
        let outcome = match &self.inner.lock().slot {
            Slot::Ready(outcome) => outcome.clone(),
            Slot::Pending | Slot::Retrieved => return None,
        };
        Some(Peek {
            outcome,
            future: PhantomData,
        })
    }
}

/**
A type-erased readiness signal.

Lets combinators wait on futures of different value types.
*/
pub trait Readiness: Send + Sync {
    fn is_ready(&self) -> bool;

    /// Runs `continuation` once, as soon as the source is ready.
    fn subscribe(&self, continuation: Box<dyn FnOnce() + Send>);
}

impl<T: Send + Sync> Readiness for Shared<T> {
    fn is_ready(&self) -> bool {
        Shared::is_ready(self)
    }

    fn subscribe(&self, continuation: Box<dyn FnOnce() + Send>) {
        Shared::subscribe(self, Box::new(move |_| continuation()));
    }
}

/// Runs `f` once, right after the last of `signals` becomes ready.
///
/// `f` runs on the thread that readied the last signal, or on the calling
/// thread if all of them are ready already.
pub(crate) fn when_all_ready<F>(signals: Vec<Arc<dyn Readiness>>, f: F)
where
    F: FnOnce() + Send + 'static,
{
    if signals.is_empty() {
        f();
        return;
    }
    let remaining = Arc::new(AtomicUsize::new(signals.len()));
    let f = Arc::new(Mutex::new(Some(f)));
    for signal in signals {
        let remaining = remaining.clone();
        let f = f.clone();
        signal.subscribe(Box::new(move || {
            if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                let f = f.lock().take();
                if let Some(f) = f {
                    f();
                }
            }
        }));
    }
}

/// A read-only view of a ready future's outcome.
///
/// A `Peek` holds no lock: other holders of the same cell can peek, wait and
/// retrieve while it is alive. It borrows the future it came from, so a
/// unique future cannot be retrieved underneath it.
pub struct Peek<'a, T> {
    outcome: Arc<Outcome<T>>,
    future: PhantomData<&'a ()>,
}

impl<T> Peek<'_, T> {
    pub fn value(&self) -> Option<&T> {
        self.deref().as_ref().ok()
    }

    pub fn error(&self) -> Option<&DispatchError> {
        self.deref().as_ref().err()
    }
}

impl<T> Deref for Peek<'_, T> {
    type Target = Outcome<T>;

    fn deref(&self) -> &Self::Target {
        &self.outcome
    }
}

impl<T: Debug> Debug for Peek<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Peek").field(&*self.outcome).finish()
    }
}

/**
The write side of a [`TaskFuture`].

Dropping a promise without satisfying it fails the future with
[`DispatchError::Abandoned`].
*/
pub struct Promise<T> {
    shared: Option<Arc<Shared<T>>>,
}

impl<T> Promise<T> {
    pub fn set_value(mut self, value: T) {
        self.finish(Ok(value));
    }

    pub fn set_error(mut self, error: DispatchError) {
        self.finish(Err(error));
    }

    pub fn complete(mut self, outcome: Outcome<T>) {
        self.finish(outcome);
    }

    fn finish(&mut self, outcome: Outcome<T>) {
        if let Some(shared) = self.shared.take() {
            shared.complete(outcome);
        }
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if self.shared.is_some() {
            tracing::trace!("promise dropped unsatisfied");
            self.finish(Err(DispatchError::Abandoned));
        }
    }
}

impl<T> Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("satisfied", &self.shared.is_none())
            .finish()
    }
}

/**
The read side of a result cell.

A `TaskFuture` has exactly one owner. Use [`TaskFuture::share`] when several
holders need to retrieve the value.
*/
#[must_use]
pub struct TaskFuture<T> {
    shared: Arc<Shared<T>>,
}

/// Creates a connected promise/future pair.
pub fn promise<T>() -> (Promise<T>, TaskFuture<T>) {
    let shared = Arc::new(Shared::new());
    (
        Promise {
            shared: Some(shared.clone()),
        },
        TaskFuture { shared },
    )
}

/// A future that is already satisfied with `value`.
pub fn make_ready_future<T>(value: T) -> TaskFuture<T> {
    let (promise, future) = promise();
    promise.set_value(value);
    future
}

/// A future that has already failed with `error`.
pub fn make_exceptional_future<T>(error: DispatchError) -> TaskFuture<T> {
    let (promise, future) = promise();
    promise.set_error(error);
    future
}

impl<T> TaskFuture<T> {
    pub fn is_ready(&self) -> bool {
        self.shared.is_ready()
    }

    pub fn has_value(&self) -> bool {
        self.peek().is_some_and(|p| p.is_ok())
    }

    pub fn has_error(&self) -> bool {
        self.peek().is_some_and(|p| p.is_err())
    }

    /// Borrows the outcome without retrieving it.
    ///
    /// Returns `None` while the future is pending.
    pub fn peek(&self) -> Option<Peek<'_, T>> {
        self.shared.peek()
    }

    /// Blocks the calling thread until the future is ready.
    pub fn wait(&self) {
        drop(self.shared.wait());
    }

    /// Blocks until ready, then retrieves the outcome.
    ///
    /// Fails with [`DispatchError::Retrieved`] if the outcome was already
    /// taken by awaiting this future.
    pub fn get(self) -> Outcome<T> {
        let mut inner = self.shared.wait();
        match inner.slot.take() {
            Some(outcome) => outcome,
            None => unreachable!("waited until ready"),
        }
    }

    pub(crate) fn subscribe(&self, continuation: Continuation) {
        self.shared.subscribe(continuation);
    }
}

impl<T: Send + Sync + 'static> TaskFuture<T> {
    /// Runs `f` once the future is ready.
    ///
    /// `f` runs on the thread that satisfies the promise, or right away if the
    /// future is already ready.
    pub fn on_ready<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.subscribe(Box::new(move |_| f()));
    }

    pub fn readiness(&self) -> Arc<dyn Readiness> {
        self.shared.clone()
    }

    /// Converts into a future that can be cloned and retrieved many times.
    pub fn share(self) -> SharedFuture<T> {
        SharedFuture {
            shared: self.shared,
        }
    }
}

impl<T> std::future::Future for TaskFuture<T> {
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.shared.waker.register(cx.waker());
        match self.shared.inner.lock().slot.take() {
            Some(outcome) => Poll::Ready(outcome),
            None => Poll::Pending,
        }
    }
}

impl<T> Debug for TaskFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFuture")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/**
A future whose outcome can be retrieved by every clone.

Retrieval clones the value, so the cell is never finalized.
*/
#[must_use]
pub struct SharedFuture<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for SharedFuture<T> {
    fn clone(&self) -> Self {
        SharedFuture {
            shared: self.shared.clone(),
        }
    }
}

impl<T> SharedFuture<T> {
    pub fn is_ready(&self) -> bool {
        self.shared.is_ready()
    }

    pub fn peek(&self) -> Option<Peek<'_, T>> {
        self.shared.peek()
    }

    pub fn wait(&self) {
        drop(self.shared.wait());
    }
}

impl<T: Clone> SharedFuture<T> {
    /// Blocks until ready, then returns a copy of the outcome.
    pub fn get(&self) -> Outcome<T> {
        let outcome = match &self.shared.wait().slot {
            Slot::Ready(outcome) => outcome.clone(),
            //shared after the unique future was awaited
            Slot::Retrieved => return Err(DispatchError::Retrieved),
            Slot::Pending => unreachable!("waited until ready"),
        };
        (*outcome).clone()
    }
}

impl<T: Send + Sync + 'static> SharedFuture<T> {
    pub fn on_ready<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.subscribe(Box::new(move |_| f()));
    }

    pub fn readiness(&self) -> Arc<dyn Readiness> {
        self.shared.clone()
    }
}

impl<T> Debug for SharedFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedFuture")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/**
A single future a continuation can be attached to.

Implemented for [`TaskFuture`] and [`SharedFuture`]. Both can be peeked and
then forwarded intact to the task that consumes them.
*/
pub trait Predecessor: Send + 'static {
    type Value: Send + Sync + 'static;

    fn readiness(&self) -> Arc<dyn Readiness>;

    fn peek(&self) -> Option<Peek<'_, Self::Value>>;
}

impl<T: Send + Sync + 'static> Predecessor for TaskFuture<T> {
    type Value = T;

    fn readiness(&self) -> Arc<dyn Readiness> {
        TaskFuture::readiness(self)
    }

    fn peek(&self) -> Option<Peek<'_, T>> {
        TaskFuture::peek(self)
    }
}

impl<T: Send + Sync + 'static> Predecessor for SharedFuture<T> {
    type Value = T;

    fn readiness(&self) -> Arc<dyn Readiness> {
        SharedFuture::readiness(self)
    }

    fn peek(&self) -> Option<Peek<'_, T>> {
        SharedFuture::peek(self)
    }
}
