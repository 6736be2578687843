//SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-size groups of futures and the `when_all` combinator.

use super::{Peek, Readiness, TaskFuture, promise, when_all_ready};
use crate::hint::HintArgs;
use std::any::Any;
use std::sync::Arc;

/**
An ordered, fixed-size group of futures.

Implemented for tuples of one to six [`TaskFuture`]s and for
`Vec<TaskFuture<T>>`.
*/
pub trait FutureTuple: Send + Sync + 'static {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One readiness signal per future, in order.
    fn readiness(&self) -> Vec<Arc<dyn Readiness>>;

    /// Peeks every future and lends the values to `f`, in order.
    ///
    /// Returns `None` if any future is pending or failed. Nothing is consumed.
    fn with_values<R>(&self, f: impl FnOnce(&HintArgs<'_>) -> R) -> Option<R>;
}

macro_rules! impl_future_tuple {
    ($len:expr; $($idx:tt $T:ident),+) => {
        impl<$($T: Send + Sync + 'static),+> FutureTuple for ($(TaskFuture<$T>,)+) {
            fn len(&self) -> usize {
                $len
            }

            fn readiness(&self) -> Vec<Arc<dyn Readiness>> {
                vec![$(self.$idx.readiness()),+]
            }

            fn with_values<R>(&self, f: impl FnOnce(&HintArgs<'_>) -> R) -> Option<R> {
                let peeks = ($(self.$idx.peek()?,)+);
                let mut args = HintArgs::new();
                $(args.push(peeks.$idx.value()? as &dyn Any);)+
                Some(f(&args))
            }
        }
    };
}

impl_future_tuple!(1; 0 A);
impl_future_tuple!(2; 0 A, 1 B);
impl_future_tuple!(3; 0 A, 1 B, 2 C);
impl_future_tuple!(4; 0 A, 1 B, 2 C, 3 D);
impl_future_tuple!(5; 0 A, 1 B, 2 C, 3 D, 4 E);
impl_future_tuple!(6; 0 A, 1 B, 2 C, 3 D, 4 E, 5 G);

impl<T: Send + Sync + 'static> FutureTuple for Vec<TaskFuture<T>> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn readiness(&self) -> Vec<Arc<dyn Readiness>> {
        self.iter().map(TaskFuture::readiness).collect()
    }

    fn with_values<R>(&self, f: impl FnOnce(&HintArgs<'_>) -> R) -> Option<R> {
        let peeks = self
            .iter()
            .map(TaskFuture::peek)
            .collect::<Option<Vec<Peek<'_, T>>>>()?;
        let args = peeks
            .iter()
            .map(|p| p.value().map(|v| v as &dyn Any))
            .collect::<Option<HintArgs<'_>>>()?;
        Some(f(&args))
    }
}

/// A future that becomes ready, holding `futures`, once every one of them is
/// ready.
///
/// The inner futures are moved into the result untouched: failures stay inside
/// them until they are retrieved.
pub fn when_all<Tup: FutureTuple>(futures: Tup) -> TaskFuture<Tup> {
    let (promise, future) = promise();
    let signals = futures.readiness();
    when_all_ready(signals, move || promise.set_value(futures));
    future
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DispatchError;
    use crate::future::{make_exceptional_future, make_ready_future};

    #[test]
    fn when_all_waits_for_every_future() {
        let (pa, a) = promise::<i32>();
        let b = make_ready_future(2_i32);
        let all = when_all((a, b));
        assert!(!all.is_ready());
        pa.set_value(1);
        let (a, b) = all.get().unwrap();
        assert_eq!(a.get().unwrap() + b.get().unwrap(), 3);
    }

    #[test]
    fn values_are_lent_in_order() {
        let group = (
            make_ready_future(1_i32),
            make_ready_future("two"),
            make_ready_future(3_u64),
        );
        let seen = group.with_values(|args| {
            (
                *args.get::<i32>(0).unwrap(),
                *args.get::<&str>(1).unwrap(),
                *args.get::<u64>(2).unwrap(),
            )
        });
        assert_eq!(seen, Some((1, "two", 3)));
        assert_eq!(group.len(), 3);
        assert_eq!(group.0.get().unwrap(), 1);
    }

    #[test]
    fn failed_members_withhold_values() {
        let group = vec![
            make_ready_future(1_u8),
            make_exceptional_future(DispatchError::msg("bad")),
        ];
        assert_eq!(group.with_values(|args| args.len()), None);
        let mut group = group;
        assert!(group.pop().unwrap().get().is_err());
    }

    #[test]
    fn members_stay_readable_while_values_are_lent() {
        let group = (make_ready_future(4_i32), make_ready_future(5_i32));
        let seen = group.with_values(|args| {
            let again = group.0.peek().and_then(|p| p.value().copied());
            (*args.get::<i32>(1).unwrap(), again)
        });
        assert_eq!(seen, Some((5, Some(4))));
    }

    #[test]
    fn empty_vec_is_ready_immediately() {
        let all = when_all(Vec::<TaskFuture<u8>>::new());
        assert!(all.is_ready());
        assert!(all.get().unwrap().is_empty());
    }
}
