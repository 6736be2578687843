//SPDX-License-Identifier: MIT OR Apache-2.0

//! Argument envelopes for `async_execute`.
//!
//! A task's arguments are passed as a tuple. Each element is either a plain
//! value or a future of a value ([`TaskFuture`] / [`SharedFuture`]). The
//! executor waits for every future in the tuple, resolves the tuple into plain
//! values, lends them to the hint function, and finally moves them into the
//! task.
//!
//! Types without a built-in [`Argument`] impl can be passed through
//! [`Value`].

use crate::error::DispatchError;
use crate::future::{Readiness, SharedFuture, TaskFuture};
use crate::hint::HintSource;
use std::sync::Arc;

/// One element of an argument tuple.
pub trait Argument: Send + 'static {
    type Output: Send + 'static;

    /// The signal to wait on before resolving, if any.
    fn readiness(&self) -> Option<Arc<dyn Readiness>>;

    /// Produces the value. Only called once [`Argument::readiness`] fired.
    fn resolve(self) -> Result<Self::Output, DispatchError>;
}

/// Passes any value as an argument unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Value<T>(pub T);

impl<T: Send + 'static> Argument for Value<T> {
    type Output = T;

    fn readiness(&self) -> Option<Arc<dyn Readiness>> {
        None
    }

    fn resolve(self) -> Result<T, DispatchError> {
        Ok(self.0)
    }
}

impl<T: Send + Sync + 'static> Argument for TaskFuture<T> {
    type Output = T;

    fn readiness(&self) -> Option<Arc<dyn Readiness>> {
        Some(TaskFuture::readiness(self))
    }

    fn resolve(self) -> Result<T, DispatchError> {
        self.get()
    }
}

impl<T: Clone + Send + Sync + 'static> Argument for SharedFuture<T> {
    type Output = T;

    fn readiness(&self) -> Option<Arc<dyn Readiness>> {
        Some(SharedFuture::readiness(self))
    }

    fn resolve(self) -> Result<T, DispatchError> {
        self.get()
    }
}

macro_rules! plain_arguments {
    ($($t:ty),* $(,)?) => {
        $(
            impl Argument for $t {
                type Output = $t;

                fn readiness(&self) -> Option<Arc<dyn Readiness>> {
                    None
                }

                fn resolve(self) -> Result<$t, DispatchError> {
                    Ok(self)
                }
            }
        )*
    };
}

plain_arguments!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
    String, &'static str,
);

impl<T: Send + 'static> Argument for Vec<T> {
    type Output = Vec<T>;

    fn readiness(&self) -> Option<Arc<dyn Readiness>> {
        None
    }

    fn resolve(self) -> Result<Vec<T>, DispatchError> {
        Ok(self)
    }
}

impl<T: Send + 'static> Argument for Option<T> {
    type Output = Option<T>;

    fn readiness(&self) -> Option<Arc<dyn Readiness>> {
        None
    }

    fn resolve(self) -> Result<Option<T>, DispatchError> {
        Ok(self)
    }
}

impl<T: Send + Sync + 'static> Argument for Arc<T> {
    type Output = Arc<T>;

    fn readiness(&self) -> Option<Arc<dyn Readiness>> {
        None
    }

    fn resolve(self) -> Result<Arc<T>, DispatchError> {
        Ok(self)
    }
}

/**
A whole argument tuple.

Implemented for tuples of up to six [`Argument`]s.
*/
pub trait Arguments: Send + 'static {
    type Output: HintSource + Send + 'static;

    fn readiness(&self) -> Vec<Arc<dyn Readiness>>;

    /// Resolves every element in order, stopping at the first failure.
    fn resolve(self) -> Result<Self::Output, DispatchError>;
}

/**
A callable taking its arguments as a tuple.

Implemented for every `FnOnce` of up to six arguments.
*/
pub trait Invoke<Args>: Send + 'static {
    type Output: Send + Sync + 'static;

    fn invoke(self, args: Args) -> Self::Output;
}

macro_rules! impl_arguments {
    ($($idx:tt $T:ident),*) => {
        impl<$($T: Argument),*> Arguments for ($($T,)*) {
            type Output = ($($T::Output,)*);

            #[allow(unused_mut)]
            fn readiness(&self) -> Vec<Arc<dyn Readiness>> {
                let mut signals = Vec::new();
                $(signals.extend(self.$idx.readiness());)*
                signals
            }

            #[allow(unused_variables)]
            fn resolve(self) -> Result<Self::Output, DispatchError> {
                Ok(($(self.$idx.resolve()?,)*))
            }
        }

        impl<Func, Ret, $($T),*> Invoke<($($T,)*)> for Func
        where
            Func: FnOnce($($T),*) -> Ret + Send + 'static,
            Ret: Send + Sync + 'static,
        {
            type Output = Ret;

            #[allow(unused_variables)]
            fn invoke(self, args: ($($T,)*)) -> Ret {
                self($(args.$idx),*)
            }
        }
    };
}

impl_arguments!();
impl_arguments!(0 A);
impl_arguments!(0 A, 1 B);
impl_arguments!(0 A, 1 B, 2 C);
impl_arguments!(0 A, 1 B, 2 C, 3 D);
impl_arguments!(0 A, 1 B, 2 C, 3 D, 4 E);
impl_arguments!(0 A, 1 B, 2 C, 3 D, 4 E, 5 G);
