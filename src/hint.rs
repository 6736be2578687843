//SPDX-License-Identifier: MIT OR Apache-2.0

//! Hint functions that choose where a task should run.
//!
//! A [`HintFunction`] inspects the values a task is about to run with and
//! returns a [`LocalityId`]. The guided executor calls it exactly once per
//! submission, after every predecessor is ready and before the task is handed
//! to the pool.
//!
//! # Overview
//!
//! Hint functions come in two flavours that behave identically and differ only
//! in what the returned id means:
//!
//! - **Domain hints** ([`domain_hint`]) name a NUMA domain
//! - **Core hints** ([`core_hint`]) name a single core
//!
//! The values are delivered through [`HintArgs`], an ordered, type-erased view
//! of borrowed arguments. Nothing in a [`HintArgs`] can be moved out, so
//! computing a hint never consumes a predecessor's result.
//!
//! # Important Notes
//!
//! - Hint functions are shared across concurrent submissions and must be
//!   reentrant; this crate does no locking around them
//! - They must not block
//! - Returning `-1` is always legal and means "no preference"
//!
//! # Examples
//!
//! ```
//! use guided_executor::hint::{domain_hint, HintArgs, HintFunction, HintKind};
//! use guided_executor::LocalityId;
//!
//! let by_value = domain_hint(|args| Ok(*args.get::<i32>(0)? % 4));
//!
//! let value = 10_i32;
//! let args: HintArgs<'_> = [&value as &dyn std::any::Any].into_iter().collect();
//! assert_eq!(by_value.compute(&args), Ok(LocalityId::new(2)));
//! assert_eq!(by_value.kind(), HintKind::Domain);
//! ```

use crate::error::HintError;
use crate::locality::{LocalityId, ScheduleHint};
use std::any::{Any, type_name};
use std::fmt;

/// An ordered, read-only view of the values a hint is computed from.
#[derive(Default)]
pub struct HintArgs<'a> {
    values: Vec<&'a dyn Any>,
}

impl<'a> HintArgs<'a> {
    pub fn new() -> Self {
        HintArgs { values: Vec::new() }
    }

    pub fn push(&mut self, value: &'a dyn Any) {
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Borrows the argument at `index` as a `T`.
    pub fn get<T: Any>(&self, index: usize) -> Result<&'a T, HintError> {
        let value = self
            .values
            .get(index)
            .copied()
            .ok_or(HintError::MissingArgument {
                index,
                len: self.values.len(),
            })?;
        value.downcast_ref::<T>().ok_or(HintError::ArgumentType {
            index,
            expected: type_name::<T>(),
        })
    }

    /// Like [`HintArgs::get`], but without an error.
    pub fn try_get<T: Any>(&self, index: usize) -> Option<&'a T> {
        self.values.get(index).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a dyn Any> + '_ {
        self.values.iter().copied()
    }
}

impl<'a> FromIterator<&'a dyn Any> for HintArgs<'a> {
    fn from_iter<I: IntoIterator<Item = &'a dyn Any>>(iter: I) -> Self {
        HintArgs {
            values: iter.into_iter().collect(),
        }
    }
}

impl fmt::Debug for HintArgs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HintArgs").field("len", &self.len()).finish()
    }
}

/// Values that can be lent to a hint function, in order.
///
/// Implemented for tuples of up to eight `'static` values.
pub trait HintSource {
    fn push_into<'a>(&'a self, args: &mut HintArgs<'a>);
}

macro_rules! impl_hint_source {
    ($($idx:tt $T:ident),*) => {
        impl<$($T: Any),*> HintSource for ($($T,)*) {
            #[allow(unused_variables)]
            fn push_into<'a>(&'a self, args: &mut HintArgs<'a>) {
                $(args.push(&self.$idx);)*
            }
        }
    };
}

impl_hint_source!();
impl_hint_source!(0 A);
impl_hint_source!(0 A, 1 B);
impl_hint_source!(0 A, 1 B, 2 C);
impl_hint_source!(0 A, 1 B, 2 C, 3 D);
impl_hint_source!(0 A, 1 B, 2 C, 3 D, 4 E);
impl_hint_source!(0 A, 1 B, 2 C, 3 D, 4 E, 5 G);
impl_hint_source!(0 A, 1 B, 2 C, 3 D, 4 E, 5 G, 6 H);
impl_hint_source!(0 A, 1 B, 2 C, 3 D, 4 E, 5 G, 6 H, 7 I);

/// Whether a hint function names NUMA domains or cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HintKind {
    #[default]
    Domain,
    Core,
}

impl HintKind {
    /// Wraps `locality` in the schedule hint this kind produces.
    pub fn schedule_hint(self, locality: LocalityId) -> ScheduleHint {
        match self {
            HintKind::Domain => ScheduleHint::numa(locality),
            HintKind::Core => ScheduleHint::core(locality),
        }
    }
}

/// Computes a placement for a task from its (borrowed) arguments.
pub trait HintFunction: Send + Sync {
    /// What the returned ids name.
    fn kind(&self) -> HintKind {
        HintKind::Domain
    }

    fn compute(&self, args: &HintArgs<'_>) -> Result<LocalityId, HintError>;
}

/// A domain-level hint built from a closure. See [`domain_hint`].
pub struct DomainHint<F>(F);

/// A core-level hint built from a closure. See [`core_hint`].
pub struct CoreHint<F>(F);

/// Builds a domain-level hint function from a closure.
pub fn domain_hint<F>(f: F) -> DomainHint<F>
where
    F: Fn(&HintArgs<'_>) -> Result<i32, HintError> + Send + Sync,
{
    DomainHint(f)
}

/// Builds a core-level hint function from a closure.
pub fn core_hint<F>(f: F) -> CoreHint<F>
where
    F: Fn(&HintArgs<'_>) -> Result<i32, HintError> + Send + Sync,
{
    CoreHint(f)
}

impl<F> HintFunction for DomainHint<F>
where
    F: Fn(&HintArgs<'_>) -> Result<i32, HintError> + Send + Sync,
{
    fn kind(&self) -> HintKind {
        HintKind::Domain
    }

    fn compute(&self, args: &HintArgs<'_>) -> Result<LocalityId, HintError> {
        (self.0)(args).map(LocalityId::new)
    }
}

impl<F> HintFunction for CoreHint<F>
where
    F: Fn(&HintArgs<'_>) -> Result<i32, HintError> + Send + Sync,
{
    fn kind(&self) -> HintKind {
        HintKind::Core
    }

    fn compute(&self, args: &HintArgs<'_>) -> Result<LocalityId, HintError> {
        (self.0)(args).map(LocalityId::new)
    }
}

/// A hint function that never expresses a preference.
///
/// Useful for measuring the cost of the guided path itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPreference;

impl HintFunction for NoPreference {
    fn compute(&self, _args: &HintArgs<'_>) -> Result<LocalityId, HintError> {
        Ok(LocalityId::NO_PREFERENCE)
    }
}
