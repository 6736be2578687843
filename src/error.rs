//SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for hint computation and dispatch.
//!
//! Every submission ends in exactly one terminal state. When that state is a
//! failure, the returned [`TaskFuture`](crate::future::TaskFuture) carries one
//! of the [`DispatchError`] variants below.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while computing a locality hint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HintError {
    /// The hint function asked for an argument position that was not supplied.
    #[error("hint argument {index} is missing ({len} supplied)")]
    MissingArgument { index: usize, len: usize },

    /// The argument at `index` is not of the requested type.
    #[error("hint argument {index} is not a `{expected}`")]
    ArgumentType { index: usize, expected: &'static str },

    /// The hint function panicked.
    #[error("hint function panicked: {0}")]
    Panicked(String),

    /// A failure reported by a user hint function.
    #[error("{0}")]
    Custom(String),
}

impl HintError {
    /// Builds a [`HintError::Custom`] from any message.
    pub fn custom(message: impl Into<String>) -> Self {
        HintError::Custom(message.into())
    }
}

/// The failure carried by a future produced by this crate.
#[derive(Error, Debug, Clone)]
pub enum DispatchError {
    /// The hint function failed; the work item was never submitted.
    #[error("hint computation failed: {0}")]
    Hint(#[from] HintError),

    /// The pool refused the work item.
    #[error("pool `{pool}` rejected the work item: {reason}")]
    Rejected { pool: String, reason: String },

    /// The work item panicked while running.
    #[error("work item panicked: {0}")]
    Panicked(String),

    /// An error supplied by user code, usually through
    /// [`Promise::set_error`](crate::future::Promise::set_error).
    #[error("{0}")]
    Failed(Arc<dyn std::error::Error + Send + Sync + 'static>),

    /// The promise was dropped before it was satisfied.
    #[error("promise dropped before a value was set")]
    Abandoned,

    /// The outcome was already taken out of the future, usually by awaiting it.
    #[error("future result was already retrieved")]
    Retrieved,
}

impl DispatchError {
    /// Wraps an arbitrary error as [`DispatchError::Failed`].
    pub fn failed<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DispatchError::Failed(Arc::new(error))
    }

    /// Builds a [`DispatchError::Failed`] carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        DispatchError::failed(Message(message.into()))
    }

    /// True when both errors are the same failure.
    ///
    /// User errors compare by identity, so a propagated error is the same as
    /// the one that was set on the original promise.
    pub fn is_same(&self, other: &DispatchError) -> bool {
        match (self, other) {
            (DispatchError::Failed(a), DispatchError::Failed(b)) => Arc::ptr_eq(a, b),
            (DispatchError::Hint(a), DispatchError::Hint(b)) => a == b,
            (
                DispatchError::Rejected { pool: a, reason: r },
                DispatchError::Rejected { pool: b, reason: s },
            ) => a == b && r == s,
            (DispatchError::Panicked(a), DispatchError::Panicked(b)) => a == b,
            (DispatchError::Abandoned, DispatchError::Abandoned) => true,
            (DispatchError::Retrieved, DispatchError::Retrieved) => true,
            _ => false,
        }
    }
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Message {}

/// A configuration string that does not name a known value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} `{value}`")]
pub struct ParseConfigError {
    pub(crate) kind: &'static str,
    pub(crate) value: String,
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
