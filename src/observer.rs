//SPDX-License-Identifier: MIT OR Apache-2.0

//! Observing the lifecycle of submissions.
//!
//! Every submission moves through the same states:
//!
//! ```text
//! Created -> WaitingOnPredecessors -> HintComputed -> Dispatched -> Completed
//!                    |                     |              |
//!                    +---------------------+--------------+-----> Failed
//! ```
//!
//! Unguided submissions skip `HintComputed`.
//!
//! An executor reports each transition to the [`DispatchObserver`] it was
//! configured with. The default, [`TracingObserver`], turns them into
//! `tracing` events.

use crate::future::TaskFuture;
use crate::locality::ScheduleHint;
use std::fmt::{self, Debug};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/**
A submission identifier.

Unique for the life of the process.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubmissionId(u64);

static SUBMISSION_IDS: AtomicU64 = AtomicU64::new(0);

impl SubmissionId {
    pub(crate) fn next() -> Self {
        SubmissionId(SUBMISSION_IDS.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a submission is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionState {
    Created,
    WaitingOnPredecessors,
    HintComputed,
    Dispatched,
    Completed,
    Failed,
}

impl SubmissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionState::Completed | SubmissionState::Failed)
    }
}

/**
Receives submission lifecycle events.

Methods are called inline, on whichever thread drives the transition, so
implementations must be cheap and must not block.
*/
pub trait DispatchObserver: Send + Sync + Debug {
    fn on_transition(&self, submission: SubmissionId, state: SubmissionState) {
        let _ = (submission, state);
    }

    /// Called once per guided submission, after the hint function returned.
    fn on_hint(&self, submission: SubmissionId, hint: ScheduleHint) {
        let _ = (submission, hint);
    }
}

/// Forwards lifecycle events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DispatchObserver for TracingObserver {
    fn on_transition(&self, submission: SubmissionId, state: SubmissionState) {
        match state {
            SubmissionState::Failed => {
                tracing::debug!(%submission, ?state, "submission failed")
            }
            _ => tracing::trace!(%submission, ?state, "submission transition"),
        }
    }

    fn on_hint(&self, submission: SubmissionId, hint: ScheduleHint) {
        tracing::debug!(%submission, %hint, "hint computed");
    }
}

/// Drives one submission through its states.
pub(crate) struct Tracker {
    id: SubmissionId,
    label: &'static str,
    observer: Arc<dyn DispatchObserver>,
}

impl Tracker {
    pub(crate) fn new(label: &'static str, observer: &Arc<dyn DispatchObserver>) -> Self {
        let tracker = Tracker {
            id: SubmissionId::next(),
            label,
            observer: observer.clone(),
        };
        tracker.advance(SubmissionState::Created);
        tracker
    }

    pub(crate) fn id(&self) -> SubmissionId {
        self.id
    }

    pub(crate) fn label(&self) -> &'static str {
        self.label
    }

    pub(crate) fn advance(&self, state: SubmissionState) {
        self.observer.on_transition(self.id, state);
    }

    pub(crate) fn hint_computed(&self, hint: ScheduleHint) {
        self.observer.on_hint(self.id, hint);
        self.advance(SubmissionState::HintComputed);
    }

    /// Reports the terminal state once `future` is satisfied.
    pub(crate) fn watch<T: Send + 'static>(&self, future: &TaskFuture<T>) {
        let id = self.id;
        let observer = self.observer.clone();
        future.subscribe(Box::new(move |succeeded| {
            let state = if succeeded {
                SubmissionState::Completed
            } else {
                SubmissionState::Failed
            };
            observer.on_transition(id, state);
        }));
    }
}

impl Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::future::promise;
    use parking_lot::Mutex;

    #[derive(Debug, Default)]
    struct Recorder(Mutex<Vec<SubmissionState>>);

    impl DispatchObserver for Recorder {
        fn on_transition(&self, _submission: SubmissionId, state: SubmissionState) {
            self.0.lock().push(state);
        }
    }

    #[test]
    fn ids_are_unique() {
        let a = SubmissionId::next();
        let b = SubmissionId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn tracker_reports_terminal_state() {
        let recorder = Arc::new(Recorder::default());
        let observer: Arc<dyn DispatchObserver> = recorder.clone();
        let tracker = Tracker::new("test", &observer);
        let (p, f) = promise::<u8>();
        tracker.watch(&f);
        tracker.advance(SubmissionState::Dispatched);
        p.set_value(1);
        assert_eq!(
            *recorder.0.lock(),
            vec![
                SubmissionState::Created,
                SubmissionState::Dispatched,
                SubmissionState::Completed
            ]
        );
        assert!(SubmissionState::Completed.is_terminal());
    }
}
