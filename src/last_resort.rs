//SPDX-License-Identifier: MIT OR Apache-2.0

/*!
This pool is in use when no pool is registered under the requested name.

It is intentionally the simplest idea possible: one OS thread per work item.
Priorities and locality hints are ignored; stack sizes are honoured. It ensures
a compliant pool is always available, but it is not meant for production.
*/

use crate::config::DispatchDescriptor;
use crate::pool::{Rejected, ThreadPool, WorkItem};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

static WARNED: AtomicBool = AtomicBool::new(false);

/// Runs every work item on a fresh thread.
#[derive(Debug)]
pub struct LastResortPool {
    name: String,
}

impl LastResortPool {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if !WARNED.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                pool = %name,
                "guided_executor::LastResortPool is in use.  This is not intended for production code; register a real pool."
            );
        }
        LastResortPool { name }
    }
}

impl ThreadPool for LastResortPool {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit(&self, item: WorkItem, descriptor: DispatchDescriptor) -> Result<(), Rejected> {
        if descriptor.hint().has_preference() {
            tracing::trace!(pool = %self.name, hint = %descriptor.hint(), "ignoring locality hint");
        }
        let mut builder = thread::Builder::new().name(format!("{}-{}", self.name, item.label()));
        if let Some(bytes) = descriptor.stack_size().bytes() {
            builder = builder.stack_size(bytes);
        }

        //the builder consumes the closure even on failure, so keep the item reachable
        let slot = Arc::new(Mutex::new(Some(item)));
        let worker_slot = slot.clone();
        let spawned = builder.spawn(move || {
            let item = worker_slot.lock().take();
            if let Some(item) = item {
                item.run();
            }
        });
        match spawned {
            Ok(_) => Ok(()),
            Err(error) => match slot.lock().take() {
                Some(item) => Err(Rejected::new(item, error.to_string())),
                None => Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LaunchMode, StackSize, ThreadPriority};
    use crate::locality::{LocalityId, ScheduleHint};
    use crate::pool::PoolExecutor;

    #[test]
    fn runs_on_a_named_thread() {
        let exec = PoolExecutor::new(
            Arc::new(LastResortPool::new("fallback")),
            ThreadPriority::Default,
            StackSize::Small,
        );
        let f = exec.submit(
            "worker",
            ScheduleHint::numa(LocalityId::new(1)),
            LaunchMode::Async,
            || thread::current().name().map(str::to_string),
        );
        assert_eq!(f.get().unwrap().as_deref(), Some("fallback-worker"));
    }

    #[test]
    fn large_stacks_are_usable() {
        let exec = PoolExecutor::new(
            Arc::new(LastResortPool::new("fallback")),
            ThreadPriority::Default,
            StackSize::Large,
        );
        let f = exec.submit("deep", ScheduleHint::NONE, LaunchMode::Async, || {
            let buffer = [1_u8; 1024 * 1024];
            buffer.iter().map(|b| *b as usize).sum::<usize>()
        });
        assert_eq!(f.get().unwrap(), 1024 * 1024);
    }
}
