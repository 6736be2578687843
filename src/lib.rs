//SPDX-License-Identifier: MIT OR Apache-2.0
/*!
guided_executor dispatches tasks onto named thread pools with a locality hint
computed from the task's own inputs.

On machines with several NUMA domains it matters where a task runs relative to
the memory it touches. A [`GuidedExecutor`] holds one [`HintFunction`]: a small,
non-blocking function that looks at a task's arguments (or at the values of the
futures the task depends on) and names the domain or core the task should run
on. The executor waits for those inputs, lends them to the hint function
without consuming them, and submits the task to the pool together with the
computed [`ScheduleHint`].

This crate does not implement a thread pool. Pools plug in through the
[`ThreadPool`] trait and are looked up by name in a process-wide registry
(see [`register_pool`]). When nothing is registered under a name, a simple
thread-per-task pool is used instead.

# Submission forms

| method | inputs | hint sees | task receives |
|--------|--------|-----------|---------------|
| [`GuidedExecutor::async_execute`] | values and futures | the unwrapped values | the unwrapped values |
| [`GuidedExecutor::then_execute`] | one future | its value | the future |
| [`GuidedExecutor::then_execute_all`] | a future of a group of futures | every inner value | the outer future |
| [`GuidedExecutor::dataflow_execute`] | a group of futures | every value | the group |

[`GuidedExecutorShim`] offers the same methods, but can be built unguided.

# Example

```
use guided_executor::{ExecutorConfig, GuidedExecutor, TaskFuture};
use guided_executor::hint::domain_hint;
use guided_executor::future::make_ready_future;

let executor = GuidedExecutor::new(
    &ExecutorConfig::new("example-pool"),
    domain_hint(|args| Ok(*args.get::<i32>(0)? % 2)),
);

let length = executor.then_execute(
    |p: TaskFuture<i32>| p.get().map(|v| v * 10),
    make_ready_future(7),
);
assert_eq!(length.get().unwrap().unwrap(), 70);
```

# Observing submissions

Every submission reports its lifecycle to the [`DispatchObserver`] in its
executor's configuration; by default these become `tracing` events.
*/

pub mod args;
pub mod config;
pub mod error;
pub mod future;
pub mod guided;
pub mod hint;
pub mod last_resort;
pub mod locality;
pub mod observer;
pub mod pool;
mod prescheduler;
pub mod registry;
pub mod shim;

pub use args::{Argument, Arguments, Invoke, Value};
pub use config::{
    DispatchDescriptor, ExecutorConfig, ExecutorConfigBuilder, LaunchMode, StackSize,
    ThreadPriority, launch_policy,
};
pub use error::{DispatchError, HintError, ParseConfigError};
pub use future::{Promise, SharedFuture, TaskFuture, promise, when_all};
pub use guided::GuidedExecutor;
pub use hint::{HintFunction, HintKind, core_hint, domain_hint};
pub use last_resort::LastResortPool;
pub use locality::{HintMode, LocalityId, ScheduleHint};
pub use observer::{DispatchObserver, SubmissionId, SubmissionState, TracingObserver};
pub use pool::{PoolExecutor, Rejected, ThreadPool, WorkItem};
pub use registry::{register_pool, resolve_pool, unregister_pool};
pub use shim::GuidedExecutorShim;
