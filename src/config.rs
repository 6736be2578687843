//SPDX-License-Identifier: MIT OR Apache-2.0

//! Executor configuration and the per-submission dispatch descriptor.
//!
//! Executors are configured once, through [`ExecutorConfig`], and then used for
//! any number of submissions. Each submission produces a [`DispatchDescriptor`]
//! that travels with the work item to the pool.

use crate::error::ParseConfigError;
use crate::locality::ScheduleHint;
use crate::observer::{DispatchObserver, TracingObserver};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Scheduling priority requested from the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThreadPriority {
    /// Whatever the pool is configured to use.
    #[default]
    Default,
    Low,
    Normal,
    High,
    /// Raised to high priority for the first run only.
    Boost,
}

impl ThreadPriority {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ThreadPriority::Default => "default",
            ThreadPriority::Low => "low",
            ThreadPriority::Normal => "normal",
            ThreadPriority::High => "high",
            ThreadPriority::Boost => "boost",
        }
    }
}

impl fmt::Display for ThreadPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreadPriority {
    type Err = ParseConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(ThreadPriority::Default),
            "low" => Ok(ThreadPriority::Low),
            "normal" => Ok(ThreadPriority::Normal),
            "high" => Ok(ThreadPriority::High),
            "boost" => Ok(ThreadPriority::Boost),
            _ => Err(ParseConfigError {
                kind: "priority",
                value: s.to_string(),
            }),
        }
    }
}

/// Stack size class requested for the thread that runs a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StackSize {
    Small,
    Medium,
    /// Whatever the pool is configured to use.
    #[default]
    Default,
    Large,
}

impl StackSize {
    /// Concrete size in bytes for pools that spawn OS threads.
    ///
    /// `Default` returns `None`: keep the platform's default.
    pub const fn bytes(&self) -> Option<usize> {
        match self {
            StackSize::Small => Some(256 * 1024),
            StackSize::Medium => Some(1024 * 1024),
            StackSize::Default => None,
            StackSize::Large => Some(8 * 1024 * 1024),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            StackSize::Small => "small",
            StackSize::Medium => "medium",
            StackSize::Default => "default",
            StackSize::Large => "large",
        }
    }
}

impl fmt::Display for StackSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StackSize {
    type Err = ParseConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(StackSize::Small),
            "medium" => Ok(StackSize::Medium),
            "default" => Ok(StackSize::Default),
            "large" => Ok(StackSize::Large),
            _ => Err(ParseConfigError {
                kind: "stack size",
                value: s.to_string(),
            }),
        }
    }
}

/// How a work item is started once its hint is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LaunchMode {
    /// Handed to the pool and run on one of its workers.
    #[default]
    Async,
    /// Run inline on the thread that computed the hint.
    Sync,
}

/// The one launch policy applied by every guided path.
///
/// Dispatch is asynchronous unless `hp_sync` is enabled and the priority is
/// [`ThreadPriority::High`].
pub const fn launch_policy(hp_sync: bool, priority: ThreadPriority) -> LaunchMode {
    if hp_sync && matches!(priority, ThreadPriority::High) {
        LaunchMode::Sync
    } else {
        LaunchMode::Async
    }
}

/// Everything a pool needs to know about one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchDescriptor {
    priority: ThreadPriority,
    stack_size: StackSize,
    launch: LaunchMode,
    hint: ScheduleHint,
}

impl DispatchDescriptor {
    pub fn new(
        priority: ThreadPriority,
        stack_size: StackSize,
        launch: LaunchMode,
        hint: ScheduleHint,
    ) -> Self {
        DispatchDescriptor {
            priority,
            stack_size,
            launch,
            hint,
        }
    }

    pub fn priority(&self) -> ThreadPriority {
        self.priority
    }

    pub fn stack_size(&self) -> StackSize {
        self.stack_size
    }

    pub fn launch(&self) -> LaunchMode {
        self.launch
    }

    pub fn hint(&self) -> ScheduleHint {
        self.hint
    }
}

/// Construction-time configuration shared by
/// [`GuidedExecutor`](crate::GuidedExecutor) and
/// [`GuidedExecutorShim`](crate::GuidedExecutorShim).
///
/// # Examples
///
/// ```
/// use guided_executor::config::{ExecutorConfig, StackSize, ThreadPriority};
///
/// let config = ExecutorConfig::builder("numa-pool")
///     .priority(ThreadPriority::High)
///     .stack_size(StackSize::Large)
///     .hp_sync(true)
///     .build();
/// assert_eq!(config.pool_name(), "numa-pool");
/// assert!(config.hp_sync());
/// ```
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pool_name: String,
    priority: ThreadPriority,
    stack_size: StackSize,
    hp_sync: bool,
    observer: Arc<dyn DispatchObserver>,
}

/// A builder for [`ExecutorConfig`].
#[derive(Debug, Clone)]
pub struct ExecutorConfigBuilder {
    pool_name: String,
    priority: Option<ThreadPriority>,
    stack_size: Option<StackSize>,
    hp_sync: Option<bool>,
    observer: Option<Arc<dyn DispatchObserver>>,
}

impl ExecutorConfigBuilder {
    pub fn new(pool_name: impl Into<String>) -> Self {
        ExecutorConfigBuilder {
            pool_name: pool_name.into(),
            priority: None,
            stack_size: None,
            hp_sync: None,
            observer: None,
        }
    }

    pub fn priority(mut self, priority: ThreadPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn stack_size(mut self, stack_size: StackSize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    /// Enables running high-priority work inline once its hint is known.
    pub fn hp_sync(mut self, hp_sync: bool) -> Self {
        self.hp_sync = Some(hp_sync);
        self
    }

    /// Receives the lifecycle of every submission made through the executor.
    pub fn observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Builds the configuration.
    ///
    /// Unset values use their defaults:
    /// - `priority`: [`ThreadPriority::Default`]
    /// - `stack_size`: [`StackSize::Default`]
    /// - `hp_sync`: `false`
    /// - `observer`: [`TracingObserver`]
    pub fn build(self) -> ExecutorConfig {
        ExecutorConfig {
            pool_name: self.pool_name,
            priority: self.priority.unwrap_or_default(),
            stack_size: self.stack_size.unwrap_or_default(),
            hp_sync: self.hp_sync.unwrap_or(false),
            observer: self.observer.unwrap_or_else(|| Arc::new(TracingObserver)),
        }
    }
}

impl ExecutorConfig {
    /// A configuration for `pool_name` with every other value defaulted.
    pub fn new(pool_name: impl Into<String>) -> Self {
        ExecutorConfigBuilder::new(pool_name).build()
    }

    pub fn builder(pool_name: impl Into<String>) -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::new(pool_name)
    }

    pub fn pool_name(&self) -> &str {
        &self.pool_name
    }

    pub fn priority(&self) -> ThreadPriority {
        self.priority
    }

    pub fn stack_size(&self) -> StackSize {
        self.stack_size
    }

    pub fn hp_sync(&self) -> bool {
        self.hp_sync
    }

    pub fn observer(&self) -> &Arc<dyn DispatchObserver> {
        &self.observer
    }

    /// The launch mode every guided submission made with this configuration uses.
    pub fn launch_mode(&self) -> LaunchMode {
        launch_policy(self.hp_sync, self.priority)
    }
}
