//SPDX-License-Identifier: MIT OR Apache-2.0

//! Named pools.
//!
//! Executors are configured with a pool *name*. The name is resolved here, once,
//! when the executor is built.

use crate::last_resort::LastResortPool;
use crate::pool::ThreadPool;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

static POOLS: OnceLock<RwLock<HashMap<String, Arc<dyn ThreadPool>>>> = OnceLock::new();

fn pools() -> &'static RwLock<HashMap<String, Arc<dyn ThreadPool>>> {
    POOLS.get_or_init(Default::default)
}

/**
Registers `pool` under its own name.

Returns the pool previously registered under that name, if any. Executors
already built keep the pool they resolved.
*/
pub fn register_pool(pool: Arc<dyn ThreadPool>) -> Option<Arc<dyn ThreadPool>> {
    let name = pool.name().to_string();
    tracing::debug!(pool = %name, "registering pool");
    pools().write().insert(name, pool)
}

/// Removes the pool registered under `name`.
pub fn unregister_pool(name: &str) -> Option<Arc<dyn ThreadPool>> {
    pools().write().remove(name)
}

pub fn registered_pool(name: &str) -> Option<Arc<dyn ThreadPool>> {
    pools().read().get(name).cloned()
}

/**
Resolves `name` to a pool.

Falls back to a [`LastResortPool`] carrying that name when nothing is
registered under it.
*/
pub fn resolve_pool(name: &str) -> Arc<dyn ThreadPool> {
    match registered_pool(name) {
        Some(pool) => pool,
        None => Arc::new(LastResortPool::new(name)),
    }
}
