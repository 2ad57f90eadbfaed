//! Named worker pools that async-wrapped filters are marshaled onto.

use crate::config::ExecutorConfig;
use crate::error::ChainBuildError;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::info;

/// A handle to a named worker pool.
#[derive(Clone)]
pub struct Executor {
    name: Arc<str>,
    handle: Handle,
}

impl Executor {
    pub fn new(name: impl Into<Arc<str>>, handle: Handle) -> Self {
        Self { name: name.into(), handle }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submits a unit of work; the returned handle resolves when the pool completes it.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor").field("name", &self.name).finish_non_exhaustive()
    }
}

/// A dedicated multi-thread runtime owned by the server.
///
/// Worker threads carry the pool name. Dropping the pool shuts the runtime down without
/// waiting for running tasks, so it may be dropped from async code.
pub struct ExecutorPool {
    runtime: Option<Runtime>,
    executor: Executor,
}

impl ExecutorPool {
    pub fn start(name: &str, config: &ExecutorConfig) -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1))
            .thread_name(name)
            .enable_all()
            .build()?;

        info!(executor = name, worker_threads = config.worker_threads, "start executor");
        let executor = Executor::new(name, runtime.handle().clone());
        Ok(Self { runtime: Some(runtime), executor })
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }
}

impl Drop for ExecutorPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl fmt::Debug for ExecutorPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorPool").field("executor", &self.executor).finish_non_exhaustive()
    }
}

/// The executors of one server, by name.
#[derive(Debug, Default)]
pub struct Executors {
    pools: HashMap<String, ExecutorPool>,
}

impl Executors {
    pub fn start(configs: &HashMap<String, ExecutorConfig>) -> Result<Self, ChainBuildError> {
        let mut pools = HashMap::with_capacity(configs.len());
        for (name, config) in configs {
            let pool = ExecutorPool::start(name, config)
                .map_err(|e| ChainBuildError::ExecutorStart { name: name.clone(), reason: e.to_string() })?;
            pools.insert(name.clone(), pool);
        }
        Ok(Self { pools })
    }

    pub fn get(&self, name: &str) -> Result<Executor, ChainBuildError> {
        self.pools
            .get(name)
            .map(|pool| pool.executor().clone())
            .ok_or_else(|| ChainBuildError::UnknownExecutor { name: name.to_owned() })
    }
}
