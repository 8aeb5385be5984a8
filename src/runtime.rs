//! Routed query runtime.
//!
//! [`InferenceEngine`] answers one query at a time on the calling thread. A
//! deep backward search can take its whole step budget, so this module runs
//! queries on bounded worker pools and routes cheap timestamp lookups and
//! expensive goal searches to separate pools. A pool full of searches never
//! delays a lookup.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::error::{ExecutionError, LogicError, LogicResult};
use crate::inference::{InferenceEngine, QueryAnswer};
use crate::rule::Query;

/// Execution path selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionPath {
    /// Bounded lookups over stored events.
    Lookup,
    /// Rule-chaining proof searches.
    Search,
}

impl ExecutionPath {
    /// Stable name used in errors and thread names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lookup => "lookup",
            Self::Search => "search",
        }
    }
}

/// Routes queries to an execution path.
pub trait QueryRouter: Send + Sync {
    /// Selects the execution path for the given query.
    fn route(&self, query: &Query) -> ExecutionPath;
}

/// Temporal queries are lookups; goals are searches.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRouter;

impl QueryRouter for DefaultRouter {
    fn route(&self, query: &Query) -> ExecutionPath {
        match query {
            Query::Temporal { .. } => ExecutionPath::Lookup,
            Query::Goal { .. } => ExecutionPath::Search,
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Number of lookup workers.
    pub lookup_workers: usize,
    /// Number of search workers.
    pub search_workers: usize,
    /// Maximum queued jobs per pool.
    pub queue_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            lookup_workers: 2,
            search_workers: 2,
            queue_capacity: 1024,
        }
    }
}

enum Job {
    Execute {
        query: Query,
        reply: Sender<LogicResult<QueryAnswer>>,
    },

    #[cfg(test)]
    Sleep {
        duration: Duration,
        reply: Sender<()>,
    },
}

struct WorkerPool {
    tx: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
    queue_capacity: usize,
}

impl WorkerPool {
    fn start(
        path: ExecutionPath,
        workers: usize,
        queue_capacity: usize,
        engine: &Arc<InferenceEngine>,
    ) -> LogicResult<Self> {
        let workers = workers.max(1);
        let queue_capacity = queue_capacity.max(1);
        let (tx, rx) = bounded::<Job>(queue_capacity);

        let mut pool = Self {
            tx,
            workers: Vec::with_capacity(workers),
            queue_capacity,
        };
        for idx in 0..workers {
            let rx: Receiver<Job> = rx.clone();
            let engine = Arc::clone(engine);
            let thread_name = format!("kyrologic-{}-{idx}", path.as_str());
            let spawned = thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || worker_loop(&rx, &engine));
            match spawned {
                Ok(handle) => pool.workers.push(handle),
                Err(err) => {
                    pool.shutdown();
                    return Err(ExecutionError::WorkerSpawn {
                        name: thread_name,
                        reason: err.to_string(),
                    }
                    .into());
                }
            }
        }
        tracing::debug!(path = path.as_str(), workers, queue_capacity, "runtime: pool started");
        Ok(pool)
    }

    fn closed() -> Self {
        Self {
            tx: bounded::<Job>(1).0,
            workers: Vec::new(),
            queue_capacity: 1,
        }
    }

    fn try_submit(&self, job: Job, path: ExecutionPath) -> LogicResult<()> {
        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                tracing::warn!(path = path.as_str(), capacity = self.queue_capacity, "runtime: queue full");
                Err(ExecutionError::QueueFull {
                    path: path.as_str().to_string(),
                    capacity: self.queue_capacity,
                }
                .into())
            }
            Err(TrySendError::Disconnected(_)) => Err(ExecutionError::Disconnected {
                path: path.as_str().to_string(),
            }
            .into()),
        }
    }

    fn shutdown(self) {
        // Closing the channel lets workers drain queued jobs, then exit.
        drop(self.tx);
        for handle in self.workers {
            let _ = handle.join();
        }
    }
}

fn worker_loop(rx: &Receiver<Job>, engine: &InferenceEngine) {
    loop {
        match rx.recv() {
            Ok(Job::Execute { query, reply }) => {
                let result = engine.query(&query);
                let _ = reply.send(result);
            }
            Err(_) => break,

            #[cfg(test)]
            Ok(Job::Sleep { duration, reply }) => {
                thread::sleep(duration);
                let _ = reply.send(());
            }
        }
    }
}

/// Handle returned by [`QueryRuntime::submit`].
#[derive(Debug)]
pub struct QueryHandle {
    path: ExecutionPath,
    rx: Receiver<LogicResult<QueryAnswer>>,
}

impl QueryHandle {
    /// Returns the path selected by the router.
    #[must_use]
    pub const fn path(&self) -> ExecutionPath {
        self.path
    }

    /// Waits for the answer.
    ///
    /// # Errors
    ///
    /// Returns `Disconnected` if the worker dropped the reply, or the
    /// query's own error.
    pub fn join(self) -> LogicResult<QueryAnswer> {
        let path = self.path;
        self.rx.recv().map_err(|_| disconnected(path))?
    }

    /// Waits for the answer with a timeout.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if no answer arrives in time, `Disconnected` if the
    /// worker dropped the reply, or the query's own error.
    pub fn join_timeout(self, timeout: Duration) -> LogicResult<QueryAnswer> {
        let path = self.path;
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => LogicError::Execution(ExecutionError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            RecvTimeoutError::Disconnected => disconnected(path),
        })?
    }
}

fn disconnected(path: ExecutionPath) -> LogicError {
    LogicError::Execution(ExecutionError::Disconnected {
        path: path.as_str().to_string(),
    })
}

/// A routed runtime isolating lookups from searches.
pub struct QueryRuntime<R: QueryRouter = DefaultRouter> {
    router: R,
    engine: Arc<InferenceEngine>,
    lookup: WorkerPool,
    search: WorkerPool,
}

impl QueryRuntime<DefaultRouter> {
    /// Creates a runtime with the default router.
    ///
    /// # Errors
    ///
    /// Returns `WorkerSpawn` if a worker thread cannot be started.
    pub fn new(engine: Arc<InferenceEngine>, config: RuntimeConfig) -> LogicResult<Self> {
        Self::with_router(engine, DefaultRouter, config)
    }
}

impl<R: QueryRouter> QueryRuntime<R> {
    /// Creates a runtime with a custom router.
    ///
    /// # Errors
    ///
    /// Returns `WorkerSpawn` if a worker thread cannot be started.
    pub fn with_router(engine: Arc<InferenceEngine>, router: R, config: RuntimeConfig) -> LogicResult<Self> {
        let lookup = WorkerPool::start(ExecutionPath::Lookup, config.lookup_workers, config.queue_capacity, &engine)?;
        let search = match WorkerPool::start(ExecutionPath::Search, config.search_workers, config.queue_capacity, &engine)
        {
            Ok(pool) => pool,
            Err(err) => {
                lookup.shutdown();
                return Err(err);
            }
        };
        Ok(Self {
            router,
            engine,
            lookup,
            search,
        })
    }

    /// Queues a query on its routed pool.
    ///
    /// # Errors
    ///
    /// Returns `QueueFull` when the pool's queue is at capacity.
    pub fn submit(&self, query: impl Into<Query>) -> LogicResult<QueryHandle> {
        let query = query.into();
        let path = self.router.route(&query);
        let (tx, rx) = bounded::<LogicResult<QueryAnswer>>(1);
        let job = Job::Execute { query, reply: tx };
        self.pool(path).try_submit(job, path)?;
        Ok(QueryHandle { path, rx })
    }

    /// Runs a query on its routed pool and waits for the answer.
    ///
    /// # Errors
    ///
    /// Returns the submission error or the query's own error.
    pub fn query(&self, query: impl Into<Query>) -> LogicResult<QueryAnswer> {
        self.submit(query)?.join()
    }

    /// The engine the workers share.
    #[must_use]
    pub fn engine(&self) -> &Arc<InferenceEngine> {
        &self.engine
    }

    fn pool(&self, path: ExecutionPath) -> &WorkerPool {
        match path {
            ExecutionPath::Lookup => &self.lookup,
            ExecutionPath::Search => &self.search,
        }
    }

    #[cfg(test)]
    fn submit_sleep(&self, path: ExecutionPath, duration: Duration) -> LogicResult<Receiver<()>> {
        let (tx, rx) = bounded::<()>(1);
        let job = Job::Sleep { duration, reply: tx };
        self.pool(path).try_submit(job, path)?;
        Ok(rx)
    }
}

impl<R: QueryRouter> Drop for QueryRuntime<R> {
    fn drop(&mut self) {
        // Workers block on recv(), so closing the channels stops them promptly.
        std::mem::replace(&mut self.lookup, WorkerPool::closed()).shutdown();
        std::mem::replace(&mut self.search, WorkerPool::closed()).shutdown();
    }
}
