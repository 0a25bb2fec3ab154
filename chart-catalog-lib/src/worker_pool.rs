//! Bounded worker pool for chart imports.
//!
//! Owns a private tokio runtime whose blocking-thread limit is the pool size.
//! Jobs are plain blocking closures (hash, parse, SQLite write) run with
//! `spawn_blocking`; jobs beyond the limit wait in the runtime's queue.
//!
//! The number of queued plus running jobs is published on a `watch` channel,
//! which is what [`WorkerPool::drain`] waits on. The counter is decremented by
//! a drop guard, so a panicking job still counts as finished.
//!
//! All blocking methods must be called from outside any async context, and
//! the pool must be dropped outside one too, since dropping the runtime
//! blocks on jobs that are already running. Jobs still queued at that point
//! are discarded; call [`WorkerPool::drain`] first to keep them.

use std::io;
use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Handle to one submitted job.
pub struct TaskHandle<R> {
    handle: JoinHandle<R>,
}

/// Decrements the in-flight count when the job ends, however it ends.
struct InFlightGuard {
    in_flight: Arc<watch::Sender<usize>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.send_modify(|n| *n = n.saturating_sub(1));
    }
}

pub struct WorkerPool {
    runtime: Runtime,
    in_flight: Arc<watch::Sender<usize>>,
    workers: usize,
}

impl WorkerPool {
    /// Create a pool running at most `workers` jobs at once (minimum 1).
    pub fn new(workers: usize) -> io::Result<Self> {
        let workers = workers.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers)
            .thread_name("chart-import")
            .build()?;
        let (in_flight, _) = watch::channel(0usize);
        log::debug!("Import pool started with {} workers", workers);
        Ok(Self {
            runtime,
            in_flight: Arc::new(in_flight),
            workers,
        })
    }

    /// Default size: available parallelism minus one for the caller, minimum 1.
    pub fn default_size() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1))
            .unwrap_or(1)
            .max(1)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of jobs queued or running right now.
    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Queue a job. It starts as soon as a worker is free.
    pub fn submit<F, R>(&self, job: F) -> TaskHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.in_flight.send_modify(|n| *n += 1);
        let guard = InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        };
        let handle = self.runtime.spawn_blocking(move || {
            let _guard = guard;
            job()
        });
        TaskHandle { handle }
    }

    /// Block until every handle in `handles` has finished, returning results
    /// in submission order. A job that panicked yields `None`.
    pub fn wait_all<R>(&self, handles: Vec<TaskHandle<R>>) -> Vec<Option<R>>
    where
        R: Send + 'static,
    {
        let joins = handles.into_iter().map(|h| h.handle);
        self.runtime
            .block_on(futures::future::join_all(joins))
            .into_iter()
            .map(|result| match result {
                Ok(value) => Some(value),
                Err(e) => {
                    log::error!("Import job did not complete: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Block until no job is queued or running, including jobs submitted by
    /// other callers of the same pool.
    pub fn drain(&self) {
        let mut rx = self.in_flight.subscribe();
        self.runtime.block_on(async move {
            // The sender lives as long as `self`, so this only ends at zero.
            let _ = rx.wait_for(|n| *n == 0).await;
        });
    }
}
