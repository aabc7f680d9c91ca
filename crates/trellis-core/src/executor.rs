//! Background execution for asynchronous handlers and data loaders.
//!
//! [`BackgroundExecutor`] is an explicitly owned worker pool: the embedding
//! application creates it, hands it to the wiring pipeline, and shuts it
//! down with the rest of the application lifecycle. There is no process-wide
//! singleton.
//!
//! Jobs are plain closures pulled from a `crossbeam-channel` queue by a
//! fixed set of worker threads. Jobs have no access to the node graph; a
//! handler that wants to mutate UI state must explicitly redispatch through
//! [`crate::thread::post_to_ui`].
//!
//! There is no cancellation of in-flight jobs: once a worker has picked a
//! job up, it runs to completion.
//!
//! # Example
//!
//! ```
//! use trellis_core::executor::BackgroundExecutor;
//!
//! let executor = BackgroundExecutor::new(2);
//! executor.spawn(|| {
//!     // expensive work off the UI thread
//! }).unwrap();
//! executor.shutdown(); // joins all workers
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::JoinHandle;

use crossbeam_channel::{Sender, unbounded};
use parking_lot::Mutex;

use crate::error::ExecutorError;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// An owned pool of background worker threads.
pub struct BackgroundExecutor {
    tx: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl BackgroundExecutor {
    /// Create an executor with `workers` threads (at least one).
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = unbounded::<Job>();
        let handles = (0..workers)
            .map(|i| {
                let rx = rx.clone();
                std::thread::Builder::new()
                    .name(format!("trellis-worker-{i}"))
                    .spawn(move || {
                        for job in rx.iter() {
                            // A panicking job must not take the worker down.
                            if catch_unwind(AssertUnwindSafe(job)).is_err() {
                                tracing::warn!(
                                    target: "trellis_core::executor",
                                    worker = i,
                                    "background job panicked"
                                );
                            }
                        }
                        tracing::trace!(
                            target: "trellis_core::executor",
                            worker = i,
                            "worker shutting down"
                        );
                    })
                    .expect("failed to spawn trellis worker thread")
            })
            .collect();
        Self {
            tx: Mutex::new(Some(tx)),
            workers: Mutex::new(handles),
        }
    }

    /// Submit a job for background execution.
    ///
    /// Returns [`ExecutorError::ShutDown`] after [`shutdown`](Self::shutdown).
    pub fn spawn<F>(&self, job: F) -> Result<(), ExecutorError>
    where
        F: FnOnce() + Send + 'static,
    {
        match &*self.tx.lock() {
            Some(tx) => tx
                .send(Box::new(job))
                .map_err(|_| ExecutorError::ShutDown),
            None => Err(ExecutorError::ShutDown),
        }
    }

    /// Whether the executor still accepts work.
    pub fn is_running(&self) -> bool {
        self.tx.lock().is_some()
    }

    /// Stop accepting work, drain the queue and join every worker.
    ///
    /// Idempotent; later calls are no-ops.
    pub fn shutdown(&self) {
        let tx = self.tx.lock().take();
        drop(tx); // disconnects the channel once all clones are gone
        let handles = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            let _ = handle.join();
        }
    }
}

impl Drop for BackgroundExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_spawn_runs_job() {
        let executor = BackgroundExecutor::new(2);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let counter = counter.clone();
            executor
                .spawn(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }

        executor.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_spawn_after_shutdown_fails() {
        let executor = BackgroundExecutor::new(1);
        executor.shutdown();
        assert_eq!(executor.spawn(|| {}), Err(ExecutorError::ShutDown));
        assert!(!executor.is_running());
    }

    #[test]
    fn test_panicking_job_does_not_kill_worker() {
        let executor = BackgroundExecutor::new(1);
        let ran = Arc::new(Mutex::new(false));

        executor.spawn(|| panic!("boom")).unwrap();
        let ran_clone = ran.clone();
        executor.spawn(move || *ran_clone.lock() = true).unwrap();

        executor.shutdown();
        assert!(*ran.lock());
    }

    #[test]
    fn test_shutdown_idempotent() {
        let executor = BackgroundExecutor::new(1);
        executor.shutdown();
        executor.shutdown();
    }
}
