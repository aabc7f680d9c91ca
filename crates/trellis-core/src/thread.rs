//! UI-thread confinement and cross-thread dispatch.
//!
//! The node graph and every binding built against it are owned by a single
//! UI thread. This module tracks which thread that is and provides the one
//! dispatch primitive the framework uses: [`post_to_ui`], which schedules a
//! closure onto the UI thread's task queue.
//!
//! The UI thread is registered once, by whatever loop embeds Trellis:
//!
//! ```
//! use trellis_core::thread::{UiQueue, register_ui_thread, post_to_ui};
//!
//! register_ui_thread();
//! let queue = UiQueue::install();
//!
//! post_to_ui(|| println!("runs on the UI thread"));
//! queue.drain(); // called from the UI loop
//! ```
//!
//! When no queue is installed (unit tests, early initialization), posted
//! closures run inline with a warning - the same graceful fallback the rest
//! of the crate uses.

use std::sync::OnceLock;
use std::thread::ThreadId;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::RwLock;

/// A unit of work scheduled for the UI thread.
type UiTask = Box<dyn FnOnce() + Send + 'static>;

static UI_THREAD_ID: OnceLock<ThreadId> = OnceLock::new();

static UI_SENDER: RwLock<Option<Sender<UiTask>>> = RwLock::new(None);

/// Record the current thread as the UI thread.
///
/// Called once by the embedding loop at startup. Calling it again from the
/// same thread is a no-op.
///
/// # Panics
///
/// Panics if called from a different thread than the first call.
pub fn register_ui_thread() {
    let current = std::thread::current().id();
    if UI_THREAD_ID.set(current).is_err() && UI_THREAD_ID.get() != Some(&current) {
        panic!("register_ui_thread() called from a second thread; the UI thread is fixed once set");
    }
}

/// The registered UI thread id, if any.
#[inline]
pub fn ui_thread_id() -> Option<ThreadId> {
    UI_THREAD_ID.get().copied()
}

/// Check whether the calling thread is the UI thread.
///
/// Returns `true` when no UI thread has been registered yet, so early
/// initialization and plain unit tests pass the check.
#[inline]
pub fn is_ui_thread() -> bool {
    match UI_THREAD_ID.get() {
        Some(&id) => std::thread::current().id() == id,
        None => true,
    }
}

/// Panics if the current thread is not the UI thread.
#[macro_export]
macro_rules! assert_ui_thread {
    () => {
        $crate::assert_ui_thread!("operation must be performed on the UI thread")
    };
    ($msg:expr) => {
        if !$crate::thread::is_ui_thread() {
            panic!(
                "UI THREAD VIOLATION at {}:{}: {} (current thread {:?}, UI thread {:?})",
                file!(),
                line!(),
                $msg,
                std::thread::current().id(),
                $crate::thread::ui_thread_id(),
            );
        }
    };
}

/// The UI thread's task queue.
///
/// Owned by the embedding loop; [`drain`](Self::drain) is called from the UI
/// thread to run everything scheduled since the last drain.
pub struct UiQueue {
    rx: Receiver<UiTask>,
}

impl UiQueue {
    /// Create the queue and install its sender as the process-wide dispatch
    /// target. Replaces any previously installed queue.
    pub fn install() -> Self {
        let (tx, rx) = unbounded();
        *UI_SENDER.write() = Some(tx);
        Self { rx }
    }

    /// Remove the installed sender so subsequent posts fall back to inline
    /// execution. The queue itself can still be drained.
    pub fn uninstall() {
        *UI_SENDER.write() = None;
    }

    /// Run every task scheduled so far. Returns the number of tasks run.
    ///
    /// Must be called from the UI thread.
    pub fn drain(&self) -> usize {
        assert_ui_thread!("UiQueue::drain must run on the UI thread");
        let mut count = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            count += 1;
        }
        count
    }
}

/// Schedule `task` on the UI thread.
///
/// - On the UI thread: runs inline immediately.
/// - Off the UI thread with a queue installed: enqueued for the next drain.
/// - Off the UI thread with no queue: runs inline with a warning (test and
///   early-init fallback).
pub fn post_to_ui<F>(task: F)
where
    F: FnOnce() + Send + 'static,
{
    if is_ui_thread() {
        task();
        return;
    }
    let sender = UI_SENDER.read().clone();
    match sender {
        Some(tx) => {
            if tx.send(Box::new(task)).is_err() {
                tracing::warn!(
                    target: "trellis_core::thread",
                    "UI queue disconnected, dropping posted task"
                );
            }
        }
        None => {
            tracing::warn!(
                target: "trellis_core::thread",
                "no UI queue installed, executing posted task inline"
            );
            task();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_is_ui_thread_fallback() {
        // Whether or not another test registered the UI thread, the calling
        // thread either is that thread or registration has not happened;
        // both cases must not panic.
        let _ = is_ui_thread();
    }

    #[test]
    fn test_post_inline_without_queue() {
        let ran = Arc::new(Mutex::new(false));
        let ran_clone = ran.clone();
        post_to_ui(move || *ran_clone.lock() = true);
        assert!(*ran.lock());
    }
}
