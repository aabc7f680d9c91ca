//! Restartable quiet-period delays.
//!
//! A [`Debouncer`] suspends an action until a configured duration has passed
//! with no further activity. Every [`poke`](Debouncer::poke) restarts the
//! window; only the last poke in a burst fires the action, exactly once per
//! quiet period. This is a restartable delay, not fixed-rate sampling: five
//! rapid pokes within the window produce one firing, after the window
//! elapses from the fifth poke.
//!
//! Debounced value-change listeners and on-change validation are built on
//! this type.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;

enum Msg {
    Poke,
    Cancel,
    Stop,
}

/// A restartable quiet-period timer driving one action.
pub struct Debouncer {
    tx: Sender<Msg>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Create a debouncer that runs `action` once `timeout` has elapsed
    /// after the most recent [`poke`](Self::poke).
    ///
    /// The action runs on the debouncer's own thread; callers that need the
    /// UI thread wrap the action in [`crate::thread::post_to_ui`].
    ///
    /// # Panics
    ///
    /// Panics if `timeout` is zero - a zero timeout means "no debouncing",
    /// which callers express by not using a `Debouncer` at all.
    pub fn new<F>(timeout: Duration, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        assert!(!timeout.is_zero(), "Debouncer requires a non-zero timeout");
        let (tx, rx) = unbounded::<Msg>();
        let handle = std::thread::Builder::new()
            .name("trellis-debounce".to_string())
            .spawn(move || {
                loop {
                    // Idle: wait for the first poke.
                    match rx.recv() {
                        Ok(Msg::Poke) => {}
                        Ok(Msg::Cancel) => continue,
                        Ok(Msg::Stop) | Err(_) => return,
                    }
                    // Armed: every further poke restarts the window.
                    loop {
                        match rx.recv_timeout(timeout) {
                            Ok(Msg::Poke) => continue,
                            Ok(Msg::Cancel) => break,
                            Ok(Msg::Stop) => return,
                            Err(RecvTimeoutError::Timeout) => {
                                action();
                                break;
                            }
                            Err(RecvTimeoutError::Disconnected) => return,
                        }
                    }
                }
            })
            .expect("failed to spawn trellis debounce thread");
        Self {
            tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Record activity: restart the quiet-period window.
    pub fn poke(&self) {
        let _ = self.tx.send(Msg::Poke);
    }

    /// Abandon a pending window without firing the action.
    pub fn cancel(&self) {
        let _ = self.tx.send(Msg::Cancel);
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        let _ = self.tx.send(Msg::Stop);
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_fires_once_after_quiet_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let debouncer = Debouncer::new(Duration::from_millis(50), move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        for _ in 0..5 {
            debouncer.poke();
            std::thread::sleep(Duration::from_millis(5));
        }

        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_each_quiet_period_fires() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let debouncer = Debouncer::new(Duration::from_millis(30), move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        debouncer.poke();
        std::thread::sleep(Duration::from_millis(100));
        debouncer.poke();
        std::thread::sleep(Duration::from_millis(100));

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cancel_discards_pending_window() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let debouncer = Debouncer::new(Duration::from_millis(40), move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        debouncer.poke();
        debouncer.cancel();
        std::thread::sleep(Duration::from_millis(120));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    #[should_panic]
    fn test_zero_timeout_panics() {
        let _ = Debouncer::new(Duration::ZERO, || {});
    }
}
