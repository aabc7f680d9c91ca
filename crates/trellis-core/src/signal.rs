//! Signal/slot notification for discrete events.
//!
//! Where [`crate::ObservableValue`] models *state* with change detection,
//! [`Signal<Args>`] models *events*: an action fired on a control, an edit
//! committed in a table cell. Connected slots are invoked directly on the
//! emitting thread; handlers that must touch UI state from a background
//! thread go through [`crate::thread::post_to_ui`].
//!
//! # Example
//!
//! ```
//! use trellis_core::Signal;
//!
//! let clicked = Signal::<()>::new();
//! let id = clicked.connect(|_| println!("clicked"));
//! clicked.emit(());
//! clicked.disconnect(id);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A type-safe signal with multiple connected slots.
///
/// `Args` is the payload passed to each slot; use `()` for argument-less
/// signals or a tuple for several values.
pub struct Signal<Args> {
    connections: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
    blocked: AtomicBool,
}

impl<Args> std::fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.connections.lock().len())
            .field(
                "blocked",
                &self.blocked.load(std::sync::atomic::Ordering::Relaxed),
            )
            .finish()
    }
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect a slot. Returns an id for later disconnection.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connections.lock().insert(Arc::new(slot))
    }

    /// Disconnect a slot by id. Returns `true` if it was connected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Disconnect every slot.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Block or unblock emission.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Check whether emission is blocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Emit the signal, invoking every connected slot in registration order.
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: "trellis_core::signal", "signal blocked, skipping emit");
            return;
        }
        // Snapshot so slots may connect/disconnect without deadlock.
        let slots: Vec<Slot<Args>> = self.connections.lock().values().cloned().collect();
        tracing::trace!(target: "trellis_core::signal", slot_count = slots.len(), "emitting signal");
        for slot in slots {
            slot(&args);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_connect_emit() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        signal.connect(move |&v| received_clone.lock().push(v));

        signal.emit(1);
        signal.emit(2);
        assert_eq!(*received.lock(), vec![1, 2]);
    }

    #[test]
    fn test_disconnect() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        let id = signal.connect(move |&v| received_clone.lock().push(v));

        signal.emit(1);
        assert!(signal.disconnect(id));
        signal.emit(2);
        assert_eq!(*received.lock(), vec![1]);
    }

    #[test]
    fn test_blocked() {
        let signal = Signal::<()>::new();
        let count = Arc::new(Mutex::new(0));

        let count_clone = count.clone();
        signal.connect(move |_| *count_clone.lock() += 1);

        signal.set_blocked(true);
        signal.emit(());
        signal.set_blocked(false);
        signal.emit(());
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_disconnect_all() {
        let signal = Signal::<()>::new();
        for _ in 0..3 {
            signal.connect(|_| {});
        }
        assert_eq!(signal.connection_count(), 3);
        signal.disconnect_all();
        assert_eq!(signal.connection_count(), 0);
    }
}
