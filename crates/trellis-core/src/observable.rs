//! Reactive value cells with change notification.
//!
//! [`ObservableValue<T>`] is the data backbone of Trellis: a shared, thread-safe
//! cell that notifies registered listeners when its value changes. Bindings,
//! control state and validation results are all carried by observable values.
//!
//! Two listener flavours are supported:
//!
//! - **Change listeners** receive the old and the new value.
//! - **Invalidation listeners** receive no arguments; they exist so derived
//!   bindings can mark themselves dirty without cloning values.
//!
//! Cloning an `ObservableValue` clones the *handle*, not the value: both
//! handles observe and mutate the same cell. This is what lets a control and a
//! binding share one live property.
//!
//! # Example
//!
//! ```
//! use trellis_core::ObservableValue;
//!
//! let name = ObservableValue::new("".to_string());
//! let id = name.on_change(|old, new| {
//!     println!("{old:?} -> {new:?}");
//! });
//!
//! assert!(name.set("carol".to_string()));
//! // Setting an equal value does not notify.
//! assert!(!name.set("carol".to_string()));
//! name.remove_change_listener(id);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::fmt;

use parking_lot::{Mutex, RwLock};
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// A unique identifier for a registered listener.
    ///
    /// Returned by the `on_*` registration methods and accepted by the
    /// matching `remove_*` methods. Valid until explicitly removed or until
    /// the last handle to the observable is dropped.
    pub struct ListenerId;
}

type ChangeListener<T> = Arc<dyn Fn(&T, &T) + Send + Sync>;
type InvalidationListener = Arc<dyn Fn() + Send + Sync>;

struct ObservableInner<T> {
    value: RwLock<T>,
    change_listeners: Mutex<SlotMap<ListenerId, ChangeListener<T>>>,
    invalidation_listeners: Mutex<SlotMap<ListenerId, InvalidationListener>>,
    blocked: AtomicBool,
}

/// A shared reactive value cell.
///
/// See the [module documentation](self) for an overview.
///
/// # Thread Safety
///
/// `ObservableValue<T>` is `Send + Sync` for `T: Send + Sync` and uses
/// interior mutability. Listeners are invoked on the thread performing the
/// mutation; cross-thread marshaling is the job of
/// [`crate::thread::post_to_ui`], not of the cell itself.
pub struct ObservableValue<T> {
    inner: Arc<ObservableInner<T>>,
}

impl<T> Clone for ObservableValue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> ObservableValue<T> {
    /// Create a new observable cell with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(ObservableInner {
                value: RwLock::new(value),
                change_listeners: Mutex::new(SlotMap::with_key()),
                invalidation_listeners: Mutex::new(SlotMap::with_key()),
                blocked: AtomicBool::new(false),
            }),
        }
    }

    /// Get the current value.
    ///
    /// This clones the value. For large types, prefer [`with`](Self::with).
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.inner.value.read())
    }

    /// Set the value without notifying listeners.
    ///
    /// Useful during initialization and batch updates.
    pub fn set_silent(&self, value: T) {
        *self.inner.value.write() = value;
    }

    /// Register a change listener receiving `(old, new)` on every change.
    pub fn on_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        self.inner.change_listeners.lock().insert(Arc::new(listener))
    }

    /// Register an invalidation listener fired on every change.
    pub fn on_invalidate<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner
            .invalidation_listeners
            .lock()
            .insert(Arc::new(listener))
    }

    /// Remove a change listener. Returns `true` if it was registered.
    pub fn remove_change_listener(&self, id: ListenerId) -> bool {
        self.inner.change_listeners.lock().remove(id).is_some()
    }

    /// Remove an invalidation listener. Returns `true` if it was registered.
    pub fn remove_invalidation_listener(&self, id: ListenerId) -> bool {
        self.inner.invalidation_listeners.lock().remove(id).is_some()
    }

    /// Block or unblock notification.
    ///
    /// While blocked, `set` still updates the value but fires no listeners.
    pub fn set_blocked(&self, blocked: bool) {
        self.inner.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Check whether notification is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.inner.blocked.load(Ordering::SeqCst)
    }

    /// Number of registered listeners of both kinds.
    pub fn listener_count(&self) -> usize {
        self.inner.change_listeners.lock().len() + self.inner.invalidation_listeners.lock().len()
    }

    fn notify(&self, old: &T, new: &T) {
        if self.is_blocked() {
            tracing::trace!(target: "trellis_core::observable", "notification blocked, skipping");
            return;
        }
        // Snapshot the listener sets so a listener may register or remove
        // listeners without deadlocking.
        let change: Vec<ChangeListener<T>> =
            self.inner.change_listeners.lock().values().cloned().collect();
        let invalidation: Vec<InvalidationListener> = self
            .inner
            .invalidation_listeners
            .lock()
            .values()
            .cloned()
            .collect();
        for listener in change {
            listener(old, new);
        }
        for listener in invalidation {
            listener();
        }
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ObservableValue<T> {
    /// Set the value, returning `true` if it changed.
    ///
    /// The new value is compared with the current one via `PartialEq`; equal
    /// values are not written and fire no notification.
    pub fn set(&self, value: T) -> bool {
        let old = {
            let mut current = self.inner.value.write();
            if *current == value {
                return false;
            }
            std::mem::replace(&mut *current, value.clone())
        };
        self.notify(&old, &value);
        true
    }

    /// Set the value, returning the previous value if it changed.
    pub fn replace(&self, value: T) -> Option<T> {
        let old = {
            let mut current = self.inner.value.write();
            if *current == value {
                return None;
            }
            std::mem::replace(&mut *current, value.clone())
        };
        self.notify(&old, &value);
        Some(old)
    }
}

impl<T: Clone + Default + Send + Sync + 'static> Default for ObservableValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> fmt::Debug for ObservableValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableValue")
            .field("value", &self.get())
            .finish()
    }
}

/// Type-erased observable dependency.
///
/// Predicate chains and derived bindings subscribe to invalidation without
/// knowing the concrete value type. Both [`ObservableValue`] and
/// [`crate::ObservableList`] implement this trait.
pub trait AnyObservable: Send + Sync {
    /// Register a type-erased invalidation listener.
    fn subscribe_invalidation(&self, listener: Box<dyn Fn() + Send + Sync>) -> ListenerId;

    /// Remove a previously registered invalidation listener.
    fn unsubscribe_invalidation(&self, id: ListenerId) -> bool;
}

impl<T: Clone + Send + Sync + 'static> AnyObservable for ObservableValue<T> {
    fn subscribe_invalidation(&self, listener: Box<dyn Fn() + Send + Sync>) -> ListenerId {
        self.on_invalidate(move || listener())
    }

    fn unsubscribe_invalidation(&self, id: ListenerId) -> bool {
        self.remove_invalidation_listener(id)
    }
}

/// A cheap cloneable reference to any observable dependency.
pub type ObservableRef = Arc<dyn AnyObservable>;

/// RAII guard that removes a listener subscription when dropped.
///
/// Built from an arbitrary unsubscribe closure so it works uniformly across
/// observable values, lists and signals.
pub struct ListenerGuard {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl ListenerGuard {
    /// Wrap an unsubscribe closure.
    pub fn new<F>(unsubscribe: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// A guard that does nothing on drop.
    pub fn noop() -> Self {
        Self { unsubscribe: None }
    }

    /// Drop the guard without unsubscribing.
    pub fn forget(mut self) {
        self.unsubscribe = None;
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(f) = self.unsubscribe.take() {
            f();
        }
    }
}

impl fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerGuard")
            .field("armed", &self.unsubscribe.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_observable_basic() {
        let value = ObservableValue::new(42);
        assert_eq!(value.get(), 42);
        assert!(value.set(100));
        assert_eq!(value.get(), 100);
    }

    #[test]
    fn test_set_detects_change() {
        let value = ObservableValue::new(10);
        assert!(!value.set(10));
        assert!(value.set(20));
    }

    #[test]
    fn test_change_listener_receives_old_and_new() {
        let value = ObservableValue::new(1);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = seen.clone();
        value.on_change(move |old, new| {
            seen_clone.lock().push((*old, *new));
        });

        value.set(2);
        value.set(2); // no change, no notification
        value.set(3);

        assert_eq!(*seen.lock(), vec![(1, 2), (2, 3)]);
    }

    #[test]
    fn test_invalidation_listener() {
        let value = ObservableValue::new("a".to_string());
        let count = Arc::new(Mutex::new(0));

        let count_clone = count.clone();
        value.on_invalidate(move || {
            *count_clone.lock() += 1;
        });

        value.set("b".to_string());
        value.set("c".to_string());
        assert_eq!(*count.lock(), 2);
    }

    #[test]
    fn test_remove_listener() {
        let value = ObservableValue::new(0);
        let count = Arc::new(Mutex::new(0));

        let count_clone = count.clone();
        let id = value.on_change(move |_, _| {
            *count_clone.lock() += 1;
        });

        value.set(1);
        assert!(value.remove_change_listener(id));
        value.set(2);
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_blocked_suppresses_notification() {
        let value = ObservableValue::new(0);
        let count = Arc::new(Mutex::new(0));

        let count_clone = count.clone();
        value.on_invalidate(move || {
            *count_clone.lock() += 1;
        });

        value.set_blocked(true);
        value.set(1);
        value.set_blocked(false);
        value.set(2);

        assert_eq!(value.get(), 2);
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_shared_handle_semantics() {
        let a = ObservableValue::new(5);
        let b = a.clone();
        b.set(9);
        assert_eq!(a.get(), 9);
    }

    #[test]
    fn test_set_silent() {
        let value = ObservableValue::new(1);
        let count = Arc::new(Mutex::new(0));

        let count_clone = count.clone();
        value.on_invalidate(move || {
            *count_clone.lock() += 1;
        });

        value.set_silent(7);
        assert_eq!(value.get(), 7);
        assert_eq!(*count.lock(), 0);
    }

    #[test]
    fn test_replace_returns_old() {
        let value = ObservableValue::new("x".to_string());
        assert_eq!(value.replace("x".to_string()), None);
        assert_eq!(value.replace("y".to_string()), Some("x".to_string()));
    }

    #[test]
    fn test_any_observable_subscription() {
        let value = ObservableValue::new(0);
        let erased: &dyn AnyObservable = &value;
        let count = Arc::new(Mutex::new(0));

        let count_clone = count.clone();
        let id = erased.subscribe_invalidation(Box::new(move || {
            *count_clone.lock() += 1;
        }));

        value.set(1);
        assert_eq!(*count.lock(), 1);
        assert!(erased.unsubscribe_invalidation(id));
        value.set(2);
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_listener_guard_unsubscribes_on_drop() {
        let value = ObservableValue::new(0);
        let count = Arc::new(Mutex::new(0));

        {
            let count_clone = count.clone();
            let id = value.on_invalidate(move || {
                *count_clone.lock() += 1;
            });
            let guarded = value.clone();
            let _guard = ListenerGuard::new(move || {
                guarded.remove_invalidation_listener(id);
            });
            value.set(1);
        }

        value.set(2);
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_listener_registration_inside_listener() {
        // Registering from inside a listener must not deadlock.
        let value = ObservableValue::new(0);
        let inner = value.clone();
        value.on_change(move |_, _| {
            inner.on_invalidate(|| {});
        });
        value.set(1);
        assert!(value.listener_count() >= 2);
    }

    #[test]
    fn test_thread_safe_mutation() {
        let value = Arc::new(ObservableValue::new(0));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let value = value.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        value.set(i * 100 + j);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}
