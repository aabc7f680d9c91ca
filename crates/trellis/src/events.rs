//! A priority-aware, typed event bus.
//!
//! Subscribers register per event type with an integer priority; on
//! publication they fire in ascending priority order, ties resolving to
//! subscription order (stable). Subscribers flagged asynchronous run on
//! the bus's [`BackgroundExecutor`]; everything else runs on the
//! publishing thread.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use trellis_core::BackgroundExecutor;

type ErasedHandler = Arc<dyn Fn(Arc<dyn Any + Send + Sync>) + Send + Sync>;

struct Subscription {
    priority: i32,
    seq: u64,
    async_hint: bool,
    handler: ErasedHandler,
}

/// A typed publish/subscribe bus with ordered delivery.
pub struct EventBus {
    executor: Option<Arc<BackgroundExecutor>>,
    subscriptions: Mutex<HashMap<TypeId, Vec<Subscription>>>,
    seq: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(None)
    }
}

impl EventBus {
    /// Create a bus; asynchronous subscribers require an executor.
    pub fn new(executor: Option<Arc<BackgroundExecutor>>) -> Self {
        Self {
            executor,
            subscriptions: Mutex::new(HashMap::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Subscribe a synchronous handler for events of type `E`.
    pub fn subscribe<E, F>(&self, priority: i32, handler: F)
    where
        E: Send + Sync + 'static,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribe_with::<E, F>(priority, false, handler);
    }

    /// Subscribe with an explicit asynchronous hint.
    ///
    /// An asynchronous subscriber without an executor on the bus falls back
    /// to synchronous delivery with a warning.
    pub fn subscribe_with<E, F>(&self, priority: i32, async_hint: bool, handler: F)
    where
        E: Send + Sync + 'static,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let erased: ErasedHandler = Arc::new(move |event: Arc<dyn Any + Send + Sync>| {
            if let Ok(event) = event.downcast::<E>() {
                handler(&event);
            }
        });
        let subscription = Subscription {
            priority,
            seq: self.seq.fetch_add(1, Ordering::SeqCst),
            async_hint,
            handler: erased,
        };
        let mut subscriptions = self.subscriptions.lock();
        let slot = subscriptions.entry(TypeId::of::<E>()).or_default();
        slot.push(subscription);
        // Ascending priority, stable for ties (seq preserves
        // subscription order).
        slot.sort_by_key(|s| (s.priority, s.seq));
    }

    /// Publish an event to every subscriber of its type.
    pub fn publish<E: Send + Sync + 'static>(&self, event: E) {
        let event: Arc<dyn Any + Send + Sync> = Arc::new(event);
        let handlers: Vec<(bool, ErasedHandler)> = {
            let subscriptions = self.subscriptions.lock();
            match subscriptions.get(&TypeId::of::<E>()) {
                Some(slot) => slot
                    .iter()
                    .map(|s| (s.async_hint, Arc::clone(&s.handler)))
                    .collect(),
                None => return,
            }
        };
        tracing::trace!(
            target: "trellis::events",
            subscriber_count = handlers.len(),
            event_type = std::any::type_name::<E>(),
            "publishing event"
        );
        for (async_hint, handler) in handlers {
            if async_hint {
                match &self.executor {
                    Some(executor) => {
                        let event = Arc::clone(&event);
                        if executor.spawn(move || handler(event)).is_err() {
                            tracing::warn!(
                                target: "trellis::events",
                                "executor shut down, dropping async event delivery"
                            );
                        }
                        continue;
                    }
                    None => {
                        tracing::warn!(
                            target: "trellis::events",
                            "no executor on bus, delivering async subscriber synchronously"
                        );
                    }
                }
            }
            handler(Arc::clone(&event));
        }
    }

    /// Number of subscribers for an event type.
    pub fn subscriber_count<E: 'static>(&self) -> usize {
        self.subscriptions
            .lock()
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug)]
    struct Saved {
        id: u32,
    }

    #[test]
    fn test_priority_ordering_with_stable_ties() {
        let bus = EventBus::default();
        let order = Arc::new(Mutex::new(Vec::new()));

        for (priority, tag) in [(30, "c"), (10, "a"), (20, "b1"), (20, "b2")] {
            let order_clone = order.clone();
            bus.subscribe::<Saved, _>(priority, move |_| {
                order_clone.lock().push(tag);
            });
        }

        bus.publish(Saved { id: 1 });
        assert_eq!(*order.lock(), vec!["a", "b1", "b2", "c"]);
    }

    #[test]
    fn test_typed_routing() {
        let bus = EventBus::default();
        let count = Arc::new(Mutex::new(0));

        let count_clone = count.clone();
        bus.subscribe::<Saved, _>(0, move |event| {
            *count_clone.lock() += event.id;
        });
        bus.subscribe::<String, _>(0, |_| panic!("wrong type routed"));

        bus.publish(Saved { id: 5 });
        assert_eq!(*count.lock(), 5);
    }

    #[test]
    fn test_async_delivery_on_executor() {
        let executor = Arc::new(BackgroundExecutor::new(1));
        let bus = EventBus::new(Some(executor.clone()));
        let count = Arc::new(Mutex::new(0));

        let count_clone = count.clone();
        bus.subscribe_with::<Saved, _>(0, true, move |_| {
            *count_clone.lock() += 1;
        });

        bus.publish(Saved { id: 1 });
        executor.shutdown(); // joins the worker, so delivery is complete
        assert_eq!(*count.lock(), 1);
    }
}
