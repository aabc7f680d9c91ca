//! Observable collections and live projections.
//!
//! [`ObservableList<T>`] is the collection counterpart of
//! [`crate::ObservableValue`]: a shared, thread-safe list that reports
//! mutations to registered listeners as [`ListChange`] payloads (what was
//! added, what was removed). Multi-value controls expose their item and
//! selection lists as observable lists.
//!
//! [`FilteredList`] and [`SortedList`] are live projections: they own an
//! output list that is recomputed whenever the source list mutates or the
//! filter/comparator is replaced. Projections compose - a sorted view over a
//! filtered view stays live through both.

use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use slotmap::SlotMap;

use crate::observable::{AnyObservable, ListenerGuard, ListenerId, ObservableValue};

/// A single mutation report delivered to list-change listeners.
///
/// Wholesale replacements (`set_all`) report the entire previous content as
/// removed and the entire new content as added.
#[derive(Clone, Debug)]
pub struct ListChange<T> {
    /// Elements added by the mutation, in list order.
    pub added: Vec<T>,
    /// Elements removed by the mutation, in previous list order.
    pub removed: Vec<T>,
}

impl<T> ListChange<T> {
    fn added(items: Vec<T>) -> Self {
        Self {
            added: items,
            removed: Vec::new(),
        }
    }

    fn removed(items: Vec<T>) -> Self {
        Self {
            added: Vec::new(),
            removed: items,
        }
    }
}

type ListListener<T> = Arc<dyn Fn(&ListChange<T>) + Send + Sync>;
type InvalidationListener = Arc<dyn Fn() + Send + Sync>;

struct ListInner<T> {
    items: RwLock<Vec<T>>,
    list_listeners: Mutex<SlotMap<ListenerId, ListListener<T>>>,
    invalidation_listeners: Mutex<SlotMap<ListenerId, InvalidationListener>>,
}

/// A shared observable list.
///
/// Cloning clones the handle: all clones read and mutate the same backing
/// vector, which is what allows a control, a projection and a binding to
/// share one item list.
pub struct ObservableList<T> {
    inner: Arc<ListInner<T>>,
}

impl<T> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> ObservableList<T> {
    /// Create an empty observable list.
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Create an observable list seeded with `items`.
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            inner: Arc::new(ListInner {
                items: RwLock::new(items),
                list_listeners: Mutex::new(SlotMap::with_key()),
                invalidation_listeners: Mutex::new(SlotMap::with_key()),
            }),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.inner.items.read().len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.items.read().is_empty()
    }

    /// Clone of the element at `index`, if present.
    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.items.read().get(index).cloned()
    }

    /// Clone of the full content.
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.items.read().clone()
    }

    /// Access the content through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&[T]) -> R,
    {
        f(&self.inner.items.read())
    }

    /// Append an element.
    pub fn push(&self, item: T) {
        self.inner.items.write().push(item.clone());
        self.notify(ListChange::added(vec![item]));
    }

    /// Insert an element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&self, index: usize, item: T) {
        self.inner.items.write().insert(index, item.clone());
        self.notify(ListChange::added(vec![item]));
    }

    /// Remove and return the element at `index`, if present.
    pub fn remove(&self, index: usize) -> Option<T> {
        let removed = {
            let mut items = self.inner.items.write();
            if index >= items.len() {
                return None;
            }
            items.remove(index)
        };
        self.notify(ListChange::removed(vec![removed.clone()]));
        Some(removed)
    }

    /// Remove all elements.
    pub fn clear(&self) {
        let removed = std::mem::take(&mut *self.inner.items.write());
        if !removed.is_empty() {
            self.notify(ListChange::removed(removed));
        }
    }

    /// Mutate the element at `index` in place.
    ///
    /// Reports the previous element as removed and the mutated one as
    /// added. Returns `false` if `index` is out of bounds.
    pub fn update<F>(&self, index: usize, f: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        let (old, new) = {
            let mut items = self.inner.items.write();
            match items.get_mut(index) {
                Some(item) => {
                    let old = item.clone();
                    f(item);
                    (old, item.clone())
                }
                None => return false,
            }
        };
        self.notify(ListChange {
            added: vec![new],
            removed: vec![old],
        });
        true
    }

    /// Replace the entire content.
    ///
    /// Reports the old content as removed and the new content as added.
    pub fn set_all(&self, items: Vec<T>) {
        let removed = {
            let mut current = self.inner.items.write();
            std::mem::replace(&mut *current, items.clone())
        };
        self.notify(ListChange {
            added: items,
            removed,
        });
    }

    /// Register a list-change listener.
    pub fn on_list_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ListChange<T>) + Send + Sync + 'static,
    {
        self.inner.list_listeners.lock().insert(Arc::new(listener))
    }

    /// Register an invalidation listener fired on every mutation.
    pub fn on_invalidate<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner
            .invalidation_listeners
            .lock()
            .insert(Arc::new(listener))
    }

    /// Remove a list-change listener.
    pub fn remove_list_listener(&self, id: ListenerId) -> bool {
        self.inner.list_listeners.lock().remove(id).is_some()
    }

    /// Remove an invalidation listener.
    pub fn remove_invalidation_listener(&self, id: ListenerId) -> bool {
        self.inner.invalidation_listeners.lock().remove(id).is_some()
    }

    fn notify(&self, change: ListChange<T>) {
        let listeners: Vec<ListListener<T>> =
            self.inner.list_listeners.lock().values().cloned().collect();
        let invalidation: Vec<InvalidationListener> = self
            .inner
            .invalidation_listeners
            .lock()
            .values()
            .cloned()
            .collect();
        for listener in listeners {
            listener(&change);
        }
        for listener in invalidation {
            listener();
        }
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ObservableList<T> {
    /// Whether the list contains `item`.
    pub fn contains(&self, item: &T) -> bool {
        self.inner.items.read().contains(item)
    }

    /// Remove the first occurrence of `item`. Returns `true` if found.
    pub fn remove_item(&self, item: &T) -> bool {
        let removed = {
            let mut items = self.inner.items.write();
            match items.iter().position(|x| x == item) {
                Some(pos) => Some(items.remove(pos)),
                None => None,
            }
        };
        match removed {
            Some(removed) => {
                self.notify(ListChange::removed(vec![removed]));
                true
            }
            None => false,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> AnyObservable for ObservableList<T> {
    fn subscribe_invalidation(&self, listener: Box<dyn Fn() + Send + Sync>) -> ListenerId {
        self.on_invalidate(move || listener())
    }

    fn unsubscribe_invalidation(&self, id: ListenerId) -> bool {
        self.remove_invalidation_listener(id)
    }
}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableList")
            .field("items", &self.snapshot())
            .finish()
    }
}

/// A shared filter predicate with pointer-identity equality.
///
/// Wrapping the closure gives the predicate property well-defined change
/// detection: replacing the filter always counts as a change, re-setting the
/// same `Filter` handle does not.
pub struct Filter<T>(Arc<dyn Fn(&T) -> bool + Send + Sync>);

impl<T> Filter<T> {
    /// Create a filter from a predicate closure.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    /// A filter accepting every element.
    pub fn accept_all() -> Self {
        Self::new(|_| true)
    }

    /// Test one element.
    pub fn test(&self, item: &T) -> bool {
        (self.0)(item)
    }
}

impl<T> Clone for Filter<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> PartialEq for Filter<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> fmt::Debug for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Filter")
    }
}

/// A live filtered projection of a source list.
///
/// The output list is recomputed wholesale on every source mutation and on
/// every filter replacement. Item lists in UI views are small; recomputing
/// beats diff bookkeeping here.
pub struct FilteredList<T> {
    output: ObservableList<T>,
    filter: ObservableValue<Filter<T>>,
    _guards: Vec<ListenerGuard>,
}

impl<T: Clone + Send + Sync + 'static> FilteredList<T> {
    /// Create a live filtered view over `source`, driven by a replaceable
    /// filter property.
    pub fn new(source: &ObservableList<T>, filter: ObservableValue<Filter<T>>) -> Self {
        let output = ObservableList::new();
        Self::recompute(source, &filter, &output);

        let mut guards = Vec::new();

        {
            let source_clone = source.clone();
            let filter_clone = filter.clone();
            let output_clone = output.clone();
            let id = source.on_invalidate(move || {
                Self::recompute(&source_clone, &filter_clone, &output_clone);
            });
            let source_for_guard = source.clone();
            guards.push(ListenerGuard::new(move || {
                source_for_guard.remove_invalidation_listener(id);
            }));
        }

        {
            let source_clone = source.clone();
            let filter_clone = filter.clone();
            let output_clone = output.clone();
            let id = filter.on_invalidate(move || {
                Self::recompute(&source_clone, &filter_clone, &output_clone);
            });
            let filter_for_guard = filter.clone();
            guards.push(ListenerGuard::new(move || {
                filter_for_guard.remove_invalidation_listener(id);
            }));
        }

        Self {
            output,
            filter,
            _guards: guards,
        }
    }

    fn recompute(
        source: &ObservableList<T>,
        filter: &ObservableValue<Filter<T>>,
        output: &ObservableList<T>,
    ) {
        let predicate = filter.get();
        let items = source.with(|items| {
            items
                .iter()
                .filter(|item| predicate.test(item))
                .cloned()
                .collect::<Vec<_>>()
        });
        output.set_all(items);
    }

    /// The live filtered output list.
    pub fn output(&self) -> &ObservableList<T> {
        &self.output
    }

    /// The filter property driving this view.
    pub fn filter(&self) -> &ObservableValue<Filter<T>> {
        &self.filter
    }
}

/// A shared comparator with pointer-identity equality.
pub struct Comparator<T>(Arc<dyn Fn(&T, &T) -> CmpOrdering + Send + Sync>);

impl<T> Comparator<T> {
    /// Create a comparator from a closure.
    pub fn new<F>(compare: F) -> Self
    where
        F: Fn(&T, &T) -> CmpOrdering + Send + Sync + 'static,
    {
        Self(Arc::new(compare))
    }

    /// Compare two elements.
    pub fn compare(&self, a: &T, b: &T) -> CmpOrdering {
        (self.0)(a, b)
    }
}

impl<T: Ord> Comparator<T> {
    /// Natural ordering.
    pub fn natural() -> Self {
        Self::new(|a: &T, b: &T| a.cmp(b))
    }
}

impl<T> Clone for Comparator<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Comparator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Comparator")
    }
}

/// A live sorted projection of a source list.
pub struct SortedList<T> {
    output: ObservableList<T>,
    _guard: ListenerGuard,
}

impl<T: Clone + Send + Sync + 'static> SortedList<T> {
    /// Create a live sorted view over `source` using `comparator`.
    ///
    /// The sort is stable, so elements comparing equal keep their source
    /// order.
    pub fn new(source: &ObservableList<T>, comparator: Comparator<T>) -> Self {
        let output = ObservableList::new();
        Self::recompute(source, &comparator, &output);

        let source_clone = source.clone();
        let comparator_clone = comparator.clone();
        let output_clone = output.clone();
        let id = source.on_invalidate(move || {
            Self::recompute(&source_clone, &comparator_clone, &output_clone);
        });
        let source_for_guard = source.clone();
        let guard = ListenerGuard::new(move || {
            source_for_guard.remove_invalidation_listener(id);
        });

        Self {
            output,
            _guard: guard,
        }
    }

    fn recompute(source: &ObservableList<T>, comparator: &Comparator<T>, output: &ObservableList<T>) {
        let mut items = source.snapshot();
        items.sort_by(|a, b| comparator.compare(a, b));
        output.set_all(items);
    }

    /// The live sorted output list.
    pub fn output(&self) -> &ObservableList<T> {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_push_and_snapshot() {
        let list = ObservableList::new();
        list.push(1);
        list.push(2);
        assert_eq!(list.snapshot(), vec![1, 2]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_list_change_payloads() {
        let list = ObservableList::from_vec(vec![1, 2, 3]);
        let changes = Arc::new(Mutex::new(Vec::new()));

        let changes_clone = changes.clone();
        list.on_list_change(move |change| {
            changes_clone
                .lock()
                .push((change.added.clone(), change.removed.clone()));
        });

        list.push(4);
        list.remove(0);
        list.set_all(vec![9]);

        let seen = changes.lock();
        assert_eq!(seen[0], (vec![4], vec![]));
        assert_eq!(seen[1], (vec![], vec![1]));
        assert_eq!(seen[2], (vec![9], vec![2, 3, 4]));
    }

    #[test]
    fn test_remove_item() {
        let list = ObservableList::from_vec(vec!["a", "b", "c"]);
        assert!(list.remove_item(&"b"));
        assert!(!list.remove_item(&"z"));
        assert_eq!(list.snapshot(), vec!["a", "c"]);
    }

    #[test]
    fn test_clear_notifies_once() {
        let list = ObservableList::from_vec(vec![1, 2]);
        let count = Arc::new(Mutex::new(0));

        let count_clone = count.clone();
        list.on_invalidate(move || *count_clone.lock() += 1);

        list.clear();
        list.clear(); // already empty, no notification
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_filtered_list_tracks_source() {
        let source = ObservableList::from_vec(vec![1, 2, 3, 4]);
        let filter = ObservableValue::new(Filter::new(|n: &i32| n % 2 == 0));
        let filtered = FilteredList::new(&source, filter.clone());

        assert_eq!(filtered.output().snapshot(), vec![2, 4]);

        source.push(6);
        source.push(7);
        assert_eq!(filtered.output().snapshot(), vec![2, 4, 6]);
    }

    #[test]
    fn test_filtered_list_tracks_predicate_swap() {
        let source = ObservableList::from_vec(vec![1, 2, 3, 4, 5]);
        let filter = ObservableValue::new(Filter::accept_all());
        let filtered = FilteredList::new(&source, filter.clone());

        assert_eq!(filtered.output().len(), 5);

        filter.set(Filter::new(|n: &i32| *n > 3));
        assert_eq!(filtered.output().snapshot(), vec![4, 5]);
    }

    #[test]
    fn test_sorted_list() {
        let source = ObservableList::from_vec(vec![3, 1, 2]);
        let sorted = SortedList::new(&source, Comparator::natural());
        assert_eq!(sorted.output().snapshot(), vec![1, 2, 3]);

        source.push(0);
        assert_eq!(sorted.output().snapshot(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_sorted_over_filtered_stays_live() {
        let source = ObservableList::from_vec(vec![5, 1, 4, 2]);
        let filter = ObservableValue::new(Filter::new(|n: &i32| *n != 4));
        let filtered = FilteredList::new(&source, filter);
        let sorted = SortedList::new(filtered.output(), Comparator::natural());

        assert_eq!(sorted.output().snapshot(), vec![1, 2, 5]);

        source.push(3);
        assert_eq!(sorted.output().snapshot(), vec![1, 2, 3, 5]);
    }

    #[test]
    fn test_shared_handles() {
        let a: ObservableList<i32> = ObservableList::new();
        let b = a.clone();
        b.push(1);
        assert_eq!(a.snapshot(), vec![1]);
    }
}
