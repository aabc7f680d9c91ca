//! Core systems for Trellis.
//!
//! This crate provides the reactive and threading primitives the Trellis
//! wiring framework is built on:
//!
//! - **Observable values**: shared cells with change and invalidation
//!   listeners
//! - **Signals**: type-safe event emission with multiple connected slots
//! - **Observable collections**: lists reporting added/removed elements,
//!   plus live filtered and sorted projections
//! - **UI-thread confinement**: thread registration, assertion and a task
//!   queue for cross-thread dispatch
//! - **Background executor**: an owned worker pool for asynchronous
//!   handlers with explicit shutdown
//! - **Debouncer**: restartable quiet-period delays for change listeners
//!   and validation
//!
//! # Observable Example
//!
//! ```
//! use trellis_core::ObservableValue;
//!
//! let text = ObservableValue::new(String::new());
//! text.on_change(|old, new| {
//!     println!("'{old}' -> '{new}'");
//! });
//! text.set("hello".to_string());
//! ```
//!
//! # Projection Example
//!
//! ```
//! use trellis_core::{Filter, FilteredList, ObservableList, ObservableValue};
//!
//! let items = ObservableList::from_vec(vec![1, 2, 3, 4]);
//! let filter = ObservableValue::new(Filter::new(|n: &i32| n % 2 == 0));
//! let evens = FilteredList::new(&items, filter);
//!
//! items.push(6);
//! assert_eq!(evens.output().snapshot(), vec![2, 4, 6]);
//! ```

pub mod collections;
pub mod debounce;
pub mod error;
pub mod executor;
pub mod observable;
pub mod signal;
pub mod thread;

pub use collections::{Comparator, Filter, FilteredList, ListChange, ObservableList, SortedList};
pub use debounce::Debouncer;
pub use error::{CoreError, ExecutorError, Result, UiQueueError};
pub use executor::BackgroundExecutor;
pub use observable::{AnyObservable, ListenerGuard, ListenerId, ObservableRef, ObservableValue};
pub use signal::{ConnectionId, Signal};
pub use thread::{UiQueue, is_ui_thread, post_to_ui, register_ui_thread};
