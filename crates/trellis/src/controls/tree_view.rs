//! A tree control with typed item values.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;
use trellis_core::{ObservableList, ObservableRef, ObservableValue};

use crate::graph::{NodeBase, UiNode};

use super::{bump_on_list, content_revision};

type Converter<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// One node of a tree's item hierarchy.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeItem<T> {
    /// The item value.
    pub value: T,
    /// Child items.
    pub children: Vec<TreeItem<T>>,
}

impl<T> TreeItem<T> {
    /// A leaf item.
    pub fn leaf(value: T) -> Self {
        Self {
            value,
            children: Vec::new(),
        }
    }

    /// An item with children.
    pub fn branch(value: T, children: Vec<TreeItem<T>>) -> Self {
        Self { value, children }
    }
}

/// A tree control.
///
/// Trees cannot bind cells to sub-properties; the only cell-value
/// configuration they accept is a single display converter.
pub struct TreeView<T: Clone + PartialEq + Send + Sync + 'static> {
    base: NodeBase,
    roots: ObservableList<TreeItem<T>>,
    selection: ObservableList<T>,
    converter: Mutex<Option<Converter<T>>>,
    revision: ObservableValue<u64>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> TreeView<T> {
    /// Create a tree view with the given id and root items.
    pub fn new(id: impl Into<String>, roots: Vec<TreeItem<T>>) -> Arc<Self> {
        let roots = ObservableList::from_vec(roots);
        let selection = ObservableList::new();
        let revision = content_revision();
        bump_on_list(&roots, &revision);
        bump_on_list(&selection, &revision);
        Arc::new(Self {
            base: NodeBase::new(id),
            roots,
            selection,
            converter: Mutex::new(None),
            revision,
        })
    }

    /// The root item list.
    pub fn roots(&self) -> &ObservableList<TreeItem<T>> {
        &self.roots
    }

    /// The live selection list of item values.
    pub fn selection(&self) -> &ObservableList<T> {
        &self.selection
    }

    /// Select a value.
    pub fn select(&self, value: T) {
        self.selection.set_all(vec![value]);
    }

    /// Install the display converter.
    pub fn set_converter<F>(&self, converter: F)
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        *self.converter.lock() = Some(Arc::new(converter));
    }

    /// Render a value through the installed converter.
    pub fn display_text(&self, value: &T) -> Option<String> {
        self.converter.lock().as_ref().map(|convert| convert(value))
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> std::fmt::Debug for TreeView<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeView")
            .field("id", &self.base.id())
            .finish_non_exhaustive()
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> UiNode for TreeView<T> {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "tree-view"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn user_value_set(&self) -> Option<bool> {
        Some(!self.selection.is_empty())
    }

    fn user_value_observable(&self) -> Option<ObservableRef> {
        Some(Arc::new(self.selection.clone()))
    }

    fn value_or_items_set(&self) -> Option<bool> {
        Some(!self.selection.is_empty() || !self.roots.is_empty())
    }

    fn value_or_items_observable(&self) -> Option<ObservableRef> {
        Some(Arc::new(self.revision.clone()))
    }
}
