//! A multi-selection list control.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;
use trellis_core::{ObservableList, ObservableRef, ObservableValue};

use crate::graph::{ControlProperty, NodeBase, UiNode};

use super::{bump_on_list, content_revision};

type Converter<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// A list control with an item list and a selection list.
///
/// Selection is single-select until the multi-select switch is flipped;
/// [`select`](Self::select) respects the switch.
pub struct ListView<T: Clone + PartialEq + Send + Sync + 'static> {
    base: NodeBase,
    items: ObservableList<T>,
    selection: ObservableList<T>,
    multi_select: ObservableValue<bool>,
    converter: Mutex<Option<Converter<T>>>,
    revision: ObservableValue<u64>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ListView<T> {
    /// Create a list view with the given id and items.
    pub fn new(id: impl Into<String>, items: Vec<T>) -> Arc<Self> {
        let items = ObservableList::from_vec(items);
        let selection = ObservableList::new();
        let revision = content_revision();
        bump_on_list(&items, &revision);
        bump_on_list(&selection, &revision);
        Arc::new(Self {
            base: NodeBase::new(id),
            items,
            selection,
            multi_select: ObservableValue::new(false),
            converter: Mutex::new(None),
            revision,
        })
    }

    /// The backing item list.
    pub fn items(&self) -> &ObservableList<T> {
        &self.items
    }

    /// The live selection list.
    pub fn selection(&self) -> &ObservableList<T> {
        &self.selection
    }

    /// Select an item: appended in multi-select mode, replacing otherwise.
    pub fn select(&self, item: T) {
        if self.multi_select.get() {
            if !self.selection.contains(&item) {
                self.selection.push(item);
            }
        } else {
            self.selection.set_all(vec![item]);
        }
    }

    /// Deselect an item.
    pub fn deselect(&self, item: &T) {
        self.selection.remove_item(item);
    }

    /// Install the display converter.
    pub fn set_converter<F>(&self, converter: F)
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        *self.converter.lock() = Some(Arc::new(converter));
    }

    /// Render an item through the installed converter.
    pub fn display_text(&self, item: &T) -> Option<String> {
        self.converter.lock().as_ref().map(|convert| convert(item))
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> std::fmt::Debug for ListView<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListView")
            .field("id", &self.base.id())
            .finish_non_exhaustive()
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> UiNode for ListView<T> {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "list-view"
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
        Some(!self.selection.is_empty() || !self.items.is_empty())
    }

    fn value_or_items_observable(&self) -> Option<ObservableRef> {
        Some(Arc::new(self.revision.clone()))
    }

    fn string_list_property(&self, property: ControlProperty) -> Option<ObservableList<String>> {
        let list = match property {
            ControlProperty::Items => &self.items,
            ControlProperty::SelectedItems => &self.selection,
            ControlProperty::UserValue => &self.selection,
        };
        (list as &dyn Any)
            .downcast_ref::<ObservableList<String>>()
            .cloned()
    }

    fn multi_select_flag(&self) -> Option<ObservableValue<bool>> {
        Some(self.multi_select.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_select_replaces() {
        let list = ListView::new("tags", vec!["a", "b", "c"]);
        list.select("a");
        list.select("b");
        assert_eq!(list.selection().snapshot(), vec!["b"]);
    }

    #[test]
    fn test_multi_select_appends() {
        let list = ListView::new("tags", vec!["a", "b", "c"]);
        list.multi_select_flag().unwrap().set(true);
        list.select("a");
        list.select("b");
        list.select("a"); // already selected, ignored
        assert_eq!(list.selection().snapshot(), vec!["a", "b"]);
    }

    #[test]
    fn test_string_list_property_for_string_items() {
        let list = ListView::new("tags", vec!["a".to_string()]);
        assert!(list.string_list_property(ControlProperty::Items).is_some());

        let numbers = ListView::new("nums", vec![1, 2]);
        assert!(numbers.string_list_property(ControlProperty::Items).is_none());
    }

    #[test]
    fn test_converter_rendering() {
        let list = ListView::new("nums", vec![1, 2]);
        assert_eq!(list.display_text(&1), None);
        list.set_converter(|n| format!("#{n}"));
        assert_eq!(list.display_text(&1), Some("#1".to_string()));
    }
}
