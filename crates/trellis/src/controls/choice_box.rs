//! A single-selection choice control.

use std::any::Any;
use std::sync::Arc;

use trellis_core::{ObservableList, ObservableRef, ObservableValue};

use crate::graph::{NodeBase, UiNode};

use super::{bump_on_list, bump_on_value, content_revision};

/// A drop-down style control selecting one of its items.
pub struct ChoiceBox<T: Clone + PartialEq + Send + Sync + 'static> {
    base: NodeBase,
    items: ObservableList<T>,
    selected: ObservableValue<Option<T>>,
    revision: ObservableValue<u64>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ChoiceBox<T> {
    /// Create a choice box with the given id and items, nothing selected.
    pub fn new(id: impl Into<String>, items: Vec<T>) -> Arc<Self> {
        let items = ObservableList::from_vec(items);
        let selected = ObservableValue::new(None);
        let revision = content_revision();
        bump_on_list(&items, &revision);
        bump_on_value(&selected, &revision);
        Arc::new(Self {
            base: NodeBase::new(id),
            items,
            selected,
            revision,
        })
    }

    /// The backing item list.
    pub fn items(&self) -> &ObservableList<T> {
        &self.items
    }

    /// The live selection property.
    pub fn selected(&self) -> &ObservableValue<Option<T>> {
        &self.selected
    }

    /// Select an item (does not check membership).
    pub fn select(&self, item: T) {
        self.selected.set(Some(item));
    }

    /// Clear the selection.
    pub fn clear_selection(&self) {
        self.selected.set(None);
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> std::fmt::Debug for ChoiceBox<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChoiceBox")
            .field("id", &self.base.id())
            .finish_non_exhaustive()
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> UiNode for ChoiceBox<T> {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "choice-box"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn user_value_set(&self) -> Option<bool> {
        Some(self.selected.with(Option::is_some))
    }

    fn user_value_observable(&self) -> Option<ObservableRef> {
        Some(Arc::new(self.selected.clone()))
    }

    fn value_or_items_set(&self) -> Option<bool> {
        Some(self.selected.with(Option::is_some) || !self.items.is_empty())
    }

    fn value_or_items_observable(&self) -> Option<ObservableRef> {
        Some(Arc::new(self.revision.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_value_follows_selection() {
        let choice = ChoiceBox::new("color", vec!["red", "green"]);
        assert_eq!(choice.user_value_set(), Some(false));
        choice.select("red");
        assert_eq!(choice.user_value_set(), Some(true));
        choice.clear_selection();
        assert_eq!(choice.user_value_set(), Some(false));
    }

    #[test]
    fn test_value_or_items_counts_content() {
        let empty: Arc<ChoiceBox<&str>> = ChoiceBox::new("empty", vec![]);
        assert_eq!(empty.value_or_items_set(), Some(false));

        let populated = ChoiceBox::new("colors", vec!["red"]);
        // Populated but unselected still counts as "has a value or items".
        assert_eq!(populated.value_or_items_set(), Some(true));
        assert_eq!(populated.user_value_set(), Some(false));
    }
}
