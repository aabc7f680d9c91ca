//! A single-line free-text input.

use std::any::Any;
use std::sync::Arc;

use trellis_core::{ObservableRef, ObservableValue, Signal};

use crate::graph::{ControlProperty, NodeBase, UiNode};

/// A free-text input control.
///
/// The user value is the text itself; it counts as "set" when the trimmed
/// text is non-empty. The action signal fires on an explicit commit
/// (the Enter-key equivalent).
#[derive(Debug)]
pub struct TextInput {
    base: NodeBase,
    text: ObservableValue<String>,
    action: Signal<()>,
}

impl TextInput {
    /// Create a text input with the given id and empty text.
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            base: NodeBase::new(id),
            text: ObservableValue::new(String::new()),
            action: Signal::new(),
        })
    }

    /// The live text property.
    pub fn text(&self) -> &ObservableValue<String> {
        &self.text
    }

    /// Replace the text.
    pub fn set_text(&self, text: impl Into<String>) {
        self.text.set(text.into());
    }

    /// Commit the current text, firing the action signal.
    pub fn commit(&self) {
        self.action.emit(());
    }
}

impl UiNode for TextInput {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "text-input"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn user_value_set(&self) -> Option<bool> {
        Some(self.text.with(|text| !text.trim().is_empty()))
    }

    fn user_value_observable(&self) -> Option<ObservableRef> {
        Some(Arc::new(self.text.clone()))
    }

    fn value_or_items_set(&self) -> Option<bool> {
        self.user_value_set()
    }

    fn value_or_items_observable(&self) -> Option<ObservableRef> {
        self.user_value_observable()
    }

    fn action_signal(&self) -> Option<&Signal<()>> {
        Some(&self.action)
    }

    fn text_property(&self, property: ControlProperty) -> Option<ObservableValue<String>> {
        match property {
            ControlProperty::UserValue => Some(self.text.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_value_requires_non_blank_text() {
        let input = TextInput::new("name");
        assert_eq!(input.user_value_set(), Some(false));
        input.set_text("   ");
        assert_eq!(input.user_value_set(), Some(false));
        input.set_text("carol");
        assert_eq!(input.user_value_set(), Some(true));
    }

    #[test]
    fn test_commit_fires_action() {
        let input = TextInput::new("name");
        let fired = std::sync::Arc::new(parking_lot::Mutex::new(0));
        let fired_clone = fired.clone();
        input.action_signal().unwrap().connect(move |_| {
            *fired_clone.lock() += 1;
        });
        input.commit();
        assert_eq!(*fired.lock(), 1);
    }
}
