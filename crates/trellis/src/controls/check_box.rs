//! A two-state check box.

use std::any::Any;
use std::sync::Arc;

use trellis_core::{ObservableRef, ObservableValue};

use crate::graph::{NodeBase, UiNode};

/// A check box whose user value is its checked flag.
#[derive(Debug)]
pub struct CheckBox {
    base: NodeBase,
    checked: ObservableValue<bool>,
}

impl CheckBox {
    /// Create an unchecked check box with the given id.
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            base: NodeBase::new(id),
            checked: ObservableValue::new(false),
        })
    }

    /// The live checked property.
    pub fn checked(&self) -> &ObservableValue<bool> {
        &self.checked
    }

    /// Set the checked flag.
    pub fn set_checked(&self, checked: bool) {
        self.checked.set(checked);
    }
}

impl UiNode for CheckBox {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "check-box"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn user_value_set(&self) -> Option<bool> {
        Some(self.checked.get())
    }

    fn user_value_observable(&self) -> Option<ObservableRef> {
        Some(Arc::new(self.checked.clone()))
    }

    fn value_or_items_set(&self) -> Option<bool> {
        self.user_value_set()
    }

    fn value_or_items_observable(&self) -> Option<ObservableRef> {
        self.user_value_observable()
    }

    fn bool_property(&self) -> Option<ObservableValue<bool>> {
        Some(self.checked.clone())
    }
}
