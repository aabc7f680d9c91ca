//! A triggerable button.

use std::any::Any;
use std::sync::Arc;

use trellis_core::Signal;

use crate::graph::{NodeBase, UiNode};

/// A button with an action signal and no value.
#[derive(Debug)]
pub struct Button {
    base: NodeBase,
    action: Signal<()>,
}

impl Button {
    /// Create a button with the given id.
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            base: NodeBase::new(id),
            action: Signal::new(),
        })
    }

    /// Trigger the button, unless it is disabled.
    pub fn fire(&self) {
        if self.base.disabled().get() {
            tracing::trace!(target: "trellis::controls", id = %self.base.id(), "button disabled, ignoring fire");
            return;
        }
        self.action.emit(());
    }
}

impl UiNode for Button {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "button"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn action_signal(&self) -> Option<&Signal<()>> {
        Some(&self.action)
    }
}
