//! A plain container node.

use std::any::Any;
use std::sync::Arc;

use crate::graph::{NodeBase, UiNode};

/// A container without value capabilities.
///
/// Panes structure the tree and can be the target of disable/enable
/// bindings and nested-view attachment; using one as a value source in a
/// declaration is a configuration error.
#[derive(Debug)]
pub struct Pane {
    base: NodeBase,
}

impl Pane {
    /// Create a pane with the given id.
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            base: NodeBase::new(id),
        })
    }
}

impl UiNode for Pane {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "pane"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
