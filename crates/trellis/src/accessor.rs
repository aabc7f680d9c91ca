//! Uniform capability access to heterogeneous controls.
//!
//! A [`ControlAccessor`] wraps exactly one resolved node and answers the
//! capability questions the extensions ask - "does this control have a user
//! value", "what observable fires when it changes" - uniformly across
//! control kinds. It is a view over the control, never a copy: it stores no
//! mutable state of its own.
//!
//! Capability misses are configuration errors that name the control, its
//! kind and the missing capability. Wiring code resolves every capability it
//! needs *eagerly*, so a declaration against an unsupported control fails
//! while the pipeline runs, not when the user first touches the control.

use std::sync::Arc;

use trellis_core::{ObservableList, ObservableRef, ObservableValue, Signal};

use crate::error::ConfigError;
use crate::graph::{ControlProperty, NodeGraph, UiNode};

/// A stateless adapter bound to one control instance.
#[derive(Clone)]
pub struct ControlAccessor {
    view_id: String,
    node: Arc<dyn UiNode>,
}

impl ControlAccessor {
    /// Resolve `control_id` in `graph` and wrap the node.
    pub fn resolve(graph: &NodeGraph, control_id: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            view_id: graph.view_id().to_string(),
            node: graph.lookup(control_id)?,
        })
    }

    /// Wrap an already-resolved node.
    pub fn new(view_id: impl Into<String>, node: Arc<dyn UiNode>) -> Self {
        Self {
            view_id: view_id.into(),
            node,
        }
    }

    /// The wrapped node.
    pub fn node(&self) -> &Arc<dyn UiNode> {
        &self.node
    }

    /// The wrapped control's id.
    pub fn control_id(&self) -> &str {
        self.node.base().id()
    }

    /// The id of the view the control was resolved in.
    pub fn view_id(&self) -> &str {
        &self.view_id
    }

    fn missing(&self, declaration: &str, capability: &'static str) -> ConfigError {
        ConfigError::MissingCapability {
            declaration: declaration.to_string(),
            control_id: self.control_id().to_string(),
            kind: self.node.kind(),
            capability,
        }
    }

    /// Whether a user-entered value is present.
    ///
    /// Infallible by design: wiring code validates the capability up front
    /// via [`user_value_observable`](Self::user_value_observable); once
    /// wired, predicates need a plain boolean.
    pub fn has_user_value(&self) -> bool {
        self.node.user_value_set().unwrap_or(false)
    }

    /// Whether the control has a user value or content.
    pub fn has_any_value(&self) -> bool {
        self.node.value_or_items_set().unwrap_or(false)
    }

    /// The observable firing on user-value changes.
    pub fn user_value_observable(&self, declaration: &str) -> Result<ObservableRef, ConfigError> {
        self.node
            .user_value_observable()
            .ok_or_else(|| self.missing(declaration, "a user value"))
    }

    /// The observable firing on value-or-content changes.
    pub fn value_or_items_observable(
        &self,
        declaration: &str,
    ) -> Result<ObservableRef, ConfigError> {
        self.node
            .value_or_items_observable()
            .ok_or_else(|| self.missing(declaration, "a value or item content"))
    }

    /// The action signal, for controls that can be triggered.
    pub fn action_signal(&self, declaration: &str) -> Result<&Signal<()>, ConfigError> {
        self.node
            .action_signal()
            .ok_or_else(|| self.missing(declaration, "an action signal"))
    }

    /// The live text property behind the given surface.
    pub fn text_property(
        &self,
        property: ControlProperty,
        declaration: &str,
    ) -> Result<ObservableValue<String>, ConfigError> {
        self.node.text_property(property).ok_or_else(|| {
            self.missing(declaration, "a textual property for the requested surface")
        })
    }

    /// The live boolean property of two-state controls.
    pub fn bool_property(&self, declaration: &str) -> Result<ObservableValue<bool>, ConfigError> {
        self.node
            .bool_property()
            .ok_or_else(|| self.missing(declaration, "a boolean property"))
    }

    /// The live string list behind the given surface.
    pub fn string_list_property(
        &self,
        property: ControlProperty,
        declaration: &str,
    ) -> Result<ObservableList<String>, ConfigError> {
        self.node.string_list_property(property).ok_or_else(|| {
            self.missing(declaration, "a string item list for the requested surface")
        })
    }

    /// The multi-select switch of selection controls.
    pub fn multi_select_flag(
        &self,
        declaration: &str,
    ) -> Result<ObservableValue<bool>, ConfigError> {
        self.node
            .multi_select_flag()
            .ok_or_else(|| self.missing(declaration, "a multi-select switch"))
    }

    /// Downcast the control to its concrete type.
    pub fn downcast<C: 'static>(&self, declaration: &str) -> Result<&C, ConfigError> {
        self.node
            .as_any()
            .downcast_ref::<C>()
            .ok_or_else(|| self.missing(declaration, "the control kind this declaration targets"))
    }
}

impl std::fmt::Debug for ControlAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlAccessor")
            .field("view_id", &self.view_id)
            .field("control_id", &self.control_id())
            .field("kind", &self.node.kind())
            .finish()
    }
}
