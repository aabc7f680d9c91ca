//! The addressable node graph of a view.
//!
//! A [`NodeGraph`] is the named tree of UI nodes belonging to exactly one
//! view instance. Node ids are unique within one graph; looking up an
//! unknown id fails with a clear error instead of silently returning
//! nothing - every misspelled id in a declaration must surface at wiring
//! time.
//!
//! [`UiNode`] is the capability contract a node offers to the framework.
//! Plain containers support none of the value capabilities; concrete
//! controls (see [`crate::controls`]) opt into the ones that make sense for
//! their kind. Asking a node for a capability it does not support yields
//! `None` here and becomes a [`ConfigError::MissingCapability`] at the
//! accessor layer.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use trellis_core::{ListenerGuard, ObservableList, ObservableRef, ObservableValue, Signal};

use crate::error::ConfigError;
use crate::predicate::BoolBinding;

/// The bindable surfaces of a control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlProperty {
    /// The value the user entered or selected.
    UserValue,
    /// The control's backing item list.
    Items,
    /// The control's selected items.
    SelectedItems,
}

impl ControlProperty {
    /// Human-readable name for error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::UserValue => "user value",
            Self::Items => "items",
            Self::SelectedItems => "selected items",
        }
    }
}

/// State shared by every node kind: identity and the disabled flag.
///
/// The disabled flag can carry at most one active binding; binding anew
/// releases the previous one first, so a re-wired node never has two
/// writers.
pub struct NodeBase {
    id: String,
    disabled: ObservableValue<bool>,
    disabled_binding: Mutex<Option<ListenerGuard>>,
}

impl NodeBase {
    /// Create a node base with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            disabled: ObservableValue::new(false),
            disabled_binding: Mutex::new(None),
        }
    }

    /// The node's id, unique within its graph.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The node's disabled flag.
    pub fn disabled(&self) -> &ObservableValue<bool> {
        &self.disabled
    }

    /// Drive the disabled flag from a boolean binding.
    ///
    /// Any previously installed binding is released first. The binding is
    /// kept alive for as long as it stays installed.
    pub fn bind_disabled(&self, binding: BoolBinding) {
        let mut slot = self.disabled_binding.lock();
        slot.take(); // release the previous binding, if any
        self.disabled.set(binding.get());
        let disabled = self.disabled.clone();
        let value = binding.value().clone();
        let id = value.on_change(move |_, new| {
            disabled.set(*new);
        });
        let value_for_guard = binding.value().clone();
        *slot = Some(ListenerGuard::new(move || {
            value_for_guard.remove_change_listener(id);
            drop(binding);
        }));
    }

    /// Remove an installed disabled binding, leaving the current value.
    pub fn unbind_disabled(&self) {
        self.disabled_binding.lock().take();
    }
}

impl std::fmt::Debug for NodeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeBase")
            .field("id", &self.id)
            .field("disabled", &self.disabled.get())
            .finish()
    }
}

/// The capability contract a UI node offers to the wiring framework.
///
/// Capability methods return `None` for node kinds that do not support
/// them; the [`crate::accessor::ControlAccessor`] turns that into a
/// configuration error that names the control and the missing capability.
pub trait UiNode: std::fmt::Debug + Send + Sync + 'static {
    /// The node's shared base state.
    fn base(&self) -> &NodeBase;

    /// A short kind name ("text-input", "table-view", ...) for errors.
    fn kind(&self) -> &'static str;

    /// Downcast support for typed wiring closures.
    fn as_any(&self) -> &dyn Any;

    /// Whether a user-entered value is present.
    fn user_value_set(&self) -> Option<bool> {
        None
    }

    /// The observable that fires when the user value changes.
    fn user_value_observable(&self) -> Option<ObservableRef> {
        None
    }

    /// Whether the control has a user value *or* content (e.g. a populated
    /// but unselected list).
    fn value_or_items_set(&self) -> Option<bool> {
        None
    }

    /// The observable that fires when the value or the content changes.
    fn value_or_items_observable(&self) -> Option<ObservableRef> {
        None
    }

    /// The action/commit signal of the control.
    fn action_signal(&self) -> Option<&Signal<()>> {
        None
    }

    /// A live text property for the given surface, if the control is
    /// textual there.
    fn text_property(&self, _property: ControlProperty) -> Option<ObservableValue<String>> {
        None
    }

    /// A live boolean property, for two-state controls.
    fn bool_property(&self) -> Option<ObservableValue<bool>> {
        None
    }

    /// A live string list for the given surface, if the control carries
    /// string items there.
    fn string_list_property(&self, _property: ControlProperty) -> Option<ObservableList<String>> {
        None
    }

    /// The multi-select switch of selection controls.
    fn multi_select_flag(&self) -> Option<ObservableValue<bool>> {
        None
    }
}

/// Where to place a node attached into an existing tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttachPosition {
    /// Append after the target's existing children.
    Append,
    /// Insert at the given child index.
    Index(usize),
    /// Insert immediately before the named sibling.
    Before(String),
}

/// The named, addressable node tree of one view.
pub struct NodeGraph {
    view_id: String,
    nodes: RwLock<HashMap<String, Arc<dyn UiNode>>>,
    children: RwLock<HashMap<String, Vec<Arc<dyn UiNode>>>>,
    roots: RwLock<Vec<Arc<dyn UiNode>>>,
}

impl NodeGraph {
    /// Create an empty graph for the given view.
    pub fn new(view_id: impl Into<String>) -> Self {
        Self {
            view_id: view_id.into(),
            nodes: RwLock::new(HashMap::new()),
            children: RwLock::new(HashMap::new()),
            roots: RwLock::new(Vec::new()),
        }
    }

    /// The id of the view owning this graph.
    pub fn view_id(&self) -> &str {
        &self.view_id
    }

    /// Register a root node.
    pub fn add_root(&self, node: Arc<dyn UiNode>) -> Result<(), ConfigError> {
        self.index(node.clone())?;
        self.roots.write().push(node);
        Ok(())
    }

    /// Register a node as child of `parent_id`.
    pub fn add_child(&self, parent_id: &str, node: Arc<dyn UiNode>) -> Result<(), ConfigError> {
        self.lookup(parent_id)?;
        self.index(node.clone())?;
        self.children
            .write()
            .entry(parent_id.to_string())
            .or_default()
            .push(node);
        Ok(())
    }

    fn index(&self, node: Arc<dyn UiNode>) -> Result<(), ConfigError> {
        let id = node.base().id().to_string();
        let mut nodes = self.nodes.write();
        if nodes.contains_key(&id) {
            return Err(ConfigError::DuplicateNodeId {
                view_id: self.view_id.clone(),
                node_id: id,
            });
        }
        tracing::trace!(target: "trellis::graph", view = %self.view_id, node = %id, kind = node.kind(), "registered node");
        nodes.insert(id, node);
        Ok(())
    }

    /// Look up a node by id, failing clearly on unknown ids.
    pub fn lookup(&self, id: &str) -> Result<Arc<dyn UiNode>, ConfigError> {
        self.nodes
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownControl {
                view_id: self.view_id.clone(),
                control_id: id.to_string(),
            })
    }

    /// Whether a node with the given id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.read().contains_key(id)
    }

    /// All registered node ids.
    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.read().keys().cloned().collect()
    }

    /// The first registered root node.
    pub fn root(&self) -> Option<Arc<dyn UiNode>> {
        self.roots.read().first().cloned()
    }

    /// Structurally attach a foreign node (e.g. a nested view's root) under
    /// `target_id` at the given position.
    ///
    /// The attached node is *not* indexed into this graph: it belongs to its
    /// own view, whose ids remain addressable only there.
    pub fn attach(
        &self,
        target_id: &str,
        node: Arc<dyn UiNode>,
        position: &AttachPosition,
    ) -> Result<(), ConfigError> {
        self.lookup(target_id)?;
        let mut children = self.children.write();
        let slot = children.entry(target_id.to_string()).or_default();
        match position {
            AttachPosition::Append => slot.push(node),
            AttachPosition::Index(index) => {
                let index = (*index).min(slot.len());
                slot.insert(index, node);
            }
            AttachPosition::Before(sibling_id) => {
                let index = slot
                    .iter()
                    .position(|child| child.base().id() == sibling_id)
                    .unwrap_or(slot.len());
                slot.insert(index, node);
            }
        }
        tracing::debug!(target: "trellis::graph", view = %self.view_id, target = %target_id, "attached nested node");
        Ok(())
    }

    /// The ordered children attached under `parent_id`.
    pub fn children_of(&self, parent_id: &str) -> Vec<Arc<dyn UiNode>> {
        self.children
            .read()
            .get(parent_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pane {
        base: NodeBase,
    }

    impl std::fmt::Debug for Pane {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Pane").field("base", &self.base).finish()
        }
    }

    impl Pane {
        fn new(id: &str) -> Arc<Self> {
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

    #[test]
    fn test_lookup_unknown_id_fails_clearly() {
        let graph = NodeGraph::new("main");
        let err = graph.lookup("missing").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("missing"));
        assert!(message.contains("main"));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let graph = NodeGraph::new("main");
        graph.add_root(Pane::new("a")).unwrap();
        let err = graph.add_root(Pane::new("a")).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateNodeId { .. }));
    }

    #[test]
    fn test_child_registration_and_lookup() {
        let graph = NodeGraph::new("main");
        graph.add_root(Pane::new("root")).unwrap();
        graph.add_child("root", Pane::new("inner")).unwrap();
        assert!(graph.contains("inner"));
        assert_eq!(graph.children_of("root").len(), 1);
    }

    #[test]
    fn test_attach_positions() {
        let graph = NodeGraph::new("main");
        graph.add_root(Pane::new("root")).unwrap();
        graph.add_child("root", Pane::new("a")).unwrap();
        graph.add_child("root", Pane::new("b")).unwrap();

        graph
            .attach("root", Pane::new("x"), &AttachPosition::Before("b".into()))
            .unwrap();
        let ids: Vec<String> = graph
            .children_of("root")
            .iter()
            .map(|n| n.base().id().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "x", "b"]);
    }

    #[test]
    fn test_attached_node_is_not_indexed() {
        let graph = NodeGraph::new("main");
        graph.add_root(Pane::new("root")).unwrap();
        graph
            .attach("root", Pane::new("foreign"), &AttachPosition::Append)
            .unwrap();
        assert!(!graph.contains("foreign"));
    }
}
