//! Model property registries and dotted-path resolution.
//!
//! [`ModelProperties`] is the explicit registry that replaces field
//! reflection: a form model lists its bindable properties by name, each
//! exposed as a live [`PropertySlot`] - the slot *is* the mutable property,
//! not a snapshot of its current value, so bindings wire straight into the
//! model.
//!
//! [`resolve_path`] walks dotted paths (`"address.city"`) through nested
//! models. A missing intermediate yields `None` without error: optional and
//! not-yet-initialized model graphs are an expected state, not a failure.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use chrono::NaiveDate;
use trellis_core::{ObservableList, ObservableValue};

/// A live, typed property slot of a form model.
#[derive(Clone)]
pub enum PropertySlot {
    /// A textual property.
    Text(ObservableValue<String>),
    /// A boolean property.
    Bool(ObservableValue<bool>),
    /// An integer property.
    Integer(ObservableValue<i64>),
    /// A floating-point property.
    Float(ObservableValue<f64>),
    /// An optional calendar date.
    Date(ObservableValue<Option<NaiveDate>>),
    /// A list of strings.
    StringList(ObservableList<String>),
    /// A nested model.
    Nested(Arc<dyn ModelProperties>),
}

impl PropertySlot {
    /// A short kind name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Date(_) => "date",
            Self::StringList(_) => "string list",
            Self::Nested(_) => "nested model",
        }
    }
}

impl fmt::Debug for PropertySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertySlot::{}", self.kind())
    }
}

/// The property registry of a form model.
pub trait ModelProperties: Send + Sync + 'static {
    /// Look up a property by name.
    fn property(&self, name: &str) -> Option<PropertySlot>;

    /// The names of all bindable properties, in declaration order.
    ///
    /// Used by name-based binding-target resolution.
    fn property_names(&self) -> Vec<String>;
}

/// Resolve a dotted path against a model.
///
/// Splits on `'.'` and recurses through [`PropertySlot::Nested`] slots. Any
/// segment that fails to resolve - including an intermediate that is not a
/// nested model - yields `None`. This is not an error condition.
pub fn resolve_path(root: &dyn ModelProperties, path: &str) -> Option<PropertySlot> {
    let mut segments = path.split('.');
    let first = segments.next().filter(|s| !s.is_empty())?;
    let mut slot = root.property(first)?;
    for segment in segments {
        if segment.is_empty() {
            return None;
        }
        slot = match slot {
            PropertySlot::Nested(model) => model.property(segment)?,
            _ => return None,
        };
    }
    Some(slot)
}

/// A shared model handle with pointer-identity equality.
///
/// Form-binding model slots hold `Option<ModelRef<M>>`; replacing the model
/// always registers as a change, re-setting the same handle does not.
pub struct ModelRef<M: ?Sized>(Arc<M>);

impl<M> ModelRef<M> {
    /// Wrap a model instance.
    pub fn new(model: M) -> Self {
        Self(Arc::new(model))
    }
}

impl<M: ?Sized> ModelRef<M> {
    /// Wrap an existing shared model.
    pub fn from_arc(model: Arc<M>) -> Self {
        Self(model)
    }

    /// The underlying shared pointer.
    pub fn as_arc(&self) -> &Arc<M> {
        &self.0
    }
}

impl<M: ?Sized> Clone for ModelRef<M> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<M: ?Sized> PartialEq for ModelRef<M> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<M: ?Sized> Deref for ModelRef<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.0
    }
}

impl<M: ?Sized> fmt::Debug for ModelRef<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ModelRef")
    }
}

/// The replaceable model slot a form binding watches.
pub type ModelProperty<M> = ObservableValue<Option<ModelRef<M>>>;
