//! Binding targets and two-way value bindings.
//!
//! Form binding connects model properties to controls in two steps:
//!
//! 1. A [`BindingTargetResolver`] turns a model into a list of
//!    [`BindingTarget`]s - which property path binds to which control id on
//!    which surface. [`NameBasedResolver`] derives control ids from
//!    property names by convention (optional prefix/suffix);
//!    [`MappingBasedResolver`] uses explicit mappings and falls back to
//!    name-based resolution for unmapped properties unless disabled.
//! 2. [`bind_model`] resolves each target against the live model and graph
//!    and installs two-way bindings, returning the listener guards that
//!    keep them alive. Dropping the guards unbinds everything - that is
//!    how a model swap detaches the old instance.
//!
//! Resolution semantics follow the rest of the framework: an *explicit*
//! mapping that fails to resolve is a configuration error; a name-based
//! candidate that has no matching control is silently skipped.

use trellis_core::{ListenerGuard, ObservableList, ObservableValue};

use crate::accessor::ControlAccessor;
use crate::convert::ConversionService;
use crate::error::ConfigError;
use crate::graph::{ControlProperty, NodeGraph};
use crate::path::{ModelProperties, PropertySlot, resolve_path};

/// One resolved binding intent: model property path → control surface.
#[derive(Clone, Debug)]
pub struct BindingTarget {
    /// Dotted path of the model property.
    pub property_path: String,
    /// Id of the control to bind.
    pub control_id: String,
    /// The control surface to bind against.
    pub target: ControlProperty,
    /// Optional format pattern for textual controls.
    pub format_pattern: Option<String>,
    /// Whether this target came from an explicit mapping.
    pub explicit: bool,
}

impl BindingTarget {
    fn declaration(&self) -> String {
        format!("form-mapping:{} -> {}", self.property_path, self.control_id)
    }
}

/// Derives binding targets from a model.
pub trait BindingTargetResolver: Send + Sync {
    /// Resolve the targets for `model` against `graph`.
    fn resolve(&self, model: &dyn ModelProperties, graph: &NodeGraph) -> Vec<BindingTarget>;
}

/// Resolves control ids from property names by naming convention.
#[derive(Clone, Debug, Default)]
pub struct NameBasedResolver {
    prefix: String,
    suffix: String,
}

impl NameBasedResolver {
    /// Create with an optional control-id prefix and suffix.
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    fn control_id(&self, property_name: &str) -> String {
        format!("{}{}{}", self.prefix, property_name, self.suffix)
    }
}

impl BindingTargetResolver for NameBasedResolver {
    fn resolve(&self, model: &dyn ModelProperties, graph: &NodeGraph) -> Vec<BindingTarget> {
        model
            .property_names()
            .into_iter()
            .filter_map(|name| {
                let control_id = self.control_id(&name);
                if graph.contains(&control_id) {
                    Some(BindingTarget {
                        property_path: name,
                        control_id,
                        target: ControlProperty::UserValue,
                        format_pattern: None,
                        explicit: false,
                    })
                } else {
                    tracing::trace!(
                        target: "trellis::bind",
                        property = %name,
                        control = %control_id,
                        "no control for name-based binding candidate, skipping"
                    );
                    None
                }
            })
            .collect()
    }
}

/// Resolves explicit mappings first, then name-based candidates for
/// properties not explicitly mapped.
pub struct MappingBasedResolver {
    mappings: Vec<BindingTarget>,
    fallback: Option<NameBasedResolver>,
}

impl MappingBasedResolver {
    /// Create from explicit mappings, with name-based fallback enabled.
    pub fn new(mappings: Vec<BindingTarget>) -> Self {
        Self {
            mappings,
            fallback: Some(NameBasedResolver::default()),
        }
    }

    /// Replace the name-based fallback (or disable it with `None`).
    pub fn with_fallback(mut self, fallback: Option<NameBasedResolver>) -> Self {
        self.fallback = fallback;
        self
    }
}

impl BindingTargetResolver for MappingBasedResolver {
    fn resolve(&self, model: &dyn ModelProperties, graph: &NodeGraph) -> Vec<BindingTarget> {
        let mut targets = self.mappings.clone();
        if let Some(fallback) = &self.fallback {
            for candidate in fallback.resolve(model, graph) {
                let mapped = targets.iter().any(|t| {
                    t.property_path == candidate.property_path
                        || t.control_id == candidate.control_id
                });
                if !mapped {
                    targets.push(candidate);
                }
            }
        }
        targets
    }
}

/// Bind a model to a view's controls, returning the guards that keep the
/// bindings alive.
///
/// Dropping the returned guards removes every installed listener; the
/// caller rebinds against a replacement model afterwards.
pub fn bind_model(
    graph: &NodeGraph,
    model: &dyn ModelProperties,
    targets: &[BindingTarget],
) -> Result<Vec<ListenerGuard>, ConfigError> {
    let service = ConversionService;
    let mut guards = Vec::new();
    for target in targets {
        let declaration = target.declaration();
        let Some(slot) = resolve_path(model, &target.property_path) else {
            if target.explicit {
                return Err(ConfigError::MissingValue {
                    declaration,
                    what: "a resolvable model property path",
                });
            }
            continue;
        };
        let accessor = ControlAccessor::resolve(graph, &target.control_id)?;
        let pattern = target.format_pattern.clone();
        match slot {
            PropertySlot::Text(model_prop) => {
                let control_prop = accessor.text_property(target.target, &declaration)?;
                guards.extend(two_way_text(&model_prop, &control_prop));
            }
            PropertySlot::Integer(model_prop) => {
                let control_prop = accessor.text_property(target.target, &declaration)?;
                guards.extend(two_way_converted(
                    &model_prop,
                    &control_prop,
                    move |value| service.format_i64(*value),
                    move |text| service.parse_i64(text),
                ));
            }
            PropertySlot::Float(model_prop) => {
                let control_prop = accessor.text_property(target.target, &declaration)?;
                let format_pattern = pattern.clone();
                guards.extend(two_way_converted(
                    &model_prop,
                    &control_prop,
                    move |value| service.format_f64(*value, format_pattern.as_deref()),
                    move |text| service.parse_f64(text),
                ));
            }
            PropertySlot::Date(model_prop) => {
                let control_prop = accessor.text_property(target.target, &declaration)?;
                let format_out = pattern.clone();
                let format_in = pattern.clone();
                guards.extend(two_way_converted(
                    &model_prop,
                    &control_prop,
                    move |value| match value {
                        Some(date) => service.format_date(*date, format_out.as_deref()),
                        None => String::new(),
                    },
                    move |text| {
                        if text.trim().is_empty() {
                            Some(None)
                        } else {
                            service.parse_date(text, format_in.as_deref()).map(Some)
                        }
                    },
                ));
            }
            PropertySlot::Bool(model_prop) => {
                let control_prop = accessor.bool_property(&declaration)?;
                guards.extend(two_way_bool(&model_prop, &control_prop));
            }
            PropertySlot::StringList(model_list) => {
                let control_list = accessor.string_list_property(target.target, &declaration)?;
                guards.extend(two_way_list(&model_list, &control_list));
            }
            PropertySlot::Nested(_) => {
                if target.explicit {
                    return Err(ConfigError::MissingValue {
                        declaration,
                        what: "a bindable leaf property (the path resolves to a nested model)",
                    });
                }
            }
        }
        tracing::debug!(
            target: "trellis::bind",
            property = %target.property_path,
            control = %target.control_id,
            "bound model property"
        );
    }
    Ok(guards)
}

fn two_way_text(
    model: &ObservableValue<String>,
    control: &ObservableValue<String>,
) -> Vec<ListenerGuard> {
    control.set(model.get());

    let control_clone = control.clone();
    let forward = model.on_change(move |_, new| {
        control_clone.set(new.clone());
    });
    let model_clone = model.clone();
    let backward = control.on_change(move |_, new| {
        model_clone.set(new.clone());
    });

    guard_pair(model, forward, control, backward)
}

fn two_way_bool(
    model: &ObservableValue<bool>,
    control: &ObservableValue<bool>,
) -> Vec<ListenerGuard> {
    control.set(model.get());

    let control_clone = control.clone();
    let forward = model.on_change(move |_, new| {
        control_clone.set(*new);
    });
    let model_clone = model.clone();
    let backward = control.on_change(move |_, new| {
        model_clone.set(*new);
    });

    guard_pair(model, forward, control, backward)
}

fn two_way_converted<M>(
    model: &ObservableValue<M>,
    control: &ObservableValue<String>,
    to_text: impl Fn(&M) -> String + Send + Sync + 'static,
    from_text: impl Fn(&str) -> Option<M> + Send + Sync + 'static,
) -> Vec<ListenerGuard>
where
    M: Clone + PartialEq + Send + Sync + 'static,
{
    control.set(to_text(&model.get()));

    let control_clone = control.clone();
    let forward = model.on_change(move |_, new| {
        control_clone.set(to_text(new));
    });
    let model_clone = model.clone();
    let backward = control.on_change(move |_, new| {
        // Unparsable edits stay on the control; the validation channel
        // reports them.
        if let Some(value) = from_text(new) {
            model_clone.set(value);
        }
    });

    guard_pair(model, forward, control, backward)
}

fn two_way_list(
    model: &ObservableList<String>,
    control: &ObservableList<String>,
) -> Vec<ListenerGuard> {
    control.set_all(model.snapshot());

    let model_for_forward = model.clone();
    let control_clone = control.clone();
    let forward = model.on_invalidate(move || {
        let snapshot = model_for_forward.snapshot();
        if control_clone.snapshot() != snapshot {
            control_clone.set_all(snapshot);
        }
    });
    let control_for_backward = control.clone();
    let model_clone = model.clone();
    let backward = control.on_invalidate(move || {
        let snapshot = control_for_backward.snapshot();
        if model_clone.snapshot() != snapshot {
            model_clone.set_all(snapshot);
        }
    });

    let model_for_guard = model.clone();
    let control_for_guard = control.clone();
    vec![
        ListenerGuard::new(move || {
            model_for_guard.remove_invalidation_listener(forward);
        }),
        ListenerGuard::new(move || {
            control_for_guard.remove_invalidation_listener(backward);
        }),
    ]
}

fn guard_pair<A: Clone + Send + Sync + 'static, B: Clone + Send + Sync + 'static>(
    model: &ObservableValue<A>,
    forward: trellis_core::ListenerId,
    control: &ObservableValue<B>,
    backward: trellis_core::ListenerId,
) -> Vec<ListenerGuard> {
    let model_for_guard = model.clone();
    let control_for_guard = control.clone();
    vec![
        ListenerGuard::new(move || {
            model_for_guard.remove_change_listener(forward);
        }),
        ListenerGuard::new(move || {
            control_for_guard.remove_change_listener(backward);
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::TextInput;
    use trellis_core::ObservableValue;

    struct Person {
        name: ObservableValue<String>,
        age: ObservableValue<i64>,
    }

    impl ModelProperties for Person {
        fn property(&self, name: &str) -> Option<PropertySlot> {
            match name {
                "name" => Some(PropertySlot::Text(self.name.clone())),
                "age" => Some(PropertySlot::Integer(self.age.clone())),
                _ => None,
            }
        }

        fn property_names(&self) -> Vec<String> {
            vec!["name".to_string(), "age".to_string()]
        }
    }

    fn graph_with_inputs() -> NodeGraph {
        let graph = NodeGraph::new("form");
        graph.add_root(TextInput::new("name")).unwrap();
        graph.add_root(TextInput::new("age")).unwrap();
        graph
    }

    #[test]
    fn test_name_based_resolution_skips_missing_controls() {
        let graph = NodeGraph::new("form");
        graph.add_root(TextInput::new("name")).unwrap();
        let person = Person {
            name: ObservableValue::new("ada".to_string()),
            age: ObservableValue::new(36),
        };

        let targets = NameBasedResolver::default().resolve(&person, &graph);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].control_id, "name");
    }

    #[test]
    fn test_name_based_resolution_with_prefix() {
        let graph = NodeGraph::new("form");
        graph.add_root(TextInput::new("input_name")).unwrap();
        let person = Person {
            name: ObservableValue::new(String::new()),
            age: ObservableValue::new(0),
        };

        let targets = NameBasedResolver::new("input_", "").resolve(&person, &graph);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].property_path, "name");
        assert_eq!(targets[0].control_id, "input_name");
    }

    #[test]
    fn test_two_way_text_binding() {
        let graph = graph_with_inputs();
        let person = Person {
            name: ObservableValue::new("ada".to_string()),
            age: ObservableValue::new(36),
        };

        let targets = NameBasedResolver::default().resolve(&person, &graph);
        let guards = bind_model(&graph, &person, &targets).unwrap();

        let name_input = ControlAccessor::resolve(&graph, "name").unwrap();
        let name_text = name_input
            .text_property(ControlProperty::UserValue, "test")
            .unwrap();

        // Model -> control initial sync, then both directions live.
        assert_eq!(name_text.get(), "ada");
        person.name.set("grace".to_string());
        assert_eq!(name_text.get(), "grace");
        name_text.set("hopper".to_string());
        assert_eq!(person.name.get(), "hopper");

        // Dropping guards detaches the binding.
        drop(guards);
        name_text.set("unbound".to_string());
        assert_eq!(person.name.get(), "hopper");
    }

    #[test]
    fn test_integer_binding_converts_and_ignores_garbage() {
        let graph = graph_with_inputs();
        let person = Person {
            name: ObservableValue::new(String::new()),
            age: ObservableValue::new(36),
        };
        let targets = NameBasedResolver::default().resolve(&person, &graph);
        let _guards = bind_model(&graph, &person, &targets).unwrap();

        let age_text = ControlAccessor::resolve(&graph, "age")
            .unwrap()
            .text_property(ControlProperty::UserValue, "test")
            .unwrap();

        assert_eq!(age_text.get(), "36");
        age_text.set("37".to_string());
        assert_eq!(person.age.get(), 37);
        age_text.set("not a number".to_string());
        assert_eq!(person.age.get(), 37);
    }

    #[test]
    fn test_explicit_mapping_with_bad_path_is_config_error() {
        let graph = graph_with_inputs();
        let person = Person {
            name: ObservableValue::new(String::new()),
            age: ObservableValue::new(0),
        };
        let targets = vec![BindingTarget {
            property_path: "missing.path".to_string(),
            control_id: "name".to_string(),
            target: ControlProperty::UserValue,
            format_pattern: None,
            explicit: true,
        }];
        let err = bind_model(&graph, &person, &targets).unwrap_err();
        assert!(err.to_string().contains("missing.path"));
    }
}
