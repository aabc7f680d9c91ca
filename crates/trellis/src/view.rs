//! Views: node graph ownership, validator registration, nested attachment.
//!
//! A [`View`] owns exactly one [`NodeGraph`] and everything wired against
//! it: validator registrations, live projections and debounce timers
//! created by the extensions are retained here so they live as long as the
//! view. Controllers hold views by shared handle, never by ownership.
//!
//! The combined [`ValidationResult`] of every registered validator is
//! published on [`validation_result`](View::validation_result), which is
//! the observable node-activation bindings subscribe to for their
//! "when controls are valid" groups.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use trellis_core::{Debouncer, ListenerGuard, ObservableValue, post_to_ui};

use crate::accessor::ControlAccessor;
use crate::error::ConfigError;
use crate::graph::{AttachPosition, ControlProperty, NodeGraph, UiNode};
use crate::validation::{ValidationMode, ValidationOptions, ValidationResult, Validator};

struct ValidationRegistration {
    accessor: ControlAccessor,
    target: ControlProperty,
    validator: Arc<dyn Validator>,
    options: ValidationOptions,
}

struct ViewInner {
    id: String,
    graph: NodeGraph,
    validation_result: ObservableValue<ValidationResult>,
    validations: Mutex<Vec<ValidationRegistration>>,
    keep_alive: Mutex<Vec<Box<dyn Any + Send>>>,
}

/// A view instance: one node graph plus the wiring state built against it.
#[derive(Clone)]
pub struct View {
    inner: Arc<ViewInner>,
}

impl View {
    /// Create a view with an empty graph.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            inner: Arc::new(ViewInner {
                graph: NodeGraph::new(id.clone()),
                id,
                validation_result: ObservableValue::new(ValidationResult::ok()),
                validations: Mutex::new(Vec::new()),
                keep_alive: Mutex::new(Vec::new()),
            }),
        }
    }

    /// The view's id.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The node graph owned by this view.
    pub fn graph(&self) -> &NodeGraph {
        &self.inner.graph
    }

    /// The view's root node, if one has been registered.
    pub fn root_node(&self) -> Option<Arc<dyn UiNode>> {
        self.inner.graph.root()
    }

    /// The published, combined validation result.
    pub fn validation_result(&self) -> &ObservableValue<ValidationResult> {
        &self.inner.validation_result
    }

    /// Keep a wiring artifact (projection, debouncer, binding bookkeeping)
    /// alive for the lifetime of the view.
    pub fn retain(&self, artifact: Box<dyn Any + Send>) {
        self.inner.keep_alive.lock().push(artifact);
    }

    /// Attach another view's root node under `target_id`.
    pub fn attach_nested(
        &self,
        child: &View,
        target_id: &str,
        position: &AttachPosition,
        declaration: &str,
    ) -> Result<(), ConfigError> {
        let root = child
            .root_node()
            .ok_or_else(|| ConfigError::MissingValue {
                declaration: declaration.to_string(),
                what: "a root node in the nested view",
            })?;
        self.inner.graph.attach(target_id, root, position)
    }

    /// Register a validator against a control surface.
    ///
    /// Mode [`ValidationMode::OnChange`] installs a debounced listener that
    /// revalidates `started_after_ms` after the last observed change; mode
    /// [`ValidationMode::Manual`] registers only the hook that
    /// [`validate`](Self::validate) runs.
    pub fn register_validator(
        &self,
        control_id: &str,
        target: ControlProperty,
        validator: Arc<dyn Validator>,
        options: ValidationOptions,
        declaration: &str,
    ) -> Result<(), ConfigError> {
        let accessor = ControlAccessor::resolve(&self.inner.graph, control_id)?;

        if options.mode == ValidationMode::OnChange {
            // Resolve the observed dependency eagerly so a control without
            // a value surface fails here, during wiring.
            let observable = accessor
                .user_value_observable(declaration)
                .or_else(|_| accessor.value_or_items_observable(declaration))?;

            let weak = Arc::downgrade(&self.inner);
            let revalidate = move || {
                if let Some(inner) = weak.upgrade() {
                    post_to_ui(move || View { inner }.recompute());
                }
            };

            if options.started_after_ms == 0 {
                let id = observable.subscribe_invalidation(Box::new(revalidate));
                let observable_for_guard = Arc::clone(&observable);
                let guard = ListenerGuard::new(move || {
                    observable_for_guard.unsubscribe_invalidation(id);
                });
                self.retain(Box::new(guard));
            } else {
                let debouncer = Arc::new(Debouncer::new(
                    Duration::from_millis(options.started_after_ms),
                    revalidate,
                ));
                let debouncer_clone = Arc::clone(&debouncer);
                let id = observable.subscribe_invalidation(Box::new(move || {
                    debouncer_clone.poke();
                }));
                let observable_for_guard = Arc::clone(&observable);
                let guard = ListenerGuard::new(move || {
                    observable_for_guard.unsubscribe_invalidation(id);
                });
                self.retain(Box::new((debouncer, guard)));
            }
        }

        tracing::debug!(
            target: "trellis::view",
            view = %self.inner.id,
            control = control_id,
            mode = ?options.mode,
            "registered validator"
        );
        self.inner.validations.lock().push(ValidationRegistration {
            accessor,
            target,
            validator,
            options,
        });
        // Publish the initial state so enablement bindings start correct.
        self.recompute();
        Ok(())
    }

    /// Run every registered validator and publish the combined result.
    pub fn validate(&self) -> ValidationResult {
        self.recompute();
        self.inner.validation_result.get()
    }

    /// Number of registered validators.
    pub fn validator_count(&self) -> usize {
        self.inner.validations.lock().len()
    }

    fn recompute(&self) {
        let combined = {
            let registrations = self.inner.validations.lock();
            let mut combined = ValidationResult::ok();
            for registration in registrations.iter() {
                combined.merge(
                    registration
                        .validator
                        .validate(&registration.accessor, registration.target),
                );
            }
            combined
        };
        self.inner.validation_result.set(combined);
    }

    /// Whether any registration marks the given control required.
    pub fn is_required(&self, control_id: &str) -> bool {
        self.inner
            .validations
            .lock()
            .iter()
            .any(|r| r.options.required && r.accessor.control_id() == control_id)
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("id", &self.inner.id)
            .field("validators", &self.inner.validations.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::TextInput;
    use crate::validation::RequiredValidator;

    #[test]
    fn test_manual_mode_validates_only_on_call() {
        let view = View::new("form");
        let input = TextInput::new("name");
        view.graph().add_root(input.clone()).unwrap();

        view.register_validator(
            "name",
            ControlProperty::UserValue,
            Arc::new(RequiredValidator::new("name required")),
            ValidationOptions::default().mode(ValidationMode::Manual),
            "required:name",
        )
        .unwrap();

        // Initial publication happens at registration.
        assert!(!view.validation_result().get().is_ok());

        input.set_text("ada");
        // Manual mode: the published result is stale until validate().
        assert!(!view.validation_result().get().is_ok());
        assert!(view.validate().is_ok());
    }

    #[test]
    fn test_on_change_mode_revalidates_after_quiet_period() {
        let view = View::new("form");
        let input = TextInput::new("name");
        view.graph().add_root(input.clone()).unwrap();

        view.register_validator(
            "name",
            ControlProperty::UserValue,
            Arc::new(RequiredValidator::new("name required")),
            ValidationOptions::default().started_after_ms(30),
            "required:name",
        )
        .unwrap();

        assert!(!view.validation_result().get().is_ok());
        input.set_text("ada");
        std::thread::sleep(std::time::Duration::from_millis(120));
        assert!(view.validation_result().get().is_ok());
    }

    #[test]
    fn test_unknown_control_fails_at_registration() {
        let view = View::new("form");
        let err = view
            .register_validator(
                "ghost",
                ControlProperty::UserValue,
                Arc::new(RequiredValidator::new("x")),
                ValidationOptions::default(),
                "required:ghost",
            )
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownControl { .. }));
    }

    #[test]
    fn test_required_flag_tracking() {
        let view = View::new("form");
        let input = TextInput::new("name");
        view.graph().add_root(input).unwrap();
        view.register_validator(
            "name",
            ControlProperty::UserValue,
            Arc::new(RequiredValidator::new("x")),
            ValidationOptions::default().required(true).mode(ValidationMode::Manual),
            "required:name",
        )
        .unwrap();
        assert!(view.is_required("name"));
        assert!(!view.is_required("other"));
    }
}
