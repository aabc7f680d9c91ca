//! The controller-extension pipeline.
//!
//! Wiring a controller is a strictly sequential pass over a fixed, ordered
//! list of [`ControllerExtension`]s, each responsible for one declaration
//! family. The pass is terminal on the first error, and every controller
//! instance is processed at most once: running the pipeline again against
//! the same [`ControllerHandle`] is a detectable error, not a silent
//! double-registration of listeners.
//!
//! State machine per controller:
//!
//! ```text
//! InjectionComplete → ExtensionsRunning(i) → PostConstructInvoked → Ready
//! ```
//!
//! No extension runs before the controller's view reference is populated -
//! every extension resolves control ids through that view's graph.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use trellis_core::BackgroundExecutor;

use crate::decl::ControllerDescriptor;
use crate::error::{ConfigError, PipelineError};
use crate::events::EventBus;
use crate::message::MessageBundle;
use crate::view::View;

/// Pipeline progress of one controller instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    /// Dependencies injected; extensions not yet run.
    InjectionComplete,
    /// Extension `i` is currently running.
    ExtensionsRunning(usize),
    /// All extensions ran; the post-construct hook was invoked.
    PostConstructInvoked,
    /// Fully wired.
    Ready,
}

/// A controller instance paired with its binding plan and pipeline state.
pub struct ControllerHandle {
    descriptor: ControllerDescriptor,
    view: Mutex<Option<View>>,
    state: Mutex<PipelineState>,
    post_construct: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl ControllerHandle {
    /// Wrap a binding plan into a fresh, unprocessed handle.
    pub fn new(descriptor: ControllerDescriptor) -> Self {
        Self {
            descriptor,
            view: Mutex::new(None),
            state: Mutex::new(PipelineState::InjectionComplete),
            post_construct: Mutex::new(None),
        }
    }

    /// The controller's id.
    pub fn id(&self) -> &str {
        self.descriptor.controller_id()
    }

    /// The controller's binding plan.
    pub fn descriptor(&self) -> &ControllerDescriptor {
        &self.descriptor
    }

    /// Populate the controller's view reference.
    pub fn attach_view(&self, view: View) {
        *self.view.lock() = Some(view);
    }

    /// The attached view, if any.
    pub fn view(&self) -> Option<View> {
        self.view.lock().clone()
    }

    /// The current pipeline state.
    pub fn state(&self) -> PipelineState {
        *self.state.lock()
    }

    /// Install the hook invoked after all extensions have run.
    pub fn on_post_construct<F: FnOnce() + Send + 'static>(&self, hook: F) {
        *self.post_construct.lock() = Some(Box::new(hook));
    }
}

/// Shared collaborators the extensions draw on.
#[derive(Default)]
pub struct PipelineEnv {
    executor: Option<Arc<BackgroundExecutor>>,
    event_bus: Option<Arc<EventBus>>,
    message_bundle: Option<Arc<MessageBundle>>,
    views: Mutex<HashMap<String, View>>,
}

impl PipelineEnv {
    /// An environment with no collaborators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide the background executor for asynchronous handlers.
    pub fn with_executor(mut self, executor: Arc<BackgroundExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Provide the event bus for subscribe declarations.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Provide the message bundle validation messages resolve against.
    pub fn with_message_bundle(mut self, bundle: Arc<MessageBundle>) -> Self {
        self.message_bundle = Some(bundle);
        self
    }

    /// The background executor, if provided.
    pub fn executor(&self) -> Option<&Arc<BackgroundExecutor>> {
        self.executor.as_ref()
    }

    /// The event bus, if provided.
    pub fn event_bus(&self) -> Option<&Arc<EventBus>> {
        self.event_bus.as_ref()
    }

    /// The message bundle, if provided.
    pub fn message_bundle(&self) -> Option<&Arc<MessageBundle>> {
        self.message_bundle.as_ref()
    }

    /// Register a view so nested-view declarations can resolve it.
    pub fn register_view(&self, view: View) {
        self.views.lock().insert(view.id().to_string(), view);
    }

    /// Resolve a registered view by id.
    pub fn lookup_view(&self, id: &str) -> Option<View> {
        self.views.lock().get(id).cloned()
    }
}

/// Everything one extension sees while wiring one controller.
pub struct ExtensionContext<'a> {
    /// The controller's id.
    pub controller_id: &'a str,
    /// The controller's view.
    pub view: &'a View,
    /// The controller's binding plan.
    pub descriptor: &'a ControllerDescriptor,
    /// Shared collaborators.
    pub env: &'a PipelineEnv,
}

/// One self-contained unit of the wiring pipeline.
pub trait ControllerExtension: Send + Sync {
    /// The extension's name, for logging and diagnostics.
    fn name(&self) -> &'static str;

    /// Inspect the declarations and install bindings, listeners and
    /// handlers. Configures once; idempotence under re-runs is not a
    /// supported scenario (the pipeline guards against re-runs instead).
    fn extend(&self, ctx: &ExtensionContext<'_>) -> Result<(), ConfigError>;
}

/// The ordered extension sequence.
pub struct Pipeline {
    extensions: Vec<Box<dyn ControllerExtension>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::with_default_extensions()
    }
}

impl Pipeline {
    /// A pipeline with the default extensions in their fixed order.
    pub fn with_default_extensions() -> Self {
        Self {
            extensions: crate::extensions::default_extensions(),
        }
    }

    /// A pipeline with a custom extension sequence.
    pub fn new(extensions: Vec<Box<dyn ControllerExtension>>) -> Self {
        Self { extensions }
    }

    /// The extension names in execution order.
    pub fn extension_names(&self) -> Vec<&'static str> {
        self.extensions.iter().map(|e| e.name()).collect()
    }

    /// Run every extension against the controller, then its post-construct
    /// hook.
    ///
    /// Errors abort the remaining extensions for this controller; other,
    /// already-processed controllers are unaffected.
    pub fn run(&self, controller: &ControllerHandle, env: &PipelineEnv) -> Result<(), PipelineError> {
        {
            let state = controller.state.lock();
            if *state != PipelineState::InjectionComplete {
                return Err(PipelineError::AlreadyProcessed {
                    controller: controller.id().to_string(),
                });
            }
        }
        let view = controller.view().ok_or_else(|| ConfigError::ViewNotAttached {
            controller: controller.id().to_string(),
        })?;

        for (index, extension) in self.extensions.iter().enumerate() {
            *controller.state.lock() = PipelineState::ExtensionsRunning(index);
            tracing::debug!(
                target: "trellis::pipeline",
                controller = controller.id(),
                extension = extension.name(),
                index,
                "running extension"
            );
            let ctx = ExtensionContext {
                controller_id: controller.id(),
                view: &view,
                descriptor: controller.descriptor(),
                env,
            };
            extension.extend(&ctx)?;
        }

        *controller.state.lock() = PipelineState::PostConstructInvoked;
        if let Some(hook) = controller.post_construct.lock().take() {
            hook();
        }
        *controller.state.lock() = PipelineState::Ready;
        tracing::debug!(target: "trellis::pipeline", controller = controller.id(), "controller ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::ControllerDescriptor;

    fn empty_controller() -> ControllerHandle {
        ControllerHandle::new(ControllerDescriptor::builder("ctrl").build())
    }

    #[test]
    fn test_missing_view_is_config_error() {
        let pipeline = Pipeline::with_default_extensions();
        let controller = empty_controller();
        let err = pipeline.run(&controller, &PipelineEnv::new()).unwrap_err();
        assert!(err.to_string().contains("no view attached"));
    }

    #[test]
    fn test_rerun_is_detected() {
        let pipeline = Pipeline::with_default_extensions();
        let controller = empty_controller();
        controller.attach_view(View::new("main"));

        pipeline.run(&controller, &PipelineEnv::new()).unwrap();
        assert_eq!(controller.state(), PipelineState::Ready);

        let err = pipeline.run(&controller, &PipelineEnv::new()).unwrap_err();
        assert!(matches!(err, PipelineError::AlreadyProcessed { .. }));
    }

    #[test]
    fn test_post_construct_runs_after_extensions() {
        use parking_lot::Mutex;
        use std::sync::Arc;

        let pipeline = Pipeline::with_default_extensions();
        let controller = empty_controller();
        controller.attach_view(View::new("main"));

        let invoked = Arc::new(Mutex::new(false));
        let invoked_clone = invoked.clone();
        controller.on_post_construct(move || *invoked_clone.lock() = true);

        pipeline.run(&controller, &PipelineEnv::new()).unwrap();
        assert!(*invoked.lock());
    }
}
