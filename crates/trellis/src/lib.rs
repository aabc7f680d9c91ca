//! Declarative controller wiring for retained-mode widget trees.
//!
//! Trellis lets application code declare *what* should happen between a
//! view's controls and its domain model - enablement rules, two-way form
//! bindings, validation, change handlers, data loaders - and wires those
//! declarations once, through an ordered extension pipeline. Afterwards
//! everything is reactive: observable mutations recompute bindings, fire
//! debounced handlers and republish validation results.
//!
//! The crate is toolkit-agnostic: it ships a headless control set
//! implementing the capability contract ([`graph::UiNode`]) that a real
//! toolkit adapter would provide. Nothing here draws pixels.
//!
//! # The pieces
//!
//! - [`decl`] - the declaration vocabulary (binding intent as data)
//! - [`graph`] / [`controls`] / [`accessor`] - the addressable node tree
//!   and uniform capability access
//! - [`predicate`] - quantified predicate chains composed into reactive
//!   boolean bindings
//! - [`pipeline`] / [`extensions`] - the ordered wiring pass
//! - [`bind`] / [`path`] / [`convert`] - form binding, model property
//!   registries, value conversion
//! - [`validation`] / [`view`] - validators and the published result
//! - [`container`] - the bean-container facade and default implementation
//! - [`events`] / [`message`] - the priority event bus and locale-aware
//!   message bundles
//!
//! # Example
//!
//! ```
//! use trellis::controls::{Button, TextInput};
//! use trellis::decl::{ControllerDescriptor, NodeActivationDecl};
//! use trellis::graph::UiNode;
//! use trellis::pipeline::{ControllerHandle, Pipeline, PipelineEnv};
//! use trellis::view::View;
//!
//! // A view with a text input and a button.
//! let view = View::new("login");
//! let name = TextInput::new("name");
//! let submit = Button::new("submit");
//! view.graph().add_root(name.clone()).unwrap();
//! view.graph().add_root(submit.clone()).unwrap();
//!
//! // Declare: submit is enabled once the name field has a user value.
//! let descriptor = ControllerDescriptor::builder("login-controller")
//!     .enable_node(NodeActivationDecl::for_node("submit").when_all_have_user_values(["name"]))
//!     .build();
//!
//! let controller = ControllerHandle::new(descriptor);
//! controller.attach_view(view.clone());
//! Pipeline::with_default_extensions()
//!     .run(&controller, &PipelineEnv::new())
//!     .unwrap();
//!
//! assert!(submit.base().disabled().get());
//! name.set_text("ada");
//! assert!(!submit.base().disabled().get());
//! ```

pub mod accessor;
pub mod bind;
pub mod container;
pub mod controls;
pub mod convert;
pub mod decl;
pub mod error;
pub mod events;
pub mod extensions;
pub mod graph;
pub mod invocation;
pub mod message;
pub mod path;
pub mod pipeline;
pub mod predicate;
pub mod validation;
pub mod view;

pub use accessor::ControlAccessor;
pub use container::{BeanContainer, BeanDefinition, DefaultBeanContainer, DefinitionId};
pub use convert::ConversionService;
pub use decl::{BindingDecl, ControllerDescriptor};
pub use error::{ConfigError, InvocationError, PipelineError};
pub use events::EventBus;
pub use graph::{AttachPosition, ControlProperty, NodeBase, NodeGraph, UiNode};
pub use invocation::{ArgumentHint, HandlerMethod, ParameterSpec, ParameterValue};
pub use message::{MessageBundle, MessageBundleRegistry};
pub use path::{ModelProperties, ModelProperty, ModelRef, PropertySlot, resolve_path};
pub use pipeline::{
    ControllerExtension, ControllerHandle, ExtensionContext, Pipeline, PipelineEnv, PipelineState,
};
pub use predicate::{BoolBinding, BoolBindingBuilder, BooleanOp, PredicateChain, Quantifier};
pub use validation::{
    Severity, ValidationMessage, ValidationMode, ValidationOptions, ValidationResult, Validator,
};
pub use view::View;
