//! Error taxonomy for the wiring framework.
//!
//! Three channels, deliberately kept apart:
//!
//! - [`ConfigError`]: structurally invalid declarations, raised synchronously
//!   while the extension pipeline wires a controller. These are programmer
//!   mistakes; they are never retried and never downgraded to logging.
//! - [`InvocationError`]: a wired handler could not be invoked (missing
//!   required argument, argument type mismatch, handler failure). Raised at
//!   firing time.
//! - Validation failures are *not* errors: end-user input problems travel as
//!   [`crate::validation::ValidationResult`] values.

use thiserror::Error;

/// A fatal configuration error raised during pipeline execution.
///
/// Every variant names the offending declaration, control or view so the
/// failure can be traced back to its source without a debugger.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A referenced control id does not exist in the view's node graph.
    #[error("control '{control_id}' does not exist in the node graph of view '{view_id}'")]
    UnknownControl {
        /// The view whose graph was searched.
        view_id: String,
        /// The id that failed to resolve.
        control_id: String,
    },

    /// A node id was registered twice within one graph.
    #[error("node id '{node_id}' is already registered in the node graph of view '{view_id}'")]
    DuplicateNodeId {
        /// The view whose graph rejected the registration.
        view_id: String,
        /// The duplicated id.
        node_id: String,
    },

    /// A control exists but does not support the capability a declaration
    /// needs from it.
    #[error(
        "declaration '{declaration}' references control '{control_id}' ({kind}), \
         which does not support {capability}"
    )]
    MissingCapability {
        /// The declaration that required the capability.
        declaration: String,
        /// The control that lacks it.
        control_id: String,
        /// The control kind, for the error message.
        kind: &'static str,
        /// Human-readable capability name.
        capability: &'static str,
    },

    /// A declaration is missing a structurally required value.
    #[error("declaration '{declaration}' requires {what}, but none was supplied")]
    MissingValue {
        /// The offending declaration.
        declaration: String,
        /// What was missing.
        what: &'static str,
    },

    /// Mutually exclusive attributes were both supplied, or both omitted.
    #[error("declaration '{declaration}' must supply exactly one of {first} and {second}")]
    MutuallyExclusive {
        /// The offending declaration.
        declaration: String,
        /// First attribute name.
        first: &'static str,
        /// Second attribute name.
        second: &'static str,
    },

    /// A predicate chain element was incomplete at build time.
    #[error("predicate element {index} is incomplete: {reason}")]
    IncompletePredicate {
        /// Position of the element in the chain.
        index: usize,
        /// What was missing.
        reason: &'static str,
    },

    /// Table column resolution failed.
    #[error("declaration '{declaration}': column resolution by {mode} failed: {reason}")]
    ColumnResolution {
        /// The offending declaration.
        declaration: String,
        /// The resolution mode that was attempted (id, index, or none).
        mode: &'static str,
        /// Why it failed.
        reason: String,
    },

    /// The pipeline was started for a controller without a populated view
    /// reference.
    #[error("controller '{controller}' has no view attached; extensions cannot run")]
    ViewNotAttached {
        /// The controller in question.
        controller: String,
    },

    /// A referenced child view is not known to the wiring environment.
    #[error("declaration '{declaration}' references unknown view '{view_id}'")]
    UnknownView {
        /// The offending declaration.
        declaration: String,
        /// The id that failed to resolve.
        view_id: String,
    },

    /// A regular expression in a validation declaration failed to compile.
    #[error("declaration '{declaration}' carries an invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The offending declaration.
        declaration: String,
        /// The pattern text.
        pattern: String,
        /// The compile error.
        message: String,
    },

    /// The default-construction fallback was requested for a type it must
    /// not apply to.
    #[error(
        "cannot auto-register a default bean definition for '{type_name}': \
         string and primitive types have no unambiguous default"
    )]
    UnresolvableBean {
        /// The refused type.
        type_name: &'static str,
    },
}

/// A fatal error raised when a wired handler fires.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// No candidate value was available for a required parameter.
    #[error("handler '{handler}': no candidate available for required parameter {index} ({type_name})")]
    MissingRequiredParameter {
        /// The handler's name.
        handler: String,
        /// Zero-based parameter index.
        index: usize,
        /// The parameter's type name.
        type_name: &'static str,
    },

    /// A resolved argument did not have the type the handler body expected.
    #[error("handler '{handler}': argument {index} is not of the expected type {type_name}")]
    ArgumentTypeMismatch {
        /// The handler's name.
        handler: String,
        /// Zero-based parameter index.
        index: usize,
        /// The expected type name.
        type_name: &'static str,
    },

    /// The handler body itself reported a failure.
    #[error("handler '{handler}' failed: {message}")]
    HandlerFailed {
        /// The handler's name.
        handler: String,
        /// The failure description.
        message: String,
    },
}

/// Errors surfaced by the extension pipeline as a whole.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The pipeline was run twice against the same controller instance.
    #[error("extension pipeline has already processed controller '{controller}'")]
    AlreadyProcessed {
        /// The controller in question.
        controller: String,
    },

    /// A configuration error from one of the extensions.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An invocation error raised while an extension ran a handler eagerly.
    #[error(transparent)]
    Invocation(#[from] InvocationError),
}
