//! The extension families of the wiring pipeline.
//!
//! One file per family, mirroring the declaration vocabulary. The fixed
//! default order is defined here:
//!
//! 1. structural one-shot mutations (nested view, multi-selection,
//!    filtered list) - later families resolve controls these reshape,
//! 2. cell-value configuration,
//! 3. handler families (on-action, load-control-data, on-value-change),
//! 4. form binding,
//! 5. the validation family,
//! 6. node activation (enable, then disable) - last, so "when controls
//!    are valid" groups observe every registered validator,
//! 7. event-bus subscriptions.

mod cell_value;
mod filtered_list;
mod form_binding;
mod load_control_data;
mod multi_selection;
mod nested_view;
mod node_activation;
mod on_action;
mod on_value_change;
mod subscribe;
mod validation;

pub use cell_value::CellValueConfigExtension;
pub use filtered_list::FilteredListExtension;
pub use form_binding::FormBindingExtension;
pub use load_control_data::LoadControlDataExtension;
pub use multi_selection::MultiSelectionExtension;
pub use nested_view::NestedViewExtension;
pub use node_activation::{DisableNodeExtension, EnableNodeExtension};
pub use on_action::OnActionExtension;
pub use on_value_change::OnValueChangeExtension;
pub use subscribe::SubscribeExtension;
pub use validation::ValidationExtension;

use std::sync::Arc;

use trellis_core::BackgroundExecutor;

use crate::invocation::{HandlerMethod, ParameterValue};
use crate::pipeline::ControllerExtension;

/// The default extension sequence in its fixed order.
pub fn default_extensions() -> Vec<Box<dyn ControllerExtension>> {
    vec![
        Box::new(NestedViewExtension),
        Box::new(MultiSelectionExtension),
        Box::new(FilteredListExtension),
        Box::new(CellValueConfigExtension),
        Box::new(OnActionExtension),
        Box::new(LoadControlDataExtension),
        Box::new(OnValueChangeExtension),
        Box::new(FormBindingExtension),
        Box::new(ValidationExtension),
        Box::new(EnableNodeExtension),
        Box::new(DisableNodeExtension),
        Box::new(SubscribeExtension),
    ]
}

/// Fire a wired handler, synchronously or on the executor.
///
/// Asynchronous handlers receive the candidate snapshot taken up front;
/// any UI mutation they perform themselves must be redispatched by the
/// handler author. Invocation failures are fatal and never swallowed.
pub(crate) fn fire_handler(
    handler: &HandlerMethod,
    candidates: Vec<ParameterValue>,
    async_hint: bool,
    executor: Option<&Arc<BackgroundExecutor>>,
) {
    match (async_hint, executor) {
        (true, Some(executor)) => {
            let handler_clone = handler.clone();
            if executor
                .spawn(move || invoke_now(&handler_clone, candidates))
                .is_err()
            {
                tracing::warn!(
                    target: "trellis::extensions",
                    handler = handler.name(),
                    "executor shut down, dropping handler invocation"
                );
            }
        }
        (true, None) => {
            tracing::warn!(
                target: "trellis::extensions",
                handler = handler.name(),
                "no executor available, running asynchronous handler inline"
            );
            invoke_now(handler, candidates);
        }
        (false, _) => invoke_now(handler, candidates),
    }
}

fn invoke_now(handler: &HandlerMethod, candidates: Vec<ParameterValue>) {
    if let Err(err) = handler.invoke(candidates) {
        tracing::error!(target: "trellis::extensions", handler = handler.name(), %err, "handler invocation failed");
        panic!("{err}");
    }
}
