//! Multi-selection switch.

use crate::accessor::ControlAccessor;
use crate::decl::BindingDecl;
use crate::error::ConfigError;
use crate::pipeline::{ControllerExtension, ExtensionContext};

/// Switches declared selection controls into multi-select mode.
pub struct MultiSelectionExtension;

impl ControllerExtension for MultiSelectionExtension {
    fn name(&self) -> &'static str {
        "enable-multi-selection"
    }

    fn extend(&self, ctx: &ExtensionContext<'_>) -> Result<(), ConfigError> {
        for decl in ctx.descriptor.decls() {
            let BindingDecl::MultiSelection(decl) = decl else {
                continue;
            };
            let label = decl.label();
            let accessor = ControlAccessor::resolve(ctx.view.graph(), &decl.control_id)?;
            accessor.multi_select_flag(&label)?.set(true);
            tracing::debug!(
                target: "trellis::extensions",
                controller = ctx.controller_id,
                control = %decl.control_id,
                "enabled multi-selection"
            );
        }
        Ok(())
    }
}
