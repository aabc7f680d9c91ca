//! Filtered-list wiring.

use crate::accessor::ControlAccessor;
use crate::decl::BindingDecl;
use crate::error::ConfigError;
use crate::pipeline::{ControllerExtension, ExtensionContext};

/// Drives a control's item list from a live filtered (and optionally
/// sorted) view over a caller-owned source list.
pub struct FilteredListExtension;

impl ControllerExtension for FilteredListExtension {
    fn name(&self) -> &'static str {
        "filtered-list"
    }

    fn extend(&self, ctx: &ExtensionContext<'_>) -> Result<(), ConfigError> {
        for decl in ctx.descriptor.decls() {
            let BindingDecl::FilteredList(decl) = decl else {
                continue;
            };
            let label = decl.label();
            let accessor = ControlAccessor::resolve(ctx.view.graph(), &decl.control_id)?;
            (decl.wire)(&accessor, ctx.view, &label)?;
            tracing::debug!(
                target: "trellis::extensions",
                controller = ctx.controller_id,
                control = %decl.control_id,
                "installed filtered item view"
            );
        }
        Ok(())
    }
}
