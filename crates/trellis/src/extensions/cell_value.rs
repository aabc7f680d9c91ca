//! Cell-value configuration wiring.

use crate::accessor::ControlAccessor;
use crate::decl::BindingDecl;
use crate::error::ConfigError;
use crate::pipeline::{ControllerExtension, ExtensionContext};

/// Installs cell-value strategies, converters and edit-commit mutators on
/// table, list and tree controls.
///
/// Column resolution happens inside each declaration's install step:
/// explicit id first, then explicit index; a failed resolution is a
/// configuration error naming the attempted mode and its reason.
pub struct CellValueConfigExtension;

impl ControllerExtension for CellValueConfigExtension {
    fn name(&self) -> &'static str {
        "cell-value-config"
    }

    fn extend(&self, ctx: &ExtensionContext<'_>) -> Result<(), ConfigError> {
        for decl in ctx.descriptor.decls() {
            let BindingDecl::CellValueConfig(decl) = decl else {
                continue;
            };
            let accessor = ControlAccessor::resolve(ctx.view.graph(), &decl.control_id)?;
            for install in &decl.installs {
                install(&accessor, decl.label())?;
            }
            tracing::debug!(
                target: "trellis::extensions",
                controller = ctx.controller_id,
                control = %decl.control_id,
                configs = decl.installs.len(),
                "installed cell-value configuration"
            );
        }
        Ok(())
    }
}
