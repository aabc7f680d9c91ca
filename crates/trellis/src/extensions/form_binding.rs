//! Form-binding wiring.

use crate::decl::BindingDecl;
use crate::error::ConfigError;
use crate::pipeline::{ControllerExtension, ExtensionContext};

/// Establishes two-way bindings between a replaceable model and the
/// view's controls, including rebinding on model replacement.
pub struct FormBindingExtension;

impl ControllerExtension for FormBindingExtension {
    fn name(&self) -> &'static str {
        "form-binding"
    }

    fn extend(&self, ctx: &ExtensionContext<'_>) -> Result<(), ConfigError> {
        for decl in ctx.descriptor.decls() {
            if let BindingDecl::FormBinding(decl) = decl {
                (decl.wire)(ctx.view)?;
                tracing::debug!(
                    target: "trellis::extensions",
                    controller = ctx.controller_id,
                    declaration = %decl.label(),
                    "established form binding"
                );
            }
        }
        Ok(())
    }
}
