//! Nested-view attachment.

use crate::decl::BindingDecl;
use crate::error::ConfigError;
use crate::pipeline::{ControllerExtension, ExtensionContext};

/// Attaches child views' root nodes into the controller's view.
///
/// A structural one-shot mutation: the child view is resolved through the
/// pipeline environment and its root node is inserted at the declared
/// position. An unknown child view or target node is a configuration
/// error.
pub struct NestedViewExtension;

impl ControllerExtension for NestedViewExtension {
    fn name(&self) -> &'static str {
        "nested-view"
    }

    fn extend(&self, ctx: &ExtensionContext<'_>) -> Result<(), ConfigError> {
        for decl in ctx.descriptor.decls() {
            let BindingDecl::NestedView(decl) = decl else {
                continue;
            };
            let label = decl.label();
            let child = ctx.env.lookup_view(&decl.child_view_id).ok_or_else(|| {
                ConfigError::UnknownView {
                    declaration: label.clone(),
                    view_id: decl.child_view_id.clone(),
                }
            })?;
            ctx.view
                .attach_nested(&child, &decl.attach_to, &decl.position, &label)?;
            tracing::debug!(
                target: "trellis::extensions",
                controller = ctx.controller_id,
                child = %decl.child_view_id,
                target = %decl.attach_to,
                "attached nested view"
            );
        }
        Ok(())
    }
}
