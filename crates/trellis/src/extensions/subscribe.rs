//! Event-bus subscription wiring.

use crate::decl::BindingDecl;
use crate::error::ConfigError;
use crate::pipeline::{ControllerExtension, ExtensionContext};

/// Registers declared event-bus subscriptions.
///
/// Requires an event bus in the pipeline environment when any subscribe
/// declaration is present.
pub struct SubscribeExtension;

impl ControllerExtension for SubscribeExtension {
    fn name(&self) -> &'static str {
        "subscribe"
    }

    fn extend(&self, ctx: &ExtensionContext<'_>) -> Result<(), ConfigError> {
        for decl in ctx.descriptor.decls() {
            let BindingDecl::Subscribe(decl) = decl else {
                continue;
            };
            let label = decl.label();
            let bus = ctx.env.event_bus().ok_or_else(|| ConfigError::MissingValue {
                declaration: label.clone(),
                what: "an event bus in the pipeline environment",
            })?;
            (decl.register)(bus);
            tracing::debug!(
                target: "trellis::extensions",
                controller = ctx.controller_id,
                declaration = %label,
                priority = decl.priority,
                "registered event subscription"
            );
        }
        Ok(())
    }
}
