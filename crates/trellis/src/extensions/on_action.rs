//! On-action handler wiring.

use trellis_core::ListenerGuard;

use crate::accessor::ControlAccessor;
use crate::decl::{BindingDecl, OnActionDecl};
use crate::error::ConfigError;
use crate::pipeline::{ControllerExtension, ExtensionContext};

use super::fire_handler;

/// Connects declared handlers to control action signals.
///
/// Handlers on the same control fire in ascending declared order; ties
/// keep declaration order (stable sort). Asynchronous handlers run on the
/// environment's executor.
pub struct OnActionExtension;

impl ControllerExtension for OnActionExtension {
    fn name(&self) -> &'static str {
        "on-action"
    }

    fn extend(&self, ctx: &ExtensionContext<'_>) -> Result<(), ConfigError> {
        let mut decls: Vec<&OnActionDecl> = ctx
            .descriptor
            .decls()
            .iter()
            .filter_map(|d| match d {
                BindingDecl::OnAction(decl) => Some(decl),
                _ => None,
            })
            .collect();
        decls.sort_by_key(|d| d.order);

        for decl in decls {
            let label = decl.label();
            let accessor = ControlAccessor::resolve(ctx.view.graph(), &decl.control_id)?;
            let signal = accessor.action_signal(&label)?;

            let handler = decl.handler.clone();
            let async_hint = decl.async_hint;
            let executor = ctx.env.executor().cloned();
            let connection = signal.connect(move |_| {
                fire_handler(&handler, Vec::new(), async_hint, executor.as_ref());
            });

            let accessor_for_guard = accessor.clone();
            ctx.view.retain(Box::new(ListenerGuard::new(move || {
                if let Ok(signal) = accessor_for_guard.action_signal("on-action") {
                    signal.disconnect(connection);
                }
            })));
            tracing::debug!(
                target: "trellis::extensions",
                controller = ctx.controller_id,
                control = %decl.control_id,
                order = decl.order,
                "connected action handler"
            );
        }
        Ok(())
    }
}
