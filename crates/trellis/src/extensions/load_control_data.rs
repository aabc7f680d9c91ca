//! Load-control-data wiring.

use trellis_core::post_to_ui;

use crate::accessor::ControlAccessor;
use crate::decl::{BindingDecl, LoadControlDataDecl};
use crate::error::ConfigError;
use crate::pipeline::{ControllerExtension, ExtensionContext};

/// Runs declared data loaders and applies the loaded items.
///
/// Applicability (item-type match between loader and control) is verified
/// eagerly during wiring. Synchronous loaders run in place; asynchronous
/// loaders run on the executor and apply their items back through the UI
/// queue.
pub struct LoadControlDataExtension;

impl ControllerExtension for LoadControlDataExtension {
    fn name(&self) -> &'static str {
        "load-control-data"
    }

    fn extend(&self, ctx: &ExtensionContext<'_>) -> Result<(), ConfigError> {
        let mut decls: Vec<&LoadControlDataDecl> = ctx
            .descriptor
            .decls()
            .iter()
            .filter_map(|d| match d {
                BindingDecl::LoadControlData(decl) => Some(decl),
                _ => None,
            })
            .collect();
        decls.sort_by_key(|d| d.order);

        for decl in decls {
            let label = decl.label();
            let accessor = ControlAccessor::resolve(ctx.view.graph(), &decl.control_id)?;
            (decl.verify)(&accessor, &label)?;

            let load = decl.load.clone();
            let apply = decl.apply.clone();
            match (decl.async_hint, ctx.env.executor()) {
                (true, Some(executor)) => {
                    let accessor = accessor.clone();
                    let spawned = executor.spawn(move || {
                        let data = load();
                        // Items are applied on the UI thread; the loader
                        // itself never touches the graph.
                        post_to_ui(move || apply(&accessor, data));
                    });
                    if spawned.is_err() {
                        tracing::warn!(
                            target: "trellis::extensions",
                            declaration = %label,
                            "executor shut down, skipping data load"
                        );
                    }
                }
                (true, None) => {
                    tracing::warn!(
                        target: "trellis::extensions",
                        declaration = %label,
                        "no executor available, loading synchronously"
                    );
                    apply(&accessor, load());
                }
                (false, _) => apply(&accessor, load()),
            }
            tracing::debug!(
                target: "trellis::extensions",
                controller = ctx.controller_id,
                control = %decl.control_id,
                "wired data loader"
            );
        }
        Ok(())
    }
}
