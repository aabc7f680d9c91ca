//! On-value-change handler wiring with debounce.
//!
//! Each declaration installs a listener on the control's value source -
//! the textual user value or a typed selection list. With a non-zero
//! timeout the listener feeds a restartable debounce window: only the last
//! change of a burst reaches the handler, carrying that change's candidate
//! values.

use std::sync::Arc;

use parking_lot::Mutex;
use trellis_core::{Debouncer, ListenerGuard, post_to_ui};

use crate::accessor::ControlAccessor;
use crate::decl::{BindingDecl, CandidateSink, OnValueChangeDecl, ValueChangeSource};
use crate::error::ConfigError;
use crate::graph::ControlProperty;
use crate::invocation::{ArgumentHint, ParameterValue};
use crate::pipeline::{ControllerExtension, ExtensionContext};

use super::fire_handler;

/// Wires value-change handlers, debounced per declaration.
pub struct OnValueChangeExtension;

impl ControllerExtension for OnValueChangeExtension {
    fn name(&self) -> &'static str {
        "on-value-change"
    }

    fn extend(&self, ctx: &ExtensionContext<'_>) -> Result<(), ConfigError> {
        let mut decls: Vec<&OnValueChangeDecl> = ctx
            .descriptor
            .decls()
            .iter()
            .filter_map(|d| match d {
                BindingDecl::OnValueChange(decl) => Some(decl),
                _ => None,
            })
            .collect();
        decls.sort_by_key(|d| d.order);

        for decl in decls {
            let label = decl.label();
            let accessor = ControlAccessor::resolve(ctx.view.graph(), &decl.control_id)?;

            // Delivery: gate on the active switch, then invoke.
            let handler = decl.handler.clone();
            let async_hint = decl.async_hint;
            let executor = ctx.env.executor().cloned();
            let active = decl.active.clone();
            let deliver: CandidateSink = Arc::new(move |candidates: Vec<ParameterValue>| {
                if let Some(active) = &active
                    && !active.get()
                {
                    return;
                }
                fire_handler(&handler, candidates, async_hint, executor.as_ref());
            });

            // Debounce: a restartable window holding the latest candidates.
            let sink: CandidateSink = if decl.timeout_ms == 0 {
                deliver
            } else {
                let pending: Arc<Mutex<Option<Vec<ParameterValue>>>> = Arc::default();
                let pending_for_timer = Arc::clone(&pending);
                let debouncer = Arc::new(Debouncer::new(
                    std::time::Duration::from_millis(decl.timeout_ms),
                    move || {
                        if let Some(candidates) = pending_for_timer.lock().take() {
                            let deliver = Arc::clone(&deliver);
                            post_to_ui(move || deliver(candidates));
                        }
                    },
                ));
                Arc::new(move |candidates: Vec<ParameterValue>| {
                    *pending.lock() = Some(candidates);
                    debouncer.poke();
                })
            };

            let guard = match &decl.source {
                ValueChangeSource::UserText => wire_text(&accessor, &label, sink)?,
                ValueChangeSource::Selection(hook) => hook(&accessor, &label, sink)?,
            };
            ctx.view.retain(Box::new(guard));
            tracing::debug!(
                target: "trellis::extensions",
                controller = ctx.controller_id,
                control = %decl.control_id,
                timeout_ms = decl.timeout_ms,
                order = decl.order,
                "wired value-change handler"
            );
        }
        Ok(())
    }
}

fn wire_text(
    accessor: &ControlAccessor,
    label: &str,
    sink: CandidateSink,
) -> Result<ListenerGuard, ConfigError> {
    let text = accessor.text_property(ControlProperty::UserValue, label)?;
    let id = text.on_change(move |old, new| {
        sink(vec![
            ParameterValue::hinted(ArgumentHint::NewValue, new.clone()),
            ParameterValue::hinted(ArgumentHint::OldValue, old.clone()),
        ]);
    });
    let text_for_guard = text.clone();
    Ok(ListenerGuard::new(move || {
        text_for_guard.remove_change_listener(id);
    }))
}
