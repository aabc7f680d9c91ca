//! Validation-family wiring.

use crate::decl::{BindingDecl, ValidationDecl, build_validator};
use crate::error::ConfigError;
use crate::pipeline::{ControllerExtension, ExtensionContext};

/// Registers declared validators on the view.
///
/// Rules are processed grouped by kind - required, min-max, size, regexp,
/// temporal, boolean, custom - with declaration order preserved inside
/// each kind. Message keys resolve against the environment's message
/// bundle; a missing key falls back to the literal message.
pub struct ValidationExtension;

impl ControllerExtension for ValidationExtension {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn extend(&self, ctx: &ExtensionContext<'_>) -> Result<(), ConfigError> {
        let mut decls: Vec<&ValidationDecl> = ctx
            .descriptor
            .decls()
            .iter()
            .filter_map(|d| match d {
                BindingDecl::Validation(decl) => Some(decl),
                _ => None,
            })
            .collect();
        decls.sort_by_key(|d| d.rule.kind_rank());

        for decl in decls {
            let label = decl.label();
            let message = decl
                .message_key
                .as_ref()
                .and_then(|key| {
                    let resolved = ctx
                        .env
                        .message_bundle()
                        .and_then(|bundle| bundle.get(key))
                        .map(str::to_string);
                    if resolved.is_none() {
                        tracing::warn!(
                            target: "trellis::extensions",
                            declaration = %label,
                            key = %key,
                            "message key not found, using literal message"
                        );
                    }
                    resolved
                })
                .unwrap_or_else(|| decl.message.clone());

            let validator = build_validator(&decl.rule, message, decl.options.required, &label)?;
            ctx.view
                .register_validator(&decl.control_id, decl.target, validator, decl.options, &label)?;
        }
        Ok(())
    }
}
