//! Enable-node and disable-node wiring.
//!
//! Both families build one boolean predicate chain per annotated node out
//! of the declaration's control-id groups and bind it to the node's
//! disabled flag, releasing any prior binding first. A disable declaration
//! binds the chain directly (chain true → node disabled); an enable
//! declaration binds the negated chain.

use std::sync::Arc;

use trellis_core::{ObservableRef, ObservableValue};

use crate::accessor::ControlAccessor;
use crate::decl::{BindingDecl, NodeActivationDecl};
use crate::error::ConfigError;
use crate::pipeline::{ControllerExtension, ExtensionContext};
use crate::predicate::{BoolBindingBuilder, Quantifier};
use crate::validation::ValidationResult;
use crate::view::View;

/// One control participating in a value group, with its pre-resolved
/// observable dependency.
struct GroupTestable {
    accessor: ControlAccessor,
    observable: ObservableRef,
    user_value: bool,
}

fn resolve_group(
    view: &View,
    ids: &[String],
    user_value: bool,
    label: &str,
) -> Result<Vec<GroupTestable>, ConfigError> {
    ids.iter()
        .map(|id| {
            let accessor = ControlAccessor::resolve(view.graph(), id)?;
            // Capability misses surface here, at wiring time.
            let observable = if user_value {
                accessor.user_value_observable(label)?
            } else {
                accessor.value_or_items_observable(label)?
            };
            Ok(GroupTestable {
                accessor,
                observable,
                user_value,
            })
        })
        .collect()
}

fn add_value_group(
    builder: BoolBindingBuilder,
    testables: Vec<GroupTestable>,
    quantifier: Quantifier,
    op: crate::predicate::BooleanOp,
) -> BoolBindingBuilder {
    if testables.is_empty() {
        return builder;
    }
    builder
        .and_element::<GroupTestable>()
        .bool_op(op)
        .quantifier(quantifier)
        .predicate(|t| {
            if t.user_value {
                t.accessor.has_user_value()
            } else {
                t.accessor.has_any_value()
            }
        })
        .testables(testables)
        .observe_with(|t| Arc::clone(&t.observable))
        .finish()
}

fn build_chain(
    view: &View,
    decl: &NodeActivationDecl,
    label: &str,
    negate_chain: bool,
) -> Result<crate::predicate::BoolBinding, ConfigError> {
    let op = decl.logical_op;
    let mut builder = BoolBindingBuilder::new();

    builder = add_value_group(
        builder,
        resolve_group(view, &decl.when_all_have_user_values, true, label)?,
        Quantifier::All,
        op,
    );
    builder = add_value_group(
        builder,
        resolve_group(view, &decl.when_all_have_values, false, label)?,
        Quantifier::All,
        op,
    );
    builder = add_value_group(
        builder,
        resolve_group(view, &decl.when_at_least_one_has_user_value, true, label)?,
        Quantifier::AtLeastOne,
        op,
    );
    builder = add_value_group(
        builder,
        resolve_group(view, &decl.when_at_least_one_has_values, false, label)?,
        Quantifier::AtLeastOne,
        op,
    );

    let mut has_validity_group = false;
    if decl.when_all_controls_valid {
        let result = view.validation_result().clone();
        builder = validity_element(builder, op, result.clone(), move |r| r.is_ok());
        has_validity_group = true;
    } else if !decl.when_controls_valid.is_empty() {
        // Referenced controls must exist even though the predicate reads
        // the published result rather than the controls themselves.
        for id in &decl.when_controls_valid {
            view.graph().lookup(id)?;
        }
        let ids: Vec<String> = decl.when_controls_valid.clone();
        let result = view.validation_result().clone();
        builder = validity_element(builder, op, result.clone(), move |r| {
            r.errors().all(|m| !ids.contains(&m.control_id))
        });
        has_validity_group = true;
    }

    let empty = decl.when_all_have_user_values.is_empty()
        && decl.when_all_have_values.is_empty()
        && decl.when_at_least_one_has_user_value.is_empty()
        && decl.when_at_least_one_has_values.is_empty()
        && !has_validity_group;
    if empty {
        return Err(ConfigError::MissingValue {
            declaration: label.to_string(),
            what: "at least one non-empty control group",
        });
    }

    builder.negate_chain(negate_chain).build()
}

fn validity_element(
    builder: BoolBindingBuilder,
    op: crate::predicate::BooleanOp,
    result: ObservableValue<ValidationResult>,
    check: impl Fn(&ValidationResult) -> bool + Send + Sync + 'static,
) -> BoolBindingBuilder {
    let probe = result.clone();
    builder
        .and_observable_element()
        .bool_op(op)
        .quantifier(Quantifier::All)
        .predicate(move |_| probe.with(|r| check(r)))
        .testables(vec![Arc::new(result) as ObservableRef])
        .finish()
}

fn wire_activation(
    ctx: &ExtensionContext<'_>,
    decl: &NodeActivationDecl,
    family: &str,
    negate_chain: bool,
) -> Result<(), ConfigError> {
    let label = decl.label(family);
    let node = ctx.view.graph().lookup(&decl.node_id)?;
    let binding = build_chain(ctx.view, decl, &label, negate_chain)?;
    tracing::debug!(
        target: "trellis::extensions",
        controller = ctx.controller_id,
        node = %decl.node_id,
        family,
        "bound node activation"
    );
    node.base().bind_disabled(binding);
    Ok(())
}

/// Wires disable-node declarations: node disabled while the chain holds.
pub struct DisableNodeExtension;

impl ControllerExtension for DisableNodeExtension {
    fn name(&self) -> &'static str {
        "disable-node"
    }

    fn extend(&self, ctx: &ExtensionContext<'_>) -> Result<(), ConfigError> {
        for decl in ctx.descriptor.decls() {
            if let BindingDecl::DisableNode(decl) = decl {
                wire_activation(ctx, decl, "disable-node", false)?;
            }
        }
        Ok(())
    }
}

/// Wires enable-node declarations: node enabled while the chain holds.
pub struct EnableNodeExtension;

impl ControllerExtension for EnableNodeExtension {
    fn name(&self) -> &'static str {
        "enable-node"
    }

    fn extend(&self, ctx: &ExtensionContext<'_>) -> Result<(), ConfigError> {
        for decl in ctx.descriptor.decls() {
            if let BindingDecl::EnableNode(decl) = decl {
                wire_activation(ctx, decl, "enable-node", true)?;
            }
        }
        Ok(())
    }
}
