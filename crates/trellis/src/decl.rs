//! The declaration vocabulary: binding intent as data.
//!
//! Controllers describe their wiring with pure-data declarations - which
//! node is enabled when, which model property binds to which control, what
//! runs when a value changes. The extension pipeline consumes the
//! declarations; nothing here installs a listener by itself.
//!
//! Where a declaration needs type knowledge (a table's row type, a filtered
//! list's element type), its constructor is generic and captures the typed
//! wiring in an erased closure. The resulting [`ControllerDescriptor`] is a
//! frozen binding plan: built once per controller, executed without further
//! type inspection.
//!
//! Defaults: boolean combination [`BooleanOp::And`], value-change debounce
//! 100 ms, handler order 0, validation mode on-change.

use std::any::Any;
use std::sync::Arc;

use trellis_core::{
    Comparator, Filter, FilteredList, ListenerGuard, ObservableList, ObservableValue, SortedList,
};

use crate::accessor::ControlAccessor;
use crate::controls::{ChoiceBox, ListView, TableView, TreeView};
use crate::error::ConfigError;
use crate::events::EventBus;
use crate::graph::{AttachPosition, ControlProperty};
use crate::invocation::{ArgumentHint, HandlerMethod, ParameterValue};
use crate::predicate::BooleanOp;
use crate::validation::{
    BooleanValidator, CustomValidator, MinMaxValidator, RegExpValidator, RequiredValidator,
    SizeValidator, TemporalConstraint, TemporalValidator, ValidationOptions, Validator,
};
use crate::view::View;

/// Declares when a node is disabled (or enabled) based on sibling controls.
///
/// Up to four control-id groups contribute predicate elements; non-empty
/// groups are combined with [`logical_op`](Self::logical_op). The
/// validity groups observe the view's published validation result.
#[derive(Clone, Debug)]
pub struct NodeActivationDecl {
    /// The node whose disabled flag is driven.
    pub node_id: String,
    /// All of these controls have a user value.
    pub when_all_have_user_values: Vec<String>,
    /// At least one of these controls has a user value.
    pub when_at_least_one_has_user_value: Vec<String>,
    /// All of these controls have a value or content.
    pub when_all_have_values: Vec<String>,
    /// At least one of these controls has a value or content.
    pub when_at_least_one_has_values: Vec<String>,
    /// These controls pass validation.
    pub when_controls_valid: Vec<String>,
    /// Every validated control in the view passes validation.
    pub when_all_controls_valid: bool,
    /// How the groups are linked. Default AND.
    pub logical_op: BooleanOp,
}

impl NodeActivationDecl {
    /// Create a declaration for the given node with empty groups.
    pub fn for_node(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            when_all_have_user_values: Vec::new(),
            when_at_least_one_has_user_value: Vec::new(),
            when_all_have_values: Vec::new(),
            when_at_least_one_has_values: Vec::new(),
            when_controls_valid: Vec::new(),
            when_all_controls_valid: false,
            logical_op: BooleanOp::And,
        }
    }

    /// Require all listed controls to have user values.
    pub fn when_all_have_user_values<I: IntoIterator<Item = S>, S: Into<String>>(
        mut self,
        ids: I,
    ) -> Self {
        self.when_all_have_user_values = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Require at least one listed control to have a user value.
    pub fn when_at_least_one_has_user_value<I: IntoIterator<Item = S>, S: Into<String>>(
        mut self,
        ids: I,
    ) -> Self {
        self.when_at_least_one_has_user_value = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Require all listed controls to have a value or content.
    pub fn when_all_have_values<I: IntoIterator<Item = S>, S: Into<String>>(
        mut self,
        ids: I,
    ) -> Self {
        self.when_all_have_values = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Require at least one listed control to have a value or content.
    pub fn when_at_least_one_has_values<I: IntoIterator<Item = S>, S: Into<String>>(
        mut self,
        ids: I,
    ) -> Self {
        self.when_at_least_one_has_values = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Require the listed controls to pass validation.
    pub fn when_controls_valid<I: IntoIterator<Item = S>, S: Into<String>>(
        mut self,
        ids: I,
    ) -> Self {
        self.when_controls_valid = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Require every validated control in the view to pass validation.
    pub fn when_all_controls_valid(mut self, flag: bool) -> Self {
        self.when_all_controls_valid = flag;
        self
    }

    /// Set the boolean operator linking the groups.
    pub fn logical_op(mut self, op: BooleanOp) -> Self {
        self.logical_op = op;
        self
    }

    pub(crate) fn label(&self, family: &str) -> String {
        format!("{family}:{}", self.node_id)
    }
}

/// Declares a handler fired by a control's action signal.
pub struct OnActionDecl {
    /// The triggering control.
    pub control_id: String,
    /// Ascending firing order among handlers on the same control.
    pub order: i32,
    /// Run the handler body on the background executor.
    pub async_hint: bool,
    /// The handler.
    pub handler: HandlerMethod,
}

impl OnActionDecl {
    /// Declare a handler for the given control's action.
    pub fn new(control_id: impl Into<String>, handler: HandlerMethod) -> Self {
        Self {
            control_id: control_id.into(),
            order: 0,
            async_hint: false,
            handler,
        }
    }

    /// Set the firing order.
    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Run the handler asynchronously.
    pub fn run_async(mut self) -> Self {
        self.async_hint = true;
        self
    }

    pub(crate) fn label(&self) -> String {
        format!("on-action:{}:{}", self.control_id, self.handler.name())
    }
}

pub(crate) type CandidateSink = Arc<dyn Fn(Vec<ParameterValue>) + Send + Sync>;

type SelectionHook =
    Arc<dyn Fn(&ControlAccessor, &str, CandidateSink) -> Result<ListenerGuard, ConfigError> + Send + Sync>;

pub(crate) enum ValueChangeSource {
    /// Observe the control's textual user value.
    UserText,
    /// Observe a typed selection list.
    Selection(SelectionHook),
}

/// Declares a handler fired when a control's value changes.
///
/// Changes are debounced: the handler fires `timeout_ms` after the last
/// observed change, once per quiet period. A timeout of zero installs a
/// plain immediate listener.
pub struct OnValueChangeDecl {
    /// The observed control.
    pub control_id: String,
    /// Ascending firing order among handlers on the same control.
    pub order: i32,
    /// Debounce quiet period in milliseconds. Default 100.
    pub timeout_ms: u64,
    /// Run the handler body on the background executor.
    pub async_hint: bool,
    /// Optional switch: when it holds `false` the listener is inert.
    pub active: Option<ObservableValue<bool>>,
    pub(crate) source: ValueChangeSource,
    /// The handler.
    pub handler: HandlerMethod,
}

impl OnValueChangeDecl {
    /// Observe a textual control's user value.
    ///
    /// Candidates offered to the handler: the new value
    /// ([`ArgumentHint::NewValue`]) and the old value
    /// ([`ArgumentHint::OldValue`]), both `String`.
    pub fn for_text(control_id: impl Into<String>, handler: HandlerMethod) -> Self {
        Self {
            control_id: control_id.into(),
            order: 0,
            timeout_ms: 100,
            async_hint: false,
            active: None,
            source: ValueChangeSource::UserText,
            handler,
        }
    }

    /// Observe a multi-selection control with item type `T`.
    ///
    /// Candidates offered to the handler: added values, removed values and
    /// the full selection, each a `Vec<T>` with the corresponding hint.
    pub fn for_selection<T>(control_id: impl Into<String>, handler: HandlerMethod) -> Self
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let hook: SelectionHook = Arc::new(
            |accessor: &ControlAccessor, declaration: &str, sink: CandidateSink| {
                let selection = typed_selection::<T>(accessor, declaration)?;
                let selection_for_listener = selection.clone();
                let id = selection.on_list_change(move |change| {
                    sink(vec![
                        ParameterValue::hinted(ArgumentHint::AddedValues, change.added.clone()),
                        ParameterValue::hinted(ArgumentHint::RemovedValues, change.removed.clone()),
                        ParameterValue::hinted(
                            ArgumentHint::AllSelected,
                            selection_for_listener.snapshot(),
                        ),
                    ]);
                });
                let selection_for_guard = selection.clone();
                Ok(ListenerGuard::new(move || {
                    selection_for_guard.remove_list_listener(id);
                }))
            },
        );
        Self {
            control_id: control_id.into(),
            order: 0,
            timeout_ms: 100,
            async_hint: false,
            active: None,
            source: ValueChangeSource::Selection(hook),
            handler,
        }
    }

    /// Set the debounce quiet period (0 = immediate).
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Set the firing order.
    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Run the handler asynchronously.
    pub fn run_async(mut self) -> Self {
        self.async_hint = true;
        self
    }

    /// Gate the listener on an external boolean property.
    pub fn active_when(mut self, active: ObservableValue<bool>) -> Self {
        self.active = Some(active);
        self
    }

    pub(crate) fn label(&self) -> String {
        format!("on-value-change:{}:{}", self.control_id, self.handler.name())
    }
}

type VerifyFn = Arc<dyn Fn(&ControlAccessor, &str) -> Result<(), ConfigError> + Send + Sync>;
type LoaderFn = Arc<dyn Fn() -> Box<dyn Any + Send> + Send + Sync>;
type ApplyFn = Arc<dyn Fn(&ControlAccessor, Box<dyn Any + Send>) + Send + Sync>;

/// Declares a data loader populating a multi-value control's items.
pub struct LoadControlDataDecl {
    /// The populated control.
    pub control_id: String,
    /// Ascending execution order among loaders.
    pub order: i32,
    /// Run the loader on the background executor; the loaded items are
    /// applied back on the UI thread.
    pub async_hint: bool,
    pub(crate) verify: VerifyFn,
    pub(crate) load: LoaderFn,
    pub(crate) apply: ApplyFn,
    name: String,
}

impl LoadControlDataDecl {
    /// Declare a loader producing items of type `T` for a list, choice or
    /// table control with matching item type.
    pub fn new<T, F>(control_id: impl Into<String>, name: impl Into<String>, loader: F) -> Self
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn() -> Vec<T> + Send + Sync + 'static,
    {
        let verify: VerifyFn = Arc::new(|accessor: &ControlAccessor, declaration: &str| {
            typed_items::<T>(accessor, declaration).map(|_| ())
        });
        let apply: ApplyFn = Arc::new(|accessor: &ControlAccessor, data: Box<dyn Any + Send>| {
            match (typed_items::<T>(accessor, "load-control-data"), data.downcast::<Vec<T>>()) {
                (Ok(items), Ok(data)) => items.set_all(*data),
                _ => tracing::warn!(
                    target: "trellis::decl",
                    control = accessor.control_id(),
                    "loaded data no longer applies to control, dropping"
                ),
            }
        });
        Self {
            control_id: control_id.into(),
            order: 0,
            async_hint: false,
            verify,
            load: Arc::new(move || Box::new(loader()) as Box<dyn Any + Send>),
            apply,
            name: name.into(),
        }
    }

    /// Set the execution order.
    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Run the loader asynchronously.
    pub fn run_async(mut self) -> Self {
        self.async_hint = true;
        self
    }

    pub(crate) fn label(&self) -> String {
        format!("load-control-data:{}:{}", self.control_id, self.name)
    }
}

/// How a cell-value configuration resolves its table column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnTarget {
    /// Resolve by explicit column id.
    ById(String),
    /// Resolve by explicit column index.
    ByIndex(usize),
    /// No column: the configuration applies to the whole control.
    WholeControl,
}

type InstallFn = Arc<dyn Fn(&ControlAccessor, &str) -> Result<(), ConfigError> + Send + Sync>;

/// Configuration for one table column.
pub struct TableColumnConfig<T> {
    target: ColumnTarget,
    cell_value: Arc<dyn Fn(&T) -> String + Send + Sync>,
    commit: Option<Arc<dyn Fn(&mut T, &str) + Send + Sync>>,
}

impl<T> TableColumnConfig<T> {
    /// Configure the column with the given id.
    pub fn by_id<F>(column_id: impl Into<String>, cell_value: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            target: ColumnTarget::ById(column_id.into()),
            cell_value: Arc::new(cell_value),
            commit: None,
        }
    }

    /// Configure the column at the given index.
    pub fn by_index<F>(index: usize, cell_value: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            target: ColumnTarget::ByIndex(index),
            cell_value: Arc::new(cell_value),
            commit: None,
        }
    }

    /// A configuration without a column target; resolution fails with a
    /// configuration error naming the omission.
    pub fn untargeted<F>(cell_value: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            target: ColumnTarget::WholeControl,
            cell_value: Arc::new(cell_value),
            commit: None,
        }
    }

    /// Mark the column editable; committed edits are written back through
    /// `commit`.
    pub fn editable<F>(mut self, commit: F) -> Self
    where
        F: Fn(&mut T, &str) + Send + Sync + 'static,
    {
        self.commit = Some(Arc::new(commit));
        self
    }
}

/// Declares cell-value strategies for a table, list or tree control.
pub struct CellValueConfigDecl {
    /// The configured control.
    pub control_id: String,
    label: String,
    pub(crate) installs: Vec<InstallFn>,
}

impl CellValueConfigDecl {
    /// Configure columns of a table with row type `T`.
    ///
    /// Declaration order determines processing order, so repeated
    /// configurations keep their declared sequence.
    pub fn for_table<T>(control_id: impl Into<String>, configs: Vec<TableColumnConfig<T>>) -> Self
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let control_id = control_id.into();
        let installs = configs
            .into_iter()
            .map(|config| {
                let install: InstallFn = Arc::new(
                    move |accessor: &ControlAccessor, declaration: &str| {
                        let table: &TableView<T> = accessor.downcast(declaration)?;
                        let index = resolve_column(table, &config.target, declaration)?;
                        let cell_value = Arc::clone(&config.cell_value);
                        table.configure_column(index, move |row: &T| cell_value(row));
                        if let Some(commit) = config.commit.clone() {
                            table.configure_editable(index, move |row: &mut T, text: &str| {
                                commit(row, text);
                            });
                        }
                        Ok(())
                    },
                );
                install
            })
            .collect();
        Self {
            label: format!("cell-value-config:{control_id}"),
            control_id,
            installs,
        }
    }

    /// Install a display converter on a list view with item type `T`.
    ///
    /// List views cannot bind cells to a sub-property; a single string
    /// converter is the only supported configuration.
    pub fn for_list<T, F>(control_id: impl Into<String>, converter: F) -> Self
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        let control_id = control_id.into();
        let converter = Arc::new(converter);
        let install: InstallFn = Arc::new(move |accessor: &ControlAccessor, declaration: &str| {
            let list: &ListView<T> = accessor.downcast(declaration)?;
            let converter = Arc::clone(&converter);
            list.set_converter(move |item: &T| converter(item));
            Ok(())
        });
        Self {
            label: format!("cell-value-config:{control_id}"),
            control_id,
            installs: vec![install],
        }
    }

    /// Install a display converter on a tree view with item type `T`.
    pub fn for_tree<T, F>(control_id: impl Into<String>, converter: F) -> Self
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        let control_id = control_id.into();
        let converter = Arc::new(converter);
        let install: InstallFn = Arc::new(move |accessor: &ControlAccessor, declaration: &str| {
            let tree: &TreeView<T> = accessor.downcast(declaration)?;
            let converter = Arc::clone(&converter);
            tree.set_converter(move |item: &T| converter(item));
            Ok(())
        });
        Self {
            label: format!("cell-value-config:{control_id}"),
            control_id,
            installs: vec![install],
        }
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }
}

fn resolve_column<T: Clone + PartialEq + Send + Sync + 'static>(
    table: &TableView<T>,
    target: &ColumnTarget,
    declaration: &str,
) -> Result<usize, ConfigError> {
    match target {
        ColumnTarget::ById(column_id) => {
            table
                .column_index(column_id)
                .ok_or_else(|| ConfigError::ColumnResolution {
                    declaration: declaration.to_string(),
                    mode: "id",
                    reason: format!("unknown column id '{column_id}'"),
                })
        }
        ColumnTarget::ByIndex(index) => {
            let count = table.column_count();
            if *index < count {
                Ok(*index)
            } else {
                Err(ConfigError::ColumnResolution {
                    declaration: declaration.to_string(),
                    mode: "index",
                    reason: format!(
                        "column index {index} is out of bounds for a table with {count} column(s)"
                    ),
                })
            }
        }
        ColumnTarget::WholeControl => Err(ConfigError::ColumnResolution {
            declaration: declaration.to_string(),
            mode: "none",
            reason: "neither a column id nor a column index was specified".to_string(),
        }),
    }
}

/// Declares the attachment of a child view's root node.
#[derive(Clone, Debug)]
pub struct NestedViewDecl {
    /// The attached child view.
    pub child_view_id: String,
    /// The node the child is attached under.
    pub attach_to: String,
    /// Where among the target's children.
    pub position: AttachPosition,
}

impl NestedViewDecl {
    /// Attach `child_view_id` under `attach_to`, appended.
    pub fn new(child_view_id: impl Into<String>, attach_to: impl Into<String>) -> Self {
        Self {
            child_view_id: child_view_id.into(),
            attach_to: attach_to.into(),
            position: AttachPosition::Append,
        }
    }

    /// Set the attach position.
    pub fn position(mut self, position: AttachPosition) -> Self {
        self.position = position;
        self
    }

    pub(crate) fn label(&self) -> String {
        format!("nested-view:{}", self.child_view_id)
    }
}

/// Declares multi-select mode for a selection control.
#[derive(Clone, Debug)]
pub struct MultiSelectionDecl {
    /// The control switched to multi-select.
    pub control_id: String,
}

impl MultiSelectionDecl {
    /// Switch the given control to multi-select mode.
    pub fn new(control_id: impl Into<String>) -> Self {
        Self {
            control_id: control_id.into(),
        }
    }

    pub(crate) fn label(&self) -> String {
        format!("enable-multi-selection:{}", self.control_id)
    }
}

type FilteredWireFn =
    Arc<dyn Fn(&ControlAccessor, &View, &str) -> Result<(), ConfigError> + Send + Sync>;

/// Declares a live filtered (and optionally sorted) item view for a
/// multi-value control.
pub struct FilteredListDecl {
    /// The control whose displayed items follow the filtered view.
    pub control_id: String,
    pub(crate) wire: FilteredWireFn,
}

impl FilteredListDecl {
    /// Drive `control_id`'s items from a live filtered view over `source`.
    ///
    /// The filter property stays under the caller's control; replacing the
    /// [`Filter`] re-filters immediately.
    pub fn new<T>(
        control_id: impl Into<String>,
        source: ObservableList<T>,
        filter: ObservableValue<Filter<T>>,
    ) -> Self
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        Self::build(control_id, source, filter, None)
    }

    /// Like [`new`](Self::new), additionally keeping the view sorted.
    pub fn sorted<T>(
        control_id: impl Into<String>,
        source: ObservableList<T>,
        filter: ObservableValue<Filter<T>>,
        comparator: Comparator<T>,
    ) -> Self
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        Self::build(control_id, source, filter, Some(comparator))
    }

    fn build<T>(
        control_id: impl Into<String>,
        source: ObservableList<T>,
        filter: ObservableValue<Filter<T>>,
        comparator: Option<Comparator<T>>,
    ) -> Self
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let wire: FilteredWireFn = Arc::new(
            move |accessor: &ControlAccessor, view: &View, declaration: &str| {
                let items = typed_items::<T>(accessor, declaration)?;
                let filtered = FilteredList::new(&source, filter.clone());
                match &comparator {
                    Some(comparator) => {
                        let sorted = SortedList::new(filtered.output(), comparator.clone());
                        let guard = sync_items(sorted.output(), &items);
                        view.retain(Box::new((filtered, sorted, guard)));
                    }
                    None => {
                        let guard = sync_items(filtered.output(), &items);
                        view.retain(Box::new((filtered, guard)));
                    }
                }
                Ok(())
            },
        );
        Self {
            control_id: control_id.into(),
            wire,
        }
    }

    pub(crate) fn label(&self) -> String {
        format!("filtered-list:{}", self.control_id)
    }
}

fn sync_items<T: Clone + Send + Sync + 'static>(
    output: &ObservableList<T>,
    control_items: &ObservableList<T>,
) -> ListenerGuard {
    control_items.set_all(output.snapshot());
    let output_clone = output.clone();
    let control_clone = control_items.clone();
    let id = output.on_invalidate(move || {
        control_clone.set_all(output_clone.snapshot());
    });
    let output_for_guard = output.clone();
    ListenerGuard::new(move || {
        output_for_guard.remove_invalidation_listener(id);
    })
}

/// One validation rule of the declaration vocabulary.
#[derive(Clone)]
pub enum ValidationRule {
    /// The control must carry a user value.
    Required,
    /// The text must match a regular expression.
    RegExp {
        /// The pattern source.
        pattern: String,
    },
    /// The date value must satisfy temporal constraints.
    Temporal {
        /// The constraints.
        constraint: TemporalConstraint,
        /// Optional date format pattern.
        pattern: Option<String>,
    },
    /// The numeric value must lie in an inclusive range.
    MinMax {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// The value length must lie in an inclusive range.
    Size {
        /// Lower bound.
        min: Option<u64>,
        /// Upper bound.
        max: Option<u64>,
    },
    /// A two-state control must match the expected state.
    Boolean {
        /// The expected state.
        expected: bool,
    },
    /// A caller-supplied validation strategy.
    Custom(Arc<dyn Validator>),
}

impl ValidationRule {
    /// The processing rank of the rule kind within the validation family.
    pub(crate) fn kind_rank(&self) -> u8 {
        match self {
            Self::Required => 0,
            Self::MinMax { .. } => 1,
            Self::Size { .. } => 2,
            Self::RegExp { .. } => 3,
            Self::Temporal { .. } => 4,
            Self::Boolean { .. } => 5,
            Self::Custom(_) => 6,
        }
    }
}

/// Declares one validation rule against a control surface.
#[derive(Clone)]
pub struct ValidationDecl {
    /// The validated control.
    pub control_id: String,
    /// The validated surface.
    pub target: ControlProperty,
    /// The rule.
    pub rule: ValidationRule,
    /// The literal violation message.
    pub message: String,
    /// Optional bundle key overriding the literal message.
    pub message_key: Option<String>,
    /// Registration options.
    pub options: ValidationOptions,
}

impl ValidationDecl {
    fn new(control_id: impl Into<String>, rule: ValidationRule, message: impl Into<String>) -> Self {
        Self {
            control_id: control_id.into(),
            target: ControlProperty::UserValue,
            rule,
            message: message.into(),
            message_key: None,
            options: ValidationOptions::default(),
        }
    }

    /// Require a user value.
    pub fn required(control_id: impl Into<String>, message: impl Into<String>) -> Self {
        let mut decl = Self::new(control_id, ValidationRule::Required, message);
        decl.options = decl.options.required(true);
        decl
    }

    /// Match the text against a regular expression.
    pub fn regexp(
        control_id: impl Into<String>,
        pattern: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            control_id,
            ValidationRule::RegExp {
                pattern: pattern.into(),
            },
            message,
        )
    }

    /// Constrain a date value relative to today.
    pub fn temporal(
        control_id: impl Into<String>,
        constraint: TemporalConstraint,
        pattern: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            control_id,
            ValidationRule::Temporal {
                constraint,
                pattern,
            },
            message,
        )
    }

    /// Constrain a numeric value to an inclusive range.
    pub fn min_max(
        control_id: impl Into<String>,
        min: f64,
        max: f64,
        message: impl Into<String>,
    ) -> Self {
        Self::new(control_id, ValidationRule::MinMax { min, max }, message)
    }

    /// Constrain the value length.
    pub fn size(
        control_id: impl Into<String>,
        min: Option<u64>,
        max: Option<u64>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(control_id, ValidationRule::Size { min, max }, message)
    }

    /// Require a two-state control to match the expected state.
    pub fn boolean(
        control_id: impl Into<String>,
        expected: bool,
        message: impl Into<String>,
    ) -> Self {
        Self::new(control_id, ValidationRule::Boolean { expected }, message)
    }

    /// Register a caller-supplied validator.
    pub fn custom(control_id: impl Into<String>, validator: Arc<dyn Validator>) -> Self {
        Self::new(control_id, ValidationRule::Custom(validator), "")
    }

    /// Set the validated surface.
    pub fn target(mut self, target: ControlProperty) -> Self {
        self.target = target;
        self
    }

    /// Replace the registration options.
    pub fn options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolve the message through a bundle key.
    pub fn message_key(mut self, key: impl Into<String>) -> Self {
        self.message_key = Some(key.into());
        self
    }

    pub(crate) fn label(&self) -> String {
        format!("validate:{}", self.control_id)
    }
}

/// Build the validator strategy for a rule.
pub(crate) fn build_validator(
    rule: &ValidationRule,
    message: String,
    required: bool,
    declaration: &str,
) -> Result<Arc<dyn Validator>, ConfigError> {
    Ok(match rule {
        ValidationRule::Required => Arc::new(RequiredValidator::new(message)),
        ValidationRule::RegExp { pattern } => {
            let compiled =
                regex::Regex::new(pattern).map_err(|err| ConfigError::InvalidPattern {
                    declaration: declaration.to_string(),
                    pattern: pattern.clone(),
                    message: err.to_string(),
                })?;
            Arc::new(RegExpValidator::new(message, compiled, required))
        }
        ValidationRule::Temporal {
            constraint,
            pattern,
        } => Arc::new(TemporalValidator::new(
            message,
            *constraint,
            pattern.clone(),
            required,
        )),
        ValidationRule::MinMax { min, max } => {
            Arc::new(MinMaxValidator::new(message, *min, *max, required))
        }
        ValidationRule::Size { min, max } => {
            Arc::new(SizeValidator::new(message, *min, *max, required))
        }
        ValidationRule::Boolean { expected } => Arc::new(BooleanValidator::new(message, *expected)),
        ValidationRule::Custom(validator) => Arc::clone(validator),
    })
}

/// One field mapping of a form binding.
pub struct FormFieldMapping {
    /// Dotted model property path.
    pub property_path: String,
    /// Target control id.
    pub control_id: String,
    /// Target control surface.
    pub target: ControlProperty,
    /// Optional format pattern for textual controls.
    pub format_pattern: Option<String>,
    /// Validation rules registered alongside the binding.
    pub validations: Vec<(ValidationRule, String)>,
    /// Options for the mapped validations.
    pub options: ValidationOptions,
}

impl FormFieldMapping {
    /// Map `property_path` to `control_id` on the user-value surface.
    pub fn new(property_path: impl Into<String>, control_id: impl Into<String>) -> Self {
        Self {
            property_path: property_path.into(),
            control_id: control_id.into(),
            target: ControlProperty::UserValue,
            format_pattern: None,
            validations: Vec::new(),
            options: ValidationOptions::default(),
        }
    }

    /// Set the target surface.
    pub fn target(mut self, target: ControlProperty) -> Self {
        self.target = target;
        self
    }

    /// Set a format pattern.
    pub fn format_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.format_pattern = Some(pattern.into());
        self
    }

    /// Add a validation rule with its message.
    pub fn validate(mut self, rule: ValidationRule, message: impl Into<String>) -> Self {
        self.validations.push((rule, message.into()));
        self
    }

    /// Replace the validation options.
    pub fn options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }
}

/// Configuration of a form binding declaration.
pub struct FormBindingConfig {
    /// Control-id prefix for name-based resolution.
    pub control_prefix: String,
    /// Control-id suffix for name-based resolution.
    pub control_suffix: String,
    /// Whether name-based resolution applies to unmapped properties.
    pub name_based: bool,
    /// Explicit field mappings.
    pub mappings: Vec<FormFieldMapping>,
}

impl Default for FormBindingConfig {
    fn default() -> Self {
        Self {
            control_prefix: String::new(),
            control_suffix: String::new(),
            name_based: true,
            mappings: Vec::new(),
        }
    }
}

impl FormBindingConfig {
    /// Start an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name-based prefix.
    pub fn control_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.control_prefix = prefix.into();
        self
    }

    /// Set the name-based suffix.
    pub fn control_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.control_suffix = suffix.into();
        self
    }

    /// Disable name-based resolution.
    pub fn disable_name_based(mut self) -> Self {
        self.name_based = false;
        self
    }

    /// Add an explicit mapping.
    pub fn mapping(mut self, mapping: FormFieldMapping) -> Self {
        self.mappings.push(mapping);
        self
    }
}

type FormWireFn = Arc<dyn Fn(&View) -> Result<(), ConfigError> + Send + Sync>;

/// Declares two-way binding between a replaceable model and a view's
/// controls.
pub struct FormBindingDecl {
    name: String,
    pub(crate) wire: FormWireFn,
}

impl FormBindingDecl {
    /// Bind the model held in `model` to the view's controls.
    ///
    /// When the model slot changes to a different instance, every binding
    /// is detached from the old instance and rebuilt against the new one.
    pub fn new<M>(
        name: impl Into<String>,
        model: crate::path::ModelProperty<M>,
        config: FormBindingConfig,
    ) -> Self
    where
        M: crate::path::ModelProperties,
    {
        use crate::bind::{BindingTarget, BindingTargetResolver, MappingBasedResolver,
            NameBasedResolver, bind_model};

        let name = name.into();
        let label = format!("form-binding:{name}");

        let mapping_targets: Vec<BindingTarget> = config
            .mappings
            .iter()
            .map(|mapping| BindingTarget {
                property_path: mapping.property_path.clone(),
                control_id: mapping.control_id.clone(),
                target: mapping.target,
                format_pattern: mapping.format_pattern.clone(),
                explicit: true,
            })
            .collect();
        let fallback = config
            .name_based
            .then(|| NameBasedResolver::new(config.control_prefix.clone(), config.control_suffix.clone()));
        let resolver = Arc::new(MappingBasedResolver::new(mapping_targets).with_fallback(fallback));
        let mappings = Arc::new(config.mappings);

        let wire_label = label.clone();
        let wire: FormWireFn = Arc::new(move |view: &View| {
            let guards: Arc<parking_lot::Mutex<Vec<ListenerGuard>>> = Arc::default();

            // Bind the model already present, if any.
            if let Some(model_ref) = model.get() {
                let instance: &M = &model_ref;
                let targets = resolver.resolve(instance, view.graph());
                *guards.lock() = bind_model(view.graph(), instance, &targets)?;
            }

            // Register the mapped validators once; they survive model swaps.
            for mapping in mappings.iter() {
                for (rule, message) in &mapping.validations {
                    let validator =
                        build_validator(rule, message.clone(), mapping.options.required, &wire_label)?;
                    view.register_validator(
                        &mapping.control_id,
                        mapping.target,
                        validator,
                        mapping.options,
                        &wire_label,
                    )?;
                }
            }

            // Swapping the model rebinds: old guards drop first, so no
            // binding keeps referencing the stale instance.
            let view_for_swap = view.clone();
            let resolver_for_swap = Arc::clone(&resolver);
            let guards_for_swap = Arc::clone(&guards);
            let swap_label = wire_label.clone();
            let listener_id = model.on_change(move |_, new| {
                guards_for_swap.lock().clear();
                if let Some(model_ref) = new {
                    let instance: &M = model_ref;
                    let targets = resolver_for_swap.resolve(instance, view_for_swap.graph());
                    match bind_model(view_for_swap.graph(), instance, &targets) {
                        Ok(new_guards) => *guards_for_swap.lock() = new_guards,
                        // Rebinding uses the same structure that bound the
                        // first instance; a failure here is a programming
                        // error and must not be swallowed.
                        Err(err) => panic!("{swap_label}: rebinding failed: {err}"),
                    }
                }
            });

            let model_for_guard = model.clone();
            view.retain(Box::new((
                guards,
                ListenerGuard::new(move || {
                    model_for_guard.remove_change_listener(listener_id);
                }),
            )));
            Ok(())
        });

        Self { name, wire }
    }

    pub(crate) fn label(&self) -> String {
        format!("form-binding:{}", self.name)
    }
}

/// Declares an event-bus subscription.
pub struct SubscribeDecl {
    name: String,
    /// Ascending delivery priority.
    pub priority: i32,
    /// Deliver on the background executor.
    pub async_hint: bool,
    pub(crate) register: Arc<dyn Fn(&EventBus) + Send + Sync>,
}

impl SubscribeDecl {
    /// Subscribe `handler` to events of type `E`.
    pub fn new<E, F>(name: impl Into<String>, priority: i32, handler: F) -> Self
    where
        E: Send + Sync + 'static,
        F: Fn(&E) + Send + Sync + 'static,
    {
        Self::build::<E, F>(name, priority, false, handler)
    }

    /// Subscribe with asynchronous delivery.
    pub fn new_async<E, F>(name: impl Into<String>, priority: i32, handler: F) -> Self
    where
        E: Send + Sync + 'static,
        F: Fn(&E) + Send + Sync + 'static,
    {
        Self::build::<E, F>(name, priority, true, handler)
    }

    fn build<E, F>(name: impl Into<String>, priority: i32, async_hint: bool, handler: F) -> Self
    where
        E: Send + Sync + 'static,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let register = Arc::new(move |bus: &EventBus| {
            let handler = Arc::clone(&handler);
            bus.subscribe_with::<E, _>(priority, async_hint, move |event| handler(event));
        });
        Self {
            name: name.into(),
            priority,
            async_hint,
            register,
        }
    }

    pub(crate) fn label(&self) -> String {
        format!("subscribe:{}", self.name)
    }
}

/// One tagged declaration of a controller's binding plan.
pub enum BindingDecl {
    /// Nested-view attachment.
    NestedView(NestedViewDecl),
    /// Multi-select switch.
    MultiSelection(MultiSelectionDecl),
    /// Filtered item view.
    FilteredList(FilteredListDecl),
    /// Cell-value configuration.
    CellValueConfig(CellValueConfigDecl),
    /// Action handler.
    OnAction(OnActionDecl),
    /// Data loader.
    LoadControlData(LoadControlDataDecl),
    /// Value-change handler.
    OnValueChange(OnValueChangeDecl),
    /// Form binding.
    FormBinding(FormBindingDecl),
    /// Validation rule.
    Validation(ValidationDecl),
    /// Enable-node activation (node enabled while the chain holds).
    EnableNode(NodeActivationDecl),
    /// Disable-node activation (node disabled while the chain holds).
    DisableNode(NodeActivationDecl),
    /// Event-bus subscription.
    Subscribe(SubscribeDecl),
}

/// A controller's frozen binding plan.
///
/// Built once per controller; the pipeline iterates the declarations, each
/// extension picking out its own family in declaration order.
pub struct ControllerDescriptor {
    controller_id: String,
    decls: Vec<BindingDecl>,
}

impl ControllerDescriptor {
    /// Start building a descriptor for the given controller.
    pub fn builder(controller_id: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder {
            controller_id: controller_id.into(),
            decls: Vec::new(),
        }
    }

    /// The controller's id.
    pub fn controller_id(&self) -> &str {
        &self.controller_id
    }

    /// All declarations in declaration order.
    pub fn decls(&self) -> &[BindingDecl] {
        &self.decls
    }
}

/// Builder for [`ControllerDescriptor`].
pub struct DescriptorBuilder {
    controller_id: String,
    decls: Vec<BindingDecl>,
}

impl DescriptorBuilder {
    /// Add a disable-node declaration.
    pub fn disable_node(mut self, decl: NodeActivationDecl) -> Self {
        self.decls.push(BindingDecl::DisableNode(decl));
        self
    }

    /// Add an enable-node declaration.
    pub fn enable_node(mut self, decl: NodeActivationDecl) -> Self {
        self.decls.push(BindingDecl::EnableNode(decl));
        self
    }

    /// Add an action handler.
    pub fn on_action(mut self, decl: OnActionDecl) -> Self {
        self.decls.push(BindingDecl::OnAction(decl));
        self
    }

    /// Add a value-change handler.
    pub fn on_value_change(mut self, decl: OnValueChangeDecl) -> Self {
        self.decls.push(BindingDecl::OnValueChange(decl));
        self
    }

    /// Add a data loader.
    pub fn load_control_data(mut self, decl: LoadControlDataDecl) -> Self {
        self.decls.push(BindingDecl::LoadControlData(decl));
        self
    }

    /// Add a cell-value configuration.
    pub fn cell_value_config(mut self, decl: CellValueConfigDecl) -> Self {
        self.decls.push(BindingDecl::CellValueConfig(decl));
        self
    }

    /// Add a form binding.
    pub fn form_binding(mut self, decl: FormBindingDecl) -> Self {
        self.decls.push(BindingDecl::FormBinding(decl));
        self
    }

    /// Add a validation declaration.
    pub fn validate(mut self, decl: ValidationDecl) -> Self {
        self.decls.push(BindingDecl::Validation(decl));
        self
    }

    /// Add a nested-view attachment.
    pub fn nested_view(mut self, decl: NestedViewDecl) -> Self {
        self.decls.push(BindingDecl::NestedView(decl));
        self
    }

    /// Add a filtered-list declaration.
    pub fn filtered_list(mut self, decl: FilteredListDecl) -> Self {
        self.decls.push(BindingDecl::FilteredList(decl));
        self
    }

    /// Add a multi-select switch.
    pub fn multi_selection(mut self, decl: MultiSelectionDecl) -> Self {
        self.decls.push(BindingDecl::MultiSelection(decl));
        self
    }

    /// Add an event-bus subscription.
    pub fn subscribe(mut self, decl: SubscribeDecl) -> Self {
        self.decls.push(BindingDecl::Subscribe(decl));
        self
    }

    /// Freeze the descriptor.
    pub fn build(self) -> ControllerDescriptor {
        ControllerDescriptor {
            controller_id: self.controller_id,
            decls: self.decls,
        }
    }
}

/// The typed selection list of a multi-selection control.
fn typed_selection<T: Clone + PartialEq + Send + Sync + 'static>(
    accessor: &ControlAccessor,
    declaration: &str,
) -> Result<ObservableList<T>, ConfigError> {
    let node = accessor.node().as_any();
    if let Some(list) = node.downcast_ref::<ListView<T>>() {
        return Ok(list.selection().clone());
    }
    if let Some(table) = node.downcast_ref::<TableView<T>>() {
        return Ok(table.selection().clone());
    }
    if let Some(tree) = node.downcast_ref::<TreeView<T>>() {
        return Ok(tree.selection().clone());
    }
    Err(ConfigError::MissingCapability {
        declaration: declaration.to_string(),
        control_id: accessor.control_id().to_string(),
        kind: accessor.node().kind(),
        capability: "a typed selection of the declared item type",
    })
}

/// The typed item list of a multi-value control.
fn typed_items<T: Clone + PartialEq + Send + Sync + 'static>(
    accessor: &ControlAccessor,
    declaration: &str,
) -> Result<ObservableList<T>, ConfigError> {
    let node = accessor.node().as_any();
    if let Some(list) = node.downcast_ref::<ListView<T>>() {
        return Ok(list.items().clone());
    }
    if let Some(table) = node.downcast_ref::<TableView<T>>() {
        return Ok(table.items().clone());
    }
    if let Some(choice) = node.downcast_ref::<ChoiceBox<T>>() {
        return Ok(choice.items().clone());
    }
    Err(ConfigError::MissingCapability {
        declaration: declaration.to_string(),
        control_id: accessor.control_id().to_string(),
        kind: accessor.node().kind(),
        capability: "an item list of the declared item type",
    })
}
