//! Validators and the validation result channel.
//!
//! End-user input problems are *values*, not errors: a [`Validator`]
//! produces a [`ValidationResult`] carrying zero or more
//! [`ValidationMessage`]s, and results from every registered validator are
//! combined and published on the owning view. Downstream bindings (node
//! activation's "when controls are valid" groups, display-layer
//! decoration) observe the published result.
//!
//! Built-in validators mirror the declaration vocabulary: required, regular
//! expression, temporal, numeric range, size, boolean and custom-function
//! validation. Most validators skip empty input unless the registration is
//! marked required, so "optional but well-formed" fields need only one
//! declaration.

use std::sync::Arc;

use chrono::NaiveDate;
use regex::Regex;

use crate::accessor::ControlAccessor;
use crate::convert::ConversionService;
use crate::graph::ControlProperty;

/// Message severity, ordered from least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational note.
    Info,
    /// Non-blocking warning.
    Warning,
    /// Blocking error.
    Error,
}

/// One validation finding for one control surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationMessage {
    /// The control the finding belongs to.
    pub control_id: String,
    /// The validated surface.
    pub target: ControlProperty,
    /// The finding's severity.
    pub severity: Severity,
    /// Display text.
    pub text: String,
}

impl ValidationMessage {
    /// An error-severity message.
    pub fn error(control_id: impl Into<String>, target: ControlProperty, text: impl Into<String>) -> Self {
        Self {
            control_id: control_id.into(),
            target,
            severity: Severity::Error,
            text: text.into(),
        }
    }

    /// A warning-severity message.
    pub fn warning(
        control_id: impl Into<String>,
        target: ControlProperty,
        text: impl Into<String>,
    ) -> Self {
        Self {
            control_id: control_id.into(),
            target,
            severity: Severity::Warning,
            text: text.into(),
        }
    }
}

/// The combined outcome of one or more validators.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationResult {
    messages: Vec<ValidationMessage>,
}

impl ValidationResult {
    /// A result with no findings.
    pub fn ok() -> Self {
        Self::default()
    }

    /// A result from a list of findings.
    pub fn from_messages(messages: Vec<ValidationMessage>) -> Self {
        Self { messages }
    }

    /// A result carrying a single error.
    pub fn error(control_id: impl Into<String>, target: ControlProperty, text: impl Into<String>) -> Self {
        Self::from_messages(vec![ValidationMessage::error(control_id, target, text)])
    }

    /// Append another result's findings.
    pub fn merge(&mut self, other: ValidationResult) {
        self.messages.extend(other.messages);
    }

    /// All findings.
    pub fn messages(&self) -> &[ValidationMessage] {
        &self.messages
    }

    /// Error-severity findings only.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationMessage> {
        self.messages
            .iter()
            .filter(|m| m.severity == Severity::Error)
    }

    /// Whether no error-severity finding is present.
    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }

    /// The highest severity present, if any finding exists.
    pub fn status(&self) -> Option<Severity> {
        self.messages.iter().map(|m| m.severity).max()
    }
}

/// When a registered validator runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// Revalidate after every (debounced) change of the control value.
    #[default]
    OnChange,
    /// Run only on an explicit [`crate::view::View::validate`] call.
    Manual,
}

/// Per-registration validation options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Whether empty input is itself a violation.
    pub required: bool,
    /// When validation runs.
    pub mode: ValidationMode,
    /// Quiet period before an on-change validation fires.
    pub started_after_ms: u64,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            required: false,
            mode: ValidationMode::OnChange,
            started_after_ms: 100,
        }
    }
}

impl ValidationOptions {
    /// Mark the control required.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Set the validation mode.
    pub fn mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the on-change quiet period in milliseconds.
    pub fn started_after_ms(mut self, ms: u64) -> Self {
        self.started_after_ms = ms;
        self
    }
}

/// A validation strategy bound to a control surface at registration time.
pub trait Validator: Send + Sync {
    /// Validate the control's current state.
    fn validate(&self, accessor: &ControlAccessor, target: ControlProperty) -> ValidationResult;
}

impl<V: Validator + ?Sized> Validator for Arc<V> {
    fn validate(&self, accessor: &ControlAccessor, target: ControlProperty) -> ValidationResult {
        (**self).validate(accessor, target)
    }
}

impl<V: Validator + ?Sized> Validator for Box<V> {
    fn validate(&self, accessor: &ControlAccessor, target: ControlProperty) -> ValidationResult {
        (**self).validate(accessor, target)
    }
}

fn current_text(accessor: &ControlAccessor, target: ControlProperty) -> Option<String> {
    accessor.node().text_property(target).map(|p| p.get())
}

/// Requires the control to carry a user value.
pub struct RequiredValidator {
    message: String,
}

impl RequiredValidator {
    /// Create with the violation message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Validator for RequiredValidator {
    fn validate(&self, accessor: &ControlAccessor, target: ControlProperty) -> ValidationResult {
        if accessor.has_user_value() {
            ValidationResult::ok()
        } else {
            ValidationResult::error(accessor.control_id(), target, self.message.clone())
        }
    }
}

/// Matches the control text against a compiled regular expression.
pub struct RegExpValidator {
    message: String,
    pattern: Regex,
    required: bool,
}

impl RegExpValidator {
    /// Create with the violation message and a compiled pattern.
    pub fn new(message: impl Into<String>, pattern: Regex, required: bool) -> Self {
        Self {
            message: message.into(),
            pattern,
            required,
        }
    }
}

impl Validator for RegExpValidator {
    fn validate(&self, accessor: &ControlAccessor, target: ControlProperty) -> ValidationResult {
        let text = current_text(accessor, target).unwrap_or_default();
        if text.is_empty() && !self.required {
            return ValidationResult::ok();
        }
        if self.pattern.is_match(&text) {
            ValidationResult::ok()
        } else {
            ValidationResult::error(accessor.control_id(), target, self.message.clone())
        }
    }
}

/// Temporal constraints relative to today.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TemporalConstraint {
    /// The date must lie strictly in the past.
    pub past: bool,
    /// The date must lie in the past or be today.
    pub past_or_present: bool,
    /// The date must lie strictly in the future.
    pub future: bool,
    /// The date must lie in the future or be today.
    pub future_or_present: bool,
}

/// Validates a date-valued control against temporal constraints.
pub struct TemporalValidator {
    message: String,
    constraint: TemporalConstraint,
    pattern: Option<String>,
    required: bool,
    service: ConversionService,
}

impl TemporalValidator {
    /// Create with the violation message, constraints and an optional date
    /// pattern.
    pub fn new(
        message: impl Into<String>,
        constraint: TemporalConstraint,
        pattern: Option<String>,
        required: bool,
    ) -> Self {
        Self {
            message: message.into(),
            constraint,
            pattern,
            required,
            service: ConversionService,
        }
    }

    fn satisfied(&self, date: NaiveDate, today: NaiveDate) -> bool {
        let c = self.constraint;
        (!c.past || date < today)
            && (!c.past_or_present || date <= today)
            && (!c.future || date > today)
            && (!c.future_or_present || date >= today)
    }
}

impl Validator for TemporalValidator {
    fn validate(&self, accessor: &ControlAccessor, target: ControlProperty) -> ValidationResult {
        let text = current_text(accessor, target).unwrap_or_default();
        if text.trim().is_empty() && !self.required {
            return ValidationResult::ok();
        }
        let Some(date) = self.service.parse_date(&text, self.pattern.as_deref()) else {
            return ValidationResult::error(accessor.control_id(), target, self.message.clone());
        };
        let today = chrono::Local::now().date_naive();
        if self.satisfied(date, today) {
            ValidationResult::ok()
        } else {
            ValidationResult::error(accessor.control_id(), target, self.message.clone())
        }
    }
}

/// Validates a numeric control value against an inclusive range.
pub struct MinMaxValidator {
    message: String,
    min: f64,
    max: f64,
    required: bool,
    service: ConversionService,
}

impl MinMaxValidator {
    /// Create with the violation message and the inclusive range.
    pub fn new(message: impl Into<String>, min: f64, max: f64, required: bool) -> Self {
        Self {
            message: message.into(),
            min,
            max,
            required,
            service: ConversionService,
        }
    }
}

impl Validator for MinMaxValidator {
    fn validate(&self, accessor: &ControlAccessor, target: ControlProperty) -> ValidationResult {
        let text = current_text(accessor, target).unwrap_or_default();
        if text.trim().is_empty() && !self.required {
            return ValidationResult::ok();
        }
        match self.service.parse_f64(&text) {
            Some(value) if value >= self.min && value <= self.max => ValidationResult::ok(),
            _ => ValidationResult::error(accessor.control_id(), target, self.message.clone()),
        }
    }
}

/// Validates the length of a value: character count for text controls,
/// selection count for multi-value controls.
pub struct SizeValidator {
    message: String,
    min: Option<u64>,
    max: Option<u64>,
    required: bool,
}

impl SizeValidator {
    /// Create with the violation message and inclusive bounds.
    pub fn new(message: impl Into<String>, min: Option<u64>, max: Option<u64>, required: bool) -> Self {
        Self {
            message: message.into(),
            min,
            max,
            required,
        }
    }

    fn measure(accessor: &ControlAccessor, target: ControlProperty) -> u64 {
        if let Some(text) = current_text(accessor, target) {
            return text.chars().count() as u64;
        }
        accessor
            .node()
            .string_list_property(target)
            .map(|list| list.len() as u64)
            .unwrap_or(0)
    }
}

impl Validator for SizeValidator {
    fn validate(&self, accessor: &ControlAccessor, target: ControlProperty) -> ValidationResult {
        let size = Self::measure(accessor, target);
        if size == 0 && !self.required {
            return ValidationResult::ok();
        }
        let below = self.min.is_some_and(|min| size < min);
        let above = self.max.is_some_and(|max| size > max);
        if below || above {
            ValidationResult::error(accessor.control_id(), target, self.message.clone())
        } else {
            ValidationResult::ok()
        }
    }
}

/// Validates that a two-state control matches the expected state.
pub struct BooleanValidator {
    message: String,
    expected: bool,
}

impl BooleanValidator {
    /// Create with the violation message and the expected state.
    pub fn new(message: impl Into<String>, expected: bool) -> Self {
        Self {
            message: message.into(),
            expected,
        }
    }
}

impl Validator for BooleanValidator {
    fn validate(&self, accessor: &ControlAccessor, target: ControlProperty) -> ValidationResult {
        let actual = accessor.node().bool_property().map(|p| p.get());
        if actual == Some(self.expected) {
            ValidationResult::ok()
        } else {
            ValidationResult::error(accessor.control_id(), target, self.message.clone())
        }
    }
}

/// Wraps a custom validation function.
pub struct CustomValidator {
    function: Arc<dyn Fn(&ControlAccessor, ControlProperty) -> ValidationResult + Send + Sync>,
}

impl CustomValidator {
    /// Wrap a validation closure.
    pub fn new<F>(function: F) -> Self
    where
        F: Fn(&ControlAccessor, ControlProperty) -> ValidationResult + Send + Sync + 'static,
    {
        Self {
            function: Arc::new(function),
        }
    }
}

impl Validator for CustomValidator {
    fn validate(&self, accessor: &ControlAccessor, target: ControlProperty) -> ValidationResult {
        (self.function)(accessor, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::{CheckBox, TextInput};
    use crate::graph::NodeGraph;
    use chrono::Days;

    fn text_accessor(initial: &str) -> ControlAccessor {
        let graph = NodeGraph::new("test");
        let input = TextInput::new("field");
        input.set_text(initial);
        graph.add_root(input).unwrap();
        ControlAccessor::resolve(&graph, "field").unwrap()
    }

    #[test]
    fn test_required_validator() {
        let validator = RequiredValidator::new("required");
        assert!(!validator
            .validate(&text_accessor(""), ControlProperty::UserValue)
            .is_ok());
        assert!(validator
            .validate(&text_accessor("x"), ControlProperty::UserValue)
            .is_ok());
    }

    #[test]
    fn test_regexp_validator_skips_empty_unless_required() {
        let pattern = Regex::new(r"^\d+$").unwrap();
        let lenient = RegExpValidator::new("digits only", pattern.clone(), false);
        assert!(lenient
            .validate(&text_accessor(""), ControlProperty::UserValue)
            .is_ok());
        assert!(!lenient
            .validate(&text_accessor("abc"), ControlProperty::UserValue)
            .is_ok());
        assert!(lenient
            .validate(&text_accessor("123"), ControlProperty::UserValue)
            .is_ok());

        let strict = RegExpValidator::new("digits only", pattern, true);
        assert!(!strict
            .validate(&text_accessor(""), ControlProperty::UserValue)
            .is_ok());
    }

    #[test]
    fn test_temporal_past_constraint() {
        let constraint = TemporalConstraint {
            past: true,
            ..Default::default()
        };
        let validator = TemporalValidator::new("must be past", constraint, None, true);

        let yesterday = chrono::Local::now().date_naive() - Days::new(1);
        let tomorrow = chrono::Local::now().date_naive() + Days::new(1);

        let ok = text_accessor(&yesterday.format("%Y-%m-%d").to_string());
        assert!(validator.validate(&ok, ControlProperty::UserValue).is_ok());

        let bad = text_accessor(&tomorrow.format("%Y-%m-%d").to_string());
        assert!(!validator.validate(&bad, ControlProperty::UserValue).is_ok());

        let garbage = text_accessor("not a date");
        assert!(!validator.validate(&garbage, ControlProperty::UserValue).is_ok());
    }

    #[test]
    fn test_min_max_validator() {
        let validator = MinMaxValidator::new("1..10", 1.0, 10.0, false);
        assert!(validator
            .validate(&text_accessor("5"), ControlProperty::UserValue)
            .is_ok());
        assert!(!validator
            .validate(&text_accessor("11"), ControlProperty::UserValue)
            .is_ok());
        assert!(validator
            .validate(&text_accessor(""), ControlProperty::UserValue)
            .is_ok());
    }

    #[test]
    fn test_size_validator_counts_characters() {
        let validator = SizeValidator::new("3..5 chars", Some(3), Some(5), false);
        assert!(!validator
            .validate(&text_accessor("ab"), ControlProperty::UserValue)
            .is_ok());
        assert!(validator
            .validate(&text_accessor("abcd"), ControlProperty::UserValue)
            .is_ok());
    }

    #[test]
    fn test_boolean_validator() {
        let graph = NodeGraph::new("test");
        let check = CheckBox::new("accept");
        graph.add_root(check.clone()).unwrap();
        let accessor = ControlAccessor::resolve(&graph, "accept").unwrap();

        let validator = BooleanValidator::new("must accept", true);
        assert!(!validator
            .validate(&accessor, ControlProperty::UserValue)
            .is_ok());
        check.set_checked(true);
        assert!(validator
            .validate(&accessor, ControlProperty::UserValue)
            .is_ok());
    }

    #[test]
    fn test_result_combination_and_status() {
        let mut result = ValidationResult::ok();
        assert_eq!(result.status(), None);
        result.merge(ValidationResult::from_messages(vec![
            ValidationMessage::warning("a", ControlProperty::UserValue, "w"),
        ]));
        assert!(result.is_ok());
        assert_eq!(result.status(), Some(Severity::Warning));
        result.merge(ValidationResult::error("b", ControlProperty::UserValue, "e"));
        assert!(!result.is_ok());
        assert_eq!(result.status(), Some(Severity::Error));
        assert_eq!(result.errors().count(), 1);
    }
}
