//! Predicate chains and reactive boolean bindings.
//!
//! A [`PredicateChain`] composes N quantified predicates over M observed
//! values into one boolean signal:
//!
//! ```text
//! result = NOT? ( NOT? q1(p1, testables1) [AND|OR] NOT? q2(p2, testables2) ... )
//! ```
//!
//! Each element evaluates its quantifier (ALL: the predicate must hold for
//! every testable; AT-LEAST-ONE: for any testable), applies its own negate
//! flag, and is folded into the chain left-to-right with its declared
//! boolean operator. The fold is **not** short-circuiting: every element is
//! evaluated on every recomputation so the set of observable dependencies
//! that get read stays identical across recomputations.
//!
//! [`BoolBindingBuilder`] is the fluent entry point. Element completeness is
//! checked in [`BoolBindingBuilder::build`], which is a pure function
//! returning a [`ConfigError`] for an incomplete element instead of
//! panicking mid-chain.

use std::sync::Arc;

use trellis_core::{AnyObservable, ListenerGuard, ObservableRef, ObservableValue};

use crate::error::ConfigError;

/// How one predicate element is combined with the accumulated chain result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BooleanOp {
    /// Logical AND (the default).
    #[default]
    And,
    /// Logical OR.
    Or,
}

/// Whether a predicate must hold for all testables or for at least one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantifier {
    /// Every testable must satisfy the predicate.
    All,
    /// At least one testable must satisfy the predicate.
    AtLeastOne,
}

trait ChainElement: Send + Sync {
    fn bool_op(&self) -> BooleanOp;
    fn evaluate(&self) -> bool;
    fn observables(&self) -> Vec<ObservableRef>;
}

struct TypedElement<T: Send + Sync> {
    bool_op: BooleanOp,
    quantifier: Quantifier,
    negate: bool,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
    testables: Vec<T>,
    extractor: Arc<dyn Fn(&T) -> ObservableRef + Send + Sync>,
}

impl<T: Send + Sync> ChainElement for TypedElement<T> {
    fn bool_op(&self) -> BooleanOp {
        self.bool_op
    }

    fn evaluate(&self) -> bool {
        let result = match self.quantifier {
            Quantifier::All => self.testables.iter().all(|t| (self.predicate)(t)),
            Quantifier::AtLeastOne => self.testables.iter().any(|t| (self.predicate)(t)),
        };
        if self.negate { !result } else { result }
    }

    fn observables(&self) -> Vec<ObservableRef> {
        self.testables.iter().map(|t| (self.extractor)(t)).collect()
    }
}

/// A frozen, composed predicate chain.
///
/// Produced by [`BoolBindingBuilder::build_chain`]; evaluation is pure and
/// re-runs every element (no short-circuiting).
pub struct PredicateChain {
    elements: Vec<Box<dyn ChainElement>>,
    negate_chain: bool,
}

impl PredicateChain {
    /// Evaluate the full chain.
    pub fn evaluate(&self) -> bool {
        let mut accumulated: Option<bool> = None;
        for element in &self.elements {
            // Evaluate unconditionally before combining; the chain must read
            // every dependency on every recomputation.
            let value = element.evaluate();
            accumulated = Some(match accumulated {
                None => value,
                Some(current) => match element.bool_op() {
                    BooleanOp::And => current & value,
                    BooleanOp::Or => current | value,
                },
            });
        }
        let result = accumulated.unwrap_or(true);
        if self.negate_chain { !result } else { result }
    }

    /// The union of every element's observables.
    pub fn observables(&self) -> Vec<ObservableRef> {
        self.elements
            .iter()
            .flat_map(|element| element.observables())
            .collect()
    }

    /// Number of elements in the chain.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the chain has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// A reactive boolean produced from a [`PredicateChain`].
///
/// The value recomputes whenever any observable of any testable
/// invalidates. Subscriptions live as long as the binding.
#[derive(Debug)]
pub struct BoolBinding {
    value: ObservableValue<bool>,
    _subscriptions: Vec<ListenerGuard>,
}

impl BoolBinding {
    fn from_chain(chain: PredicateChain) -> Self {
        let chain = Arc::new(chain);
        let value = ObservableValue::new(chain.evaluate());
        let mut subscriptions = Vec::new();
        for observable in chain.observables() {
            let chain_clone = Arc::clone(&chain);
            let value_clone = value.clone();
            let id = observable.subscribe_invalidation(Box::new(move || {
                value_clone.set(chain_clone.evaluate());
            }));
            let observable_for_guard = Arc::clone(&observable);
            subscriptions.push(ListenerGuard::new(move || {
                observable_for_guard.unsubscribe_invalidation(id);
            }));
        }
        Self {
            value,
            _subscriptions: subscriptions,
        }
    }

    /// The current boolean value.
    pub fn get(&self) -> bool {
        self.value.get()
    }

    /// The underlying observable value, for further composition.
    pub fn value(&self) -> &ObservableValue<bool> {
        &self.value
    }
}

enum PendingExtractor<T> {
    Missing,
    Supplied(Arc<dyn Fn(&T) -> ObservableRef + Send + Sync>),
}

struct PendingElement<T: Send + Sync> {
    bool_op: BooleanOp,
    quantifier: Option<Quantifier>,
    negate: bool,
    predicate: Option<Arc<dyn Fn(&T) -> bool + Send + Sync>>,
    testables: Vec<T>,
    extractor: PendingExtractor<T>,
}

trait PendingCheck: Send + Sync {
    fn validate(self: Box<Self>, index: usize) -> Result<Box<dyn ChainElement>, ConfigError>;
}

impl<T: Send + Sync + 'static> PendingCheck for PendingElement<T> {
    fn validate(self: Box<Self>, index: usize) -> Result<Box<dyn ChainElement>, ConfigError> {
        let predicate = self.predicate.ok_or(ConfigError::IncompletePredicate {
            index,
            reason: "no predicate has been supplied",
        })?;
        if self.testables.is_empty() {
            return Err(ConfigError::IncompletePredicate {
                index,
                reason: "no testables have been supplied",
            });
        }
        let quantifier = self.quantifier.ok_or(ConfigError::IncompletePredicate {
            index,
            reason: "no quantifier has been supplied",
        })?;
        let extractor = match self.extractor {
            PendingExtractor::Supplied(extractor) => extractor,
            PendingExtractor::Missing => {
                return Err(ConfigError::IncompletePredicate {
                    index,
                    reason: "no observable extractor supplied and testables are not observables",
                });
            }
        };
        Ok(Box::new(TypedElement {
            bool_op: self.bool_op,
            quantifier,
            negate: self.negate,
            predicate,
            testables: self.testables,
            extractor,
        }))
    }
}

/// Fluent builder for one predicate element.
///
/// Finish the element with [`finish`](Self::finish) to return to the chain
/// builder. Completeness is *not* checked here; it is checked in
/// [`BoolBindingBuilder::build`].
pub struct ElementBuilder<T: Send + Sync + 'static> {
    parent: BoolBindingBuilder,
    pending: PendingElement<T>,
}

impl<T: Send + Sync + 'static> ElementBuilder<T> {
    /// Set the predicate applied to every testable.
    pub fn predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.pending.predicate = Some(Arc::new(predicate));
        self
    }

    /// Set the testables the predicate is evaluated against.
    pub fn testables(mut self, testables: Vec<T>) -> Self {
        self.pending.testables = testables;
        self
    }

    /// Set the function extracting the observed dependency per testable.
    pub fn observe_with<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&T) -> ObservableRef + Send + Sync + 'static,
    {
        self.pending.extractor = PendingExtractor::Supplied(Arc::new(extractor));
        self
    }

    /// Set the boolean operator linking this element to the previous one.
    pub fn bool_op(mut self, op: BooleanOp) -> Self {
        self.pending.bool_op = op;
        self
    }

    /// Set the quantifier.
    pub fn quantifier(mut self, quantifier: Quantifier) -> Self {
        self.pending.quantifier = Some(quantifier);
        self
    }

    /// Negate this element's result.
    pub fn negate(mut self, negate: bool) -> Self {
        self.pending.negate = negate;
        self
    }

    /// Add the element to the chain and return the chain builder.
    pub fn finish(mut self) -> BoolBindingBuilder {
        self.parent.pending.push(Box::new(self.pending));
        self.parent
    }
}

/// Fluent builder producing a [`PredicateChain`] / [`BoolBinding`].
///
/// ```
/// use trellis::predicate::{BoolBindingBuilder, Quantifier};
/// use trellis_core::{ObservableRef, ObservableValue};
/// use std::sync::Arc;
///
/// let a = ObservableValue::new(1);
/// let b = ObservableValue::new(2);
///
/// let binding = BoolBindingBuilder::new()
///     .and_element::<ObservableValue<i32>>()
///     .quantifier(Quantifier::All)
///     .predicate(|value| value.get() > 0)
///     .testables(vec![a.clone(), b.clone()])
///     .observe_with(|value| Arc::new(value.clone()) as ObservableRef)
///     .finish()
///     .build()
///     .unwrap();
///
/// assert!(binding.get());
/// a.set(-1);
/// assert!(!binding.get());
/// ```
#[derive(Default)]
pub struct BoolBindingBuilder {
    pending: Vec<Box<dyn PendingCheck>>,
    negate_chain: bool,
}

impl BoolBindingBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an element linked with AND.
    pub fn and_element<T: Send + Sync + 'static>(self) -> ElementBuilder<T> {
        self.element(BooleanOp::And)
    }

    /// Start an element linked with OR.
    pub fn or_element<T: Send + Sync + 'static>(self) -> ElementBuilder<T> {
        self.element(BooleanOp::Or)
    }

    fn element<T: Send + Sync + 'static>(self, bool_op: BooleanOp) -> ElementBuilder<T> {
        ElementBuilder {
            parent: self,
            pending: PendingElement {
                bool_op,
                quantifier: None,
                negate: false,
                predicate: None,
                testables: Vec::new(),
                extractor: PendingExtractor::Missing,
            },
        }
    }

    /// Start an element whose testables are themselves observables; the
    /// extractor defaults to identity.
    pub fn and_observable_element(self) -> ElementBuilder<ObservableRef> {
        self.observable_element(BooleanOp::And)
    }

    /// Like [`and_observable_element`](Self::and_observable_element) with OR
    /// linking.
    pub fn or_observable_element(self) -> ElementBuilder<ObservableRef> {
        self.observable_element(BooleanOp::Or)
    }

    fn observable_element(self, bool_op: BooleanOp) -> ElementBuilder<ObservableRef> {
        self.element::<ObservableRef>(bool_op)
            .observe_with(Arc::clone)
    }

    /// Negate the result of the entire chain.
    pub fn negate_chain(mut self, negate: bool) -> Self {
        self.negate_chain = negate;
        self
    }

    /// Validate every element and freeze the chain.
    pub fn build_chain(self) -> Result<PredicateChain, ConfigError> {
        let mut elements = Vec::with_capacity(self.pending.len());
        for (index, pending) in self.pending.into_iter().enumerate() {
            elements.push(pending.validate(index)?);
        }
        Ok(PredicateChain {
            elements,
            negate_chain: self.negate_chain,
        })
    }

    /// Validate, freeze and subscribe: the reactive boolean binding.
    pub fn build(self) -> Result<BoolBinding, ConfigError> {
        Ok(BoolBinding::from_chain(self.build_chain()?))
    }
}
