//! Handler invocation with deterministic argument matching.
//!
//! A [`HandlerMethod`] is the statically-shaped stand-in for an annotated
//! controller method: a named parameter signature plus a body. At firing
//! time the wiring code supplies *candidate* values - the new value, the old
//! value, added/removed selections - and the matcher assigns each formal
//! parameter exactly one candidate:
//!
//! 1. A candidate whose [`ArgumentHint`] equals the parameter's hint (and
//!    whose type matches) is chosen immediately and irrevocably.
//! 2. Otherwise the first not-yet-claimed candidate with a matching type is
//!    chosen, in candidate declaration order.
//!
//! Candidates are consumed: no candidate is assigned to two parameters of
//! one invocation. An unmatched parameter resolves to `None`, which is only
//! legal for parameters not marked required - a `None` meeting a required
//! parameter is an [`InvocationError`] raised at invocation time, not
//! earlier.

use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::error::InvocationError;

/// Disambiguation hints for candidates and parameters of the same type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArgumentHint {
    /// The value before the observed change.
    OldValue,
    /// The value after the observed change.
    NewValue,
    /// Elements added to a selection.
    AddedValues,
    /// Elements removed from a selection.
    RemovedValues,
    /// The full current selection.
    AllSelected,
}

/// One formal parameter of a handler.
#[derive(Clone)]
pub struct ParameterSpec {
    type_id: TypeId,
    type_name: &'static str,
    hint: Option<ArgumentHint>,
    required: bool,
}

impl ParameterSpec {
    /// An optional parameter of type `T` with no hint.
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            hint: None,
            required: false,
        }
    }

    /// Attach a hint.
    pub fn with_hint(mut self, hint: ArgumentHint) -> Self {
        self.hint = Some(hint);
        self
    }

    /// Mark the parameter required: an unmatched candidate becomes an
    /// invocation error.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// One candidate value offered to the matcher.
pub struct ParameterValue {
    hint: Option<ArgumentHint>,
    type_id: TypeId,
    value: Box<dyn Any + Send>,
}

impl ParameterValue {
    /// A positional candidate.
    pub fn new<T: Send + 'static>(value: T) -> Self {
        Self {
            hint: None,
            type_id: TypeId::of::<T>(),
            value: Box::new(value),
        }
    }

    /// A hinted candidate.
    pub fn hinted<T: Send + 'static>(hint: ArgumentHint, value: T) -> Self {
        Self {
            hint: Some(hint),
            type_id: TypeId::of::<T>(),
            value: Box::new(value),
        }
    }
}

/// The matched arguments handed to a handler body.
pub struct ResolvedArgs {
    handler: String,
    values: Vec<Option<Box<dyn Any + Send>>>,
}

impl ResolvedArgs {
    /// Take the argument at `index` as a required value.
    pub fn take<T: 'static>(&mut self, index: usize) -> Result<T, InvocationError> {
        match self.take_opt(index)? {
            Some(value) => Ok(value),
            None => Err(InvocationError::MissingRequiredParameter {
                handler: self.handler.clone(),
                index,
                type_name: std::any::type_name::<T>(),
            }),
        }
    }

    /// Take the argument at `index`, which may be unmatched.
    pub fn take_opt<T: 'static>(&mut self, index: usize) -> Result<Option<T>, InvocationError> {
        match self.values.get_mut(index).and_then(Option::take) {
            Some(boxed) => match boxed.downcast::<T>() {
                Ok(value) => Ok(Some(*value)),
                Err(_) => Err(InvocationError::ArgumentTypeMismatch {
                    handler: self.handler.clone(),
                    index,
                    type_name: std::any::type_name::<T>(),
                }),
            },
            None => Ok(None),
        }
    }
}

type HandlerBody = Arc<dyn Fn(ResolvedArgs) -> Result<(), InvocationError> + Send + Sync>;

/// A named handler with a parameter signature and a body.
#[derive(Clone)]
pub struct HandlerMethod {
    name: String,
    params: Vec<ParameterSpec>,
    body: HandlerBody,
}

impl HandlerMethod {
    /// Build a handler from an explicit signature and body.
    pub fn with_params<F>(name: impl Into<String>, params: Vec<ParameterSpec>, body: F) -> Self
    where
        F: Fn(ResolvedArgs) -> Result<(), InvocationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params,
            body: Arc::new(body),
        }
    }

    /// A handler taking no arguments.
    pub fn nullary<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_params(name, Vec::new(), move |_| {
            f();
            Ok(())
        })
    }

    /// A handler with one required parameter.
    pub fn unary<A, F>(name: impl Into<String>, f: F) -> Self
    where
        A: Send + 'static,
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::with_params(
            name,
            vec![ParameterSpec::of::<A>().required()],
            move |mut args| {
                f(args.take::<A>(0)?);
                Ok(())
            },
        )
    }

    /// A handler with one required, hinted parameter.
    pub fn unary_hinted<A, F>(name: impl Into<String>, hint: ArgumentHint, f: F) -> Self
    where
        A: Send + 'static,
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::with_params(
            name,
            vec![ParameterSpec::of::<A>().with_hint(hint).required()],
            move |mut args| {
                f(args.take::<A>(0)?);
                Ok(())
            },
        )
    }

    /// A handler with two required parameters.
    pub fn binary<A, B, F>(name: impl Into<String>, f: F) -> Self
    where
        A: Send + 'static,
        B: Send + 'static,
        F: Fn(A, B) + Send + Sync + 'static,
    {
        Self::with_params(
            name,
            vec![
                ParameterSpec::of::<A>().required(),
                ParameterSpec::of::<B>().required(),
            ],
            move |mut args| {
                let a = args.take::<A>(0)?;
                let b = args.take::<B>(1)?;
                f(a, b);
                Ok(())
            },
        )
    }

    /// A handler with two required, hinted parameters.
    pub fn binary_hinted<A, B, F>(
        name: impl Into<String>,
        hints: (ArgumentHint, ArgumentHint),
        f: F,
    ) -> Self
    where
        A: Send + 'static,
        B: Send + 'static,
        F: Fn(A, B) + Send + Sync + 'static,
    {
        Self::with_params(
            name,
            vec![
                ParameterSpec::of::<A>().with_hint(hints.0).required(),
                ParameterSpec::of::<B>().with_hint(hints.1).required(),
            ],
            move |mut args| {
                let a = args.take::<A>(0)?;
                let b = args.take::<B>(1)?;
                f(a, b);
                Ok(())
            },
        )
    }

    /// The handler's name, used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Match `candidates` against the signature and run the body.
    pub fn invoke(&self, candidates: Vec<ParameterValue>) -> Result<(), InvocationError> {
        let values = self.match_candidates(candidates)?;
        (self.body)(ResolvedArgs {
            handler: self.name.clone(),
            values,
        })
    }

    fn match_candidates(
        &self,
        candidates: Vec<ParameterValue>,
    ) -> Result<Vec<Option<Box<dyn Any + Send>>>, InvocationError> {
        let mut pool: Vec<Option<ParameterValue>> = candidates.into_iter().map(Some).collect();
        let mut values = Vec::with_capacity(self.params.len());
        for (index, param) in self.params.iter().enumerate() {
            let matched = claim_candidate(param, &mut pool);
            if matched.is_none() && param.required {
                return Err(InvocationError::MissingRequiredParameter {
                    handler: self.name.clone(),
                    index,
                    type_name: param.type_name,
                });
            }
            values.push(matched);
        }
        Ok(values)
    }
}

/// Claim one candidate for `param` from the pool, consuming it.
fn claim_candidate(
    param: &ParameterSpec,
    pool: &mut [Option<ParameterValue>],
) -> Option<Box<dyn Any + Send>> {
    let mut hint_match: Option<usize> = None;
    let mut first_type_match: Option<usize> = None;
    for (slot, entry) in pool.iter().enumerate() {
        let Some(candidate) = entry else { continue };
        // Hint equality has the highest priority: chosen immediately and
        // irrevocably.
        if param.hint.is_some()
            && candidate.hint == param.hint
            && candidate.type_id == param.type_id
        {
            hint_match = Some(slot);
            break;
        }
        if candidate.type_id == param.type_id && first_type_match.is_none() {
            first_type_match = Some(slot);
        }
    }
    let slot = hint_match.or(first_type_match)?;
    pool[slot].take().map(|c| c.value)
}
