//! The standard XACML function library.
//!
//! Functions are plain values: an identifier, a signature, and an
//! evaluator. The registry is built once per process and shared
//! read-only. First-order functions are eager over fully evaluated
//! arguments; the logical connectives and the higher-order family get
//! their own lazy behaviors because they control argument evaluation
//! themselves.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use pdp_api::{Datatype, IndeterminateError, PolicyBuildError};

use crate::expr::ExprValue;

mod bags;
mod equality;
pub(crate) mod higher_order;
pub(crate) mod logical;
mod numeric;
mod sets;
mod strings;
mod temporal;

pub use higher_order::HigherOrderOp;

/// URN prefix of the XACML 1.0 function namespace.
pub const XACML_1_0: &str = "urn:oasis:names:tc:xacml:1.0:function:";
/// URN prefix of the XACML 2.0 function namespace.
pub const XACML_2_0: &str = "urn:oasis:names:tc:xacml:2.0:function:";
/// URN prefix of the XACML 3.0 function namespace.
pub const XACML_3_0: &str = "urn:oasis:names:tc:xacml:3.0:function:";

/// The namespace a per-datatype function family lives in: datatypes that
/// joined the standard later carry that version's prefix.
pub(crate) fn family_prefix(datatype: Datatype) -> &'static str {
    match datatype {
        Datatype::DayTimeDuration | Datatype::YearMonthDuration => XACML_3_0,
        Datatype::IpAddress | Datatype::DnsName => XACML_2_0,
        _ => XACML_1_0,
    }
}

/// The shape of an evaluated value: a single value or a bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Single(Datatype),
    Bag(Datatype),
}

impl ValueKind {
    pub fn datatype(self) -> Datatype {
        match self {
            ValueKind::Single(dt) | ValueKind::Bag(dt) => dt,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Single(dt) => write!(f, "single {}", dt.uri()),
            ValueKind::Bag(dt) => write!(f, "bag of {}", dt.uri()),
        }
    }
}

/// One parameter of a function signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSpec {
    Single(Datatype),
    Bag(Datatype),
    /// Any value or bag; shape is checked by the function itself.
    Any,
    /// A function reference (higher-order functions only).
    Func,
}

impl ParamSpec {
    pub fn admits(self, kind: ValueKind) -> bool {
        match self {
            ParamSpec::Single(dt) => kind == ValueKind::Single(dt),
            ParamSpec::Bag(dt) => kind == ValueKind::Bag(dt),
            ParamSpec::Any => true,
            ParamSpec::Func => false,
        }
    }
}

impl fmt::Display for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamSpec::Single(dt) => write!(f, "single {}", dt.uri()),
            ParamSpec::Bag(dt) => write!(f, "bag of {}", dt.uri()),
            ParamSpec::Any => f.write_str("any value"),
            ParamSpec::Func => f.write_str("function"),
        }
    }
}

/// A function signature: fixed leading parameters plus an optional
/// homogeneous variadic tail.
#[derive(Debug, Clone)]
pub struct Params {
    pub fixed: Vec<ParamSpec>,
    pub variadic: Option<ParamSpec>,
}

impl Params {
    pub fn fixed(fixed: Vec<ParamSpec>) -> Self {
        Self {
            fixed,
            variadic: None,
        }
    }

    pub fn variadic(fixed: Vec<ParamSpec>, tail: ParamSpec) -> Self {
        Self {
            fixed,
            variadic: Some(tail),
        }
    }

    pub fn check_arity(&self, actual: usize, function: &str) -> Result<(), PolicyBuildError> {
        let ok = actual >= self.fixed.len() && (self.variadic.is_some() || actual == self.fixed.len());
        if ok {
            return Ok(());
        }
        let expected = match self.variadic {
            Some(_) => format!("at least {}", self.fixed.len()),
            None => self.fixed.len().to_string(),
        };
        Err(PolicyBuildError::ArityMismatch {
            function: function.to_owned(),
            expected,
            actual,
        })
    }

    pub fn spec_at(&self, position: usize) -> ParamSpec {
        self.fixed
            .get(position)
            .copied()
            .or(self.variadic)
            .unwrap_or(ParamSpec::Any)
    }

    /// Dynamic shape check performed on every eager call.
    pub fn check_values(
        &self,
        args: &[ExprValue],
        function: &str,
    ) -> Result<(), IndeterminateError> {
        let arity_ok =
            args.len() >= self.fixed.len() && (self.variadic.is_some() || args.len() == self.fixed.len());
        if !arity_ok {
            return Err(IndeterminateError::processing_error(format!(
                "Function {function} applied to {} arguments",
                args.len()
            )));
        }
        for (position, arg) in args.iter().enumerate() {
            let spec = self.spec_at(position);
            if !spec.admits(arg.kind()) {
                return Err(IndeterminateError::processing_error(format!(
                    "Function {function}, argument {position}: expected {spec}, got {}",
                    arg.kind()
                )));
            }
        }
        Ok(())
    }
}

/// Evaluator of a first-order function over fully evaluated arguments.
pub type EagerFn =
    Box<dyn Fn(&[ExprValue]) -> Result<ExprValue, IndeterminateError> + Send + Sync>;

/// How a function consumes its arguments.
pub enum Behavior {
    /// Arguments are fully evaluated left to right before the call.
    Eager(EagerFn),
    /// Logical conjunction: lazy, short-circuits on False.
    And,
    /// Logical disjunction: lazy, short-circuits on True.
    Or,
    /// Quorum: lazy, short-circuits once decided either way.
    NOf,
    /// Iterates a sub-function over bag arguments.
    HigherOrder(HigherOrderOp),
}

/// A standard function: identifier, signature, return shape, behavior.
pub struct Function {
    pub id: String,
    pub params: Params,
    pub returns: ValueKind,
    pub behavior: Behavior,
}

impl Function {
    fn eager<F>(
        id: String,
        params: Params,
        returns: ValueKind,
        f: F,
    ) -> Self
    where
        F: Fn(&[ExprValue]) -> Result<ExprValue, IndeterminateError> + Send + Sync + 'static,
    {
        Self {
            id,
            params,
            returns,
            behavior: Behavior::Eager(Box::new(f)),
        }
    }

    /// Invoke a first-order function over evaluated arguments. The
    /// logical and higher-order behaviors drive argument evaluation
    /// themselves and cannot be invoked this way.
    pub fn invoke(&self, args: &[ExprValue]) -> Result<ExprValue, IndeterminateError> {
        match &self.behavior {
            Behavior::Eager(f) => {
                self.params.check_values(args, &self.id)?;
                f(args)
            }
            _ => Err(IndeterminateError::processing_error(format!(
                "Function {} is not a first-order function",
                self.id
            ))),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("id", &self.id)
            .field("returns", &self.returns)
            .finish_non_exhaustive()
    }
}

/// Registry under construction; insertion panics on a duplicate id,
/// which can only happen at process start from a programming error.
#[derive(Default)]
pub(crate) struct Registry(HashMap<String, Arc<Function>>);

impl Registry {
    pub(crate) fn insert(&mut self, function: Function) {
        let previous = self.0.insert(function.id.clone(), Arc::new(function));
        assert!(previous.is_none(), "duplicate function registration");
    }
}

static REGISTRY: Lazy<HashMap<String, Arc<Function>>> = Lazy::new(|| {
    let mut registry = Registry::default();
    equality::register(&mut registry);
    numeric::register(&mut registry);
    strings::register(&mut registry);
    logical::register(&mut registry);
    bags::register(&mut registry);
    sets::register(&mut registry);
    temporal::register(&mut registry);
    higher_order::register(&mut registry);
    registry.0
});

/// Look up a standard function by its URN.
pub fn function(id: &str) -> Option<Arc<Function>> {
    REGISTRY.get(id).cloned()
}

/// Number of registered standard functions.
pub fn function_count() -> usize {
    REGISTRY.len()
}
