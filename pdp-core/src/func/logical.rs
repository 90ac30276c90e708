//! Logical connectives: not, and, or, n-of.
//!
//! `and`, `or` and `n-of` are lazy: they evaluate arguments left to right
//! and stop as soon as the outcome is decided, which lets a definite
//! answer win over an Indeterminate argument that was never needed. When
//! no early exit happens and some argument failed, the first failure's
//! status is the result.

use pdp_api::{AttributeValue, Datatype, IndeterminateError};

use crate::context::EvaluationContext;
use crate::expr::{Expression, ExprValue};

use super::{Behavior, Function, Params, ParamSpec, Registry, ValueKind, XACML_1_0};

pub(super) fn register(registry: &mut Registry) {
    registry.insert(Function::eager(
        format!("{XACML_1_0}not"),
        Params::fixed(vec![ParamSpec::Single(Datatype::Boolean)]),
        ValueKind::Single(Datatype::Boolean),
        |args| {
            let b = args[0].expect_boolean()?;
            Ok(ExprValue::Single(AttributeValue::Boolean(!b)))
        },
    ));

    registry.insert(Function {
        id: format!("{XACML_1_0}and"),
        params: Params::variadic(Vec::new(), ParamSpec::Single(Datatype::Boolean)),
        returns: ValueKind::Single(Datatype::Boolean),
        behavior: Behavior::And,
    });
    registry.insert(Function {
        id: format!("{XACML_1_0}or"),
        params: Params::variadic(Vec::new(), ParamSpec::Single(Datatype::Boolean)),
        returns: ValueKind::Single(Datatype::Boolean),
        behavior: Behavior::Or,
    });
    registry.insert(Function {
        id: format!("{XACML_1_0}n-of"),
        params: Params::variadic(
            vec![ParamSpec::Single(Datatype::Integer)],
            ParamSpec::Single(Datatype::Boolean),
        ),
        returns: ValueKind::Single(Datatype::Boolean),
        behavior: Behavior::NOf,
    });
}

fn boolean(b: bool) -> Result<ExprValue, IndeterminateError> {
    Ok(ExprValue::Single(AttributeValue::Boolean(b)))
}

/// `and`: False on the first False; True only if every argument is True;
/// otherwise the first saved failure.
pub(crate) fn evaluate_and(
    args: &[Expression],
    ctx: &mut EvaluationContext<'_>,
) -> Result<ExprValue, IndeterminateError> {
    let mut first_error: Option<IndeterminateError> = None;
    for arg in args {
        match arg.evaluate(ctx).and_then(|v| v.expect_boolean()) {
            Ok(false) => return boolean(false),
            Ok(true) => {}
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => boolean(true),
    }
}

/// `or`: mirror image of `and`.
pub(crate) fn evaluate_or(
    args: &[Expression],
    ctx: &mut EvaluationContext<'_>,
) -> Result<ExprValue, IndeterminateError> {
    let mut first_error: Option<IndeterminateError> = None;
    for arg in args {
        match arg.evaluate(ctx).and_then(|v| v.expect_boolean()) {
            Ok(true) => return boolean(true),
            Ok(false) => {}
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => boolean(false),
    }
}

/// `n-of(n, b...)`: True once n Trues are seen; False once success is
/// impossible even if every unresolved argument were True.
pub(crate) fn evaluate_n_of(
    args: &[Expression],
    ctx: &mut EvaluationContext<'_>,
) -> Result<ExprValue, IndeterminateError> {
    let first = args
        .first()
        .ok_or_else(|| IndeterminateError::processing_error("n-of requires an argument"))?;
    let n = first
        .evaluate(ctx)?
        .expect_single()?
        .as_integer()
        .ok_or_else(|| {
            IndeterminateError::processing_error("First argument to n-of must be an integer")
        })?;
    if n < 0 {
        return Err(IndeterminateError::processing_error(
            "First argument to n-of cannot be negative",
        ));
    }
    if n == 0 {
        return boolean(true);
    }
    let mut remaining = (args.len() - 1) as i64;
    if n > remaining {
        return Err(IndeterminateError::processing_error(format!(
            "Not enough arguments to n-of to find {n} true values"
        )));
    }

    let mut needed = n;
    let mut first_error: Option<IndeterminateError> = None;
    for arg in &args[1..] {
        match arg.evaluate(ctx).and_then(|v| v.expect_boolean()) {
            Ok(true) => {
                needed -= 1;
                if needed == 0 {
                    return boolean(true);
                }
            }
            Ok(false) => {}
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        remaining -= 1;
        if needed > remaining {
            // An errored argument might have been True, so a definite
            // False needs an error-free prefix.
            return match first_error {
                Some(e) => Err(e),
                None => boolean(false),
            };
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => boolean(false),
    }
}
