//! Higher-order bag functions: any-of, all-of, their two-bag variants,
//! and map.
//!
//! Each takes a first-order function as its first argument and iterates
//! it over bag arguments. The generalized 3.0 forms accept the bag at any
//! position; the legacy two-bag forms keep their 1.0 identifiers, as the
//! 3.0 standard does.

use std::sync::Arc;

use pdp_api::{AttributeValue, Bag, Datatype, IndeterminateError};

use crate::context::EvaluationContext;
use crate::expr::{Expression, ExprValue};

use super::{Behavior, Function, Params, ParamSpec, Registry, ValueKind, XACML_1_0, XACML_3_0};

/// The iteration scheme of a higher-order function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HigherOrderOp {
    /// True if the predicate holds for at least one element of the one
    /// bag argument.
    AnyOf,
    /// True if the predicate holds for every element of the one bag
    /// argument.
    AllOf,
    /// Cross-product over every bag argument; true if any combination
    /// holds.
    AnyOfAny,
    /// For every element of the first bag, some element of the second
    /// matches.
    AllOfAny,
    /// Some element of the first bag matches every element of the second.
    AnyOfAll,
    /// Every pairing of the two bags matches.
    AllOfAll,
    /// Apply the sub-function to each element of the one bag argument,
    /// collecting results into a bag.
    Map,
}

impl HigherOrderOp {
    pub fn requires_boolean_sub_function(self) -> bool {
        !matches!(self, HigherOrderOp::Map)
    }
}

pub(super) fn register(registry: &mut Registry) {
    let general = |id: String, op: HigherOrderOp| Function {
        id,
        params: Params::variadic(vec![ParamSpec::Func, ParamSpec::Any], ParamSpec::Any),
        returns: ValueKind::Single(Datatype::Boolean),
        behavior: Behavior::HigherOrder(op),
    };
    registry.insert(general(format!("{XACML_3_0}any-of"), HigherOrderOp::AnyOf));
    registry.insert(general(format!("{XACML_3_0}all-of"), HigherOrderOp::AllOf));
    registry.insert(general(
        format!("{XACML_3_0}any-of-any"),
        HigherOrderOp::AnyOfAny,
    ));

    let two_bags = |id: String, op: HigherOrderOp| Function {
        id,
        params: Params::fixed(vec![ParamSpec::Func, ParamSpec::Any, ParamSpec::Any]),
        returns: ValueKind::Single(Datatype::Boolean),
        behavior: Behavior::HigherOrder(op),
    };
    registry.insert(two_bags(
        format!("{XACML_1_0}all-of-any"),
        HigherOrderOp::AllOfAny,
    ));
    registry.insert(two_bags(
        format!("{XACML_1_0}any-of-all"),
        HigherOrderOp::AnyOfAll,
    ));
    registry.insert(two_bags(
        format!("{XACML_1_0}all-of-all"),
        HigherOrderOp::AllOfAll,
    ));

    registry.insert(Function {
        id: format!("{XACML_3_0}map"),
        params: Params::variadic(vec![ParamSpec::Func, ParamSpec::Any], ParamSpec::Any),
        // Placeholder; the real result type is the sub-function's return
        // datatype and is computed per application site.
        returns: ValueKind::Bag(Datatype::String),
        behavior: Behavior::HigherOrder(HigherOrderOp::Map),
    });
}

pub(crate) fn evaluate(
    op: HigherOrderOp,
    args: &[Expression],
    ctx: &mut EvaluationContext<'_>,
) -> Result<ExprValue, IndeterminateError> {
    let sub = match args.first() {
        Some(Expression::FunctionRef(f)) => Arc::clone(f),
        _ => {
            return Err(IndeterminateError::processing_error(
                "Higher-order function requires a function as its first argument",
            ))
        }
    };
    let mut values = Vec::with_capacity(args.len() - 1);
    for arg in &args[1..] {
        values.push(arg.evaluate(ctx)?);
    }

    match op {
        HigherOrderOp::AnyOf => fold_one_bag(&sub, &values, FoldMode::Any),
        HigherOrderOp::AllOf => fold_one_bag(&sub, &values, FoldMode::All),
        HigherOrderOp::AnyOfAny => cross_product(&sub, &values),
        HigherOrderOp::AllOfAny => two_bag(&sub, &values, |sub, a, b| {
            // every a has some matching b
            for left in a.iter() {
                if !exists(sub, left, b)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }),
        HigherOrderOp::AnyOfAll => two_bag(&sub, &values, |sub, a, b| {
            for left in a.iter() {
                if forall(sub, left, b)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }),
        HigherOrderOp::AllOfAll => two_bag(&sub, &values, |sub, a, b| {
            for left in a.iter() {
                if !forall(sub, left, b)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }),
        HigherOrderOp::Map => map(&sub, &values),
    }
}

enum FoldMode {
    Any,
    All,
}

fn call_bool(sub: &Function, args: &[ExprValue]) -> Result<bool, IndeterminateError> {
    sub.invoke(args)?.expect_boolean()
}

fn exists(
    sub: &Function,
    left: &AttributeValue,
    bag: &Bag,
) -> Result<bool, IndeterminateError> {
    for right in bag.iter() {
        if call_bool(
            sub,
            &[
                ExprValue::Single(left.clone()),
                ExprValue::Single(right.clone()),
            ],
        )? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn forall(
    sub: &Function,
    left: &AttributeValue,
    bag: &Bag,
) -> Result<bool, IndeterminateError> {
    for right in bag.iter() {
        if !call_bool(
            sub,
            &[
                ExprValue::Single(left.clone()),
                ExprValue::Single(right.clone()),
            ],
        )? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// The one-bag schemes: exactly one argument is a bag; the sub-function
/// is applied once per element with the other arguments fixed.
fn fold_one_bag(
    sub: &Function,
    values: &[ExprValue],
    mode: FoldMode,
) -> Result<ExprValue, IndeterminateError> {
    let (bag_position, bag) = sole_bag(values)?;
    for element in bag.iter() {
        let call: Vec<ExprValue> = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                if i == bag_position {
                    ExprValue::Single(element.clone())
                } else {
                    v.clone()
                }
            })
            .collect();
        let holds = call_bool(sub, &call)?;
        match mode {
            FoldMode::Any if holds => return boolean(true),
            FoldMode::All if !holds => return boolean(false),
            _ => {}
        }
    }
    boolean(matches!(mode, FoldMode::All))
}

/// any-of-any: every argument may be a bag; iterate the full cross
/// product, true on the first holding combination.
fn cross_product(sub: &Function, values: &[ExprValue]) -> Result<ExprValue, IndeterminateError> {
    let lists: Vec<Vec<AttributeValue>> = values
        .iter()
        .map(|v| match v {
            ExprValue::Single(value) => vec![value.clone()],
            ExprValue::Bag(bag) => bag.iter().cloned().collect(),
        })
        .collect();
    if lists.iter().any(Vec::is_empty) {
        return boolean(false);
    }

    let mut indices = vec![0usize; lists.len()];
    loop {
        let call: Vec<ExprValue> = indices
            .iter()
            .zip(&lists)
            .map(|(&i, list)| ExprValue::Single(list[i].clone()))
            .collect();
        if call_bool(sub, &call)? {
            return boolean(true);
        }
        // Odometer advance.
        let mut position = lists.len();
        loop {
            if position == 0 {
                return boolean(false);
            }
            position -= 1;
            indices[position] += 1;
            if indices[position] < lists[position].len() {
                break;
            }
            indices[position] = 0;
        }
    }
}

fn two_bag<F>(
    sub: &Function,
    values: &[ExprValue],
    scheme: F,
) -> Result<ExprValue, IndeterminateError>
where
    F: Fn(&Function, &Bag, &Bag) -> Result<bool, IndeterminateError>,
{
    if values.len() != 2 {
        return Err(IndeterminateError::processing_error(
            "Expected exactly two bag arguments",
        ));
    }
    let (a, b) = (values[0].expect_bag()?, values[1].expect_bag()?);
    scheme(sub, a, b).map(|holds| ExprValue::Single(AttributeValue::Boolean(holds)))
}

fn map(sub: &Function, values: &[ExprValue]) -> Result<ExprValue, IndeterminateError> {
    let (bag_position, bag) = sole_bag(values)?;
    let result_datatype = sub.returns.datatype();
    let mut out = Vec::with_capacity(bag.len());
    for element in bag.iter() {
        let call: Vec<ExprValue> = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                if i == bag_position {
                    ExprValue::Single(element.clone())
                } else {
                    v.clone()
                }
            })
            .collect();
        out.push(sub.invoke(&call)?.expect_single()?.clone());
    }
    Ok(ExprValue::Bag(Bag::new(result_datatype, out)?))
}

fn sole_bag(values: &[ExprValue]) -> Result<(usize, &Bag), IndeterminateError> {
    let mut found = None;
    for (i, v) in values.iter().enumerate() {
        if let ExprValue::Bag(bag) = v {
            if found.is_some() {
                return Err(IndeterminateError::processing_error(
                    "Expected exactly one bag argument, got several",
                ));
            }
            found = Some((i, bag));
        }
    }
    found.ok_or_else(|| {
        IndeterminateError::processing_error("Expected one bag argument, got none")
    })
}

fn boolean(b: bool) -> Result<ExprValue, IndeterminateError> {
    Ok(ExprValue::Single(AttributeValue::Boolean(b)))
}
