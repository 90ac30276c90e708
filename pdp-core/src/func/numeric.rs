//! Arithmetic, comparison, and numeric conversion functions.

use std::cmp::Ordering;

use pdp_api::{AttributeValue, Datatype, IndeterminateError};

use crate::expr::ExprValue;

use super::{Function, Params, ParamSpec, Registry, ValueKind, XACML_1_0};

/// Ordered datatypes with a standard comparison family.
const COMPARABLE_TYPES: [Datatype; 6] = [
    Datatype::Integer,
    Datatype::Double,
    Datatype::String,
    Datatype::Time,
    Datatype::Date,
    Datatype::DateTime,
];

fn integer(args: &[ExprValue], i: usize) -> Result<i64, IndeterminateError> {
    args[i].expect_single()?.as_integer().ok_or_else(|| {
        IndeterminateError::processing_error("Expected an integer argument")
    })
}

fn double(args: &[ExprValue], i: usize) -> Result<f64, IndeterminateError> {
    match args[i].expect_single()? {
        AttributeValue::Double(d) => Ok(*d),
        _ => Err(IndeterminateError::processing_error(
            "Expected a double argument",
        )),
    }
}

fn int_result(v: i64) -> Result<ExprValue, IndeterminateError> {
    Ok(ExprValue::Single(AttributeValue::Integer(v)))
}

fn double_result(v: f64) -> Result<ExprValue, IndeterminateError> {
    Ok(ExprValue::Single(AttributeValue::Double(v)))
}

fn overflow(op: &str) -> IndeterminateError {
    IndeterminateError::processing_error(format!("Integer overflow in {op}"))
}

fn integer_fold(
    id: String,
    op: &'static str,
    fold: fn(i64, i64) -> Option<i64>,
) -> Function {
    Function::eager(
        id,
        Params::variadic(
            vec![
                ParamSpec::Single(Datatype::Integer),
                ParamSpec::Single(Datatype::Integer),
            ],
            ParamSpec::Single(Datatype::Integer),
        ),
        ValueKind::Single(Datatype::Integer),
        move |args| {
            let mut acc = integer(args, 0)?;
            for i in 1..args.len() {
                acc = fold(acc, integer(args, i)?).ok_or_else(|| overflow(op))?;
            }
            int_result(acc)
        },
    )
}

fn double_fold(id: String, fold: fn(f64, f64) -> f64) -> Function {
    Function::eager(
        id,
        Params::variadic(
            vec![
                ParamSpec::Single(Datatype::Double),
                ParamSpec::Single(Datatype::Double),
            ],
            ParamSpec::Single(Datatype::Double),
        ),
        ValueKind::Single(Datatype::Double),
        move |args| {
            let mut acc = double(args, 0)?;
            for i in 1..args.len() {
                acc = fold(acc, double(args, i)?);
            }
            double_result(acc)
        },
    )
}

pub(super) fn register(registry: &mut Registry) {
    // Comparisons, four per ordered datatype.
    for dt in COMPARABLE_TYPES {
        for (suffix, accepts) in [
            ("greater-than", [Ordering::Greater].as_slice()),
            (
                "greater-than-or-equal",
                [Ordering::Greater, Ordering::Equal].as_slice(),
            ),
            ("less-than", [Ordering::Less].as_slice()),
            (
                "less-than-or-equal",
                [Ordering::Less, Ordering::Equal].as_slice(),
            ),
        ] {
            let accepts = accepts.to_vec();
            registry.insert(Function::eager(
                format!("{XACML_1_0}{}-{suffix}", dt.short_name()),
                Params::fixed(vec![ParamSpec::Single(dt), ParamSpec::Single(dt)]),
                ValueKind::Single(Datatype::Boolean),
                move |args| {
                    let a = args[0].expect_single()?;
                    let b = args[1].expect_single()?;
                    // IEEE semantics: a NaN operand compares false.
                    let holds = match a.compare(b) {
                        Some(ordering) => accepts.contains(&ordering),
                        None => false,
                    };
                    Ok(ExprValue::Single(AttributeValue::Boolean(holds)))
                },
            ));
        }
    }

    // Integer arithmetic, checked.
    registry.insert(integer_fold(
        format!("{XACML_1_0}integer-add"),
        "integer-add",
        i64::checked_add,
    ));
    registry.insert(integer_fold(
        format!("{XACML_1_0}integer-multiply"),
        "integer-multiply",
        i64::checked_mul,
    ));
    registry.insert(Function::eager(
        format!("{XACML_1_0}integer-subtract"),
        Params::fixed(vec![
            ParamSpec::Single(Datatype::Integer),
            ParamSpec::Single(Datatype::Integer),
        ]),
        ValueKind::Single(Datatype::Integer),
        |args| {
            let (a, b) = (integer(args, 0)?, integer(args, 1)?);
            int_result(a.checked_sub(b).ok_or_else(|| overflow("integer-subtract"))?)
        },
    ));
    registry.insert(Function::eager(
        format!("{XACML_1_0}integer-divide"),
        Params::fixed(vec![
            ParamSpec::Single(Datatype::Integer),
            ParamSpec::Single(Datatype::Integer),
        ]),
        ValueKind::Single(Datatype::Integer),
        |args| {
            let (a, b) = (integer(args, 0)?, integer(args, 1)?);
            if b == 0 {
                return Err(IndeterminateError::processing_error("Division by zero"));
            }
            int_result(a.checked_div(b).ok_or_else(|| overflow("integer-divide"))?)
        },
    ));
    registry.insert(Function::eager(
        format!("{XACML_1_0}integer-mod"),
        Params::fixed(vec![
            ParamSpec::Single(Datatype::Integer),
            ParamSpec::Single(Datatype::Integer),
        ]),
        ValueKind::Single(Datatype::Integer),
        |args| {
            let (a, b) = (integer(args, 0)?, integer(args, 1)?);
            if b == 0 {
                return Err(IndeterminateError::processing_error("Division by zero"));
            }
            int_result(a.checked_rem(b).ok_or_else(|| overflow("integer-mod"))?)
        },
    ));
    registry.insert(Function::eager(
        format!("{XACML_1_0}integer-abs"),
        Params::fixed(vec![ParamSpec::Single(Datatype::Integer)]),
        ValueKind::Single(Datatype::Integer),
        |args| {
            let a = integer(args, 0)?;
            int_result(a.checked_abs().ok_or_else(|| overflow("integer-abs"))?)
        },
    ));

    // Double arithmetic, IEEE-754.
    registry.insert(double_fold(format!("{XACML_1_0}double-add"), |a, b| a + b));
    registry.insert(double_fold(
        format!("{XACML_1_0}double-multiply"),
        |a, b| a * b,
    ));
    registry.insert(Function::eager(
        format!("{XACML_1_0}double-subtract"),
        Params::fixed(vec![
            ParamSpec::Single(Datatype::Double),
            ParamSpec::Single(Datatype::Double),
        ]),
        ValueKind::Single(Datatype::Double),
        |args| double_result(double(args, 0)? - double(args, 1)?),
    ));
    registry.insert(Function::eager(
        format!("{XACML_1_0}double-divide"),
        Params::fixed(vec![
            ParamSpec::Single(Datatype::Double),
            ParamSpec::Single(Datatype::Double),
        ]),
        ValueKind::Single(Datatype::Double),
        |args| {
            let (a, b) = (double(args, 0)?, double(args, 1)?);
            if b == 0.0 {
                return Err(IndeterminateError::processing_error("Division by zero"));
            }
            double_result(a / b)
        },
    ));
    registry.insert(Function::eager(
        format!("{XACML_1_0}double-abs"),
        Params::fixed(vec![ParamSpec::Single(Datatype::Double)]),
        ValueKind::Single(Datatype::Double),
        |args| double_result(double(args, 0)?.abs()),
    ));
    registry.insert(Function::eager(
        format!("{XACML_1_0}round"),
        Params::fixed(vec![ParamSpec::Single(Datatype::Double)]),
        ValueKind::Single(Datatype::Double),
        |args| double_result(double(args, 0)?.round()),
    ));
    registry.insert(Function::eager(
        format!("{XACML_1_0}floor"),
        Params::fixed(vec![ParamSpec::Single(Datatype::Double)]),
        ValueKind::Single(Datatype::Double),
        |args| double_result(double(args, 0)?.floor()),
    ));

    // Conversions.
    registry.insert(Function::eager(
        format!("{XACML_1_0}integer-to-double"),
        Params::fixed(vec![ParamSpec::Single(Datatype::Integer)]),
        ValueKind::Single(Datatype::Double),
        |args| double_result(integer(args, 0)? as f64),
    ));
    registry.insert(Function::eager(
        format!("{XACML_1_0}double-to-integer"),
        Params::fixed(vec![ParamSpec::Single(Datatype::Double)]),
        ValueKind::Single(Datatype::Integer),
        |args| {
            let d = double(args, 0)?.trunc();
            if !d.is_finite() || d < i64::MIN as f64 || d > i64::MAX as f64 {
                return Err(IndeterminateError::processing_error(
                    "Double out of integer range",
                ));
            }
            int_result(d as i64)
        },
    ));
}

#[cfg(test)]
mod tests {
    use super::super::function;
    use crate::expr::ExprValue;
    use pdp_api::{AttributeValue, StatusCode};

    fn int(i: i64) -> ExprValue {
        ExprValue::Single(AttributeValue::Integer(i))
    }

    fn dbl(d: f64) -> ExprValue {
        ExprValue::Single(AttributeValue::Double(d))
    }

    #[test]
    fn integer_add_is_variadic() {
        let f = function("urn:oasis:names:tc:xacml:1.0:function:integer-add").unwrap();
        assert_eq!(f.invoke(&[int(1), int(2), int(3)]).unwrap(), int(6));
    }

    #[test]
    fn division_by_zero_is_indeterminate() {
        let f = function("urn:oasis:names:tc:xacml:1.0:function:integer-divide").unwrap();
        let err = f.invoke(&[int(1), int(0)]).unwrap_err();
        assert_eq!(err.code, StatusCode::ProcessingError);
        assert!(err.message.contains("Division by zero"));
    }

    #[test]
    fn integer_overflow_is_indeterminate() {
        let f = function("urn:oasis:names:tc:xacml:1.0:function:integer-add").unwrap();
        assert!(f.invoke(&[int(i64::MAX), int(1)]).is_err());
    }

    #[test]
    fn comparisons() {
        let gt = function("urn:oasis:names:tc:xacml:1.0:function:integer-greater-than").unwrap();
        assert_eq!(
            gt.invoke(&[int(3), int(2)]).unwrap(),
            ExprValue::Single(AttributeValue::Boolean(true))
        );
        let lt = function("urn:oasis:names:tc:xacml:1.0:function:string-less-than").unwrap();
        assert_eq!(
            lt.invoke(&[
                ExprValue::Single(AttributeValue::String("a".into())),
                ExprValue::Single(AttributeValue::String("b".into())),
            ])
            .unwrap(),
            ExprValue::Single(AttributeValue::Boolean(true))
        );
    }

    #[test]
    fn nan_compares_false_both_ways() {
        let gt = function("urn:oasis:names:tc:xacml:1.0:function:double-greater-than").unwrap();
        let lt = function("urn:oasis:names:tc:xacml:1.0:function:double-less-than").unwrap();
        let f = ExprValue::Single(AttributeValue::Boolean(false));
        assert_eq!(gt.invoke(&[dbl(f64::NAN), dbl(1.0)]).unwrap(), f);
        assert_eq!(lt.invoke(&[dbl(f64::NAN), dbl(1.0)]).unwrap(), f);
    }

    #[test]
    fn double_to_integer_truncates() {
        let f = function("urn:oasis:names:tc:xacml:1.0:function:double-to-integer").unwrap();
        assert_eq!(f.invoke(&[dbl(3.9)]).unwrap(), int(3));
        assert_eq!(f.invoke(&[dbl(-3.9)]).unwrap(), int(-3));
        assert!(f.invoke(&[dbl(f64::INFINITY)]).is_err());
    }
}
