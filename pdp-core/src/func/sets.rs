//! Set operations over bags, generated per datatype.

use pdp_api::{AttributeValue, Datatype, IndeterminateError};

use crate::expr::ExprValue;

use super::{family_prefix, Function, Params, ParamSpec, Registry, ValueKind};

/// Datatypes the standard defines set functions for: everything with an
/// equality function.
const SET_TYPES: [Datatype; 14] = [
    Datatype::String,
    Datatype::Boolean,
    Datatype::Integer,
    Datatype::Double,
    Datatype::Date,
    Datatype::Time,
    Datatype::DateTime,
    Datatype::DayTimeDuration,
    Datatype::YearMonthDuration,
    Datatype::AnyUri,
    Datatype::X500Name,
    Datatype::Rfc822Name,
    Datatype::HexBinary,
    Datatype::Base64Binary,
];

fn boolean(b: bool) -> Result<ExprValue, IndeterminateError> {
    Ok(ExprValue::Single(AttributeValue::Boolean(b)))
}

pub(super) fn register(registry: &mut Registry) {
    for dt in SET_TYPES {
        let prefix = family_prefix(dt);
        let name = dt.short_name();
        let two_bags = || Params::fixed(vec![ParamSpec::Bag(dt), ParamSpec::Bag(dt)]);

        registry.insert(Function::eager(
            format!("{prefix}{name}-intersection"),
            two_bags(),
            ValueKind::Bag(dt),
            |args| {
                Ok(ExprValue::Bag(
                    args[0].expect_bag()?.intersection(args[1].expect_bag()?),
                ))
            },
        ));
        registry.insert(Function::eager(
            format!("{prefix}{name}-union"),
            two_bags(),
            ValueKind::Bag(dt),
            |args| {
                Ok(ExprValue::Bag(
                    args[0].expect_bag()?.union(args[1].expect_bag()?),
                ))
            },
        ));
        registry.insert(Function::eager(
            format!("{prefix}{name}-at-least-one-member-of"),
            two_bags(),
            ValueKind::Single(Datatype::Boolean),
            |args| {
                let (a, b) = (args[0].expect_bag()?, args[1].expect_bag()?);
                boolean(a.iter().any(|v| b.contains(v)))
            },
        ));
        registry.insert(Function::eager(
            format!("{prefix}{name}-subset"),
            two_bags(),
            ValueKind::Single(Datatype::Boolean),
            |args| boolean(args[0].expect_bag()?.subset_of(args[1].expect_bag()?)),
        ));
        registry.insert(Function::eager(
            format!("{prefix}{name}-set-equals"),
            two_bags(),
            ValueKind::Single(Datatype::Boolean),
            |args| boolean(args[0].expect_bag()?.set_equals(args[1].expect_bag()?)),
        ));
    }
}
