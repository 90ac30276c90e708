//! Date and time duration arithmetic.

use pdp_api::value::{DayTimeDuration, YearMonthDuration};
use pdp_api::{AttributeValue, Datatype, IndeterminateError};

use crate::expr::ExprValue;

use super::{Function, Params, ParamSpec, Registry, ValueKind, XACML_3_0};

fn day_time(args: &[ExprValue], i: usize) -> Result<DayTimeDuration, IndeterminateError> {
    match args[i].expect_single()? {
        AttributeValue::DayTimeDuration(d) => Ok(*d),
        _ => Err(IndeterminateError::processing_error(
            "Expected a dayTimeDuration argument",
        )),
    }
}

fn year_month(args: &[ExprValue], i: usize) -> Result<YearMonthDuration, IndeterminateError> {
    match args[i].expect_single()? {
        AttributeValue::YearMonthDuration(d) => Ok(*d),
        _ => Err(IndeterminateError::processing_error(
            "Expected a yearMonthDuration argument",
        )),
    }
}

pub(super) fn register(registry: &mut Registry) {
    for (suffix, negate) in [("add", false), ("subtract", true)] {
        registry.insert(Function::eager(
            format!("{XACML_3_0}dateTime-{suffix}-dayTimeDuration"),
            Params::fixed(vec![
                ParamSpec::Single(Datatype::DateTime),
                ParamSpec::Single(Datatype::DayTimeDuration),
            ]),
            ValueKind::Single(Datatype::DateTime),
            move |args| {
                let base = match args[0].expect_single()? {
                    AttributeValue::DateTime(dt) => *dt,
                    _ => {
                        return Err(IndeterminateError::processing_error(
                            "Expected a dateTime argument",
                        ))
                    }
                };
                let mut duration = day_time(args, 1)?;
                if negate {
                    duration = duration.negated();
                }
                Ok(ExprValue::Single(AttributeValue::DateTime(
                    base.add_day_time(&duration)?,
                )))
            },
        ));

        registry.insert(Function::eager(
            format!("{XACML_3_0}dateTime-{suffix}-yearMonthDuration"),
            Params::fixed(vec![
                ParamSpec::Single(Datatype::DateTime),
                ParamSpec::Single(Datatype::YearMonthDuration),
            ]),
            ValueKind::Single(Datatype::DateTime),
            move |args| {
                let base = match args[0].expect_single()? {
                    AttributeValue::DateTime(dt) => *dt,
                    _ => {
                        return Err(IndeterminateError::processing_error(
                            "Expected a dateTime argument",
                        ))
                    }
                };
                let mut duration = year_month(args, 1)?;
                if negate {
                    duration = duration.negated();
                }
                Ok(ExprValue::Single(AttributeValue::DateTime(
                    base.add_year_month(&duration)?,
                )))
            },
        ));

        registry.insert(Function::eager(
            format!("{XACML_3_0}date-{suffix}-yearMonthDuration"),
            Params::fixed(vec![
                ParamSpec::Single(Datatype::Date),
                ParamSpec::Single(Datatype::YearMonthDuration),
            ]),
            ValueKind::Single(Datatype::Date),
            move |args| {
                let base = match args[0].expect_single()? {
                    AttributeValue::Date(d) => *d,
                    _ => {
                        return Err(IndeterminateError::processing_error(
                            "Expected a date argument",
                        ))
                    }
                };
                let mut duration = year_month(args, 1)?;
                if negate {
                    duration = duration.negated();
                }
                Ok(ExprValue::Single(AttributeValue::Date(
                    base.add_year_month(&duration)?,
                )))
            },
        ));
    }
}
