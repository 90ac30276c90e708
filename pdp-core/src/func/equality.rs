//! Per-datatype equality, plus the special name-matching predicates.

use pdp_api::{AttributeValue, Datatype, IndeterminateError};

use crate::expr::ExprValue;

use super::{family_prefix, Function, Params, ParamSpec, Registry, ValueKind, XACML_1_0, XACML_3_0};

/// Datatypes the standard defines an `-equal` function for.
const EQUALITY_TYPES: [Datatype; 14] = [
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
    for dt in EQUALITY_TYPES {
        registry.insert(Function::eager(
            format!("{}{}-equal", family_prefix(dt), dt.short_name()),
            Params::fixed(vec![ParamSpec::Single(dt), ParamSpec::Single(dt)]),
            ValueKind::Single(Datatype::Boolean),
            |args| boolean(args[0].expect_single()? == args[1].expect_single()?),
        ));
    }

    registry.insert(Function::eager(
        format!("{XACML_3_0}string-equal-ignore-case"),
        Params::fixed(vec![
            ParamSpec::Single(Datatype::String),
            ParamSpec::Single(Datatype::String),
        ]),
        ValueKind::Single(Datatype::Boolean),
        |args| {
            let (a, b) = (args[0].expect_single()?, args[1].expect_single()?);
            match (a, b) {
                (AttributeValue::String(a), AttributeValue::String(b)) => {
                    boolean(a.to_lowercase() == b.to_lowercase())
                }
                _ => boolean(false),
            }
        },
    ));

    // x500Name-match(base, candidate): true when the candidate name ends
    // in the base name's RDN sequence.
    registry.insert(Function::eager(
        format!("{XACML_1_0}x500Name-match"),
        Params::fixed(vec![
            ParamSpec::Single(Datatype::X500Name),
            ParamSpec::Single(Datatype::X500Name),
        ]),
        ValueKind::Single(Datatype::Boolean),
        |args| {
            let (base, candidate) = (args[0].expect_single()?, args[1].expect_single()?);
            match (base, candidate) {
                (AttributeValue::X500Name(base), AttributeValue::X500Name(candidate)) => {
                    boolean(candidate.ends_with(base))
                }
                _ => boolean(false),
            }
        },
    ));

    // rfc822Name-match(pattern, name): pattern is a full mailbox, a
    // domain, or a `.domain` suffix.
    registry.insert(Function::eager(
        format!("{XACML_1_0}rfc822Name-match"),
        Params::fixed(vec![
            ParamSpec::Single(Datatype::String),
            ParamSpec::Single(Datatype::Rfc822Name),
        ]),
        ValueKind::Single(Datatype::Boolean),
        |args| {
            let (pattern, name) = (args[0].expect_single()?, args[1].expect_single()?);
            match (pattern, name) {
                (AttributeValue::String(pattern), AttributeValue::Rfc822Name(name)) => {
                    boolean(name.matches(pattern))
                }
                _ => boolean(false),
            }
        },
    ));
}

#[cfg(test)]
mod tests {
    use super::super::function;
    use crate::expr::ExprValue;
    use pdp_api::{AttributeValue, Datatype};

    fn call(id: &str, args: &[ExprValue]) -> ExprValue {
        function(id).unwrap().invoke(args).unwrap()
    }

    fn single(dt: Datatype, lexical: &str) -> ExprValue {
        ExprValue::Single(AttributeValue::parse(dt, lexical).unwrap())
    }

    #[test]
    fn string_equal_is_codepoint_equality() {
        let t = call(
            "urn:oasis:names:tc:xacml:1.0:function:string-equal",
            &[single(Datatype::String, "abc"), single(Datatype::String, "abc")],
        );
        assert_eq!(t, single(Datatype::Boolean, "true"));
        let f = call(
            "urn:oasis:names:tc:xacml:1.0:function:string-equal",
            &[single(Datatype::String, "abc"), single(Datatype::String, "Abc")],
        );
        assert_eq!(f, single(Datatype::Boolean, "false"));
    }

    #[test]
    fn duration_equal_uses_three_zero_namespace() {
        let t = call(
            "urn:oasis:names:tc:xacml:3.0:function:yearMonthDuration-equal",
            &[
                single(Datatype::YearMonthDuration, "P1Y2M"),
                single(Datatype::YearMonthDuration, "P14M"),
            ],
        );
        assert_eq!(t, single(Datatype::Boolean, "true"));
    }

    #[test]
    fn x500_match_is_terminal() {
        let t = call(
            "urn:oasis:names:tc:xacml:1.0:function:x500Name-match",
            &[
                single(Datatype::X500Name, "O=Example, C=US"),
                single(Datatype::X500Name, "CN=Alice, O=Example, C=US"),
            ],
        );
        assert_eq!(t, single(Datatype::Boolean, "true"));
    }

    #[test]
    fn rfc822_match_patterns() {
        let f = function("urn:oasis:names:tc:xacml:1.0:function:rfc822Name-match").unwrap();
        let name = single(Datatype::Rfc822Name, "alice@mail.example.com");
        for (pattern, expected) in [
            ("mail.example.com", true),
            (".example.com", true),
            ("example.com", false),
        ] {
            let result = f
                .invoke(&[single(Datatype::String, pattern), name.clone()])
                .unwrap();
            assert_eq!(result, single(Datatype::Boolean, if expected { "true" } else { "false" }));
        }
    }
}
