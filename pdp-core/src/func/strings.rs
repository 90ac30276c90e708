//! String functions: normalisation, containment, substring, regular
//! expressions, and string conversions.

use pdp_api::{AttributeValue, Datatype, IndeterminateError};

use crate::expr::ExprValue;

use super::{Function, Params, ParamSpec, Registry, ValueKind, XACML_1_0, XACML_2_0, XACML_3_0};

fn string(args: &[ExprValue], i: usize) -> Result<&str, IndeterminateError> {
    args[i]
        .expect_single()?
        .as_str()
        .ok_or_else(|| IndeterminateError::processing_error("Expected a string argument"))
}

fn str_result(s: String) -> Result<ExprValue, IndeterminateError> {
    Ok(ExprValue::Single(AttributeValue::String(s)))
}

fn bool_result(b: bool) -> Result<ExprValue, IndeterminateError> {
    Ok(ExprValue::Single(AttributeValue::Boolean(b)))
}

/// XACML regexp semantics: the pattern must match the whole value, per
/// the XML Schema regex dialect the standard references.
fn regexp_match(pattern: &str, value: &str) -> Result<bool, IndeterminateError> {
    let anchored = format!("^(?:{pattern})$");
    let re = regex::Regex::new(&anchored).map_err(|e| {
        IndeterminateError::syntax_error(format!("Invalid regular expression '{pattern}': {e}"))
    })?;
    Ok(re.is_match(value))
}

/// Datatypes with a 2.0 `-regexp-match` variant over their lexical form.
const REGEXP_TYPES: [Datatype; 5] = [
    Datatype::AnyUri,
    Datatype::IpAddress,
    Datatype::DnsName,
    Datatype::Rfc822Name,
    Datatype::X500Name,
];

pub(super) fn register(registry: &mut Registry) {
    registry.insert(Function::eager(
        format!("{XACML_1_0}string-normalize-space"),
        Params::fixed(vec![ParamSpec::Single(Datatype::String)]),
        ValueKind::Single(Datatype::String),
        |args| str_result(string(args, 0)?.trim().to_owned()),
    ));
    registry.insert(Function::eager(
        format!("{XACML_1_0}string-normalize-to-lower-case"),
        Params::fixed(vec![ParamSpec::Single(Datatype::String)]),
        ValueKind::Single(Datatype::String),
        |args| str_result(string(args, 0)?.to_lowercase()),
    ));

    registry.insert(Function::eager(
        format!("{XACML_2_0}string-concatenate"),
        Params::variadic(
            vec![
                ParamSpec::Single(Datatype::String),
                ParamSpec::Single(Datatype::String),
            ],
            ParamSpec::Single(Datatype::String),
        ),
        ValueKind::Single(Datatype::String),
        |args| {
            let mut out = String::new();
            for i in 0..args.len() {
                out.push_str(string(args, i)?);
            }
            str_result(out)
        },
    ));

    // Containment: the first argument is the needle.
    registry.insert(Function::eager(
        format!("{XACML_3_0}string-starts-with"),
        Params::fixed(vec![
            ParamSpec::Single(Datatype::String),
            ParamSpec::Single(Datatype::String),
        ]),
        ValueKind::Single(Datatype::Boolean),
        |args| bool_result(string(args, 1)?.starts_with(string(args, 0)?)),
    ));
    registry.insert(Function::eager(
        format!("{XACML_3_0}string-ends-with"),
        Params::fixed(vec![
            ParamSpec::Single(Datatype::String),
            ParamSpec::Single(Datatype::String),
        ]),
        ValueKind::Single(Datatype::Boolean),
        |args| bool_result(string(args, 1)?.ends_with(string(args, 0)?)),
    ));
    registry.insert(Function::eager(
        format!("{XACML_3_0}string-contains"),
        Params::fixed(vec![
            ParamSpec::Single(Datatype::String),
            ParamSpec::Single(Datatype::String),
        ]),
        ValueKind::Single(Datatype::Boolean),
        |args| bool_result(string(args, 1)?.contains(string(args, 0)?)),
    ));

    // string-substring(value, begin, end): character indexes, end of -1
    // meaning the end of the string.
    registry.insert(Function::eager(
        format!("{XACML_3_0}string-substring"),
        Params::fixed(vec![
            ParamSpec::Single(Datatype::String),
            ParamSpec::Single(Datatype::Integer),
            ParamSpec::Single(Datatype::Integer),
        ]),
        ValueKind::Single(Datatype::String),
        |args| {
            let value = string(args, 0)?;
            let begin = args[1].expect_single()?.as_integer().unwrap_or(0);
            let end = args[2].expect_single()?.as_integer().unwrap_or(0);
            let chars: Vec<char> = value.chars().collect();
            let len = chars.len() as i64;
            let end = if end == -1 { len } else { end };
            if begin < 0 || end < begin || end > len {
                return Err(IndeterminateError::processing_error(format!(
                    "Substring range [{begin}, {end}) out of bounds for length {len}"
                )));
            }
            str_result(chars[begin as usize..end as usize].iter().collect())
        },
    ));

    registry.insert(Function::eager(
        format!("{XACML_1_0}string-regexp-match"),
        Params::fixed(vec![
            ParamSpec::Single(Datatype::String),
            ParamSpec::Single(Datatype::String),
        ]),
        ValueKind::Single(Datatype::Boolean),
        |args| bool_result(regexp_match(string(args, 0)?, string(args, 1)?)?),
    ));
    for dt in REGEXP_TYPES {
        registry.insert(Function::eager(
            format!("{XACML_2_0}{}-regexp-match", dt.short_name()),
            Params::fixed(vec![ParamSpec::Single(Datatype::String), ParamSpec::Single(dt)]),
            ValueKind::Single(Datatype::Boolean),
            |args| {
                let pattern = string(args, 0)?;
                let value = args[1].expect_single()?.to_lexical();
                bool_result(regexp_match(pattern, &value)?)
            },
        ));
    }

    // Lexical conversions to and from string.
    for dt in [Datatype::Boolean, Datatype::Integer, Datatype::Double] {
        registry.insert(Function::eager(
            format!("{XACML_3_0}{}-from-string", dt.short_name()),
            Params::fixed(vec![ParamSpec::Single(Datatype::String)]),
            ValueKind::Single(dt),
            move |args| Ok(ExprValue::Single(dt.parse(string(args, 0)?)?)),
        ));
        registry.insert(Function::eager(
            format!("{XACML_3_0}string-from-{}", dt.short_name()),
            Params::fixed(vec![ParamSpec::Single(dt)]),
            ValueKind::Single(Datatype::String),
            |args| str_result(args[0].expect_single()?.to_lexical()),
        ));
    }
}
