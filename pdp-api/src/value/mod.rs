//! Typed attribute values.
//!
//! An [`AttributeValue`] is an immutable value tagged by its datatype.
//! Equality is datatype-specific (see the payload types); two values of
//! different datatypes are never equal.

use std::cmp::Ordering;
use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::datatype::Datatype;
use crate::error::IndeterminateError;

pub mod duration;
pub mod name;
pub mod net;
pub mod temporal;

pub use duration::{DayTimeDuration, YearMonthDuration};
pub use name::{Rfc822Name, X500Name};
pub use net::{DnsName, IpAddress, PortRange};
pub use temporal::{XacmlDate, XacmlDateTime, XacmlTime};

/// A single typed XACML attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Time(XacmlTime),
    Date(XacmlDate),
    DateTime(XacmlDateTime),
    DayTimeDuration(DayTimeDuration),
    YearMonthDuration(YearMonthDuration),
    AnyUri(String),
    HexBinary(Vec<u8>),
    Base64Binary(Vec<u8>),
    Rfc822Name(Rfc822Name),
    X500Name(X500Name),
    IpAddress(IpAddress),
    DnsName(DnsName),
}

impl AttributeValue {
    /// The datatype this value is tagged with.
    pub fn datatype(&self) -> Datatype {
        match self {
            AttributeValue::Boolean(_) => Datatype::Boolean,
            AttributeValue::Integer(_) => Datatype::Integer,
            AttributeValue::Double(_) => Datatype::Double,
            AttributeValue::String(_) => Datatype::String,
            AttributeValue::Time(_) => Datatype::Time,
            AttributeValue::Date(_) => Datatype::Date,
            AttributeValue::DateTime(_) => Datatype::DateTime,
            AttributeValue::DayTimeDuration(_) => Datatype::DayTimeDuration,
            AttributeValue::YearMonthDuration(_) => Datatype::YearMonthDuration,
            AttributeValue::AnyUri(_) => Datatype::AnyUri,
            AttributeValue::HexBinary(_) => Datatype::HexBinary,
            AttributeValue::Base64Binary(_) => Datatype::Base64Binary,
            AttributeValue::Rfc822Name(_) => Datatype::Rfc822Name,
            AttributeValue::X500Name(_) => Datatype::X500Name,
            AttributeValue::IpAddress(_) => Datatype::IpAddress,
            AttributeValue::DnsName(_) => Datatype::DnsName,
        }
    }

    /// Parse a lexical form into a value of the given datatype.
    pub fn parse(datatype: Datatype, lexical: &str) -> Result<Self, IndeterminateError> {
        match datatype {
            Datatype::Boolean => match lexical {
                "true" | "1" => Ok(AttributeValue::Boolean(true)),
                "false" | "0" => Ok(AttributeValue::Boolean(false)),
                _ => Err(IndeterminateError::syntax_error(format!(
                    "Invalid xs:boolean value '{lexical}'"
                ))),
            },
            Datatype::Integer => lexical
                .parse::<i64>()
                .map(AttributeValue::Integer)
                .map_err(|_| {
                    IndeterminateError::syntax_error(format!(
                        "Invalid xs:integer value '{lexical}'"
                    ))
                }),
            Datatype::Double => parse_double(lexical).map(AttributeValue::Double),
            Datatype::String => Ok(AttributeValue::String(lexical.to_owned())),
            Datatype::Time => XacmlTime::parse(lexical).map(AttributeValue::Time),
            Datatype::Date => XacmlDate::parse(lexical).map(AttributeValue::Date),
            Datatype::DateTime => XacmlDateTime::parse(lexical).map(AttributeValue::DateTime),
            Datatype::DayTimeDuration => {
                DayTimeDuration::parse(lexical).map(AttributeValue::DayTimeDuration)
            }
            Datatype::YearMonthDuration => {
                YearMonthDuration::parse(lexical).map(AttributeValue::YearMonthDuration)
            }
            Datatype::AnyUri => Ok(AttributeValue::AnyUri(lexical.to_owned())),
            Datatype::HexBinary => hex::decode(lexical)
                .map(AttributeValue::HexBinary)
                .map_err(|_| {
                    IndeterminateError::syntax_error(format!(
                        "Invalid xs:hexBinary value '{lexical}'"
                    ))
                }),
            Datatype::Base64Binary => BASE64
                .decode(lexical)
                .map(AttributeValue::Base64Binary)
                .map_err(|_| {
                    IndeterminateError::syntax_error(format!(
                        "Invalid xs:base64Binary value '{lexical}'"
                    ))
                }),
            Datatype::Rfc822Name => Rfc822Name::parse(lexical).map(AttributeValue::Rfc822Name),
            Datatype::X500Name => X500Name::parse(lexical).map(AttributeValue::X500Name),
            Datatype::IpAddress => IpAddress::parse(lexical).map(AttributeValue::IpAddress),
            Datatype::DnsName => DnsName::parse(lexical).map(AttributeValue::DnsName),
        }
    }

    /// Serialise back to a lexical form that re-parses to an equal value.
    pub fn to_lexical(&self) -> String {
        match self {
            AttributeValue::Boolean(b) => b.to_string(),
            AttributeValue::Integer(i) => i.to_string(),
            AttributeValue::Double(d) => format_double(*d),
            AttributeValue::String(s) | AttributeValue::AnyUri(s) => s.clone(),
            AttributeValue::Time(v) => v.to_string(),
            AttributeValue::Date(v) => v.to_string(),
            AttributeValue::DateTime(v) => v.to_string(),
            AttributeValue::DayTimeDuration(v) => v.to_string(),
            AttributeValue::YearMonthDuration(v) => v.to_string(),
            AttributeValue::HexBinary(bytes) => hex::encode(bytes),
            AttributeValue::Base64Binary(bytes) => BASE64.encode(bytes),
            AttributeValue::Rfc822Name(v) => v.to_string(),
            AttributeValue::X500Name(v) => v.to_string(),
            AttributeValue::IpAddress(v) => v.to_string(),
            AttributeValue::DnsName(v) => v.to_string(),
        }
    }

    /// Total order for ordered datatypes; `None` for unordered datatypes
    /// or a datatype mismatch.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (AttributeValue::Integer(a), AttributeValue::Integer(b)) => Some(a.cmp(b)),
            (AttributeValue::Double(a), AttributeValue::Double(b)) => a.partial_cmp(b),
            (AttributeValue::String(a), AttributeValue::String(b)) => Some(a.cmp(b)),
            (AttributeValue::Time(a), AttributeValue::Time(b)) => Some(a.cmp(b)),
            (AttributeValue::Date(a), AttributeValue::Date(b)) => Some(a.cmp(b)),
            (AttributeValue::DateTime(a), AttributeValue::DateTime(b)) => Some(a.cmp(b)),
            (AttributeValue::DayTimeDuration(a), AttributeValue::DayTimeDuration(b)) => {
                Some(a.cmp(b))
            }
            (AttributeValue::YearMonthDuration(a), AttributeValue::YearMonthDuration(b)) => {
                Some(a.cmp(b))
            }
            _ => None,
        }
    }

    /// Convenience accessor for boolean results.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) | AttributeValue::AnyUri(s) => Some(s),
            _ => None,
        }
    }
}

fn parse_double(lexical: &str) -> Result<f64, IndeterminateError> {
    // xs:double uses INF / -INF / NaN; everything else is plain IEEE-754
    // decimal or scientific notation.
    match lexical {
        "INF" => return Ok(f64::INFINITY),
        "-INF" => return Ok(f64::NEG_INFINITY),
        "NaN" => return Ok(f64::NAN),
        _ => {}
    }
    if lexical
        .chars()
        .any(|c| !c.is_ascii_digit() && !matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return Err(IndeterminateError::syntax_error(format!(
            "Invalid xs:double value '{lexical}'"
        )));
    }
    lexical.parse::<f64>().map_err(|_| {
        IndeterminateError::syntax_error(format!("Invalid xs:double value '{lexical}'"))
    })
}

fn format_double(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_owned()
    } else if d == f64::INFINITY {
        "INF".to_owned()
    } else if d == f64::NEG_INFINITY {
        "-INF".to_owned()
    } else {
        // Rust's shortest round-trip formatting.
        format!("{d}")
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_lexical())
    }
}

/// Wire form: a datatype URI plus the lexical value, the shape a parsed
/// request supplies.
#[derive(Serialize, Deserialize)]
struct LexicalForm {
    datatype: Datatype,
    value: String,
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        LexicalForm {
            datatype: self.datatype(),
            value: self.to_lexical(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AttributeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let form = LexicalForm::deserialize(deserializer)?;
        AttributeValue::parse(form.datatype, &form.value)
            .map_err(|e| serde::de::Error::custom(e.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_datatype_never_equal() {
        let s = AttributeValue::parse(Datatype::String, "1").unwrap();
        let i = AttributeValue::parse(Datatype::Integer, "1").unwrap();
        let u = AttributeValue::parse(Datatype::AnyUri, "1").unwrap();
        assert_ne!(s, i);
        assert_ne!(s, u);
    }

    #[test]
    fn double_specials() {
        assert_eq!(
            AttributeValue::parse(Datatype::Double, "INF").unwrap(),
            AttributeValue::Double(f64::INFINITY)
        );
        // NaN is never equal to itself under IEEE-754.
        let nan = AttributeValue::parse(Datatype::Double, "NaN").unwrap();
        assert_ne!(nan, nan);
        assert!(AttributeValue::parse(Datatype::Double, "1x0").is_err());
    }

    #[test]
    fn binary_parsing() {
        let hex = AttributeValue::parse(Datatype::HexBinary, "0aFF").unwrap();
        assert_eq!(hex, AttributeValue::HexBinary(vec![0x0a, 0xff]));
        let b64 = AttributeValue::parse(Datatype::Base64Binary, "aGVsbG8=").unwrap();
        assert_eq!(b64, AttributeValue::Base64Binary(b"hello".to_vec()));
        assert!(AttributeValue::parse(Datatype::HexBinary, "xyz").is_err());
    }

    #[test]
    fn serde_wire_form() {
        let v = AttributeValue::parse(Datatype::Integer, "42").unwrap();
        let json = serde_json::to_string(&v).unwrap();
        assert!(json.contains("http://www.w3.org/2001/XMLSchema#integer"));
        let back: AttributeValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn compare_only_within_ordered_types() {
        let a = AttributeValue::Integer(1);
        let b = AttributeValue::Integer(2);
        assert_eq!(a.compare(&b), Some(Ordering::Less));
        let u1 = AttributeValue::AnyUri("a".into());
        let u2 = AttributeValue::AnyUri("b".into());
        assert_eq!(u1.compare(&u2), None);
    }
}
