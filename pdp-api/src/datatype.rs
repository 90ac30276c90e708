//! The closed set of XACML 3.0 attribute datatypes.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::IndeterminateError;
use crate::value::AttributeValue;

/// Identifier of one of the sixteen standard XACML datatypes.
///
/// Each datatype knows its URI, whether a total order is defined for it,
/// and how to parse a lexical form into an [`AttributeValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Datatype {
    Boolean,
    Integer,
    Double,
    String,
    Time,
    Date,
    DateTime,
    DayTimeDuration,
    YearMonthDuration,
    AnyUri,
    HexBinary,
    Base64Binary,
    Rfc822Name,
    X500Name,
    IpAddress,
    DnsName,
}

/// All datatypes, in declaration order.
pub const ALL_DATATYPES: [Datatype; 16] = [
    Datatype::Boolean,
    Datatype::Integer,
    Datatype::Double,
    Datatype::String,
    Datatype::Time,
    Datatype::Date,
    Datatype::DateTime,
    Datatype::DayTimeDuration,
    Datatype::YearMonthDuration,
    Datatype::AnyUri,
    Datatype::HexBinary,
    Datatype::Base64Binary,
    Datatype::Rfc822Name,
    Datatype::X500Name,
    Datatype::IpAddress,
    Datatype::DnsName,
];

impl Datatype {
    /// The standard URI identifying this datatype.
    pub fn uri(self) -> &'static str {
        match self {
            Datatype::Boolean => "http://www.w3.org/2001/XMLSchema#boolean",
            Datatype::Integer => "http://www.w3.org/2001/XMLSchema#integer",
            Datatype::Double => "http://www.w3.org/2001/XMLSchema#double",
            Datatype::String => "http://www.w3.org/2001/XMLSchema#string",
            Datatype::Time => "http://www.w3.org/2001/XMLSchema#time",
            Datatype::Date => "http://www.w3.org/2001/XMLSchema#date",
            Datatype::DateTime => "http://www.w3.org/2001/XMLSchema#dateTime",
            Datatype::DayTimeDuration => "http://www.w3.org/2001/XMLSchema#dayTimeDuration",
            Datatype::YearMonthDuration => "http://www.w3.org/2001/XMLSchema#yearMonthDuration",
            Datatype::AnyUri => "http://www.w3.org/2001/XMLSchema#anyURI",
            Datatype::HexBinary => "http://www.w3.org/2001/XMLSchema#hexBinary",
            Datatype::Base64Binary => "http://www.w3.org/2001/XMLSchema#base64Binary",
            Datatype::Rfc822Name => {
                "urn:oasis:names:tc:xacml:1.0:data-type:rfc822Name"
            }
            Datatype::X500Name => "urn:oasis:names:tc:xacml:1.0:data-type:x500Name",
            Datatype::IpAddress => "urn:oasis:names:tc:xacml:2.0:data-type:ipAddress",
            Datatype::DnsName => "urn:oasis:names:tc:xacml:2.0:data-type:dnsName",
        }
    }

    /// Resolve a datatype from its standard URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        ALL_DATATYPES.iter().copied().find(|dt| dt.uri() == uri)
    }

    /// Short name used in function identifiers (`string-equal`, ...).
    pub fn short_name(self) -> &'static str {
        match self {
            Datatype::Boolean => "boolean",
            Datatype::Integer => "integer",
            Datatype::Double => "double",
            Datatype::String => "string",
            Datatype::Time => "time",
            Datatype::Date => "date",
            Datatype::DateTime => "dateTime",
            Datatype::DayTimeDuration => "dayTimeDuration",
            Datatype::YearMonthDuration => "yearMonthDuration",
            Datatype::AnyUri => "anyURI",
            Datatype::HexBinary => "hexBinary",
            Datatype::Base64Binary => "base64Binary",
            Datatype::Rfc822Name => "rfc822Name",
            Datatype::X500Name => "x500Name",
            Datatype::IpAddress => "ipAddress",
            Datatype::DnsName => "dnsName",
        }
    }

    /// Whether comparison functions are defined over this datatype.
    pub fn is_ordered(self) -> bool {
        matches!(
            self,
            Datatype::Integer
                | Datatype::Double
                | Datatype::String
                | Datatype::Time
                | Datatype::Date
                | Datatype::DateTime
                | Datatype::DayTimeDuration
                | Datatype::YearMonthDuration
        )
    }

    /// Parse a lexical form into a value of this datatype.
    ///
    /// A lexical form that violates the datatype's schema yields a
    /// syntax-error Indeterminate.
    pub fn parse(self, lexical: &str) -> Result<AttributeValue, IndeterminateError> {
        AttributeValue::parse(self, lexical)
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

impl Serialize for Datatype {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.uri())
    }
}

impl<'de> Deserialize<'de> for Datatype {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let uri = String::deserialize(deserializer)?;
        Datatype::from_uri(&uri)
            .ok_or_else(|| D::Error::custom(format!("unknown datatype URI: {uri}")))
    }
}
