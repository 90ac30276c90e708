//! The decision model: decisions, statuses, obligations and advice.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IndeterminateError;
use crate::ident;
use crate::value::AttributeValue;

/// The effect a rule emits when it fully matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    Permit,
    Deny,
}

impl Effect {
    /// The Indeterminate flavour a failure under this effect lifts to.
    pub fn indeterminate_flavor(self) -> ExtendedIndeterminate {
        match self {
            Effect::Permit => ExtendedIndeterminate::Permit,
            Effect::Deny => ExtendedIndeterminate::Deny,
        }
    }
}

/// Which decision an Indeterminate child could have produced had
/// evaluation succeeded. Drives the XACML 3.0 combining truth tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtendedIndeterminate {
    /// Could only have been Permit.
    Permit,
    /// Could only have been Deny.
    Deny,
    /// Could have been either.
    DenyPermit,
}

/// An authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Permit,
    Deny,
    NotApplicable,
    Indeterminate(ExtendedIndeterminate),
}

impl Decision {
    pub fn is_indeterminate(self) -> bool {
        matches!(self, Decision::Indeterminate(_))
    }
}

// On the wire a decision is its XACML lexical name; the Indeterminate
// flavour is internal to combining and does not survive serialization.
impl Serialize for Decision {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Decision {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        match name.as_str() {
            "Permit" => Ok(Decision::Permit),
            "Deny" => Ok(Decision::Deny),
            "NotApplicable" => Ok(Decision::NotApplicable),
            "Indeterminate" => Ok(Decision::Indeterminate(ExtendedIndeterminate::DenyPermit)),
            other => Err(serde::de::Error::custom(format!(
                "unknown decision: {other}"
            ))),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Decision::Permit => "Permit",
            Decision::Deny => "Deny",
            Decision::NotApplicable => "NotApplicable",
            Decision::Indeterminate(_) => "Indeterminate",
        };
        f.write_str(name)
    }
}

/// Standard XACML status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    MissingAttribute,
    SyntaxError,
    ProcessingError,
}

impl StatusCode {
    pub fn urn(self) -> &'static str {
        match self {
            StatusCode::Ok => ident::STATUS_OK,
            StatusCode::MissingAttribute => ident::STATUS_MISSING_ATTRIBUTE,
            StatusCode::SyntaxError => ident::STATUS_SYNTAX_ERROR,
            StatusCode::ProcessingError => ident::STATUS_PROCESSING_ERROR,
        }
    }

    pub fn from_urn(urn: &str) -> Option<Self> {
        [
            StatusCode::Ok,
            StatusCode::MissingAttribute,
            StatusCode::SyntaxError,
            StatusCode::ProcessingError,
        ]
        .into_iter()
        .find(|code| code.urn() == urn)
    }
}

impl Serialize for StatusCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.urn())
    }
}

impl<'de> Deserialize<'de> for StatusCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let urn = String::deserialize(deserializer)?;
        StatusCode::from_urn(&urn)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown status code: {urn}")))
    }
}

/// Evaluation status attached to a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: StatusCode,
    pub message: Option<String>,
    /// Extra diagnostic text, surfaced only in debug mode.
    pub detail: Option<String>,
}

impl Status {
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: None,
            detail: None,
        }
    }
}

impl From<&IndeterminateError> for Status {
    fn from(err: &IndeterminateError) -> Self {
        Self {
            code: err.code,
            message: Some(err.message.clone()),
            detail: None,
        }
    }
}

/// One attribute assignment inside a fulfilled obligation or advice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeAssignment {
    pub attribute_id: String,
    pub category: Option<String>,
    pub issuer: Option<String>,
    pub value: AttributeValue,
}

/// An obligation the enforcement point must honor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obligation {
    pub id: String,
    pub assignments: Vec<AttributeAssignment>,
}

/// Advice the enforcement point may ignore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    pub id: String,
    pub assignments: Vec<AttributeAssignment>,
}

/// Identifier of a policy or policy set that was applicable to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyIdentifier {
    pub id: String,
    pub version: String,
    pub is_policy_set: bool,
}

/// The outcome of evaluating a policy element against one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub decision: Decision,
    pub status: Status,
    pub obligations: Vec<Obligation>,
    pub advice: Vec<Advice>,
}

impl DecisionResult {
    pub fn not_applicable() -> Self {
        Self {
            decision: Decision::NotApplicable,
            status: Status::ok(),
            obligations: Vec::new(),
            advice: Vec::new(),
        }
    }

    pub fn permit() -> Self {
        Self {
            decision: Decision::Permit,
            status: Status::ok(),
            obligations: Vec::new(),
            advice: Vec::new(),
        }
    }

    pub fn deny() -> Self {
        Self {
            decision: Decision::Deny,
            status: Status::ok(),
            obligations: Vec::new(),
            advice: Vec::new(),
        }
    }

    /// Indeterminate result carrying the first error's status.
    pub fn indeterminate(flavor: ExtendedIndeterminate, error: &IndeterminateError) -> Self {
        Self {
            decision: Decision::Indeterminate(flavor),
            status: Status::from(error),
            obligations: Vec::new(),
            advice: Vec::new(),
        }
    }
}
