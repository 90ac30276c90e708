//! Error types shared by the engine crates.
//!
//! Two channels are kept strictly apart: [`PolicyBuildError`] reports static
//! defects detected while assembling a policy tree, before any request is
//! seen; [`IndeterminateError`] is the runtime Indeterminate channel of
//! XACML, carried as an explicit `Result` error through every evaluator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decision::StatusCode;

/// Runtime evaluation failure, surfaced as an XACML Indeterminate.
///
/// Carries the standard status code URN plus a human-readable message.
/// The first error observed on an evaluation path wins; later causes on
/// the same path are discarded.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct IndeterminateError {
    /// Standard XACML status code.
    pub code: StatusCode,
    /// Diagnostic message for the status element.
    pub message: String,
}

impl IndeterminateError {
    /// A value could not be parsed into its declared datatype.
    pub fn syntax_error(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::SyntaxError,
            message: message.into(),
        }
    }

    /// A mustBePresent designator or selector resolved to an empty bag.
    pub fn missing_attribute(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::MissingAttribute,
            message: message.into(),
        }
    }

    /// Any other evaluation failure (arity, division by zero, ...).
    pub fn processing_error(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::ProcessingError,
            message: message.into(),
        }
    }
}

/// Static policy construction failure.
///
/// Raised while building expressions, rules, and policies; a policy tree
/// that constructs successfully never fails these checks again at
/// evaluation time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyBuildError {
    #[error("Unknown function: {id}")]
    UnknownFunction { id: String },

    #[error("Unknown combining algorithm: {id}")]
    UnknownCombiningAlgorithm { id: String },

    #[error("Combining algorithm {id} cannot combine rules")]
    NotARuleCombiningAlgorithm { id: String },

    #[error("Unknown datatype: {uri}")]
    UnknownDatatype { uri: String },

    #[error("Function {function} expects {expected} arguments, got {actual}")]
    ArityMismatch {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("Function {function}, argument {position}: expected {expected}, got {actual}")]
    ArgumentType {
        function: String,
        position: usize,
        expected: String,
        actual: String,
    },

    #[error("Expression must evaluate to a single boolean, got {actual}")]
    NotABooleanExpression { actual: String },

    #[error("Invalid version pattern: {pattern}")]
    InvalidVersionPattern { pattern: String },

    #[error("Invalid policy version: {version}")]
    InvalidVersion { version: String },

    #[error("Duplicate variable definition: {id}")]
    DuplicateVariable { id: String },

    #[error("Reference to undefined variable: {id}")]
    UndefinedVariable { id: String },

    #[error("Higher-order function {function} requires a boolean sub-function, got {actual}")]
    NonBooleanSubFunction { function: String, actual: String },

    #[error("Invalid value for datatype {datatype}: {reason}")]
    InvalidValue { datatype: String, reason: String },

    #[error("No root policy or policy provider configured")]
    NoRootPolicy,
}
