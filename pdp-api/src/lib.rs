#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, future_incompatible)]
//! Data model and extension contracts for the XACML 3.0 policy decision
//! engine.
//!
//! This crate defines the typed attribute values and bags, the decision and
//! status model, the parsed request/response data model, and the provider
//! traits through which deployments plug in external attribute sources.
//! It contains no evaluation logic; the engine lives in `pdp-core`.

pub mod bag;
pub mod datatype;
pub mod decision;
pub mod error;
pub mod ident;
pub mod provider;
pub mod request;
pub mod value;
pub mod version;

pub use bag::Bag;
pub use datatype::Datatype;
pub use decision::{
    Advice, AttributeAssignment, Decision, DecisionResult, Effect, ExtendedIndeterminate,
    Obligation, PolicyIdentifier, Status, StatusCode,
};
pub use error::{IndeterminateError, PolicyBuildError};
pub use provider::{AttributeProvider, PolicyProvider, PolicyRefType};
pub use request::{Attribute, AttributeId, Attributes, IndividualResult, Request, Response};
pub use value::AttributeValue;
pub use version::{PolicyVersion, VersionConstraints, VersionPattern};
