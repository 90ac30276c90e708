#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, future_incompatible)]
//! The XACML 3.0 policy decision engine.
//!
//! Evaluates a tree of policies and policy sets against an individual
//! decision request and produces Permit, Deny, NotApplicable or
//! Indeterminate, together with the obligations and advice the policies
//! attach to that decision.
//!
//! The policy tree, the function registry, and the combining-algorithm
//! registry are immutable once built and can be shared freely across
//! threads; all per-request state lives in an [`context::EvaluationContext`]
//! that exists only for the duration of one decision.

pub mod combining;
pub mod context;
pub mod expr;
pub mod func;
pub mod pdp;
pub mod policy;
pub mod rule;
pub mod target;

pub use combining::{Combinable, CombiningAlg};
pub use context::EvaluationContext;
pub use expr::{Apply, AttributeDesignator, AttributeSelector, Expression, ExprValue};
pub use pdp::{Pdp, PdpBuilder};
pub use policy::{
    Policy, PolicyChild, PolicyProvider, PolicyRef, PolicyRefType, PolicySet, ResolvedPolicy,
    StaticPolicyProvider, VariableDefinition,
};
pub use rule::{
    AdviceExpression, AttributeAssignmentExpression, Condition, ObligationExpression, Rule,
};
pub use target::{AllOf, AnyOf, Match, MatchResult, MatchSource, Target};
