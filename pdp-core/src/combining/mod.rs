//! Combining algorithms: reduce child decisions into one parent decision.
//!
//! An algorithm is a pure reduction over lazily evaluable children. The
//! eight standard algorithms are variants of one enum; registries map the
//! standard URNs onto them, with rule-combining and policy-combining
//! namespaces kept apart because `only-one-applicable` exists only for
//! policies.

use pdp_api::{Advice, Decision, DecisionResult, IndeterminateError, Obligation, PolicyBuildError};

use crate::context::EvaluationContext;

mod default_decision;
mod first_applicable;
mod only_one_applicable;
mod overrides;

/// Something a combining algorithm can reduce: rules inside a policy, or
/// policies/policy sets/references inside a policy set.
pub trait Combinable {
    /// Full evaluation to a decision with obligations.
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> DecisionResult;

    /// Applicability only (target match), used by only-one-applicable.
    fn is_applicable(&self, ctx: &mut EvaluationContext<'_>) -> Result<bool, IndeterminateError>;
}

/// The standard combining algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombiningAlg {
    DenyOverrides,
    OrderedDenyOverrides,
    PermitOverrides,
    OrderedPermitOverrides,
    FirstApplicable,
    OnlyOneApplicable,
    DenyUnlessPermit,
    PermitUnlessDeny,
}

const RULE_PREFIX_1_0: &str = "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:";
const RULE_PREFIX_3_0: &str = "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:";
const POLICY_PREFIX_1_0: &str = "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:";
const POLICY_PREFIX_3_0: &str = "urn:oasis:names:tc:xacml:3.0:policy-combining-algorithm:";

/// Every algorithm, for registry-style iteration in tests and tooling.
pub const ALL_ALGORITHMS: [CombiningAlg; 8] = [
    CombiningAlg::DenyOverrides,
    CombiningAlg::OrderedDenyOverrides,
    CombiningAlg::PermitOverrides,
    CombiningAlg::OrderedPermitOverrides,
    CombiningAlg::FirstApplicable,
    CombiningAlg::OnlyOneApplicable,
    CombiningAlg::DenyUnlessPermit,
    CombiningAlg::PermitUnlessDeny,
];

impl CombiningAlg {
    fn suffix(self) -> &'static str {
        match self {
            CombiningAlg::DenyOverrides => "deny-overrides",
            CombiningAlg::OrderedDenyOverrides => "ordered-deny-overrides",
            CombiningAlg::PermitOverrides => "permit-overrides",
            CombiningAlg::OrderedPermitOverrides => "ordered-permit-overrides",
            CombiningAlg::FirstApplicable => "first-applicable",
            CombiningAlg::OnlyOneApplicable => "only-one-applicable",
            CombiningAlg::DenyUnlessPermit => "deny-unless-permit",
            CombiningAlg::PermitUnlessDeny => "permit-unless-deny",
        }
    }

    /// The URN identifying this algorithm as a rule-combining algorithm;
    /// `None` for only-one-applicable, which cannot combine rules.
    pub fn rule_uri(self) -> Option<&'static str> {
        Some(match self {
            CombiningAlg::DenyOverrides => {
                "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:deny-overrides"
            }
            CombiningAlg::OrderedDenyOverrides => {
                "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:ordered-deny-overrides"
            }
            CombiningAlg::PermitOverrides => {
                "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:permit-overrides"
            }
            CombiningAlg::OrderedPermitOverrides => {
                "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:ordered-permit-overrides"
            }
            CombiningAlg::FirstApplicable => {
                "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:first-applicable"
            }
            CombiningAlg::OnlyOneApplicable => return None,
            CombiningAlg::DenyUnlessPermit => {
                "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:deny-unless-permit"
            }
            CombiningAlg::PermitUnlessDeny => {
                "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:permit-unless-deny"
            }
        })
    }

    /// The URN identifying this algorithm as a policy-combining
    /// algorithm.
    pub fn policy_uri(self) -> &'static str {
        match self {
            CombiningAlg::DenyOverrides => {
                "urn:oasis:names:tc:xacml:3.0:policy-combining-algorithm:deny-overrides"
            }
            CombiningAlg::OrderedDenyOverrides => {
                "urn:oasis:names:tc:xacml:3.0:policy-combining-algorithm:ordered-deny-overrides"
            }
            CombiningAlg::PermitOverrides => {
                "urn:oasis:names:tc:xacml:3.0:policy-combining-algorithm:permit-overrides"
            }
            CombiningAlg::OrderedPermitOverrides => {
                "urn:oasis:names:tc:xacml:3.0:policy-combining-algorithm:ordered-permit-overrides"
            }
            CombiningAlg::FirstApplicable => {
                "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:first-applicable"
            }
            CombiningAlg::OnlyOneApplicable => {
                "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:only-one-applicable"
            }
            CombiningAlg::DenyUnlessPermit => {
                "urn:oasis:names:tc:xacml:3.0:policy-combining-algorithm:deny-unless-permit"
            }
            CombiningAlg::PermitUnlessDeny => {
                "urn:oasis:names:tc:xacml:3.0:policy-combining-algorithm:permit-unless-deny"
            }
        }
    }

    /// Resolve a rule-combining algorithm URN.
    pub fn rule_from_uri(uri: &str) -> Result<Self, PolicyBuildError> {
        let suffix = uri
            .strip_prefix(RULE_PREFIX_3_0)
            .or_else(|| uri.strip_prefix(RULE_PREFIX_1_0));
        match suffix.and_then(Self::from_suffix) {
            Some(CombiningAlg::OnlyOneApplicable) => {
                Err(PolicyBuildError::NotARuleCombiningAlgorithm {
                    id: uri.to_owned(),
                })
            }
            None => Err(PolicyBuildError::UnknownCombiningAlgorithm {
                id: uri.to_owned(),
            }),
            Some(alg) => Ok(alg),
        }
    }

    /// Resolve a policy-combining algorithm URN.
    pub fn policy_from_uri(uri: &str) -> Result<Self, PolicyBuildError> {
        let suffix = uri
            .strip_prefix(POLICY_PREFIX_3_0)
            .or_else(|| uri.strip_prefix(POLICY_PREFIX_1_0));
        suffix
            .and_then(Self::from_suffix)
            .ok_or_else(|| PolicyBuildError::UnknownCombiningAlgorithm {
                id: uri.to_owned(),
            })
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        Some(match suffix {
            "deny-overrides" => CombiningAlg::DenyOverrides,
            "ordered-deny-overrides" => CombiningAlg::OrderedDenyOverrides,
            "permit-overrides" => CombiningAlg::PermitOverrides,
            "ordered-permit-overrides" => CombiningAlg::OrderedPermitOverrides,
            "first-applicable" => CombiningAlg::FirstApplicable,
            "only-one-applicable" => CombiningAlg::OnlyOneApplicable,
            "deny-unless-permit" => CombiningAlg::DenyUnlessPermit,
            "permit-unless-deny" => CombiningAlg::PermitUnlessDeny,
            _ => return None,
        })
    }

    /// Reduce the children. Document order is honored by every algorithm
    /// here, ordered or not, so obligation aggregation is reproducible.
    pub fn combine<C: Combinable>(
        self,
        children: &[C],
        ctx: &mut EvaluationContext<'_>,
    ) -> DecisionResult {
        let result = match self {
            CombiningAlg::DenyOverrides | CombiningAlg::OrderedDenyOverrides => {
                overrides::combine(children, ctx, Decision::Deny)
            }
            CombiningAlg::PermitOverrides | CombiningAlg::OrderedPermitOverrides => {
                overrides::combine(children, ctx, Decision::Permit)
            }
            CombiningAlg::FirstApplicable => first_applicable::combine(children, ctx),
            CombiningAlg::OnlyOneApplicable => only_one_applicable::combine(children, ctx),
            CombiningAlg::DenyUnlessPermit => {
                default_decision::combine(children, ctx, Decision::Permit)
            }
            CombiningAlg::PermitUnlessDeny => {
                default_decision::combine(children, ctx, Decision::Deny)
            }
        };
        tracing::debug!(algorithm = self.suffix(), decision = %result.decision, "combined");
        result
    }
}

/// Concatenate obligations and advice of every evaluated child whose
/// decision equals the final one, in evaluation order.
pub(crate) fn aggregate_matching(
    results: &[DecisionResult],
    decision: Decision,
) -> (Vec<Obligation>, Vec<Advice>) {
    let mut obligations = Vec::new();
    let mut advice = Vec::new();
    for result in results.iter().filter(|r| r.decision == decision) {
        obligations.extend(result.obligations.iter().cloned());
        advice.extend(result.advice.iter().cloned());
    }
    (obligations, advice)
}
