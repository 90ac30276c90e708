//! deny-unless-permit and permit-unless-deny: algorithms that never
//! return NotApplicable or Indeterminate.

use pdp_api::{Decision, DecisionResult, Status};

use super::{aggregate_matching, Combinable};
use crate::context::EvaluationContext;

/// `wins` is the decision that, once seen, decides the outcome; anything
/// else collapses to its opposite.
pub(super) fn combine<C: Combinable>(
    children: &[C],
    ctx: &mut EvaluationContext<'_>,
    wins: Decision,
) -> DecisionResult {
    let results: Vec<DecisionResult> = children.iter().map(|c| c.evaluate(ctx)).collect();

    let decision = if results.iter().any(|r| r.decision == wins) {
        wins
    } else {
        match wins {
            Decision::Permit => Decision::Deny,
            _ => Decision::Permit,
        }
    };
    let (obligations, advice) = aggregate_matching(&results, decision);
    DecisionResult {
        decision,
        status: Status::ok(),
        obligations,
        advice,
    }
}
