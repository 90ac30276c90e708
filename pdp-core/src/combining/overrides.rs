//! deny-overrides and permit-overrides, including the ordered variants.
//!
//! The XACML 3.0 Section 7.18 truth tables, written once with the
//! overriding decision as a parameter. Children are always evaluated in
//! document order, so the ordered variants share this implementation and
//! obligation aggregation stays reproducible.

use pdp_api::{Decision, DecisionResult, ExtendedIndeterminate, Status};

use super::{aggregate_matching, Combinable};
use crate::context::EvaluationContext;

pub(super) fn combine<C: Combinable>(
    children: &[C],
    ctx: &mut EvaluationContext<'_>,
    overriding: Decision,
) -> DecisionResult {
    let results: Vec<DecisionResult> = children.iter().map(|c| c.evaluate(ctx)).collect();

    let other = match overriding {
        Decision::Deny => Decision::Permit,
        _ => Decision::Deny,
    };
    let overriding_flavor = match overriding {
        Decision::Deny => ExtendedIndeterminate::Deny,
        _ => ExtendedIndeterminate::Permit,
    };
    let other_flavor = match overriding_flavor {
        ExtendedIndeterminate::Deny => ExtendedIndeterminate::Permit,
        _ => ExtendedIndeterminate::Deny,
    };

    let any_overriding = results.iter().any(|r| r.decision == overriding);
    let any_other = results.iter().any(|r| r.decision == other);
    let any_indet_dp = results
        .iter()
        .any(|r| r.decision == Decision::Indeterminate(ExtendedIndeterminate::DenyPermit));
    let any_indet_overriding = results
        .iter()
        .any(|r| r.decision == Decision::Indeterminate(overriding_flavor));
    let any_indet_other = results
        .iter()
        .any(|r| r.decision == Decision::Indeterminate(other_flavor));

    let first_indeterminate_status = || -> Status {
        results
            .iter()
            .find(|r| r.decision.is_indeterminate())
            .map(|r| r.status.clone())
            .unwrap_or_else(Status::ok)
    };

    let decision = if any_overriding {
        overriding
    } else if any_indet_dp || (any_indet_overriding && (any_indet_other || any_other)) {
        Decision::Indeterminate(ExtendedIndeterminate::DenyPermit)
    } else if any_indet_overriding {
        Decision::Indeterminate(overriding_flavor)
    } else if any_other {
        other
    } else if any_indet_other {
        Decision::Indeterminate(other_flavor)
    } else {
        return DecisionResult::not_applicable();
    };

    match decision {
        Decision::Indeterminate(_) => DecisionResult {
            decision,
            status: first_indeterminate_status(),
            obligations: Vec::new(),
            advice: Vec::new(),
        },
        _ => {
            let (obligations, advice) = aggregate_matching(&results, decision);
            DecisionResult {
                decision,
                status: Status::ok(),
                obligations,
                advice,
            }
        }
    }
}
