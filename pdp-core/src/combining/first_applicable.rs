//! first-applicable: scan in document order; the first child that is not
//! NotApplicable decides.

use pdp_api::{Decision, DecisionResult};

use super::Combinable;
use crate::context::EvaluationContext;

pub(super) fn combine<C: Combinable>(
    children: &[C],
    ctx: &mut EvaluationContext<'_>,
) -> DecisionResult {
    for child in children {
        let result = child.evaluate(ctx);
        if result.decision != Decision::NotApplicable {
            return result;
        }
    }
    DecisionResult::not_applicable()
}
