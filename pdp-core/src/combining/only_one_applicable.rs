//! only-one-applicable: exactly one child may be applicable; it alone is
//! evaluated.

use pdp_api::{DecisionResult, ExtendedIndeterminate, IndeterminateError};

use super::Combinable;
use crate::context::EvaluationContext;

pub(super) fn combine<C: Combinable>(
    children: &[C],
    ctx: &mut EvaluationContext<'_>,
) -> DecisionResult {
    let mut selected: Option<&C> = None;

    for child in children {
        let applicable = match child.is_applicable(ctx) {
            Ok(applicable) => applicable,
            Err(e) => {
                tracing::debug!(error = %e, "applicability check failed");
                return DecisionResult::indeterminate(ExtendedIndeterminate::DenyPermit, &e);
            }
        };
        if applicable {
            if selected.is_some() {
                return DecisionResult::indeterminate(
                    ExtendedIndeterminate::DenyPermit,
                    &IndeterminateError::processing_error(
                        "Too many (more than one) applicable policies",
                    ),
                );
            }
            selected = Some(child);
        }
    }

    match selected {
        Some(child) => child.evaluate(ctx),
        None => DecisionResult::not_applicable(),
    }
}
