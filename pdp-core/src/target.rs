//! Target matching: Match, AllOf, AnyOf, Target.
//!
//! Matching short-circuits but remembers the first Indeterminate it saw,
//! because a NO_MATCH later in a conjunction still decides the outcome
//! while a MATCH does not.

use std::sync::Arc;

use pdp_api::{AttributeValue, Datatype, IndeterminateError, PolicyBuildError};

use crate::context::EvaluationContext;
use crate::expr::{AttributeDesignator, AttributeSelector, ExprValue};
use crate::func::{Behavior, Function, ValueKind};

/// Outcome of matching a target section.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    Match,
    NoMatch,
    Indeterminate(IndeterminateError),
}

/// Where a Match draws its bag of request values from.
#[derive(Debug, Clone)]
pub enum MatchSource {
    Designator(AttributeDesignator),
    Selector(AttributeSelector),
}

impl MatchSource {
    fn datatype(&self) -> Datatype {
        match self {
            MatchSource::Designator(d) => d.datatype,
            MatchSource::Selector(s) => s.datatype,
        }
    }

    fn resolve(&self, ctx: &mut EvaluationContext<'_>) -> Result<pdp_api::Bag, IndeterminateError> {
        match self {
            MatchSource::Designator(d) => d.evaluate(ctx),
            MatchSource::Selector(s) => s.evaluate(ctx),
        }
    }
}

/// One predicate: a boolean function applied to (literal, bag element),
/// true iff some element matches.
#[derive(Debug, Clone)]
pub struct Match {
    function: Arc<Function>,
    value: AttributeValue,
    source: MatchSource,
}

impl Match {
    /// Build a Match, checking the function is a first-order boolean
    /// predicate over (literal's datatype, source's datatype).
    pub fn new(
        function: Arc<Function>,
        value: AttributeValue,
        source: MatchSource,
    ) -> Result<Self, PolicyBuildError> {
        if !matches!(function.behavior, Behavior::Eager(_))
            || function.returns != ValueKind::Single(Datatype::Boolean)
        {
            return Err(PolicyBuildError::NonBooleanSubFunction {
                function: function.id.clone(),
                actual: function.returns.to_string(),
            });
        }
        function.params.check_arity(2, &function.id)?;
        for (position, datatype) in [value.datatype(), source.datatype()].into_iter().enumerate()
        {
            let spec = function.params.spec_at(position);
            if !spec.admits(ValueKind::Single(datatype)) {
                return Err(PolicyBuildError::ArgumentType {
                    function: function.id.clone(),
                    position,
                    expected: spec.to_string(),
                    actual: ValueKind::Single(datatype).to_string(),
                });
            }
        }
        Ok(Self {
            function,
            value,
            source,
        })
    }

    /// Convenience constructor resolving the function by URN.
    pub fn with_function(
        function_id: &str,
        value: AttributeValue,
        source: MatchSource,
    ) -> Result<Self, PolicyBuildError> {
        let function = crate::func::function(function_id).ok_or_else(|| {
            PolicyBuildError::UnknownFunction {
                id: function_id.to_owned(),
            }
        })?;
        Self::new(function, value, source)
    }

    pub fn matches(&self, ctx: &mut EvaluationContext<'_>) -> MatchResult {
        let bag = match self.source.resolve(ctx) {
            Ok(bag) => bag,
            Err(e) => return MatchResult::Indeterminate(e),
        };
        let mut first_error: Option<IndeterminateError> = None;
        for element in bag.iter() {
            let call = [
                ExprValue::Single(self.value.clone()),
                ExprValue::Single(element.clone()),
            ];
            match self.function.invoke(&call).and_then(|v| v.expect_boolean()) {
                Ok(true) => return MatchResult::Match,
                Ok(false) => {}
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        match first_error {
            Some(e) => MatchResult::Indeterminate(e),
            None => MatchResult::NoMatch,
        }
    }
}

/// Conjunction of Match elements.
#[derive(Debug, Clone)]
pub struct AllOf {
    pub matches: Vec<Match>,
}

impl AllOf {
    fn matches(&self, ctx: &mut EvaluationContext<'_>) -> MatchResult {
        conjunction(self.matches.iter().map(|m| m.matches(ctx)))
    }
}

/// Disjunction of AllOf elements.
#[derive(Debug, Clone)]
pub struct AnyOf {
    pub all_of: Vec<AllOf>,
}

impl AnyOf {
    fn matches(&self, ctx: &mut EvaluationContext<'_>) -> MatchResult {
        let mut first_error: Option<IndeterminateError> = None;
        for all_of in &self.all_of {
            match all_of.matches(ctx) {
                MatchResult::Match => return MatchResult::Match,
                MatchResult::NoMatch => {}
                MatchResult::Indeterminate(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        match first_error {
            Some(e) => MatchResult::Indeterminate(e),
            None => MatchResult::NoMatch,
        }
    }
}

/// The predicate selecting which requests a policy element applies to.
/// An empty target matches every request.
#[derive(Debug, Clone, Default)]
pub struct Target {
    pub any_of: Vec<AnyOf>,
}

impl Target {
    /// The target that matches anything.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn matches(&self, ctx: &mut EvaluationContext<'_>) -> MatchResult {
        conjunction(self.any_of.iter().map(|a| a.matches(ctx)))
    }
}

/// AllOf and Target share the same conjunction scheme: NO_MATCH decides
/// immediately, the first Indeterminate is kept in case nothing decides.
fn conjunction(results: impl Iterator<Item = MatchResult>) -> MatchResult {
    let mut first_error: Option<IndeterminateError> = None;
    for result in results {
        match result {
            MatchResult::Match => {}
            MatchResult::NoMatch => return MatchResult::NoMatch,
            MatchResult::Indeterminate(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    match first_error {
        Some(e) => MatchResult::Indeterminate(e),
        None => MatchResult::Match,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdp_api::ident;
    use pdp_api::{Attribute, AttributeProvider, Attributes, Request};

    const STRING_EQUAL: &str = "urn:oasis:names:tc:xacml:1.0:function:string-equal";

    fn subject_match(expected: &str) -> Match {
        Match::with_function(
            STRING_EQUAL,
            AttributeValue::String(expected.to_owned()),
            MatchSource::Designator(AttributeDesignator::new(
                ident::CATEGORY_ACCESS_SUBJECT,
                "urn:example:subject-id",
                Datatype::String,
            )),
        )
        .unwrap()
    }

    fn must_be_present_match(expected: &str) -> Match {
        Match::with_function(
            STRING_EQUAL,
            AttributeValue::String(expected.to_owned()),
            MatchSource::Designator(
                AttributeDesignator::new(
                    ident::CATEGORY_ACCESS_SUBJECT,
                    "urn:example:absent",
                    Datatype::String,
                )
                .must_be_present(),
            ),
        )
        .unwrap()
    }

    fn request_for(subject: &str) -> Request {
        Request {
            attributes: vec![Attributes::new(ident::CATEGORY_ACCESS_SUBJECT)
                .with_attribute(Attribute::new(
                    "urn:example:subject-id",
                    vec![AttributeValue::String(subject.to_owned())],
                ))],
            return_policy_id_list: false,
        }
    }

    fn ctx_over<'a>(
        request: &'a Request,
        providers: &'a [Box<dyn AttributeProvider>],
    ) -> EvaluationContext<'a> {
        EvaluationContext::new(request, &[], false, true, providers)
    }

    #[test]
    fn empty_target_matches_anything() {
        let request = Request::default();
        let providers: Vec<Box<dyn AttributeProvider>> = Vec::new();
        let mut ctx = ctx_over(&request, &providers);
        assert_eq!(Target::any().matches(&mut ctx), MatchResult::Match);
    }

    #[test]
    fn match_is_true_when_any_bag_element_matches() {
        let request = request_for("alice");
        let providers: Vec<Box<dyn AttributeProvider>> = Vec::new();
        let mut ctx = ctx_over(&request, &providers);
        assert_eq!(subject_match("alice").matches(&mut ctx), MatchResult::Match);
        assert_eq!(subject_match("bob").matches(&mut ctx), MatchResult::NoMatch);
    }

    #[test]
    fn all_of_is_conjunction() {
        let request = request_for("alice");
        let providers: Vec<Box<dyn AttributeProvider>> = Vec::new();
        let mut ctx = ctx_over(&request, &providers);
        let both = AllOf {
            matches: vec![subject_match("alice"), subject_match("bob")],
        };
        assert_eq!(both.matches(&mut ctx), MatchResult::NoMatch);
    }

    #[test]
    fn any_of_is_disjunction() {
        let request = request_for("alice");
        let providers: Vec<Box<dyn AttributeProvider>> = Vec::new();
        let mut ctx = ctx_over(&request, &providers);
        let either = AnyOf {
            all_of: vec![
                AllOf {
                    matches: vec![subject_match("bob")],
                },
                AllOf {
                    matches: vec![subject_match("alice")],
                },
            ],
        };
        assert_eq!(either.matches(&mut ctx), MatchResult::Match);
    }

    #[test]
    fn no_match_beats_indeterminate_in_conjunction() {
        let request = request_for("alice");
        let providers: Vec<Box<dyn AttributeProvider>> = Vec::new();
        let mut ctx = ctx_over(&request, &providers);
        let target = Target {
            any_of: vec![
                AnyOf {
                    all_of: vec![AllOf {
                        matches: vec![must_be_present_match("x")],
                    }],
                },
                AnyOf {
                    all_of: vec![AllOf {
                        matches: vec![subject_match("bob")],
                    }],
                },
            ],
        };
        assert_eq!(target.matches(&mut ctx), MatchResult::NoMatch);
    }

    #[test]
    fn indeterminate_surfaces_when_nothing_decides() {
        let request = request_for("alice");
        let providers: Vec<Box<dyn AttributeProvider>> = Vec::new();
        let mut ctx = ctx_over(&request, &providers);
        let target = Target {
            any_of: vec![AnyOf {
                all_of: vec![AllOf {
                    matches: vec![must_be_present_match("x"), subject_match("alice")],
                }],
            }],
        };
        match target.matches(&mut ctx) {
            MatchResult::Indeterminate(e) => {
                assert_eq!(e.code, pdp_api::StatusCode::MissingAttribute);
            }
            other => panic!("expected Indeterminate, got {other:?}"),
        }
    }

    #[test]
    fn match_rejects_non_boolean_function() {
        let err = Match::with_function(
            "urn:oasis:names:tc:xacml:1.0:function:string-normalize-space",
            AttributeValue::String("x".into()),
            MatchSource::Designator(AttributeDesignator::new(
                ident::CATEGORY_ACCESS_SUBJECT,
                "urn:example:subject-id",
                Datatype::String,
            )),
        )
        .unwrap_err();
        assert!(matches!(err, PolicyBuildError::NonBooleanSubFunction { .. }));
    }
}
