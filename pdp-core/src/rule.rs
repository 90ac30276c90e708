//! Rule evaluation: target, condition, effect, and the obligation and
//! advice expressions fulfilled by the rule's decision.

use pdp_api::{
    Advice, AttributeAssignment, AttributeValue, Datatype, DecisionResult, Effect,
    IndeterminateError, Obligation, PolicyBuildError,
};

use crate::combining::Combinable;
use crate::context::EvaluationContext;
use crate::expr::Expression;
use crate::func::ValueKind;
use crate::target::{MatchResult, Target};

/// A rule condition: an expression constrained to one boolean.
#[derive(Debug, Clone)]
pub struct Condition(Expression);

impl Condition {
    /// Wrap an expression, rejecting anything whose static type is not a
    /// single boolean. Expressions with unknown static type (variable
    /// references) are accepted and checked at evaluation time.
    pub fn new(expression: Expression) -> Result<Self, PolicyBuildError> {
        match expression.static_type() {
            Some(ValueKind::Single(Datatype::Boolean)) | None => Ok(Self(expression)),
            Some(other) => Err(PolicyBuildError::NotABooleanExpression {
                actual: other.to_string(),
            }),
        }
    }

    pub fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> Result<bool, IndeterminateError> {
        self.0.evaluate(ctx)?.expect_boolean()
    }

    pub fn expression(&self) -> &Expression {
        &self.0
    }
}

/// One attribute assignment inside an obligation or advice expression.
/// An expression yielding a bag fans out into one assignment per value.
#[derive(Debug, Clone)]
pub struct AttributeAssignmentExpression {
    pub attribute_id: String,
    pub category: Option<String>,
    pub issuer: Option<String>,
    pub expression: Expression,
}

impl AttributeAssignmentExpression {
    fn evaluate(
        &self,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<Vec<AttributeAssignment>, IndeterminateError> {
        let values: Vec<AttributeValue> = match self.expression.evaluate(ctx)? {
            crate::expr::ExprValue::Single(v) => vec![v],
            crate::expr::ExprValue::Bag(bag) => bag.into_values(),
        };
        Ok(values
            .into_iter()
            .map(|value| AttributeAssignment {
                attribute_id: self.attribute_id.clone(),
                category: self.category.clone(),
                issuer: self.issuer.clone(),
                value,
            })
            .collect())
    }
}

/// A declared obligation, instantiated when its fulfil-on decision is
/// reached.
#[derive(Debug, Clone)]
pub struct ObligationExpression {
    pub id: String,
    pub fulfill_on: Effect,
    pub assignments: Vec<AttributeAssignmentExpression>,
}

impl ObligationExpression {
    pub(crate) fn evaluate(
        &self,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<Obligation, IndeterminateError> {
        let mut assignments = Vec::new();
        for assignment in &self.assignments {
            assignments.extend(assignment.evaluate(ctx)?);
        }
        Ok(Obligation {
            id: self.id.clone(),
            assignments,
        })
    }
}

/// A declared advice, instantiated when its fulfil-on decision is
/// reached.
#[derive(Debug, Clone)]
pub struct AdviceExpression {
    pub id: String,
    pub fulfill_on: Effect,
    pub assignments: Vec<AttributeAssignmentExpression>,
}

impl AdviceExpression {
    pub(crate) fn evaluate(
        &self,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<Advice, IndeterminateError> {
        let mut assignments = Vec::new();
        for assignment in &self.assignments {
            assignments.extend(assignment.evaluate(ctx)?);
        }
        Ok(Advice {
            id: self.id.clone(),
            assignments,
        })
    }
}

/// Evaluate the obligation and advice expressions whose fulfil-on equals
/// the reached effect. Shared by rules and policies.
pub(crate) fn fulfill(
    obligations: &[ObligationExpression],
    advice: &[AdviceExpression],
    effect: Effect,
    ctx: &mut EvaluationContext<'_>,
) -> Result<(Vec<Obligation>, Vec<Advice>), IndeterminateError> {
    let mut fulfilled_obligations = Vec::new();
    for expression in obligations.iter().filter(|o| o.fulfill_on == effect) {
        fulfilled_obligations.push(expression.evaluate(ctx)?);
    }
    let mut fulfilled_advice = Vec::new();
    for expression in advice.iter().filter(|a| a.fulfill_on == effect) {
        fulfilled_advice.push(expression.evaluate(ctx)?);
    }
    Ok((fulfilled_obligations, fulfilled_advice))
}

/// A single rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub effect: Effect,
    pub description: Option<String>,
    pub target: Target,
    pub condition: Option<Condition>,
    pub obligations: Vec<ObligationExpression>,
    pub advice: Vec<AdviceExpression>,
}

impl Rule {
    pub fn new(id: impl Into<String>, effect: Effect) -> Self {
        Self {
            id: id.into(),
            effect,
            description: None,
            target: Target::any(),
            condition: None,
            obligations: Vec::new(),
            advice: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_obligation(mut self, obligation: ObligationExpression) -> Self {
        self.obligations.push(obligation);
        self
    }

    pub fn with_advice(mut self, advice: AdviceExpression) -> Self {
        self.advice.push(advice);
        self
    }

    /// Rule evaluation per the XACML rule truth table: target, then
    /// condition, then fulfilment; any failure lifts to the Indeterminate
    /// flavoured with this rule's effect.
    fn evaluate_inner(&self, ctx: &mut EvaluationContext<'_>) -> DecisionResult {
        match self.target.matches(ctx) {
            MatchResult::NoMatch => return DecisionResult::not_applicable(),
            MatchResult::Indeterminate(e) => {
                return DecisionResult::indeterminate(self.effect.indeterminate_flavor(), &e)
            }
            MatchResult::Match => {}
        }

        match &self.condition {
            None => {}
            Some(condition) => match condition.evaluate(ctx) {
                Ok(true) => {}
                Ok(false) => return DecisionResult::not_applicable(),
                Err(e) => {
                    return DecisionResult::indeterminate(self.effect.indeterminate_flavor(), &e)
                }
            },
        }

        match fulfill(&self.obligations, &self.advice, self.effect, ctx) {
            Ok((obligations, advice)) => {
                let mut result = match self.effect {
                    Effect::Permit => DecisionResult::permit(),
                    Effect::Deny => DecisionResult::deny(),
                };
                result.obligations = obligations;
                result.advice = advice;
                result
            }
            Err(e) => DecisionResult::indeterminate(self.effect.indeterminate_flavor(), &e),
        }
    }
}

impl Combinable for Rule {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> DecisionResult {
        let result = self.evaluate_inner(ctx);
        tracing::debug!(rule = %self.id, decision = %result.decision, "rule evaluated");
        result
    }

    fn is_applicable(&self, ctx: &mut EvaluationContext<'_>) -> Result<bool, IndeterminateError> {
        match self.target.matches(ctx) {
            MatchResult::Match => Ok(true),
            MatchResult::NoMatch => Ok(false),
            MatchResult::Indeterminate(e) => Err(e),
        }
    }
}
