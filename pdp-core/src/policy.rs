//! Policies, policy sets, references, and the policy provider contract.

use std::collections::HashMap;
use std::sync::Arc;

use pdp_api::{
    Decision, DecisionResult, Effect, ExtendedIndeterminate, IndeterminateError,
    PolicyBuildError, PolicyIdentifier, PolicyVersion, Request, VersionConstraints,
};

pub use pdp_api::provider::PolicyRefType;

use crate::combining::{Combinable, CombiningAlg};
use crate::context::EvaluationContext;
use crate::expr::Expression;
use crate::rule::{fulfill, AdviceExpression, ObligationExpression, Rule};
use crate::target::{MatchResult, Target};

/// A named expression; within one policy every reference to it shares a
/// single evaluation.
#[derive(Debug, Clone)]
pub struct VariableDefinition {
    pub id: String,
    pub expression: Expression,
}

/// A policy: a target, variables, and rules reduced by a rule-combining
/// algorithm.
#[derive(Debug, Clone)]
pub struct Policy {
    pub id: String,
    pub version: PolicyVersion,
    pub description: Option<String>,
    pub target: Target,
    pub combining_alg: CombiningAlg,
    pub variables: Vec<VariableDefinition>,
    pub rules: Vec<Rule>,
    pub obligations: Vec<ObligationExpression>,
    pub advice: Vec<AdviceExpression>,
    /// Administrative delegation depth bound; carried for completeness,
    /// delegation itself is out of scope.
    pub max_delegation_depth: Option<u32>,
}

impl Policy {
    /// Build a policy, rejecting rule-incapable combining algorithms and
    /// duplicate or dangling variable definitions.
    pub fn new(
        id: impl Into<String>,
        version: &str,
        combining_alg: CombiningAlg,
        target: Target,
        variables: Vec<VariableDefinition>,
        rules: Vec<Rule>,
    ) -> Result<Self, PolicyBuildError> {
        let id = id.into();
        if combining_alg == CombiningAlg::OnlyOneApplicable {
            return Err(PolicyBuildError::NotARuleCombiningAlgorithm {
                id: CombiningAlg::OnlyOneApplicable.policy_uri().to_owned(),
            });
        }
        let version = PolicyVersion::parse(version)?;

        let mut seen = Vec::new();
        for variable in &variables {
            if seen.contains(&&variable.id) {
                return Err(PolicyBuildError::DuplicateVariable {
                    id: variable.id.clone(),
                });
            }
            seen.push(&variable.id);
        }
        check_variable_references(&variables, &rules)?;

        Ok(Self {
            id,
            version,
            description: None,
            target,
            combining_alg,
            variables,
            rules,
            obligations: Vec::new(),
            advice: Vec::new(),
            max_delegation_depth: None,
        })
    }

    pub fn with_obligation(mut self, obligation: ObligationExpression) -> Self {
        self.obligations.push(obligation);
        self
    }

    pub fn with_advice(mut self, advice: AdviceExpression) -> Self {
        self.advice.push(advice);
        self
    }

    pub fn identifier(&self) -> PolicyIdentifier {
        PolicyIdentifier {
            id: self.id.clone(),
            version: self.version.to_string(),
            is_policy_set: false,
        }
    }

    pub fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> DecisionResult {
        match self.target.matches(ctx) {
            MatchResult::NoMatch => return DecisionResult::not_applicable(),
            MatchResult::Indeterminate(e) => {
                return DecisionResult::indeterminate(ExtendedIndeterminate::DenyPermit, &e)
            }
            MatchResult::Match => {}
        }

        ctx.push_variable_scope(&self.variables);
        let combined = self.combining_alg.combine(&self.rules, ctx);
        let result = finalize(
            combined,
            &self.obligations,
            &self.advice,
            self.identifier(),
            ctx,
        );
        ctx.pop_variable_scope();
        tracing::debug!(policy = %self.id, decision = %result.decision, "policy evaluated");
        result
    }

    fn check_applicable(
        &self,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<bool, IndeterminateError> {
        match self.target.matches(ctx) {
            MatchResult::Match => Ok(true),
            MatchResult::NoMatch => Ok(false),
            MatchResult::Indeterminate(e) => Err(e),
        }
    }
}

/// A policy set: child policies, policy sets, and references reduced by a
/// policy-combining algorithm.
#[derive(Debug, Clone)]
pub struct PolicySet {
    pub id: String,
    pub version: PolicyVersion,
    pub description: Option<String>,
    pub target: Target,
    pub combining_alg: CombiningAlg,
    pub children: Vec<PolicyChild>,
    pub obligations: Vec<ObligationExpression>,
    pub advice: Vec<AdviceExpression>,
}

impl PolicySet {
    pub fn new(
        id: impl Into<String>,
        version: &str,
        combining_alg: CombiningAlg,
        target: Target,
        children: Vec<PolicyChild>,
    ) -> Result<Self, PolicyBuildError> {
        Ok(Self {
            id: id.into(),
            version: PolicyVersion::parse(version)?,
            description: None,
            target,
            combining_alg,
            children,
            obligations: Vec::new(),
            advice: Vec::new(),
        })
    }

    pub fn with_obligation(mut self, obligation: ObligationExpression) -> Self {
        self.obligations.push(obligation);
        self
    }

    pub fn identifier(&self) -> PolicyIdentifier {
        PolicyIdentifier {
            id: self.id.clone(),
            version: self.version.to_string(),
            is_policy_set: true,
        }
    }

    pub fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> DecisionResult {
        match self.target.matches(ctx) {
            MatchResult::NoMatch => return DecisionResult::not_applicable(),
            MatchResult::Indeterminate(e) => {
                return DecisionResult::indeterminate(ExtendedIndeterminate::DenyPermit, &e)
            }
            MatchResult::Match => {}
        }

        let combined = self.combining_alg.combine(&self.children, ctx);
        let result = finalize(
            combined,
            &self.obligations,
            &self.advice,
            self.identifier(),
            ctx,
        );
        tracing::debug!(policy_set = %self.id, decision = %result.decision, "policy set evaluated");
        result
    }

    fn check_applicable(
        &self,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<bool, IndeterminateError> {
        match self.target.matches(ctx) {
            MatchResult::Match => Ok(true),
            MatchResult::NoMatch => Ok(false),
            MatchResult::Indeterminate(e) => Err(e),
        }
    }
}

/// Apply the combining element's own obligations and advice on top of the
/// combined child result, and record applicability.
fn finalize(
    mut result: DecisionResult,
    obligations: &[ObligationExpression],
    advice: &[AdviceExpression],
    identifier: PolicyIdentifier,
    ctx: &mut EvaluationContext<'_>,
) -> DecisionResult {
    let effect = match result.decision {
        Decision::Permit => Effect::Permit,
        Decision::Deny => Effect::Deny,
        _ => return result,
    };
    match fulfill(obligations, advice, effect, ctx) {
        Ok((mut own_obligations, mut own_advice)) => {
            // The combining element's own obligations come first.
            own_obligations.extend(std::mem::take(&mut result.obligations));
            own_advice.extend(std::mem::take(&mut result.advice));
            result.obligations = own_obligations;
            result.advice = own_advice;
            ctx.note_applicable_policy(identifier);
            result
        }
        Err(e) => DecisionResult::indeterminate(effect.indeterminate_flavor(), &e),
    }
}

/// A reference to a policy or policy set resolved through the provider.
#[derive(Debug, Clone)]
pub struct PolicyRef {
    pub id: String,
    pub ref_type: PolicyRefType,
    pub constraints: VersionConstraints,
}

impl PolicyRef {
    pub fn policy(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ref_type: PolicyRefType::Policy,
            constraints: VersionConstraints::any(),
        }
    }

    pub fn policy_set(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ref_type: PolicyRefType::PolicySet,
            constraints: VersionConstraints::any(),
        }
    }

    pub fn with_constraints(mut self, constraints: VersionConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    fn resolve(
        &self,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<ResolvedPolicy, IndeterminateError> {
        let provider = ctx.policy_provider().ok_or_else(|| {
            IndeterminateError::processing_error(format!(
                "No policy provider to resolve reference {}",
                self.id
            ))
        })?;
        let resolved = provider
            .find_by_reference(&self.id, &self.constraints, self.ref_type)?
            .ok_or_else(|| {
                IndeterminateError::processing_error(format!(
                    "Unresolvable policy reference {}",
                    self.id
                ))
            })?;

        // Verify the provider honored the reference.
        let (version, matches_type) = match &resolved {
            ResolvedPolicy::Policy(p) => (&p.version, self.ref_type == PolicyRefType::Policy),
            ResolvedPolicy::PolicySet(p) => {
                (&p.version, self.ref_type == PolicyRefType::PolicySet)
            }
        };
        if !matches_type {
            return Err(IndeterminateError::processing_error(format!(
                "Reference {} resolved to the wrong policy element kind",
                self.id
            )));
        }
        if !self.constraints.matches(version) {
            return Err(IndeterminateError::processing_error(format!(
                "Resolved version {version} of {} violates the reference constraints",
                self.id
            )));
        }
        Ok(resolved)
    }
}

/// A child of a policy set.
#[derive(Debug, Clone)]
pub enum PolicyChild {
    Policy(Arc<Policy>),
    PolicySet(Arc<PolicySet>),
    Reference(PolicyRef),
}

impl Combinable for PolicyChild {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> DecisionResult {
        match self {
            PolicyChild::Policy(policy) => policy.evaluate(ctx),
            PolicyChild::PolicySet(policy_set) => policy_set.evaluate(ctx),
            PolicyChild::Reference(reference) => {
                let outcome = with_reference(reference, ctx, |resolved, ctx| match resolved {
                    ResolvedPolicy::Policy(p) => Ok(p.evaluate(ctx)),
                    ResolvedPolicy::PolicySet(p) => Ok(p.evaluate(ctx)),
                });
                match outcome {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::warn!(reference = %reference.id, error = %e, "reference evaluation failed");
                        DecisionResult::indeterminate(ExtendedIndeterminate::DenyPermit, &e)
                    }
                }
            }
        }
    }

    fn is_applicable(&self, ctx: &mut EvaluationContext<'_>) -> Result<bool, IndeterminateError> {
        match self {
            PolicyChild::Policy(policy) => policy.check_applicable(ctx),
            PolicyChild::PolicySet(policy_set) => policy_set.check_applicable(ctx),
            PolicyChild::Reference(reference) => {
                with_reference(reference, ctx, |resolved, ctx| match resolved {
                    ResolvedPolicy::Policy(p) => p.check_applicable(ctx),
                    ResolvedPolicy::PolicySet(p) => p.check_applicable(ctx),
                })
            }
        }
    }
}

/// Resolve a reference with cycle protection around the body.
fn with_reference<T>(
    reference: &PolicyRef,
    ctx: &mut EvaluationContext<'_>,
    body: impl FnOnce(&ResolvedPolicy, &mut EvaluationContext<'_>) -> Result<T, IndeterminateError>,
) -> Result<T, IndeterminateError> {
    ctx.enter_reference(&reference.id)?;
    let result = reference
        .resolve(ctx)
        .and_then(|resolved| body(&resolved, ctx));
    ctx.exit_reference();
    result
}

/// A policy or policy set handed back by a provider.
#[derive(Debug, Clone)]
pub enum ResolvedPolicy {
    Policy(Arc<Policy>),
    PolicySet(Arc<PolicySet>),
}

/// The abstract `pdp-api` provider contract bound to this crate's policy
/// tree. Implement the `pdp_api` trait with `Resolved = ResolvedPolicy`
/// and this one comes for free.
pub trait PolicyProvider: pdp_api::PolicyProvider<Resolved = ResolvedPolicy> {}

impl<T> PolicyProvider for T where
    T: pdp_api::PolicyProvider<Resolved = ResolvedPolicy> + ?Sized
{
}

/// In-memory provider: one root plus a by-id table for references. The
/// highest version satisfying the constraints wins.
#[derive(Default)]
pub struct StaticPolicyProvider {
    root: Option<ResolvedPolicy>,
    by_id: HashMap<String, Vec<ResolvedPolicy>>,
}

impl StaticPolicyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, root: ResolvedPolicy) -> Self {
        self.root = Some(root);
        self
    }

    pub fn with_policy(mut self, policy: Arc<Policy>) -> Self {
        self.by_id
            .entry(policy.id.clone())
            .or_default()
            .push(ResolvedPolicy::Policy(policy));
        self
    }

    pub fn with_policy_set(mut self, policy_set: Arc<PolicySet>) -> Self {
        self.by_id
            .entry(policy_set.id.clone())
            .or_default()
            .push(ResolvedPolicy::PolicySet(policy_set));
        self
    }
}

impl pdp_api::PolicyProvider for StaticPolicyProvider {
    type Resolved = ResolvedPolicy;

    fn find_by_target(
        &self,
        _request: &Request,
    ) -> Result<Option<ResolvedPolicy>, IndeterminateError> {
        Ok(self.root.clone())
    }

    fn find_by_reference(
        &self,
        id: &str,
        constraints: &VersionConstraints,
        ref_type: PolicyRefType,
    ) -> Result<Option<ResolvedPolicy>, IndeterminateError> {
        let candidates = match self.by_id.get(id) {
            Some(candidates) => candidates,
            None => return Ok(None),
        };
        let best = candidates
            .iter()
            .filter(|candidate| match (candidate, ref_type) {
                (ResolvedPolicy::Policy(_), PolicyRefType::Policy) => true,
                (ResolvedPolicy::PolicySet(_), PolicyRefType::PolicySet) => true,
                _ => false,
            })
            .filter(|candidate| {
                let version = match candidate {
                    ResolvedPolicy::Policy(p) => &p.version,
                    ResolvedPolicy::PolicySet(p) => &p.version,
                };
                constraints.matches(version)
            })
            .max_by(|a, b| {
                let va = match a {
                    ResolvedPolicy::Policy(p) => &p.version,
                    ResolvedPolicy::PolicySet(p) => &p.version,
                };
                let vb = match b {
                    ResolvedPolicy::Policy(p) => &p.version,
                    ResolvedPolicy::PolicySet(p) => &p.version,
                };
                va.cmp(vb)
            });
        Ok(best.cloned())
    }
}

/// Reject references to variables no definition provides.
fn check_variable_references(
    variables: &[VariableDefinition],
    rules: &[Rule],
) -> Result<(), PolicyBuildError> {
    let mut referenced = Vec::new();
    for variable in variables {
        collect_variables(&variable.expression, &mut referenced);
    }
    for rule in rules {
        if let Some(condition) = &rule.condition {
            collect_variables(condition.expression(), &mut referenced);
        }
        for obligation in &rule.obligations {
            for assignment in &obligation.assignments {
                collect_variables(&assignment.expression, &mut referenced);
            }
        }
        for advice in &rule.advice {
            for assignment in &advice.assignments {
                collect_variables(&assignment.expression, &mut referenced);
            }
        }
    }
    for id in referenced {
        if !variables.iter().any(|v| v.id == id) {
            return Err(PolicyBuildError::UndefinedVariable { id });
        }
    }
    Ok(())
}

fn collect_variables(expression: &Expression, out: &mut Vec<String>) {
    match expression {
        Expression::VariableReference(id) => {
            if !out.contains(id) {
                out.push(id.clone());
            }
        }
        Expression::Apply(apply) => {
            for arg in apply.args() {
                collect_variables(arg, out);
            }
        }
        _ => {}
    }
}
