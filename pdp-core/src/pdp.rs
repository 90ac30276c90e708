//! The policy decision point: the engine's entry point.
//!
//! A `Pdp` owns the immutable pieces of a decision session: the policy
//! provider, the attribute provider chain, the standing PDP-issued
//! attribute groups, and the evaluation flags. One `Pdp` serves any
//! number of concurrent requests; each `evaluate` call builds its own
//! context and discards it with the response.

use std::sync::Arc;

use pdp_api::ident;
use pdp_api::{
    Attribute, AttributeProvider, Attributes, Decision, DecisionResult, ExtendedIndeterminate,
    IndeterminateError, IndividualResult, PolicyBuildError, Request, Response, Status,
};

use crate::context::EvaluationContext;
use crate::policy::{Policy, PolicyProvider, PolicySet, ResolvedPolicy, StaticPolicyProvider};

/// The policy decision point.
pub struct Pdp {
    policy_provider: Arc<dyn PolicyProvider>,
    attribute_providers: Vec<Box<dyn AttributeProvider>>,
    pdp_issued: Vec<Attributes>,
    pdp_env_overrides_request: bool,
    cache_env_values: bool,
    return_used_attributes: bool,
}

impl std::fmt::Debug for Pdp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pdp")
            .field("pdp_issued", &self.pdp_issued)
            .field("pdp_env_overrides_request", &self.pdp_env_overrides_request)
            .field("cache_env_values", &self.cache_env_values)
            .field("return_used_attributes", &self.return_used_attributes)
            .finish_non_exhaustive()
    }
}

impl Pdp {
    pub fn builder() -> PdpBuilder {
        PdpBuilder::default()
    }

    /// Evaluate one individual decision request.
    pub fn evaluate(&self, request: &Request) -> Response {
        let result = self.evaluate_individual(request);
        tracing::info!(
            decision = %result.decision,
            status = result.status.code.urn(),
            "authorization decision made"
        );
        Response {
            results: vec![result],
        }
    }

    fn evaluate_individual(&self, request: &Request) -> IndividualResult {
        let mut ctx = EvaluationContext::new(
            request,
            &self.pdp_issued,
            self.pdp_env_overrides_request,
            self.cache_env_values,
            &self.attribute_providers,
        )
        .with_policy_provider(self.policy_provider.as_ref());

        let decision = match self.check_resource_scope(request) {
            Err(e) => DecisionResult::indeterminate(ExtendedIndeterminate::DenyPermit, &e),
            Ok(()) => match self.policy_provider.find_by_target(request) {
                Err(e) => DecisionResult::indeterminate(ExtendedIndeterminate::DenyPermit, &e),
                Ok(None) => DecisionResult::not_applicable(),
                Ok(Some(ResolvedPolicy::Policy(policy))) => policy.evaluate(&mut ctx),
                Ok(Some(ResolvedPolicy::PolicySet(policy_set))) => {
                    policy_set.evaluate(&mut ctx)
                }
            },
        };

        self.assemble(request, decision, &ctx)
    }

    /// Scopes other than Immediate require multi-resource expansion,
    /// which happens above this engine.
    fn check_resource_scope(&self, request: &Request) -> Result<(), IndeterminateError> {
        match request.resource_scope() {
            None | Some(ident::RESOURCE_SCOPE_IMMEDIATE) => Ok(()),
            Some(scope) => Err(IndeterminateError::processing_error(format!(
                "Unsupported resource scope '{scope}': expand multi-resource requests before evaluation"
            ))),
        }
    }

    fn assemble(
        &self,
        request: &Request,
        decision: DecisionResult,
        ctx: &EvaluationContext<'_>,
    ) -> IndividualResult {
        // Statuses accompany failures; a definite decision reports ok
        // even when some discarded branch failed along the way.
        let status = match decision.decision {
            Decision::Indeterminate(_) => decision.status,
            _ => Status::ok(),
        };

        let policy_id_list = if request.return_policy_id_list {
            ctx.applicable_policies().to_vec()
        } else {
            Vec::new()
        };

        let used_attributes = if self.return_used_attributes {
            ctx.used_attributes().to_vec()
        } else {
            Vec::new()
        };

        IndividualResult {
            decision: decision.decision,
            status,
            obligations: decision.obligations,
            advice: decision.advice,
            policy_id_list,
            attributes: echoed_attributes(request),
            used_attributes,
        }
    }
}

/// Attribute groups reduced to the attributes flagged include-in-result.
fn echoed_attributes(request: &Request) -> Vec<Attributes> {
    request
        .attributes
        .iter()
        .filter_map(|group| {
            let echoed: Vec<Attribute> = group
                .attributes
                .iter()
                .filter(|a| a.include_in_result)
                .cloned()
                .collect();
            if echoed.is_empty() {
                return None;
            }
            Some(Attributes {
                category: group.category.clone(),
                attributes: echoed,
                content: None,
            })
        })
        .collect()
}

/// Builder assembling a decision session.
#[derive(Default)]
pub struct PdpBuilder {
    policy_provider: Option<Arc<dyn PolicyProvider>>,
    root: Option<ResolvedPolicy>,
    attribute_providers: Vec<Box<dyn AttributeProvider>>,
    pdp_issued: Vec<Attributes>,
    pdp_env_overrides_request: bool,
    disable_env_cache: bool,
    return_used_attributes: bool,
}

impl PdpBuilder {
    /// Use an external policy provider for the root and for references.
    pub fn policy_provider(mut self, provider: Arc<dyn PolicyProvider>) -> Self {
        self.policy_provider = Some(provider);
        self
    }

    /// Serve a fixed root policy (no reference resolution).
    pub fn root_policy(mut self, policy: Policy) -> Self {
        self.root = Some(ResolvedPolicy::Policy(Arc::new(policy)));
        self
    }

    /// Serve a fixed root policy set (no reference resolution).
    pub fn root_policy_set(mut self, policy_set: PolicySet) -> Self {
        self.root = Some(ResolvedPolicy::PolicySet(Arc::new(policy_set)));
        self
    }

    /// Append an attribute provider to the fallback chain.
    pub fn attribute_provider(mut self, provider: Box<dyn AttributeProvider>) -> Self {
        self.attribute_providers.push(provider);
        self
    }

    /// Standing attribute groups the PDP issues into every request.
    pub fn pdp_issued_attributes(mut self, groups: Vec<Attributes>) -> Self {
        self.pdp_issued = groups;
        self
    }

    /// Let PDP-issued values override request-supplied ones.
    pub fn pdp_env_overrides_request(mut self, overrides: bool) -> Self {
        self.pdp_env_overrides_request = overrides;
        self
    }

    /// Disable freezing of the environment clock (frozen by default).
    pub fn without_env_value_cache(mut self) -> Self {
        self.disable_env_cache = true;
        self
    }

    /// Report the attributes each evaluation consulted.
    pub fn return_used_attributes(mut self, return_used: bool) -> Self {
        self.return_used_attributes = return_used;
        self
    }

    pub fn build(self) -> Result<Pdp, PolicyBuildError> {
        let policy_provider: Arc<dyn PolicyProvider> = match (self.policy_provider, self.root) {
            (Some(provider), _) => provider,
            (None, Some(root)) => Arc::new(StaticPolicyProvider::new().with_root(root)),
            (None, None) => return Err(PolicyBuildError::NoRootPolicy),
        };
        Ok(Pdp {
            policy_provider,
            attribute_providers: self.attribute_providers,
            pdp_issued: self.pdp_issued,
            pdp_env_overrides_request: self.pdp_env_overrides_request,
            cache_env_values: !self.disable_env_cache,
            return_used_attributes: self.return_used_attributes,
        })
    }
}
