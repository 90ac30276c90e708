//! The per-request evaluation context.
//!
//! Holds the request's attribute bags indexed by (category, attribute id,
//! datatype), falls back on the attribute provider chain for anything the
//! request does not carry, and freezes the environment clock on first
//! observation. All caches live here and die with the request.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use pdp_api::ident;
use pdp_api::{
    AttributeId, AttributeProvider, AttributeValue, Bag, Datatype, IndeterminateError,
    PolicyIdentifier, Request,
};

use crate::expr::{AttributeDesignator, AttributeSelector, ExprValue};
use crate::policy::{PolicyProvider, VariableDefinition};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AttrKey {
    category: String,
    attribute_id: String,
    datatype: Datatype,
}

#[derive(Debug, Clone)]
struct AttrEntry {
    issuer: Option<String>,
    value: AttributeValue,
}

enum VarState {
    InProgress,
    Done(Result<ExprValue, IndeterminateError>),
}

struct VariableFrame {
    definitions: Vec<VariableDefinition>,
    cache: HashMap<String, VarState>,
}

/// Per-request evaluation state.
pub struct EvaluationContext<'a> {
    request: &'a Request,
    providers: &'a [Box<dyn AttributeProvider>],
    /// (category, id, datatype) -> values supplied by the request or the
    /// PDP-issued set, merged at construction.
    attributes: HashMap<AttrKey, Vec<AttrEntry>>,
    /// Provider answers, cached verbatim so repeated lookups within one
    /// request are deterministic.
    provider_cache: HashMap<(AttrKey, Option<String>), Result<Bag, IndeterminateError>>,
    cache_env_values: bool,
    pdp_env_overrides_request: bool,
    /// Keys the PDP-issued groups supplied literal values for; those
    /// values win over clock synthesis under the override flag.
    pdp_issued_keys: HashSet<AttrKey>,
    frozen_now: Option<DateTime<Utc>>,
    variables: Vec<VariableFrame>,
    /// Ids of policies found applicable, in evaluation order.
    applicable_policies: Vec<PolicyIdentifier>,
    /// Attributes consulted through designators, in first-use order.
    used_attributes: Vec<AttributeId>,
    /// Policy/policy-set ids on the current reference-resolution path.
    reference_stack: Vec<String>,
    /// Resolver for policy references; absent in provider-less setups.
    policy_provider: Option<&'a dyn PolicyProvider>,
}

impl<'a> EvaluationContext<'a> {
    /// Build a context over a request plus the PDP-issued attribute
    /// groups. The PDP-issued groups are shared across requests and are
    /// only read here, never mutated.
    pub fn new(
        request: &'a Request,
        pdp_issued: &[pdp_api::Attributes],
        pdp_env_overrides_request: bool,
        cache_env_values: bool,
        providers: &'a [Box<dyn AttributeProvider>],
    ) -> Self {
        let mut attributes: HashMap<AttrKey, Vec<AttrEntry>> = HashMap::new();
        index_attributes(&mut attributes, &request.attributes);

        // Merge direction is governed by the override flag; the shared
        // PDP-issued groups are cloned into the per-request index, never
        // touched.
        let mut pdp_index: HashMap<AttrKey, Vec<AttrEntry>> = HashMap::new();
        index_attributes(&mut pdp_index, pdp_issued);
        let pdp_issued_keys: HashSet<AttrKey> = pdp_index.keys().cloned().collect();
        for (key, entries) in pdp_index {
            match attributes.entry(key) {
                std::collections::hash_map::Entry::Occupied(mut occupied) => {
                    if pdp_env_overrides_request {
                        *occupied.get_mut() = entries;
                    }
                }
                std::collections::hash_map::Entry::Vacant(vacant) => {
                    vacant.insert(entries);
                }
            }
        }

        Self {
            request,
            providers,
            attributes,
            provider_cache: HashMap::new(),
            cache_env_values,
            pdp_env_overrides_request,
            pdp_issued_keys,
            frozen_now: None,
            variables: Vec::new(),
            applicable_policies: Vec::new(),
            used_attributes: Vec::new(),
            reference_stack: Vec::new(),
            policy_provider: None,
        }
    }

    pub fn with_policy_provider(mut self, provider: &'a dyn PolicyProvider) -> Self {
        self.policy_provider = Some(provider);
        self
    }

    pub fn policy_provider(&self) -> Option<&'a dyn PolicyProvider> {
        self.policy_provider
    }

    pub fn request(&self) -> &'a Request {
        self.request
    }

    /// The evaluation instant. Frozen on first observation unless
    /// environment-value caching was disabled.
    pub fn current_instant(&mut self) -> DateTime<Utc> {
        if self.cache_env_values {
            *self.frozen_now.get_or_insert_with(Utc::now)
        } else {
            Utc::now()
        }
    }

    /// Core attribute lookup: context map, then provider chain, then the
    /// empty bag. mustBePresent lifting happens in the designator.
    pub fn attribute_bag(
        &mut self,
        category: &str,
        attribute_id: &str,
        datatype: Datatype,
        issuer: Option<&str>,
    ) -> Result<Bag, IndeterminateError> {
        self.note_use(category, attribute_id, datatype);

        if let Some(bag) = self.environment_override(category, attribute_id, datatype) {
            return Ok(bag);
        }

        let key = AttrKey {
            category: category.to_owned(),
            attribute_id: attribute_id.to_owned(),
            datatype,
        };

        if let Some(entries) = self.attributes.get(&key) {
            let values: Vec<AttributeValue> = entries
                .iter()
                .filter(|e| issuer.is_none() || e.issuer.as_deref() == issuer)
                .map(|e| e.value.clone())
                .collect();
            return Bag::new(datatype, values);
        }

        if let Some(bag) = self.environment_fallback(category, attribute_id, datatype) {
            return Ok(bag);
        }

        self.resolve_through_providers(key, issuer)
    }

    fn resolve_through_providers(
        &mut self,
        key: AttrKey,
        issuer: Option<&str>,
    ) -> Result<Bag, IndeterminateError> {
        let cache_key = (key.clone(), issuer.map(str::to_owned));
        if let Some(cached) = self.provider_cache.get(&cache_key) {
            return cached.clone();
        }

        let provider = self
            .providers
            .iter()
            .find(|p| p.supports(&key.category, &key.attribute_id, key.datatype));

        let result = match provider {
            Some(provider) => {
                tracing::debug!(
                    category = %key.category,
                    attribute_id = %key.attribute_id,
                    "resolving attribute through provider chain"
                );
                provider.find(
                    &key.category,
                    &key.attribute_id,
                    key.datatype,
                    issuer,
                    self.request,
                )
            }
            None => Ok(Bag::empty(key.datatype)),
        };
        if let Err(e) = &result {
            tracing::warn!(
                category = %key.category,
                attribute_id = %key.attribute_id,
                error = %e,
                "attribute provider failed"
            );
        }

        // Cached verbatim, success or failure, so the answer is stable
        // for the rest of this request.
        self.provider_cache.insert(cache_key, result.clone());
        result
    }

    /// When the PDP's environment values take precedence, request-supplied
    /// current-* attributes are ignored. A literal PDP-issued value was
    /// already merged over the request's in the index, so only the case
    /// where the PDP issued nothing falls back to clock synthesis here.
    fn environment_override(
        &mut self,
        category: &str,
        attribute_id: &str,
        datatype: Datatype,
    ) -> Option<Bag> {
        if !self.pdp_env_overrides_request
            || !is_current_env_attribute(category, attribute_id, datatype)
        {
            return None;
        }
        let key = AttrKey {
            category: category.to_owned(),
            attribute_id: attribute_id.to_owned(),
            datatype,
        };
        if self.pdp_issued_keys.contains(&key) {
            // Let the index lookup return the PDP-issued literal.
            return None;
        }
        self.clock_bag(category, attribute_id, datatype)
    }

    /// Neither request nor PDP-issued groups carried the attribute (the
    /// index missed); current-* values come from the clock.
    fn environment_fallback(
        &mut self,
        category: &str,
        attribute_id: &str,
        datatype: Datatype,
    ) -> Option<Bag> {
        self.clock_bag(category, attribute_id, datatype)
    }

    fn clock_bag(
        &mut self,
        category: &str,
        attribute_id: &str,
        datatype: Datatype,
    ) -> Option<Bag> {
        if !is_current_env_attribute(category, attribute_id, datatype) {
            return None;
        }
        let now = pdp_api::value::XacmlDateTime::now_utc(self.current_instant());
        let value = match datatype {
            Datatype::Time => AttributeValue::Time(now.time_part()),
            Datatype::Date => AttributeValue::Date(now.date_part()),
            _ => AttributeValue::DateTime(now),
        };
        Some(Bag::singleton(value))
    }

    /// Resolve a designator to its bag, before mustBePresent lifting.
    pub fn resolve_designator(
        &mut self,
        designator: &AttributeDesignator,
    ) -> Result<Bag, IndeterminateError> {
        self.attribute_bag(
            &designator.category,
            &designator.attribute_id,
            designator.datatype,
            designator.issuer.as_deref(),
        )
    }

    /// Resolve a selector: project the category's structured content
    /// along the selector's path. No structured content means the empty
    /// bag.
    pub fn resolve_selector(
        &mut self,
        selector: &AttributeSelector,
    ) -> Result<Bag, IndeterminateError> {
        let content = self
            .request
            .category(&selector.category)
            .find_map(|a| a.content.as_ref());
        let Some(content) = content else {
            return Ok(Bag::empty(selector.datatype));
        };

        let root = match &selector.context_selector_id {
            None => content.clone(),
            Some(id) => {
                let bag =
                    self.attribute_bag(&selector.category, id, Datatype::String, None)?;
                let path = bag.single()?.as_str().map(str::to_owned).ok_or_else(|| {
                    IndeterminateError::processing_error(format!(
                        "Context selector {id} must be a string path"
                    ))
                })?;
                let nodes = project(content, &path);
                match nodes.as_slice() {
                    [node] => (*node).clone(),
                    _ => {
                        return Err(IndeterminateError::processing_error(format!(
                            "Context selector {id} selected {} nodes, expected 1",
                            nodes.len()
                        )))
                    }
                }
            }
        };

        let mut values = Vec::new();
        for node in project(&root, &selector.path) {
            let lexical = match node {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => {
                    return Err(IndeterminateError::syntax_error(format!(
                        "Selector path {} reached a non-scalar node",
                        selector.path
                    )))
                }
            };
            values.push(selector.datatype.parse(&lexical)?);
        }
        Bag::new(selector.datatype, values)
    }

    // --- variable memoisation -------------------------------------------

    /// Enter a policy's variable scope. Every policy evaluation pushes a
    /// frame, even an empty one, so references cannot leak across
    /// sibling policies.
    pub fn push_variable_scope(&mut self, definitions: &[VariableDefinition]) {
        self.variables.push(VariableFrame {
            definitions: definitions.to_vec(),
            cache: HashMap::new(),
        });
    }

    pub fn pop_variable_scope(&mut self) {
        self.variables.pop();
    }

    /// Look up a variable, evaluating and memoising its definition on
    /// first use. The memo stores errors too: a failing variable fails
    /// the same way every time it is referenced.
    pub fn variable(&mut self, id: &str) -> Result<ExprValue, IndeterminateError> {
        let expression = {
            let frame = self.variables.last_mut().ok_or_else(|| {
                IndeterminateError::processing_error(format!(
                    "Variable {id} referenced outside any policy scope"
                ))
            })?;
            match frame.cache.get(id) {
                Some(VarState::Done(result)) => return result.clone(),
                Some(VarState::InProgress) => {
                    return Err(IndeterminateError::processing_error(format!(
                        "Circular reference in variable definition {id}"
                    )))
                }
                None => {}
            }
            let definition = frame
                .definitions
                .iter()
                .find(|d| d.id == id)
                .ok_or_else(|| {
                    IndeterminateError::processing_error(format!(
                        "Reference to undefined variable {id}"
                    ))
                })?;
            frame.cache.insert(id.to_owned(), VarState::InProgress);
            definition.expression.clone()
        };

        let result = expression.evaluate(self);
        if let Some(frame) = self.variables.last_mut() {
            frame
                .cache
                .insert(id.to_owned(), VarState::Done(result.clone()));
        }
        result
    }

    // --- bookkeeping ----------------------------------------------------

    fn note_use(&mut self, category: &str, attribute_id: &str, datatype: Datatype) {
        let id = AttributeId {
            category: category.to_owned(),
            attribute_id: attribute_id.to_owned(),
            datatype,
        };
        if !self.used_attributes.contains(&id) {
            self.used_attributes.push(id);
        }
    }

    pub fn note_applicable_policy(&mut self, id: PolicyIdentifier) {
        if !self.applicable_policies.contains(&id) {
            self.applicable_policies.push(id);
        }
    }

    pub fn applicable_policies(&self) -> &[PolicyIdentifier] {
        &self.applicable_policies
    }

    pub fn used_attributes(&self) -> &[AttributeId] {
        &self.used_attributes
    }

    /// Track a reference-resolution step; a repeated id means a cycle.
    pub fn enter_reference(&mut self, id: &str) -> Result<(), IndeterminateError> {
        if self.reference_stack.iter().any(|r| r == id) {
            return Err(IndeterminateError::processing_error(format!(
                "Circular policy reference involving {id}"
            )));
        }
        self.reference_stack.push(id.to_owned());
        Ok(())
    }

    pub fn exit_reference(&mut self) {
        self.reference_stack.pop();
    }
}

/// Whether this is one of the well-known PDP-issued environment
/// attributes, at its standard datatype.
fn is_current_env_attribute(category: &str, attribute_id: &str, datatype: Datatype) -> bool {
    category == ident::CATEGORY_ENVIRONMENT
        && matches!(
            (attribute_id, datatype),
            (ident::ATTR_CURRENT_TIME, Datatype::Time)
                | (ident::ATTR_CURRENT_DATE, Datatype::Date)
                | (ident::ATTR_CURRENT_DATETIME, Datatype::DateTime)
        )
}

fn index_attributes(
    index: &mut HashMap<AttrKey, Vec<AttrEntry>>,
    groups: &[pdp_api::Attributes],
) {
    for group in groups {
        for attr in &group.attributes {
            for value in &attr.values {
                let key = AttrKey {
                    category: group.category.clone(),
                    attribute_id: attr.attribute_id.clone(),
                    datatype: value.datatype(),
                };
                index.entry(key).or_default().push(AttrEntry {
                    issuer: attr.issuer.clone(),
                    value: value.clone(),
                });
            }
        }
    }
}

/// Slash-separated projection over JSON content. Arrays are flattened at
/// every step; a missing key selects nothing.
fn project<'v>(root: &'v serde_json::Value, path: &str) -> Vec<&'v serde_json::Value> {
    let mut nodes = vec![root];
    for step in path.split('/').filter(|s| !s.is_empty()) {
        let mut next = Vec::new();
        for node in nodes {
            match node {
                serde_json::Value::Object(map) => {
                    if let Some(v) = map.get(step) {
                        flatten_into(&mut next, v);
                    }
                }
                serde_json::Value::Array(items) => {
                    for item in items {
                        if let Some(v) = item.get(step) {
                            flatten_into(&mut next, v);
                        }
                    }
                }
                _ => {}
            }
        }
        nodes = next;
    }
    nodes
}

fn flatten_into<'v>(out: &mut Vec<&'v serde_json::Value>, value: &'v serde_json::Value) {
    match value {
        serde_json::Value::Array(items) => out.extend(items.iter()),
        other => out.push(other),
    }
}
