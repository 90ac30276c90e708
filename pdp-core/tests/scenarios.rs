//! End-to-end decision scenarios through the full engine stack.

// Acknowledge dev dependencies kept for ad-hoc debugging
use tracing_subscriber as _;

use std::sync::Arc;

use pdp_api::ident;
use pdp_api::{
    Attribute, AttributeProvider, Attributes, AttributeValue, Datatype, Decision, Effect,
    ExtendedIndeterminate, Request, StatusCode, VersionConstraints,
};
use pdp_core::{
    AllOf, AnyOf, AttributeDesignator, CombiningAlg, Condition, Expression, Match, MatchSource,
    ObligationExpression, Pdp, Policy, PolicyChild, PolicyRef, PolicySet, Rule,
    StaticPolicyProvider, Target,
};
use pdp_core::rule::AttributeAssignmentExpression;

const STRING_EQUAL: &str = "urn:oasis:names:tc:xacml:1.0:function:string-equal";

fn subject_target(expected: &str) -> Target {
    Target {
        any_of: vec![AnyOf {
            all_of: vec![AllOf {
                matches: vec![Match::with_function(
                    STRING_EQUAL,
                    AttributeValue::String(expected.to_owned()),
                    MatchSource::Designator(AttributeDesignator::new(
                        ident::CATEGORY_ACCESS_SUBJECT,
                        "urn:example:subject-id",
                        Datatype::String,
                    )),
                )
                .unwrap()],
            }],
        }],
    }
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

fn obligation(id: &str, fulfill_on: Effect) -> ObligationExpression {
    ObligationExpression {
        id: id.to_owned(),
        fulfill_on,
        assignments: vec![AttributeAssignmentExpression {
            attribute_id: "urn:example:note".into(),
            category: None,
            issuer: None,
            expression: Expression::Value(AttributeValue::String("noted".into())),
        }],
    }
}

#[test]
fn permit_leaf() {
    let policy = Policy::new(
        "urn:example:policy",
        "1.0",
        CombiningAlg::DenyOverrides,
        subject_target("alice"),
        Vec::new(),
        vec![Rule::new("r1", Effect::Permit)],
    )
    .unwrap();
    let pdp = Pdp::builder().root_policy(policy).build().unwrap();

    let response = pdp.evaluate(&request_for("alice"));
    let result = &response.results[0];
    assert_eq!(result.decision, Decision::Permit);
    assert_eq!(result.status.code, StatusCode::Ok);
    assert!(result.obligations.is_empty());
}

#[test]
fn deny_overrides_two_rules_keeps_only_deny_obligations() {
    let policy = Policy::new(
        "urn:example:policy",
        "1.0",
        CombiningAlg::DenyOverrides,
        Target::any(),
        Vec::new(),
        vec![
            Rule::new("permit", Effect::Permit)
                .with_obligation(obligation("urn:example:on-permit", Effect::Permit)),
            Rule::new("deny", Effect::Deny)
                .with_obligation(obligation("urn:example:on-deny", Effect::Deny)),
        ],
    )
    .unwrap();
    let pdp = Pdp::builder().root_policy(policy).build().unwrap();

    let result = &pdp.evaluate(&request_for("alice")).results[0];
    assert_eq!(result.decision, Decision::Deny);
    assert_eq!(result.obligations.len(), 1);
    assert_eq!(result.obligations[0].id, "urn:example:on-deny");
}

#[test]
fn only_one_applicable_with_two_applicable_children() {
    let child = |id: &str| {
        PolicyChild::Policy(Arc::new(
            Policy::new(
                id,
                "1.0",
                CombiningAlg::DenyOverrides,
                subject_target("alice"),
                Vec::new(),
                vec![Rule::new("r", Effect::Permit)],
            )
            .unwrap(),
        ))
    };
    let policy_set = PolicySet::new(
        "urn:example:set",
        "1.0",
        CombiningAlg::OnlyOneApplicable,
        Target::any(),
        vec![child("urn:example:p1"), child("urn:example:p2")],
    )
    .unwrap();
    let pdp = Pdp::builder().root_policy_set(policy_set).build().unwrap();

    let result = &pdp.evaluate(&request_for("alice")).results[0];
    assert_eq!(
        result.decision,
        Decision::Indeterminate(ExtendedIndeterminate::DenyPermit)
    );
    assert_eq!(result.status.code, StatusCode::ProcessingError);
    assert_eq!(
        result.status.message.as_deref(),
        Some("Too many (more than one) applicable policies")
    );
}

#[test]
fn only_one_applicable_picks_the_single_applicable_child() {
    let child = |id: &str, subject: &str, effect: Effect| {
        PolicyChild::Policy(Arc::new(
            Policy::new(
                id,
                "1.0",
                CombiningAlg::DenyOverrides,
                subject_target(subject),
                Vec::new(),
                vec![Rule::new("r", effect)],
            )
            .unwrap(),
        ))
    };
    // Child order must not matter.
    for children in [
        vec![
            child("urn:example:p1", "bob", Effect::Permit),
            child("urn:example:p2", "alice", Effect::Deny),
        ],
        vec![
            child("urn:example:p2", "alice", Effect::Deny),
            child("urn:example:p1", "bob", Effect::Permit),
        ],
    ] {
        let policy_set = PolicySet::new(
            "urn:example:set",
            "1.0",
            CombiningAlg::OnlyOneApplicable,
            Target::any(),
            children,
        )
        .unwrap();
        let pdp = Pdp::builder().root_policy_set(policy_set).build().unwrap();
        let result = &pdp.evaluate(&request_for("alice")).results[0];
        assert_eq!(result.decision, Decision::Deny);
    }
}

#[test]
fn missing_must_be_present_attribute() {
    let condition = Condition::new(
        Expression::apply(
            "urn:oasis:names:tc:xacml:1.0:function:string-one-and-only",
            vec![Expression::Designator(
                AttributeDesignator::new(
                    ident::CATEGORY_ACCESS_SUBJECT,
                    "urn:example:role",
                    Datatype::String,
                )
                .must_be_present(),
            )],
        )
        .and_then(|one| {
            Expression::apply(
                STRING_EQUAL,
                vec![one, Expression::Value(AttributeValue::String("admin".into()))],
            )
        })
        .unwrap(),
    )
    .unwrap();
    let policy = Policy::new(
        "urn:example:policy",
        "1.0",
        CombiningAlg::DenyOverrides,
        Target::any(),
        Vec::new(),
        vec![Rule::new("r1", Effect::Permit).with_condition(condition)],
    )
    .unwrap();
    let pdp = Pdp::builder().root_policy(policy).build().unwrap();

    let result = &pdp.evaluate(&request_for("alice")).results[0];
    assert_eq!(
        result.decision,
        Decision::Indeterminate(ExtendedIndeterminate::Permit)
    );
    assert_eq!(result.status.code, StatusCode::MissingAttribute);
}

#[test]
fn provider_chain_resolves_missing_attribute() {
    struct RoleProvider;
    impl AttributeProvider for RoleProvider {
        fn supports(&self, _category: &str, attribute_id: &str, datatype: Datatype) -> bool {
            attribute_id == "urn:example:role" && datatype == Datatype::String
        }
        fn find(
            &self,
            _category: &str,
            _attribute_id: &str,
            _datatype: Datatype,
            _issuer: Option<&str>,
            _request: &Request,
        ) -> Result<pdp_api::Bag, pdp_api::IndeterminateError> {
            Ok(pdp_api::Bag::singleton(AttributeValue::String(
                "admin".into(),
            )))
        }
    }

    let condition = Condition::new(
        Expression::apply(
            STRING_EQUAL,
            vec![
                Expression::apply(
                    "urn:oasis:names:tc:xacml:1.0:function:string-one-and-only",
                    vec![Expression::Designator(AttributeDesignator::new(
                        ident::CATEGORY_ACCESS_SUBJECT,
                        "urn:example:role",
                        Datatype::String,
                    ))],
                )
                .unwrap(),
                Expression::Value(AttributeValue::String("admin".into())),
            ],
        )
        .unwrap(),
    )
    .unwrap();
    let policy = Policy::new(
        "urn:example:policy",
        "1.0",
        CombiningAlg::DenyOverrides,
        Target::any(),
        Vec::new(),
        vec![Rule::new("r1", Effect::Permit).with_condition(condition)],
    )
    .unwrap();
    let pdp = Pdp::builder()
        .root_policy(policy)
        .attribute_provider(Box::new(RoleProvider))
        .build()
        .unwrap();

    let result = &pdp.evaluate(&request_for("alice")).results[0];
    assert_eq!(result.decision, Decision::Permit);
}

#[test]
fn policy_set_resolves_references_and_detects_missing_ones() {
    let referenced = Arc::new(
        Policy::new(
            "urn:example:referenced",
            "2.1",
            CombiningAlg::DenyOverrides,
            Target::any(),
            Vec::new(),
            vec![Rule::new("r", Effect::Permit)],
        )
        .unwrap(),
    );
    let root = Arc::new(
        PolicySet::new(
            "urn:example:root",
            "1.0",
            CombiningAlg::DenyOverrides,
            Target::any(),
            vec![PolicyChild::Reference(
                PolicyRef::policy("urn:example:referenced")
                    .with_constraints(VersionConstraints::any()),
            )],
        )
        .unwrap(),
    );
    let provider = Arc::new(
        StaticPolicyProvider::new()
            .with_root(pdp_core::ResolvedPolicy::PolicySet(Arc::clone(&root)))
            .with_policy(referenced),
    );
    let pdp = Pdp::builder().policy_provider(provider).build().unwrap();
    let result = &pdp.evaluate(&request_for("alice")).results[0];
    assert_eq!(result.decision, Decision::Permit);

    // A dangling reference is a processing error.
    let dangling = PolicySet::new(
        "urn:example:root2",
        "1.0",
        CombiningAlg::DenyOverrides,
        Target::any(),
        vec![PolicyChild::Reference(PolicyRef::policy(
            "urn:example:nowhere",
        ))],
    )
    .unwrap();
    let pdp = Pdp::builder().root_policy_set(dangling).build().unwrap();
    let result = &pdp.evaluate(&request_for("alice")).results[0];
    assert!(result.decision.is_indeterminate());
    assert_eq!(result.status.code, StatusCode::ProcessingError);
}

#[test]
fn self_referencing_policy_set_is_detected() {
    let cyclic = Arc::new(
        PolicySet::new(
            "urn:example:cycle",
            "1.0",
            CombiningAlg::DenyOverrides,
            Target::any(),
            vec![PolicyChild::Reference(PolicyRef::policy_set(
                "urn:example:cycle",
            ))],
        )
        .unwrap(),
    );
    let provider = Arc::new(
        StaticPolicyProvider::new()
            .with_root(pdp_core::ResolvedPolicy::PolicySet(Arc::clone(&cyclic)))
            .with_policy_set(cyclic),
    );
    let pdp = Pdp::builder().policy_provider(provider).build().unwrap();

    let result = &pdp.evaluate(&request_for("alice")).results[0];
    assert!(result.decision.is_indeterminate());
    assert_eq!(result.status.code, StatusCode::ProcessingError);
    assert!(result
        .status
        .message
        .as_deref()
        .unwrap()
        .contains("Circular policy reference"));
}

#[test]
fn variable_shared_between_rules_is_memoised() {
    // The variable resolves a mustBePresent designator; with the
    // attribute supplied both rules see the same value.
    let variable = pdp_core::VariableDefinition {
        id: "is-admin".into(),
        expression: Expression::apply(
            STRING_EQUAL,
            vec![
                Expression::apply(
                    "urn:oasis:names:tc:xacml:1.0:function:string-one-and-only",
                    vec![Expression::Designator(AttributeDesignator::new(
                        ident::CATEGORY_ACCESS_SUBJECT,
                        "urn:example:subject-id",
                        Datatype::String,
                    ))],
                )
                .unwrap(),
                Expression::Value(AttributeValue::String("alice".into())),
            ],
        )
        .unwrap(),
    };
    let rule_with_var = |id: &str, effect: Effect| {
        Rule::new(id, effect).with_condition(
            Condition::new(Expression::VariableReference("is-admin".into())).unwrap(),
        )
    };
    let policy = Policy::new(
        "urn:example:policy",
        "1.0",
        CombiningAlg::FirstApplicable,
        Target::any(),
        vec![variable],
        vec![
            rule_with_var("r1", Effect::Permit),
            rule_with_var("r2", Effect::Deny),
        ],
    )
    .unwrap();
    let pdp = Pdp::builder().root_policy(policy).build().unwrap();

    let result = &pdp.evaluate(&request_for("alice")).results[0];
    assert_eq!(result.decision, Decision::Permit);
    let result = &pdp.evaluate(&request_for("bob")).results[0];
    assert_eq!(result.decision, Decision::NotApplicable);
}

#[test]
fn policy_own_obligations_precede_rule_obligations() {
    let policy = Policy::new(
        "urn:example:policy",
        "1.0",
        CombiningAlg::DenyOverrides,
        Target::any(),
        Vec::new(),
        vec![Rule::new("r", Effect::Permit)
            .with_obligation(obligation("urn:example:from-rule", Effect::Permit))],
    )
    .unwrap()
    .with_obligation(obligation("urn:example:from-policy", Effect::Permit));
    let pdp = Pdp::builder().root_policy(policy).build().unwrap();

    let result = &pdp.evaluate(&request_for("alice")).results[0];
    assert_eq!(result.decision, Decision::Permit);
    let ids: Vec<&str> = result.obligations.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, ["urn:example:from-policy", "urn:example:from-rule"]);
}

#[test]
fn deny_unless_permit_never_not_applicable() {
    let policy = Policy::new(
        "urn:example:policy",
        "1.0",
        CombiningAlg::DenyUnlessPermit,
        Target::any(),
        Vec::new(),
        vec![Rule::new("r", Effect::Permit).with_target(subject_target("nobody"))],
    )
    .unwrap();
    let pdp = Pdp::builder().root_policy(policy).build().unwrap();
    let result = &pdp.evaluate(&request_for("alice")).results[0];
    assert_eq!(result.decision, Decision::Deny);
    assert_eq!(result.status.code, StatusCode::Ok);
}

#[test]
fn clock_freeze_within_one_request() {
    // Two conditions each read current-dateTime; a frozen clock makes
    // them equal, so the rule permits.
    let read_clock = || {
        Expression::apply(
            "urn:oasis:names:tc:xacml:1.0:function:dateTime-one-and-only",
            vec![Expression::Designator(AttributeDesignator::new(
                ident::CATEGORY_ENVIRONMENT,
                ident::ATTR_CURRENT_DATETIME,
                Datatype::DateTime,
            ))],
        )
        .unwrap()
    };
    let condition = Condition::new(
        Expression::apply(
            "urn:oasis:names:tc:xacml:1.0:function:dateTime-equal",
            vec![read_clock(), read_clock()],
        )
        .unwrap(),
    )
    .unwrap();
    let policy = Policy::new(
        "urn:example:policy",
        "1.0",
        CombiningAlg::DenyOverrides,
        Target::any(),
        Vec::new(),
        vec![Rule::new("r", Effect::Permit).with_condition(condition)],
    )
    .unwrap();
    let pdp = Pdp::builder().root_policy(policy).build().unwrap();

    let result = &pdp.evaluate(&Request::default()).results[0];
    assert_eq!(result.decision, Decision::Permit);
}

#[test]
fn first_applicable_scans_in_document_order() {
    let policy = Policy::new(
        "urn:example:policy",
        "1.0",
        CombiningAlg::FirstApplicable,
        Target::any(),
        Vec::new(),
        vec![
            Rule::new("skip", Effect::Deny).with_target(subject_target("bob")),
            Rule::new("hit", Effect::Permit).with_target(subject_target("alice")),
            Rule::new("shadowed", Effect::Deny),
        ],
    )
    .unwrap();
    let pdp = Pdp::builder().root_policy(policy).build().unwrap();
    let result = &pdp.evaluate(&request_for("alice")).results[0];
    assert_eq!(result.decision, Decision::Permit);
}
