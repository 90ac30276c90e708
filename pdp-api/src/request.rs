//! The parsed request and response data model.
//!
//! The engine consumes a request that has already been unmarshalled from
//! XML or JSON; this is that in-memory shape, serde-serializable so JSON
//! front ends can feed it directly.

use serde::{Deserialize, Serialize};

use crate::datatype::Datatype;
use crate::decision::{Advice, Decision, Obligation, PolicyIdentifier, Status};
use crate::ident;
use crate::value::AttributeValue;

/// An individual decision request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Request {
    /// Attribute groups, one per category.
    pub attributes: Vec<Attributes>,
    /// Ask for the ids of all applicable policies in the result.
    #[serde(default)]
    pub return_policy_id_list: bool,
}

impl Request {
    /// All attribute groups in the given category.
    pub fn category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Attributes> + 'a {
        self.attributes
            .iter()
            .filter(move |a| a.category == category)
    }

    /// The single `resource-scope` value, if the request carries one.
    pub fn resource_scope(&self) -> Option<&str> {
        self.category(ident::CATEGORY_RESOURCE)
            .flat_map(|a| a.attributes.iter())
            .find(|a| a.attribute_id == ident::ATTR_RESOURCE_SCOPE)
            .and_then(|a| a.values.first())
            .and_then(|v| v.as_str())
    }
}

/// The attributes of one category, with optional structured content for
/// selector evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attributes {
    pub category: String,
    pub attributes: Vec<Attribute>,
    /// Structured content the category may carry; selectors project over
    /// it. Absent in deployments without structured content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
}

impl Attributes {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            attributes: Vec::new(),
            content: None,
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// A named attribute and its values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub attribute_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// Echo this attribute back in the result.
    #[serde(default)]
    pub include_in_result: bool,
    pub values: Vec<AttributeValue>,
}

impl Attribute {
    pub fn new(attribute_id: impl Into<String>, values: Vec<AttributeValue>) -> Self {
        Self {
            attribute_id: attribute_id.into(),
            issuer: None,
            include_in_result: false,
            values,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn include_in_result(mut self) -> Self {
        self.include_in_result = true;
        self
    }
}

/// Identifier of an attribute the engine consulted during evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeId {
    pub category: String,
    pub attribute_id: String,
    pub datatype: Datatype,
}

/// One result of a decision request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndividualResult {
    pub decision: Decision,
    pub status: Status,
    pub obligations: Vec<Obligation>,
    pub advice: Vec<Advice>,
    /// Applicable policies, present when the request asked for them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policy_id_list: Vec<PolicyIdentifier>,
    /// Request attributes flagged include-in-result, echoed back.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attributes>,
    /// Attributes the evaluation actually consulted, when asked for.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub used_attributes: Vec<AttributeId>,
}

/// The engine's response: one result per individual decision request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub results: Vec<IndividualResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_lookup() {
        let request = Request {
            attributes: vec![
                Attributes::new(ident::CATEGORY_ACCESS_SUBJECT),
                Attributes::new(ident::CATEGORY_RESOURCE),
            ],
            return_policy_id_list: false,
        };
        assert_eq!(request.category(ident::CATEGORY_RESOURCE).count(), 1);
        assert_eq!(request.category("urn:example:none").count(), 0);
    }

    #[test]
    fn resource_scope_extraction() {
        let request = Request {
            attributes: vec![Attributes::new(ident::CATEGORY_RESOURCE).with_attribute(
                Attribute::new(
                    ident::ATTR_RESOURCE_SCOPE,
                    vec![AttributeValue::String("Children".into())],
                ),
            )],
            return_policy_id_list: false,
        };
        assert_eq!(request.resource_scope(), Some("Children"));
    }

    #[test]
    fn request_round_trips_through_json() {
        let request = Request {
            attributes: vec![Attributes::new(ident::CATEGORY_ACCESS_SUBJECT)
                .with_attribute(
                    Attribute::new(
                        "urn:oasis:names:tc:xacml:1.0:subject:subject-id",
                        vec![AttributeValue::String("alice".into())],
                    )
                    .include_in_result(),
                )],
            return_policy_id_list: true,
        };
        let json = serde_json::to_string(&request).unwrap();
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(back.attributes[0].attributes[0].attribute_id,
            "urn:oasis:names:tc:xacml:1.0:subject:subject-id");
        assert!(back.return_policy_id_list);
        assert!(back.attributes[0].attributes[0].include_in_result);
    }
}
