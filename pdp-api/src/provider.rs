//! The attribute and policy provider contracts.
//!
//! Attribute providers form an ordered chain behind the per-request
//! attribute context: when a designator cannot be satisfied from the
//! request, the first provider that declares support for the attribute
//! is asked, and its answer (a bag, possibly empty, or an error) is
//! cached verbatim for the rest of the evaluation. Providers may block
//! on I/O; callers are responsible for bounding that.
//!
//! Policy providers hand the engine its root policy for a request and
//! resolve policy references by id and version constraints. The contract
//! is agnostic to the engine's policy representation: the resolved
//! handle is an associated type the engine binds to its own policy tree.

use crate::bag::Bag;
use crate::datatype::Datatype;
use crate::error::IndeterminateError;
use crate::request::Request;
use crate::version::VersionConstraints;

/// An external source of attribute values.
pub trait AttributeProvider: Send + Sync {
    /// Whether this provider can resolve the given attribute at all.
    /// Only supporting providers are asked to `find`.
    fn supports(&self, category: &str, attribute_id: &str, datatype: Datatype) -> bool;

    /// Resolve the attribute. An empty bag is a valid, cacheable answer
    /// meaning "looked, found nothing"; an error becomes an Indeterminate
    /// for every expression that needs the attribute.
    fn find(
        &self,
        category: &str,
        attribute_id: &str,
        datatype: Datatype,
        issuer: Option<&str>,
        request: &Request,
    ) -> Result<Bag, IndeterminateError>;
}

/// What a policy reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyRefType {
    Policy,
    PolicySet,
}

/// An external source of policies.
pub trait PolicyProvider: Send + Sync {
    /// The policy element handle this provider resolves to; the engine
    /// binds it to its policy tree.
    type Resolved;

    /// The root policy element applicable to this request, if any.
    fn find_by_target(
        &self,
        request: &Request,
    ) -> Result<Option<Self::Resolved>, IndeterminateError>;

    /// Resolve a reference. `None` means unknown id (or no version in
    /// range), which the engine turns into a processing error.
    fn find_by_reference(
        &self,
        id: &str,
        constraints: &VersionConstraints,
        ref_type: PolicyRefType,
    ) -> Result<Option<Self::Resolved>, IndeterminateError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::AttributeValue;
    use crate::version::PolicyVersion;

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
        ) -> Result<Bag, IndeterminateError> {
            Ok(Bag::singleton(AttributeValue::String("admin".into())))
        }
    }

    #[test]
    fn attribute_provider_contract() {
        let p = RoleProvider;
        assert!(p.supports("c", "urn:example:role", Datatype::String));
        assert!(!p.supports("c", "urn:example:role", Datatype::Integer));
        let bag = p
            .find("c", "urn:example:role", Datatype::String, None, &Request::default())
            .unwrap();
        assert_eq!(bag.len(), 1);
    }

    /// The policy contract works against any resolved handle; here ids
    /// stand in for a policy tree.
    struct LabelProvider;

    impl PolicyProvider for LabelProvider {
        type Resolved = String;

        fn find_by_target(
            &self,
            _request: &Request,
        ) -> Result<Option<String>, IndeterminateError> {
            Ok(Some("urn:example:root".into()))
        }

        fn find_by_reference(
            &self,
            id: &str,
            constraints: &VersionConstraints,
            ref_type: PolicyRefType,
        ) -> Result<Option<String>, IndeterminateError> {
            let known = id == "urn:example:known"
                && ref_type == PolicyRefType::Policy
                && constraints.matches(&PolicyVersion::parse("1.0").unwrap());
            Ok(known.then(|| id.to_owned()))
        }
    }

    #[test]
    fn policy_provider_contract() {
        let p = LabelProvider;
        assert_eq!(
            p.find_by_target(&Request::default()).unwrap().as_deref(),
            Some("urn:example:root")
        );
        assert!(p
            .find_by_reference(
                "urn:example:known",
                &VersionConstraints::any(),
                PolicyRefType::Policy,
            )
            .unwrap()
            .is_some());
        assert!(p
            .find_by_reference(
                "urn:example:known",
                &VersionConstraints::any(),
                PolicyRefType::PolicySet,
            )
            .unwrap()
            .is_none());
    }
}
