//! Bags: unordered multisets over a single datatype.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::datatype::Datatype;
use crate::error::IndeterminateError;
use crate::value::AttributeValue;

/// An unordered multiset of attribute values sharing one datatype.
///
/// Duplicates are preserved; insertion order is an implementation detail
/// and never observable through the engine's functions. A bag keeps its
/// datatype even when empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bag {
    datatype: Datatype,
    values: Vec<AttributeValue>,
}

impl Bag {
    /// The empty bag of the given datatype.
    pub fn empty(datatype: Datatype) -> Self {
        Self {
            datatype,
            values: Vec::new(),
        }
    }

    /// Build a bag, checking that every member carries the bag's datatype.
    pub fn new(
        datatype: Datatype,
        values: Vec<AttributeValue>,
    ) -> Result<Self, IndeterminateError> {
        if let Some(v) = values.iter().find(|v| v.datatype() != datatype) {
            return Err(IndeterminateError::processing_error(format!(
                "Bag of {} cannot hold a value of {}",
                datatype.uri(),
                v.datatype().uri()
            )));
        }
        Ok(Self { datatype, values })
    }

    /// Bag holding a single value.
    pub fn singleton(value: AttributeValue) -> Self {
        Self {
            datatype: value.datatype(),
            values: vec![value],
        }
    }

    pub fn datatype(&self) -> Datatype {
        self.datatype
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeValue> {
        self.values.iter()
    }

    pub fn contains(&self, value: &AttributeValue) -> bool {
        self.values.iter().any(|v| v == value)
    }

    /// The bag's only member; the one-and-only failure mode otherwise.
    pub fn single(&self) -> Result<&AttributeValue, IndeterminateError> {
        if self.values.len() == 1 {
            Ok(&self.values[0])
        } else {
            Err(IndeterminateError::processing_error(format!(
                "Expected a bag of exactly one {}, got {} values",
                self.datatype.uri(),
                self.values.len()
            )))
        }
    }

    /// Multiset containment: every member of `self`, with multiplicity
    /// folded to set semantics per the XACML subset function.
    pub fn subset_of(&self, other: &Bag) -> bool {
        self.values.iter().all(|v| other.contains(v))
    }

    /// Set-equality per the XACML set-equals function: mutual subset,
    /// duplicates ignored.
    pub fn set_equals(&self, other: &Bag) -> bool {
        self.subset_of(other) && other.subset_of(self)
    }

    /// Values present in both bags, deduplicated.
    pub fn intersection(&self, other: &Bag) -> Bag {
        let mut values: Vec<AttributeValue> = Vec::new();
        for v in &self.values {
            if other.contains(v) && !values.contains(v) {
                values.push(v.clone());
            }
        }
        Bag {
            datatype: self.datatype,
            values,
        }
    }

    /// Values present in either bag, deduplicated.
    pub fn union(&self, other: &Bag) -> Bag {
        let mut values: Vec<AttributeValue> = Vec::new();
        for v in self.values.iter().chain(other.values.iter()) {
            if !values.contains(v) {
                values.push(v.clone());
            }
        }
        Bag {
            datatype: self.datatype,
            values,
        }
    }

    /// Multiset equality: same members with the same multiplicities,
    /// in any order. This is the bag's own notion of equality, distinct
    /// from the set-equals function.
    fn multiset_eq(&self, other: &Bag) -> bool {
        if self.datatype != other.datatype || self.values.len() != other.values.len() {
            return false;
        }
        let mut matched = vec![false; other.values.len()];
        'outer: for v in &self.values {
            for (i, w) in other.values.iter().enumerate() {
                if !matched[i] && v == w {
                    matched[i] = true;
                    continue 'outer;
                }
            }
            return false;
        }
        true
    }

    pub fn into_values(self) -> Vec<AttributeValue> {
        self.values
    }
}

impl PartialEq for Bag {
    fn eq(&self, other: &Self) -> bool {
        self.multiset_eq(other)
    }
}

impl fmt::Display for Bag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bag<{}>[", self.datatype.short_name())?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Bag {
        Bag::new(
            Datatype::String,
            values
                .iter()
                .map(|s| AttributeValue::String((*s).to_owned()))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn unordered_equality_preserves_duplicates() {
        assert_eq!(strings(&["a", "b", "a"]), strings(&["b", "a", "a"]));
        assert_ne!(strings(&["a", "b"]), strings(&["a", "a", "b"]));
        assert_ne!(strings(&["a", "a"]), strings(&["a"]));
    }

    #[test]
    fn empty_bag_keeps_datatype() {
        let b = Bag::empty(Datatype::Integer);
        assert_eq!(b.datatype(), Datatype::Integer);
        assert_ne!(b, Bag::empty(Datatype::String));
    }

    #[test]
    fn mixed_datatype_rejected() {
        let err = Bag::new(
            Datatype::String,
            vec![AttributeValue::Integer(1)],
        )
        .unwrap_err();
        assert!(err.message.contains("cannot hold"));
    }

    #[test]
    fn single_enforces_cardinality() {
        assert!(strings(&["a"]).single().is_ok());
        assert!(strings(&[]).single().is_err());
        assert!(strings(&["a", "b"]).single().is_err());
    }

    #[test]
    fn set_algebra() {
        let a = strings(&["a", "b", "b"]);
        let b = strings(&["b", "c"]);
        assert_eq!(a.intersection(&b), strings(&["b"]));
        assert_eq!(a.union(&b), strings(&["a", "b", "c"]));
        assert!(strings(&["b", "b"]).subset_of(&b));
        assert!(!a.subset_of(&b));
        assert!(strings(&["a", "a", "b"]).set_equals(&strings(&["b", "a"])));
    }
}
