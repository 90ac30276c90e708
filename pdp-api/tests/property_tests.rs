//! Property-based tests for the value and bag model using proptest.
//!
//! These verify the datatype laws the engine depends on: lexical
//! round-trips, multiset semantics, and version ordering across a wide
//! range of generated inputs.

use proptest::prelude::*;

use pdp_api::{AttributeValue, Bag, Datatype, PolicyVersion};

// Helper strategy for xs:string values without surrogate surprises
fn string_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 _:./@-]{0,40}").unwrap()
}

fn hex_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..32)
}

fn time_lexical_strategy() -> impl Strategy<Value = String> {
    (0u8..24, 0u8..60, 0u8..60).prop_map(|(h, m, s)| format!("{h:02}:{m:02}:{s:02}Z"))
}

fn date_lexical_strategy() -> impl Strategy<Value = String> {
    (1970i32..2100, 1u8..13, 1u8..29).prop_map(|(y, m, d)| format!("{y:04}-{m:02}-{d:02}"))
}

fn duration_lexical_strategy() -> impl Strategy<Value = String> {
    (0u32..500, 0u32..24, 0u32..60).prop_map(|(d, h, m)| format!("P{d}DT{h}H{m}M"))
}

proptest! {
    #[test]
    fn integer_round_trips(value in any::<i64>()) {
        let parsed = Datatype::Integer.parse(&value.to_string()).unwrap();
        prop_assert_eq!(&parsed, &AttributeValue::Integer(value));
        let reparsed = Datatype::Integer.parse(&parsed.to_lexical()).unwrap();
        prop_assert_eq!(reparsed, parsed);
    }

    #[test]
    fn finite_double_round_trips(value in prop::num::f64::NORMAL | prop::num::f64::ZERO) {
        let parsed = Datatype::Double.parse(&AttributeValue::Double(value).to_lexical()).unwrap();
        prop_assert_eq!(parsed, AttributeValue::Double(value));
    }

    #[test]
    fn string_round_trips(value in string_strategy()) {
        let parsed = Datatype::String.parse(&value).unwrap();
        let reparsed = Datatype::String.parse(&parsed.to_lexical()).unwrap();
        prop_assert_eq!(reparsed, parsed);
    }

    #[test]
    fn hex_binary_round_trips(bytes in hex_strategy()) {
        let value = AttributeValue::HexBinary(bytes);
        let reparsed = Datatype::HexBinary.parse(&value.to_lexical()).unwrap();
        prop_assert_eq!(reparsed, value);
    }

    #[test]
    fn base64_binary_round_trips(bytes in hex_strategy()) {
        let value = AttributeValue::Base64Binary(bytes);
        let reparsed = Datatype::Base64Binary.parse(&value.to_lexical()).unwrap();
        prop_assert_eq!(reparsed, value);
    }

    #[test]
    fn temporal_round_trips(
        time in time_lexical_strategy(),
        date in date_lexical_strategy(),
        duration in duration_lexical_strategy(),
    ) {
        for (dt, lexical) in [
            (Datatype::Time, time),
            (Datatype::Date, date),
            (Datatype::DayTimeDuration, duration),
        ] {
            let parsed = dt.parse(&lexical).unwrap();
            let reparsed = dt.parse(&parsed.to_lexical()).unwrap();
            prop_assert_eq!(reparsed, parsed);
        }
    }

    #[test]
    fn bag_size_and_membership(values in prop::collection::vec(string_strategy(), 0..12)) {
        let bag = Bag::new(
            Datatype::String,
            values.iter().cloned().map(AttributeValue::String).collect(),
        )
        .unwrap();
        prop_assert_eq!(bag.len(), values.len());
        for v in &values {
            prop_assert!(bag.contains(&AttributeValue::String(v.clone())));
        }
    }

    #[test]
    fn bag_equality_ignores_order(values in prop::collection::vec(string_strategy(), 0..10)) {
        let forward = Bag::new(
            Datatype::String,
            values.iter().cloned().map(AttributeValue::String).collect(),
        )
        .unwrap();
        let reversed = Bag::new(
            Datatype::String,
            values.iter().rev().cloned().map(AttributeValue::String).collect(),
        )
        .unwrap();
        prop_assert_eq!(forward, reversed);
    }

    #[test]
    fn bag_union_contains_both_sides(
        a in prop::collection::vec(0i64..50, 0..8),
        b in prop::collection::vec(0i64..50, 0..8),
    ) {
        let bag_a = Bag::new(Datatype::Integer, a.iter().map(|v| AttributeValue::Integer(*v)).collect()).unwrap();
        let bag_b = Bag::new(Datatype::Integer, b.iter().map(|v| AttributeValue::Integer(*v)).collect()).unwrap();
        let union = bag_a.union(&bag_b);
        prop_assert!(bag_a.subset_of(&union));
        prop_assert!(bag_b.subset_of(&union));
        // Intersection is a subset of each side.
        let intersection = bag_a.intersection(&bag_b);
        prop_assert!(intersection.subset_of(&bag_a));
        prop_assert!(intersection.subset_of(&bag_b));
    }

    #[test]
    fn version_ordering_is_total(
        a in prop::collection::vec(0u64..40, 1..5),
        b in prop::collection::vec(0u64..40, 1..5),
    ) {
        let va = PolicyVersion::parse(&a.iter().map(u64::to_string).collect::<Vec<_>>().join(".")).unwrap();
        let vb = PolicyVersion::parse(&b.iter().map(u64::to_string).collect::<Vec<_>>().join(".")).unwrap();
        // Exactly one of <, ==, > holds, and display round-trips.
        let ordering = va.cmp(&vb);
        prop_assert_eq!(ordering.reverse(), vb.cmp(&va));
        let reparsed = PolicyVersion::parse(&va.to_string()).unwrap();
        prop_assert_eq!(reparsed, va);
    }
}
