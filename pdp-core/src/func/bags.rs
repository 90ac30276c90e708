//! Bag construction and deconstruction, generated per datatype.

use pdp_api::datatype::ALL_DATATYPES;
use pdp_api::{AttributeValue, Bag, Datatype};

use crate::expr::ExprValue;

use super::{family_prefix, Function, Params, ParamSpec, Registry, ValueKind};

pub(super) fn register(registry: &mut Registry) {
    for dt in ALL_DATATYPES {
        let prefix = family_prefix(dt);
        let name = dt.short_name();

        registry.insert(Function::eager(
            format!("{prefix}{name}-one-and-only"),
            Params::fixed(vec![ParamSpec::Bag(dt)]),
            ValueKind::Single(dt),
            |args| Ok(ExprValue::Single(args[0].expect_bag()?.single()?.clone())),
        ));

        registry.insert(Function::eager(
            format!("{prefix}{name}-bag-size"),
            Params::fixed(vec![ParamSpec::Bag(dt)]),
            ValueKind::Single(Datatype::Integer),
            |args| {
                let size = args[0].expect_bag()?.len() as i64;
                Ok(ExprValue::Single(AttributeValue::Integer(size)))
            },
        ));

        registry.insert(Function::eager(
            format!("{prefix}{name}-is-in"),
            Params::fixed(vec![ParamSpec::Single(dt), ParamSpec::Bag(dt)]),
            ValueKind::Single(Datatype::Boolean),
            |args| {
                let value = args[0].expect_single()?;
                let bag = args[1].expect_bag()?;
                Ok(ExprValue::Single(AttributeValue::Boolean(
                    bag.contains(value),
                )))
            },
        ));

        registry.insert(Function::eager(
            format!("{prefix}{name}-bag"),
            Params::variadic(Vec::new(), ParamSpec::Single(dt)),
            ValueKind::Bag(dt),
            move |args| {
                let values = args
                    .iter()
                    .map(|a| a.expect_single().cloned())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ExprValue::Bag(Bag::new(dt, values)?))
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::super::function;
    use crate::expr::ExprValue;
    use pdp_api::{AttributeValue, Bag, Datatype, StatusCode};

    fn s(v: &str) -> ExprValue {
        ExprValue::Single(AttributeValue::String(v.into()))
    }

    fn bag(values: &[&str]) -> ExprValue {
        ExprValue::Bag(
            Bag::new(
                Datatype::String,
                values
                    .iter()
                    .map(|v| AttributeValue::String((*v).to_owned()))
                    .collect(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn bag_builds_and_measures() {
        let make = function("urn:oasis:names:tc:xacml:1.0:function:string-bag").unwrap();
        let built = make.invoke(&[s("a"), s("b"), s("a")]).unwrap();
        assert_eq!(built, bag(&["a", "b", "a"]));

        let size = function("urn:oasis:names:tc:xacml:1.0:function:string-bag-size").unwrap();
        assert_eq!(
            size.invoke(&[built]).unwrap(),
            ExprValue::Single(AttributeValue::Integer(3))
        );
    }

    #[test]
    fn is_in() {
        let f = function("urn:oasis:names:tc:xacml:1.0:function:string-is-in").unwrap();
        assert_eq!(
            f.invoke(&[s("b"), bag(&["a", "b"])]).unwrap(),
            ExprValue::Single(AttributeValue::Boolean(true))
        );
        assert_eq!(
            f.invoke(&[s("z"), bag(&["a", "b"])]).unwrap(),
            ExprValue::Single(AttributeValue::Boolean(false))
        );
    }

    #[test]
    fn one_and_only_requires_singleton() {
        let f = function("urn:oasis:names:tc:xacml:1.0:function:string-one-and-only").unwrap();
        assert_eq!(f.invoke(&[bag(&["only"])]).unwrap(), s("only"));
        let err = f.invoke(&[bag(&[])]).unwrap_err();
        assert_eq!(err.code, StatusCode::ProcessingError);
        assert!(f.invoke(&[bag(&["a", "b"])]).is_err());
    }

    #[test]
    fn duration_and_network_bags_registered() {
        assert!(
            function("urn:oasis:names:tc:xacml:3.0:function:yearMonthDuration-one-and-only")
                .is_some()
        );
        assert!(function("urn:oasis:names:tc:xacml:2.0:function:dnsName-one-and-only").is_some());
    }
}
