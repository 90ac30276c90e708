//! The expression AST and its recursive evaluator.
//!
//! Every node yields a single value, a bag, or an Indeterminate carried
//! as the error arm of the `Result`. Arity and statically-known argument
//! datatypes are checked when an [`Apply`] is built, so a policy tree
//! that constructs successfully cannot fail those checks at evaluation
//! time; bag-vs-singleton shape is re-checked dynamically.

use std::fmt;
use std::sync::Arc;

use pdp_api::{AttributeValue, Bag, Datatype, IndeterminateError, PolicyBuildError};

use crate::context::EvaluationContext;
use crate::func::{self, Behavior, Function, HigherOrderOp, ParamSpec, ValueKind};

/// The result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprValue {
    Single(AttributeValue),
    Bag(Bag),
}

impl ExprValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            ExprValue::Single(v) => ValueKind::Single(v.datatype()),
            ExprValue::Bag(b) => ValueKind::Bag(b.datatype()),
        }
    }

    /// The single boolean this expression must produce (conditions,
    /// logical arguments).
    pub fn expect_boolean(&self) -> Result<bool, IndeterminateError> {
        match self {
            ExprValue::Single(AttributeValue::Boolean(b)) => Ok(*b),
            other => Err(IndeterminateError::processing_error(format!(
                "Expected a single boolean, got {}",
                other.kind()
            ))),
        }
    }

    pub fn expect_single(&self) -> Result<&AttributeValue, IndeterminateError> {
        match self {
            ExprValue::Single(v) => Ok(v),
            ExprValue::Bag(b) => Err(IndeterminateError::processing_error(format!(
                "Expected a single value, got a bag of {}",
                b.datatype().uri()
            ))),
        }
    }

    pub fn expect_bag(&self) -> Result<&Bag, IndeterminateError> {
        match self {
            ExprValue::Bag(b) => Ok(b),
            ExprValue::Single(v) => Err(IndeterminateError::processing_error(format!(
                "Expected a bag, got a single {}",
                v.datatype().uri()
            ))),
        }
    }
}

impl fmt::Display for ExprValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprValue::Single(v) => write!(f, "{v}"),
            ExprValue::Bag(b) => write!(f, "{b}"),
        }
    }
}

/// A request for all attribute values matching (category, id, datatype,
/// issuer), yielding a bag.
#[derive(Debug, Clone)]
pub struct AttributeDesignator {
    pub category: String,
    pub attribute_id: String,
    pub datatype: Datatype,
    pub issuer: Option<String>,
    pub must_be_present: bool,
}

impl AttributeDesignator {
    pub fn new(
        category: impl Into<String>,
        attribute_id: impl Into<String>,
        datatype: Datatype,
    ) -> Self {
        Self {
            category: category.into(),
            attribute_id: attribute_id.into(),
            datatype,
            issuer: None,
            must_be_present: false,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn must_be_present(mut self) -> Self {
        self.must_be_present = true;
        self
    }

    pub fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> Result<Bag, IndeterminateError> {
        let bag = ctx.resolve_designator(self)?;
        if self.must_be_present && bag.is_empty() {
            return Err(IndeterminateError::missing_attribute(format!(
                "Missing required attribute {} of {} in category {}",
                self.attribute_id,
                self.datatype.uri(),
                self.category
            )));
        }
        Ok(bag)
    }
}

/// A path projection over a category's structured content, yielding a bag.
#[derive(Debug, Clone)]
pub struct AttributeSelector {
    pub category: String,
    pub path: String,
    pub context_selector_id: Option<String>,
    pub datatype: Datatype,
    pub must_be_present: bool,
}

impl AttributeSelector {
    pub fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> Result<Bag, IndeterminateError> {
        let bag = ctx.resolve_selector(self)?;
        if self.must_be_present && bag.is_empty() {
            return Err(IndeterminateError::missing_attribute(format!(
                "Selector {} over category {} selected nothing",
                self.path, self.category
            )));
        }
        Ok(bag)
    }
}

/// A function application, type-checked at construction.
#[derive(Debug, Clone)]
pub struct Apply {
    function: Arc<Function>,
    args: Vec<Expression>,
    /// The application's result type. Usually the function's declared
    /// return; for `map` it is a bag of the sub-function's return type.
    result_kind: ValueKind,
}

impl Apply {
    /// Build an application, verifying arity and every statically-known
    /// argument type against the function's signature.
    pub fn new(function: Arc<Function>, args: Vec<Expression>) -> Result<Self, PolicyBuildError> {
        function.params.check_arity(args.len(), &function.id)?;
        for (position, arg) in args.iter().enumerate() {
            let spec = function.params.spec_at(position);
            match spec {
                ParamSpec::Func => {
                    let sub = match arg {
                        Expression::FunctionRef(f) => f,
                        _ => {
                            return Err(PolicyBuildError::ArgumentType {
                                function: function.id.clone(),
                                position,
                                expected: "function".to_owned(),
                                actual: "expression".to_owned(),
                            })
                        }
                    };
                    if matches!(function.behavior, Behavior::HigherOrder(op) if op.requires_boolean_sub_function())
                        && sub.returns != ValueKind::Single(Datatype::Boolean)
                    {
                        return Err(PolicyBuildError::NonBooleanSubFunction {
                            function: function.id.clone(),
                            actual: sub.returns.to_string(),
                        });
                    }
                }
                ParamSpec::Any => {}
                _ => {
                    if let Some(actual) = arg.static_type() {
                        if !spec.admits(actual) {
                            return Err(PolicyBuildError::ArgumentType {
                                function: function.id.clone(),
                                position,
                                expected: spec.to_string(),
                                actual: actual.to_string(),
                            });
                        }
                    }
                }
            }
        }

        let result_kind = if matches!(
            function.behavior,
            Behavior::HigherOrder(HigherOrderOp::Map)
        ) {
            match args.first() {
                Some(Expression::FunctionRef(sub)) => match sub.returns {
                    ValueKind::Single(dt) => ValueKind::Bag(dt),
                    bag => {
                        return Err(PolicyBuildError::ArgumentType {
                            function: function.id.clone(),
                            position: 0,
                            expected: "function returning a single value".to_owned(),
                            actual: bag.to_string(),
                        })
                    }
                },
                _ => function.returns,
            }
        } else {
            function.returns
        };
        Ok(Self {
            function,
            args,
            result_kind,
        })
    }

    pub fn function(&self) -> &Arc<Function> {
        &self.function
    }

    pub fn args(&self) -> &[Expression] {
        &self.args
    }

    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> Result<ExprValue, IndeterminateError> {
        match &self.function.behavior {
            Behavior::Eager(_) => {
                // Arguments evaluate left to right; the first
                // Indeterminate wins.
                let mut values = Vec::with_capacity(self.args.len());
                for arg in &self.args {
                    values.push(arg.evaluate(ctx)?);
                }
                self.function.invoke(&values)
            }
            Behavior::And => func::logical::evaluate_and(&self.args, ctx),
            Behavior::Or => func::logical::evaluate_or(&self.args, ctx),
            Behavior::NOf => func::logical::evaluate_n_of(&self.args, ctx),
            Behavior::HigherOrder(op) => func::higher_order::evaluate(*op, &self.args, ctx),
        }
    }
}

/// An XACML expression.
#[derive(Debug, Clone)]
pub enum Expression {
    /// A literal attribute value.
    Value(AttributeValue),
    Designator(AttributeDesignator),
    Selector(AttributeSelector),
    /// Reference to a variable defined in the enclosing policy.
    VariableReference(String),
    Apply(Box<Apply>),
    /// A function used as an argument to a higher-order function.
    FunctionRef(Arc<Function>),
}

impl Expression {
    /// Shorthand: look up a standard function and apply it.
    pub fn apply(function_id: &str, args: Vec<Expression>) -> Result<Self, PolicyBuildError> {
        let function = func::function(function_id).ok_or_else(|| {
            PolicyBuildError::UnknownFunction {
                id: function_id.to_owned(),
            }
        })?;
        Ok(Expression::Apply(Box::new(Apply::new(function, args)?)))
    }

    /// Shorthand: a function reference for higher-order arguments.
    pub fn function_ref(function_id: &str) -> Result<Self, PolicyBuildError> {
        let function = func::function(function_id).ok_or_else(|| {
            PolicyBuildError::UnknownFunction {
                id: function_id.to_owned(),
            }
        })?;
        Ok(Expression::FunctionRef(function))
    }

    /// The statically-known result type, when one exists. Variable
    /// references are resolved per enclosing policy and stay unknown
    /// here.
    pub fn static_type(&self) -> Option<ValueKind> {
        match self {
            Expression::Value(v) => Some(ValueKind::Single(v.datatype())),
            Expression::Designator(d) => Some(ValueKind::Bag(d.datatype)),
            Expression::Selector(s) => Some(ValueKind::Bag(s.datatype)),
            Expression::VariableReference(_) => None,
            Expression::Apply(a) => Some(a.result_kind),
            Expression::FunctionRef(_) => None,
        }
    }

    pub fn evaluate(
        &self,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<ExprValue, IndeterminateError> {
        match self {
            Expression::Value(v) => Ok(ExprValue::Single(v.clone())),
            Expression::Designator(d) => d.evaluate(ctx).map(ExprValue::Bag),
            Expression::Selector(s) => s.evaluate(ctx).map(ExprValue::Bag),
            Expression::VariableReference(id) => ctx.variable(id),
            Expression::Apply(a) => a.evaluate(ctx),
            Expression::FunctionRef(f) => Err(IndeterminateError::processing_error(format!(
                "Function {} used outside a higher-order application",
                f.id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdp_api::ident;
    use pdp_api::{Attribute, AttributeProvider, Attributes, Request};

    fn eval(expr: &Expression) -> Result<ExprValue, IndeterminateError> {
        let request = Request::default();
        let providers: Vec<Box<dyn AttributeProvider>> = Vec::new();
        let mut ctx = EvaluationContext::new(&request, &[], false, true, &providers);
        expr.evaluate(&mut ctx)
    }

    fn int(i: i64) -> Expression {
        Expression::Value(AttributeValue::Integer(i))
    }

    #[test]
    fn literal_evaluates_to_itself() {
        let v = eval(&int(5)).unwrap();
        assert_eq!(v, ExprValue::Single(AttributeValue::Integer(5)));
    }

    #[test]
    fn apply_checks_arity_statically() {
        let err = Expression::apply(
            "urn:oasis:names:tc:xacml:1.0:function:integer-equal",
            vec![int(1)],
        )
        .unwrap_err();
        assert!(matches!(err, PolicyBuildError::ArityMismatch { .. }));
    }

    #[test]
    fn apply_checks_argument_types_statically() {
        let err = Expression::apply(
            "urn:oasis:names:tc:xacml:1.0:function:integer-equal",
            vec![int(1), Expression::Value(AttributeValue::String("x".into()))],
        )
        .unwrap_err();
        assert!(matches!(err, PolicyBuildError::ArgumentType { .. }));
    }

    #[test]
    fn unknown_function_rejected() {
        let err = Expression::apply("urn:example:no-such-function", vec![]).unwrap_err();
        assert!(matches!(err, PolicyBuildError::UnknownFunction { .. }));
    }

    #[test]
    fn nested_apply_evaluates() {
        let expr = Expression::apply(
            "urn:oasis:names:tc:xacml:1.0:function:integer-equal",
            vec![
                Expression::apply(
                    "urn:oasis:names:tc:xacml:1.0:function:integer-add",
                    vec![int(2), int(3)],
                )
                .unwrap(),
                int(5),
            ],
        )
        .unwrap();
        assert_eq!(
            eval(&expr).unwrap(),
            ExprValue::Single(AttributeValue::Boolean(true))
        );
    }

    #[test]
    fn missing_must_be_present_lifts_to_missing_attribute() {
        let designator = AttributeDesignator::new(
            ident::CATEGORY_ACCESS_SUBJECT,
            "urn:example:role",
            Datatype::String,
        )
        .must_be_present();
        let err = eval(&Expression::Designator(designator)).unwrap_err();
        assert_eq!(err.code, pdp_api::StatusCode::MissingAttribute);
    }

    #[test]
    fn issuer_filters_request_values() {
        let request = Request {
            attributes: vec![Attributes::new(ident::CATEGORY_ACCESS_SUBJECT)
                .with_attribute(
                    Attribute::new(
                        "urn:example:role",
                        vec![AttributeValue::String("admin".into())],
                    )
                    .with_issuer("urn:example:hr"),
                )
                .with_attribute(Attribute::new(
                    "urn:example:role",
                    vec![AttributeValue::String("guest".into())],
                ))],
            return_policy_id_list: false,
        };
        let providers: Vec<Box<dyn AttributeProvider>> = Vec::new();
        let mut ctx = EvaluationContext::new(&request, &[], false, true, &providers);

        let with_issuer = AttributeDesignator::new(
            ident::CATEGORY_ACCESS_SUBJECT,
            "urn:example:role",
            Datatype::String,
        )
        .with_issuer("urn:example:hr");
        let bag = with_issuer.evaluate(&mut ctx).unwrap();
        assert_eq!(bag.len(), 1);
        assert!(bag.contains(&AttributeValue::String("admin".into())));

        // Without an issuer, every value matches.
        let any_issuer = AttributeDesignator::new(
            ident::CATEGORY_ACCESS_SUBJECT,
            "urn:example:role",
            Datatype::String,
        );
        assert_eq!(any_issuer.evaluate(&mut ctx).unwrap().len(), 2);
    }
}
