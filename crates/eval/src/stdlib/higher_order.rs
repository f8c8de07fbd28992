//! Higher-order bag functions: any-of / all-of and their two-bag variants,
//! the generalized Cartesian any-of-any, and map.
//!
//! Bag arguments are evaluated exactly once per call; sub-function
//! arguments are passed by value; any Indeterminate from the sub-function
//! propagates immediately.

use std::sync::Arc;

use aegis_core::{Bag, Datatype, EvalResult, IndeterminateError, ValueType};

use crate::context::EvaluationContext;
use crate::expr::{Expression, Value};
use crate::function::{
    FirstOrderFn, FunctionError, FunctionRegistry, HigherOrderFn, HigherOrderKind, FN_3_0,
};

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), FunctionError> {
    for (name, kind) in [
        ("any-of", HigherOrderKind::AnyOf),
        ("all-of", HigherOrderKind::AllOf),
        ("any-of-any", HigherOrderKind::AnyOfAny),
        ("all-of-any", HigherOrderKind::AllOfAny),
        ("any-of-all", HigherOrderKind::AnyOfAll),
        ("all-of-all", HigherOrderKind::AllOfAll),
        ("map", HigherOrderKind::Map),
    ] {
        registry.register_higher_order(HigherOrderFn::new(format!("{FN_3_0}{name}"), kind))?;
    }
    Ok(())
}

/// A bound higher-order application: the shape, the first-order
/// sub-function, and the type-checked argument expressions.
#[derive(Debug)]
pub struct HigherOrderCall {
    func: Arc<HigherOrderFn>,
    sub: Arc<FirstOrderFn>,
    args: Vec<Expression>,
    bag_positions: Vec<usize>,
    return_type: ValueType,
}

impl HigherOrderCall {
    /// Type-checks and binds the call. Every argument's primitive-or-element
    /// type must equal the sub-function's parameter type at that position;
    /// the per-shape structural constraints (bag counts, sub-function
    /// return type) are enforced here, fatally.
    pub fn bind(
        func: Arc<HigherOrderFn>,
        sub: Arc<FirstOrderFn>,
        args: Vec<Expression>,
    ) -> Result<Self, FunctionError> {
        let id = func.id().to_owned();
        let kind = func.kind();

        let sub_return = sub.return_type();
        let return_type = match kind {
            HigherOrderKind::Map => match sub_return {
                ValueType::Primitive(dt) => ValueType::Bag(dt),
                other => {
                    return Err(FunctionError::InvalidHigherOrderCall {
                        id,
                        reason: format!("map sub-function must return a primitive, not {other}"),
                    })
                }
            },
            _ => {
                if sub_return != ValueType::Primitive(Datatype::Boolean) {
                    return Err(FunctionError::SubFunctionNotBoolean { id, found: sub_return });
                }
                ValueType::Primitive(Datatype::Boolean)
            }
        };

        let mut element_types = Vec::with_capacity(args.len());
        let mut bag_positions = Vec::new();
        for (index, arg) in args.iter().enumerate() {
            match arg.return_type() {
                ValueType::Bag(dt) => {
                    bag_positions.push(index);
                    element_types.push(ValueType::Primitive(dt));
                }
                ValueType::Primitive(dt) => element_types.push(ValueType::Primitive(dt)),
                ValueType::Function => {
                    return Err(FunctionError::InvalidHigherOrderCall {
                        id,
                        reason: format!("argument {index} is a nested function reference"),
                    })
                }
            }
        }
        sub.signature().check(sub.id(), &element_types)?;

        match kind {
            HigherOrderKind::AnyOf | HigherOrderKind::AllOf | HigherOrderKind::Map => {
                if bag_positions.len() != 1 {
                    return Err(FunctionError::InvalidHigherOrderCall {
                        id,
                        reason: format!(
                            "exactly one bag argument required, found {}",
                            bag_positions.len()
                        ),
                    });
                }
            }
            HigherOrderKind::AnyOfAny => {
                if args.is_empty() {
                    return Err(FunctionError::InvalidHigherOrderCall {
                        id,
                        reason: "at least one argument required".into(),
                    });
                }
            }
            HigherOrderKind::AllOfAny
            | HigherOrderKind::AnyOfAll
            | HigherOrderKind::AllOfAll => {
                if args.len() != 2 || bag_positions.len() != 2 {
                    return Err(FunctionError::InvalidHigherOrderCall {
                        id,
                        reason: "exactly two bag arguments required".into(),
                    });
                }
            }
        }

        Ok(Self { func, sub, args, bag_positions, return_type })
    }

    /// The id of the higher-order function.
    #[must_use]
    pub fn function_id(&self) -> &str {
        self.func.id()
    }

    /// The bound sub-function.
    #[must_use]
    pub fn sub_function(&self) -> &Arc<FirstOrderFn> {
        &self.sub
    }

    /// The static return type: boolean, or bag-of-T for map.
    #[must_use]
    pub const fn return_type(&self) -> ValueType {
        self.return_type
    }

    /// Evaluates the call.
    pub fn invoke(&self, ctx: &EvaluationContext<'_>) -> EvalResult<Value> {
        match self.func.kind() {
            HigherOrderKind::AnyOf => self.scan_one_bag(ctx, true).map(Value::boolean),
            HigherOrderKind::AllOf => self.scan_one_bag(ctx, false).map(Value::boolean),
            HigherOrderKind::AnyOfAny => self.cartesian_any(ctx).map(Value::boolean),
            HigherOrderKind::AllOfAny => self.two_bags(ctx, TwoBagShape::AllOfAny),
            HigherOrderKind::AnyOfAll => self.two_bags(ctx, TwoBagShape::AnyOfAll),
            HigherOrderKind::AllOfAll => self.two_bags(ctx, TwoBagShape::AllOfAll),
            HigherOrderKind::Map => self.map(ctx),
        }
    }

    fn evaluate_args(&self, ctx: &EvaluationContext<'_>) -> EvalResult<Vec<Value>> {
        self.args.iter().map(|a| a.evaluate(ctx)).collect()
    }

    fn check_product(ctx: &EvaluationContext<'_>, product: u128) -> EvalResult<()> {
        let max = ctx.limits().max_product_size as u128;
        if product > max {
            return Err(IndeterminateError::processing(format!(
                "higher-order product of {product} tuples exceeds the configured maximum of {max}"
            )));
        }
        Ok(())
    }

    /// any-of (`circuit = true`) and all-of (`circuit = false`): one bag,
    /// other arguments held constant. Short-circuits when the sub-function
    /// returns `circuit`; an empty bag yields `!circuit`.
    fn scan_one_bag(&self, ctx: &EvaluationContext<'_>, circuit: bool) -> EvalResult<bool> {
        let values = self.evaluate_args(ctx)?;
        let bag_index = self.bag_positions[0];
        let bag = values[bag_index].expect_bag()?.clone();
        let mut scratch = values;
        for element in bag.iter() {
            scratch[bag_index] = Value::Primitive(element.clone());
            let result = self.sub.invoke_values(&scratch, ctx)?.expect_boolean()?;
            if result == circuit {
                return Ok(circuit);
            }
        }
        Ok(!circuit)
    }

    /// any-of-any: Cartesian enumeration over every argument, a primitive
    /// contributing one value and a bag its elements. An empty bag anywhere
    /// empties the product, yielding false.
    fn cartesian_any(&self, ctx: &EvaluationContext<'_>) -> EvalResult<bool> {
        let values = self.evaluate_args(ctx)?;
        let mut lists: Vec<Vec<Value>> = Vec::with_capacity(values.len());
        let mut product: u128 = 1;
        for value in values {
            let list = match value {
                Value::Bag(bag) => {
                    bag.iter().cloned().map(Value::Primitive).collect::<Vec<_>>()
                }
                primitive => vec![primitive],
            };
            if list.is_empty() {
                return Ok(false);
            }
            product = product.saturating_mul(list.len() as u128);
            lists.push(list);
        }
        Self::check_product(ctx, product)?;
        let mut chosen = Vec::with_capacity(lists.len());
        self.enumerate(&lists, &mut chosen, ctx)
    }

    fn enumerate(
        &self,
        lists: &[Vec<Value>],
        chosen: &mut Vec<Value>,
        ctx: &EvaluationContext<'_>,
    ) -> EvalResult<bool> {
        let depth = chosen.len();
        if depth == lists.len() {
            return self.sub.invoke_values(chosen, ctx)?.expect_boolean();
        }
        for value in &lists[depth] {
            chosen.push(value.clone());
            let found = self.enumerate(lists, chosen, ctx)?;
            chosen.pop();
            if found {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn two_bags(&self, ctx: &EvaluationContext<'_>, shape: TwoBagShape) -> EvalResult<Value> {
        let values = self.evaluate_args(ctx)?;
        let first = values[0].expect_bag()?;
        let second = values[1].expect_bag()?;
        Self::check_product(ctx, first.len() as u128 * second.len() as u128)?;

        let call = |x: &aegis_core::AttributeValue, y: &aegis_core::AttributeValue| {
            let pair = [Value::Primitive(x.clone()), Value::Primitive(y.clone())];
            self.sub.invoke_values(&pair, ctx)?.expect_boolean()
        };

        let result = match shape {
            // ∀ x∈B₀ ∀ y∈B₁ : f(x, y)
            TwoBagShape::AllOfAll => {
                let mut all = true;
                'outer: for x in first.iter() {
                    for y in second.iter() {
                        if !call(x, y)? {
                            all = false;
                            break 'outer;
                        }
                    }
                }
                all
            }
            // ∀ x∈B₀ ∃ y∈B₁ : f(x, y)
            TwoBagShape::AllOfAny => {
                let mut all = true;
                for x in first.iter() {
                    let mut any = false;
                    for y in second.iter() {
                        if call(x, y)? {
                            any = true;
                            break;
                        }
                    }
                    if !any {
                        all = false;
                        break;
                    }
                }
                all
            }
            // ∀ y∈B₁ ∃ x∈B₀ : f(x, y)
            TwoBagShape::AnyOfAll => {
                let mut all = true;
                for y in second.iter() {
                    let mut any = false;
                    for x in first.iter() {
                        if call(x, y)? {
                            any = true;
                            break;
                        }
                    }
                    if !any {
                        all = false;
                        break;
                    }
                }
                all
            }
        };
        Ok(Value::boolean(result))
    }

    /// map: the sub-function applied to each element of the one bag, other
    /// arguments held constant; results collected into a bag of the
    /// sub-function's return datatype.
    fn map(&self, ctx: &EvaluationContext<'_>) -> EvalResult<Value> {
        let ValueType::Bag(element_type) = self.return_type else {
            return Err(IndeterminateError::processing("map with a non-bag return type"));
        };
        let values = self.evaluate_args(ctx)?;
        let bag_index = self.bag_positions[0];
        let bag = values[bag_index].expect_bag()?.clone();
        let mut scratch = values;
        let mut results = Vec::with_capacity(bag.len());
        for element in bag.iter() {
            scratch[bag_index] = Value::Primitive(element.clone());
            let result = self.sub.invoke_values(&scratch, ctx)?;
            results.push(result.expect_primitive()?.clone());
        }
        let bag = Bag::new(element_type, results)
            .map_err(|e| IndeterminateError::processing(e.to_string()))?;
        Ok(Value::Bag(bag))
    }
}

enum TwoBagShape {
    AllOfAny,
    AnyOfAll,
    AllOfAll,
}

#[cfg(test)]
mod tests {
    use aegis_core::AttributeValue;

    use super::*;
    use crate::function::{FunctionRegistry, FN_1_0};

    fn registry() -> &'static FunctionRegistry {
        FunctionRegistry::standard()
    }

    fn string_equal() -> Expression {
        let sub = registry().get_first_order(&format!("{FN_1_0}string-equal")).unwrap();
        Expression::FunctionReference(Arc::clone(sub))
    }

    fn s(v: &str) -> Expression {
        Expression::constant(Value::Primitive(AttributeValue::String(v.into())))
    }

    fn string_bag(values: &[&str]) -> Expression {
        let values = values.iter().map(|v| AttributeValue::String((*v).into())).collect();
        Expression::constant(Value::Bag(
            Bag::new(Datatype::String, values).expect("homogeneous bag"),
        ))
    }

    fn apply(name: &str, args: Vec<Expression>) -> Result<Expression, FunctionError> {
        let func = registry().get(&format!("{FN_3_0}{name}")).expect(name);
        Expression::apply(func, args)
    }

    fn eval_to_bool(expr: &Expression) -> bool {
        let ctx = EvaluationContext::constant_folding();
        expr.evaluate(&ctx).unwrap().expect_boolean().unwrap()
    }

    #[test]
    fn any_of_scans_the_bag() {
        let expr =
            apply("any-of", vec![string_equal(), s("test"), string_bag(&["a", "test", "b"])])
                .unwrap();
        assert!(eval_to_bool(&expr));
        let expr = apply("any-of", vec![string_equal(), s("test"), string_bag(&[])]).unwrap();
        assert!(!eval_to_bool(&expr));
    }

    #[test]
    fn all_of_requires_every_element() {
        let expr = apply("all-of", vec![string_equal(), s("x"), string_bag(&["x", "x"])]).unwrap();
        assert!(eval_to_bool(&expr));
        let expr = apply("all-of", vec![string_equal(), s("x"), string_bag(&["x", "y"])]).unwrap();
        assert!(!eval_to_bool(&expr));
        // Vacuously true over the empty bag.
        let expr = apply("all-of", vec![string_equal(), s("x"), string_bag(&[])]).unwrap();
        assert!(eval_to_bool(&expr));
    }

    #[test]
    fn any_of_any_enumerates_the_product() {
        let expr = apply(
            "any-of-any",
            vec![string_equal(), string_bag(&["a", "b"]), string_bag(&["c", "b"])],
        )
        .unwrap();
        assert!(eval_to_bool(&expr));
        let expr = apply(
            "any-of-any",
            vec![string_equal(), string_bag(&["a", "b"]), string_bag(&[])],
        )
        .unwrap();
        assert!(!eval_to_bool(&expr));
    }

    #[test]
    fn two_bag_quantifiers() {
        let b0 = || string_bag(&["a", "b"]);
        let all_of_any =
            apply("all-of-any", vec![string_equal(), b0(), string_bag(&["b", "a", "z"])]).unwrap();
        assert!(eval_to_bool(&all_of_any));
        let all_of_any =
            apply("all-of-any", vec![string_equal(), b0(), string_bag(&["a", "z"])]).unwrap();
        assert!(!eval_to_bool(&all_of_any));

        let any_of_all =
            apply("any-of-all", vec![string_equal(), b0(), string_bag(&["a", "a", "b"])]).unwrap();
        assert!(eval_to_bool(&any_of_all));

        let all_of_all =
            apply("all-of-all", vec![string_equal(), string_bag(&["a", "a"]), string_bag(&["a"])])
                .unwrap();
        assert!(eval_to_bool(&all_of_all));
        let all_of_all =
            apply("all-of-all", vec![string_equal(), b0(), string_bag(&["a"])]).unwrap();
        assert!(!eval_to_bool(&all_of_all));
    }

    #[test]
    fn map_converts_each_element() {
        let from_integer = registry()
            .get_first_order(&format!("{FN_3_0}string-from-integer"))
            .unwrap();
        let ints = vec![1i64, -5, 0]
            .into_iter()
            .map(AttributeValue::Integer)
            .collect::<Vec<_>>();
        let bag = Expression::constant(Value::Bag(Bag::new(Datatype::Integer, ints).unwrap()));
        let expr = apply(
            "map",
            vec![Expression::FunctionReference(Arc::clone(from_integer)), bag],
        )
        .unwrap();
        let ctx = EvaluationContext::constant_folding();
        let result = expr.evaluate(&ctx).unwrap();
        let result = result.expect_bag().unwrap();
        assert_eq!(result.datatype(), Datatype::String);
        let strings: Vec<String> =
            result.iter().map(aegis_core::AttributeValue::canonical).collect();
        assert_eq!(strings, ["1", "-5", "0"]);
    }

    #[test]
    fn binding_rejects_structural_violations() {
        // Two bags where any-of allows only one.
        let err = apply(
            "any-of",
            vec![string_equal(), string_bag(&["a"]), string_bag(&["b"])],
        )
        .unwrap_err();
        assert!(matches!(err, FunctionError::InvalidHigherOrderCall { .. }));

        // Non-boolean sub-function for a quantifier.
        let from_integer = registry()
            .get_first_order(&format!("{FN_3_0}string-from-integer"))
            .unwrap();
        let func = registry().get(&format!("{FN_3_0}any-of")).unwrap();
        let err = Expression::apply(
            func,
            vec![
                Expression::FunctionReference(Arc::clone(from_integer)),
                Expression::constant(Value::Bag(Bag::empty(Datatype::Integer))),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, FunctionError::SubFunctionNotBoolean { .. }));

        // Missing function reference entirely.
        let func = registry().get(&format!("{FN_3_0}any-of")).unwrap();
        let err = Expression::apply(func, vec![s("x"), string_bag(&["x"])]).unwrap_err();
        assert!(matches!(err, FunctionError::MissingSubFunction { .. }));
    }

    #[test]
    fn product_limit_is_enforced() {
        let big = |tag: char| {
            let values = (0..400).map(|i| AttributeValue::String(format!("{tag}{i}"))).collect();
            Expression::constant(Value::Bag(Bag::new(Datatype::String, values).unwrap()))
        };
        // 400 * 400 = 160k tuples, beyond the default cap of 100k. Bind the
        // call directly so constant folding cannot swallow the error.
        let func = registry().get(&format!("{FN_3_0}any-of-any")).unwrap();
        let call =
            crate::expr::FunctionCall::bind(func, vec![string_equal(), big('a'), big('b')])
                .unwrap();
        let ctx = EvaluationContext::constant_folding();
        let err = call.invoke(&ctx).unwrap_err();
        assert_eq!(err.code(), aegis_core::StatusCode::ProcessingError);
    }
}
