//! Integer and double arithmetic and comparisons.

use aegis_core::{AttributeValue, Datatype, IndeterminateError};

use crate::expr::Value;
use crate::function::{FirstOrderFn, FunctionError, FunctionRegistry, Signature, FN_1_0};
use crate::stdlib::{boolean, double_arg, int_arg, prim};

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), FunctionError> {
    let int = prim(Datatype::Integer);
    let dbl = prim(Datatype::Double);
    let bool_t = prim(Datatype::Boolean);

    // add and multiply take two or more arguments; subtract, divide, and
    // mod exactly two.
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}integer-add"),
        Signature::variadic(vec![int, int], int),
        int,
        |args, _| {
            let mut acc = 0i64;
            for i in 0..args.len() {
                acc = acc
                    .checked_add(int_arg(args, i)?)
                    .ok_or_else(|| IndeterminateError::processing("integer-add overflow"))?;
            }
            Ok(Value::Primitive(AttributeValue::Integer(acc)))
        },
    ))?;
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}integer-multiply"),
        Signature::variadic(vec![int, int], int),
        int,
        |args, _| {
            let mut acc = 1i64;
            for i in 0..args.len() {
                acc = acc
                    .checked_mul(int_arg(args, i)?)
                    .ok_or_else(|| IndeterminateError::processing("integer-multiply overflow"))?;
            }
            Ok(Value::Primitive(AttributeValue::Integer(acc)))
        },
    ))?;
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}integer-subtract"),
        Signature::fixed(vec![int, int]),
        int,
        |args, _| {
            let r = int_arg(args, 0)?
                .checked_sub(int_arg(args, 1)?)
                .ok_or_else(|| IndeterminateError::processing("integer-subtract overflow"))?;
            Ok(Value::Primitive(AttributeValue::Integer(r)))
        },
    ))?;
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}integer-divide"),
        Signature::fixed(vec![int, int]),
        int,
        |args, _| {
            let divisor = int_arg(args, 1)?;
            if divisor == 0 {
                return Err(IndeterminateError::processing("integer-divide by zero"));
            }
            let r = int_arg(args, 0)?
                .checked_div(divisor)
                .ok_or_else(|| IndeterminateError::processing("integer-divide overflow"))?;
            Ok(Value::Primitive(AttributeValue::Integer(r)))
        },
    ))?;
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}integer-mod"),
        Signature::fixed(vec![int, int]),
        int,
        |args, _| {
            let divisor = int_arg(args, 1)?;
            if divisor == 0 {
                return Err(IndeterminateError::processing("integer-mod by zero"));
            }
            let r = int_arg(args, 0)?
                .checked_rem(divisor)
                .ok_or_else(|| IndeterminateError::processing("integer-mod overflow"))?;
            Ok(Value::Primitive(AttributeValue::Integer(r)))
        },
    ))?;
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}integer-abs"),
        Signature::fixed(vec![int]),
        int,
        |args, _| {
            let r = int_arg(args, 0)?
                .checked_abs()
                .ok_or_else(|| IndeterminateError::processing("integer-abs overflow"))?;
            Ok(Value::Primitive(AttributeValue::Integer(r)))
        },
    ))?;

    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}double-add"),
        Signature::variadic(vec![dbl, dbl], dbl),
        dbl,
        |args, _| {
            let mut acc = 0f64;
            for i in 0..args.len() {
                acc += double_arg(args, i)?;
            }
            Ok(Value::Primitive(AttributeValue::Double(acc)))
        },
    ))?;
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}double-multiply"),
        Signature::variadic(vec![dbl, dbl], dbl),
        dbl,
        |args, _| {
            let mut acc = 1f64;
            for i in 0..args.len() {
                acc *= double_arg(args, i)?;
            }
            Ok(Value::Primitive(AttributeValue::Double(acc)))
        },
    ))?;
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}double-subtract"),
        Signature::fixed(vec![dbl, dbl]),
        dbl,
        |args, _| {
            Ok(Value::Primitive(AttributeValue::Double(double_arg(args, 0)? - double_arg(args, 1)?)))
        },
    ))?;
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}double-divide"),
        Signature::fixed(vec![dbl, dbl]),
        dbl,
        |args, _| {
            let divisor = double_arg(args, 1)?;
            if divisor == 0.0 {
                return Err(IndeterminateError::processing("double-divide by zero"));
            }
            Ok(Value::Primitive(AttributeValue::Double(double_arg(args, 0)? / divisor)))
        },
    ))?;
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}double-abs"),
        Signature::fixed(vec![dbl]),
        dbl,
        |args, _| Ok(Value::Primitive(AttributeValue::Double(double_arg(args, 0)?.abs()))),
    ))?;
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}round"),
        Signature::fixed(vec![dbl]),
        dbl,
        |args, _| Ok(Value::Primitive(AttributeValue::Double(double_arg(args, 0)?.round()))),
    ))?;
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}floor"),
        Signature::fixed(vec![dbl]),
        dbl,
        |args, _| Ok(Value::Primitive(AttributeValue::Double(double_arg(args, 0)?.floor()))),
    ))?;

    // Comparisons.
    for (suffix, int_cmp, dbl_cmp) in [
        (
            "greater-than",
            (|a, b| a > b) as fn(i64, i64) -> bool,
            (|a, b| a > b) as fn(f64, f64) -> bool,
        ),
        ("greater-than-or-equal", |a, b| a >= b, |a, b| a >= b),
        ("less-than", |a, b| a < b, |a, b| a < b),
        ("less-than-or-equal", |a, b| a <= b, |a, b| a <= b),
    ] {
        registry.register_first_order(FirstOrderFn::eager(
            format!("{FN_1_0}integer-{suffix}"),
            Signature::fixed(vec![int, int]),
            bool_t,
            move |args, _| Ok(boolean(int_cmp(int_arg(args, 0)?, int_arg(args, 1)?))),
        ))?;
        registry.register_first_order(FirstOrderFn::eager(
            format!("{FN_1_0}double-{suffix}"),
            Signature::fixed(vec![dbl, dbl]),
            bool_t,
            move |args, _| Ok(boolean(dbl_cmp(double_arg(args, 0)?, double_arg(args, 1)?))),
        ))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;

    fn int_v(n: i64) -> Value {
        Value::Primitive(AttributeValue::Integer(n))
    }

    fn invoke(id: &str, args: &[Value]) -> aegis_core::EvalResult<Value> {
        let registry = FunctionRegistry::standard();
        let func = registry.get_first_order(id).expect(id);
        let ctx = EvaluationContext::constant_folding();
        func.invoke_values(args, &ctx)
    }

    #[test]
    fn add_is_variadic() {
        let id = format!("{FN_1_0}integer-add");
        assert_eq!(invoke(&id, &[int_v(1), int_v(2), int_v(3)]).unwrap(), int_v(6));
    }

    #[test]
    fn division_by_zero_is_a_processing_error() {
        for id in [format!("{FN_1_0}integer-divide"), format!("{FN_1_0}integer-mod")] {
            let err = invoke(&id, &[int_v(5), int_v(0)]).unwrap_err();
            assert_eq!(err.code(), aegis_core::StatusCode::ProcessingError);
        }
    }

    #[test]
    fn overflow_is_a_processing_error() {
        let id = format!("{FN_1_0}integer-add");
        assert!(invoke(&id, &[int_v(i64::MAX), int_v(1)]).is_err());
    }

    #[test]
    fn comparisons() {
        assert_eq!(
            invoke(&format!("{FN_1_0}integer-greater-than"), &[int_v(3), int_v(2)]).unwrap(),
            Value::boolean(true)
        );
        assert_eq!(
            invoke(&format!("{FN_1_0}integer-less-than-or-equal"), &[int_v(3), int_v(3)]).unwrap(),
            Value::boolean(true)
        );
    }

    #[test]
    fn round_and_floor() {
        let d = |x: f64| Value::Primitive(AttributeValue::Double(x));
        assert_eq!(invoke(&format!("{FN_1_0}round"), &[d(2.5)]).unwrap(), d(3.0));
        assert_eq!(invoke(&format!("{FN_1_0}floor"), &[d(2.9)]).unwrap(), d(2.0));
    }
}
