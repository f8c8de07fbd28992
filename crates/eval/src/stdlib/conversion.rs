//! Numeric promotion and the `<T>-from-string` / `string-from-<T>`
//! conversion families.

use aegis_core::{AttributeValue, Datatype, IndeterminateError};

use crate::expr::Value;
use crate::function::{FirstOrderFn, FunctionError, FunctionRegistry, Signature, FN_1_0, FN_3_0};
use crate::stdlib::{double_arg, int_arg, prim, prim_arg, str_arg};

/// Datatypes with 3.0 string conversions in both directions.
const CONVERTIBLE: [Datatype; 13] = [
    Datatype::Boolean,
    Datatype::Integer,
    Datatype::Double,
    Datatype::Time,
    Datatype::Date,
    Datatype::DateTime,
    Datatype::AnyUri,
    Datatype::DayTimeDuration,
    Datatype::YearMonthDuration,
    Datatype::X500Name,
    Datatype::Rfc822Name,
    Datatype::IpAddress,
    Datatype::DnsName,
];

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), FunctionError> {
    let int = prim(Datatype::Integer);
    let dbl = prim(Datatype::Double);
    let string = prim(Datatype::String);

    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}double-to-integer"),
        Signature::fixed(vec![dbl]),
        int,
        |args, _| {
            let d = double_arg(args, 0)?.trunc();
            if !d.is_finite() || d < i64::MIN as f64 || d > i64::MAX as f64 {
                return Err(IndeterminateError::processing("double-to-integer out of range"));
            }
            #[allow(clippy::cast_possible_truncation)]
            let truncated = d as i64;
            Ok(Value::Primitive(AttributeValue::Integer(truncated)))
        },
    ))?;
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}integer-to-double"),
        Signature::fixed(vec![int]),
        dbl,
        |args, _| {
            #[allow(clippy::cast_precision_loss)]
            let widened = int_arg(args, 0)? as f64;
            Ok(Value::Primitive(AttributeValue::Double(widened)))
        },
    ))?;

    for dt in CONVERTIBLE {
        let short = dt.short_name();
        registry.register_first_order(FirstOrderFn::eager(
            format!("{FN_3_0}{short}-from-string"),
            Signature::fixed(vec![string]),
            prim(dt),
            move |args, _| {
                let input = str_arg(args, 0)?;
                let value = AttributeValue::parse_lexical(dt, input)
                    .map_err(|e| IndeterminateError::syntax(e.to_string()))?;
                Ok(Value::Primitive(value))
            },
        ))?;
        registry.register_first_order(FirstOrderFn::eager(
            format!("{FN_3_0}string-from-{short}"),
            Signature::fixed(vec![prim(dt)]),
            string,
            |args, _| {
                Ok(Value::Primitive(AttributeValue::String(prim_arg(args, 0)?.canonical())))
            },
        ))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;

    fn s(v: &str) -> Value {
        Value::Primitive(AttributeValue::String(v.into()))
    }

    fn invoke(id: &str, args: &[Value]) -> aegis_core::EvalResult<Value> {
        let registry = FunctionRegistry::standard();
        let func = registry.get_first_order(id).expect(id);
        let ctx = EvaluationContext::constant_folding();
        func.invoke_values(args, &ctx)
    }

    #[test]
    fn boolean_from_string_is_strict() {
        let id = format!("{FN_3_0}boolean-from-string");
        assert_eq!(invoke(&id, &[s("true")]).unwrap(), Value::boolean(true));
        assert_eq!(invoke(&id, &[s("false")]).unwrap(), Value::boolean(false));
        let err = invoke(&id, &[s("error")]).unwrap_err();
        assert_eq!(err.code(), aegis_core::StatusCode::SyntaxError);
    }

    #[test]
    fn round_trip_through_strings() {
        for (dt, lexical) in [
            (Datatype::Integer, "-5"),
            (Datatype::Double, "2.5"),
            (Datatype::Date, "2002-09-24"),
            (Datatype::DayTimeDuration, "P1DT2H"),
            (Datatype::Rfc822Name, "alice@example.com"),
        ] {
            let short = dt.short_name();
            let parsed = invoke(&format!("{FN_3_0}{short}-from-string"), &[s(lexical)]).unwrap();
            let back = invoke(&format!("{FN_3_0}string-from-{short}"), &[parsed.clone()]).unwrap();
            let reparsed = invoke(
                &format!("{FN_3_0}{short}-from-string"),
                &[back],
            )
            .unwrap();
            assert_eq!(parsed, reparsed, "{short} {lexical}");
        }
    }

    #[test]
    fn double_to_integer_truncates() {
        let id = format!("{FN_1_0}double-to-integer");
        let d = Value::Primitive(AttributeValue::Double(-2.9));
        assert_eq!(invoke(&id, &[d]).unwrap(), Value::Primitive(AttributeValue::Integer(-2)));
    }
}
