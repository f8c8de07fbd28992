//! String functions: concatenation, containment, substring, normalization,
//! and lexicographic comparison.

use aegis_core::{AttributeValue, Datatype, IndeterminateError};

use crate::expr::Value;
use crate::function::{
    FirstOrderFn, FunctionError, FunctionRegistry, Signature, FN_1_0, FN_2_0, FN_3_0,
};
use crate::stdlib::{boolean, int_arg, prim, str_arg, uri_arg};

/// Character-indexed substring with the XACML bounds rules: `end == -1`
/// means "to the end"; anything else out of range is a processing error.
fn substring(input: &str, begin: i64, end: i64) -> Result<String, IndeterminateError> {
    let len = i64::try_from(input.chars().count())
        .map_err(|_| IndeterminateError::processing("string too long"))?;
    if begin < 0 || begin > len {
        return Err(IndeterminateError::processing(format!(
            "substring begin {begin} out of range for length {len}"
        )));
    }
    let end = if end == -1 { len } else { end };
    if end < begin || end > len {
        return Err(IndeterminateError::processing(format!(
            "substring end {end} out of range for length {len}"
        )));
    }
    let begin = usize::try_from(begin).unwrap_or(usize::MAX);
    let end = usize::try_from(end).unwrap_or(usize::MAX);
    Ok(input.chars().skip(begin).take(end - begin).collect())
}

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), FunctionError> {
    let string = prim(Datatype::String);
    let any_uri = prim(Datatype::AnyUri);
    let int = prim(Datatype::Integer);
    let bool_t = prim(Datatype::Boolean);

    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_2_0}string-concatenate"),
        Signature::variadic(vec![string, string], string),
        string,
        |args, _| {
            let mut out = String::new();
            for i in 0..args.len() {
                out.push_str(str_arg(args, i)?);
            }
            Ok(Value::Primitive(AttributeValue::String(out)))
        },
    ))?;

    // Containment tests take the needle first and the haystack second.
    for (suffix, test) in [
        ("starts-with", (|hay: &str, needle: &str| hay.starts_with(needle)) as fn(&str, &str) -> bool),
        ("ends-with", |hay, needle| hay.ends_with(needle)),
        ("contains", |hay, needle| hay.contains(needle)),
    ] {
        registry.register_first_order(FirstOrderFn::eager(
            format!("{FN_3_0}string-{suffix}"),
            Signature::fixed(vec![string, string]),
            bool_t,
            move |args, _| Ok(boolean(test(str_arg(args, 1)?, str_arg(args, 0)?))),
        ))?;
        registry.register_first_order(FirstOrderFn::eager(
            format!("{FN_3_0}anyURI-{suffix}"),
            Signature::fixed(vec![string, any_uri]),
            bool_t,
            move |args, _| Ok(boolean(test(uri_arg(args, 1)?, str_arg(args, 0)?))),
        ))?;
    }

    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_3_0}string-substring"),
        Signature::fixed(vec![string, int, int]),
        string,
        |args, _| {
            let s = substring(str_arg(args, 0)?, int_arg(args, 1)?, int_arg(args, 2)?)?;
            Ok(Value::Primitive(AttributeValue::String(s)))
        },
    ))?;
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_3_0}anyURI-substring"),
        Signature::fixed(vec![any_uri, int, int]),
        string,
        |args, _| {
            let s = substring(uri_arg(args, 0)?, int_arg(args, 1)?, int_arg(args, 2)?)?;
            Ok(Value::Primitive(AttributeValue::String(s)))
        },
    ))?;

    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}string-normalize-space"),
        Signature::fixed(vec![string]),
        string,
        |args, _| Ok(Value::Primitive(AttributeValue::String(str_arg(args, 0)?.trim().to_owned()))),
    ))?;
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}string-normalize-to-lower-case"),
        Signature::fixed(vec![string]),
        string,
        |args, _| {
            Ok(Value::Primitive(AttributeValue::String(str_arg(args, 0)?.to_lowercase())))
        },
    ))?;

    for (suffix, cmp) in [
        ("greater-than", (|a: &str, b: &str| a > b) as fn(&str, &str) -> bool),
        ("greater-than-or-equal", |a, b| a >= b),
        ("less-than", |a, b| a < b),
        ("less-than-or-equal", |a, b| a <= b),
    ] {
        registry.register_first_order(FirstOrderFn::eager(
            format!("{FN_1_0}string-{suffix}"),
            Signature::fixed(vec![string, string]),
            bool_t,
            move |args, _| Ok(boolean(cmp(str_arg(args, 0)?, str_arg(args, 1)?))),
        ))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;
    use crate::function::FunctionRegistry;

    fn s(v: &str) -> Value {
        Value::Primitive(AttributeValue::String(v.into()))
    }

    fn i(v: i64) -> Value {
        Value::Primitive(AttributeValue::Integer(v))
    }

    fn invoke(id: &str, args: &[Value]) -> aegis_core::EvalResult<Value> {
        let registry = FunctionRegistry::standard();
        let func = registry.get_first_order(id).expect(id);
        let ctx = EvaluationContext::constant_folding();
        func.invoke_values(args, &ctx)
    }

    #[test]
    fn substring_to_end_with_minus_one() {
        let id = format!("{FN_3_0}string-substring");
        let r = invoke(&id, &[s("First test"), i(6), i(-1)]).unwrap();
        assert_eq!(r, s("test"));
    }

    #[test]
    fn substring_out_of_range_is_a_processing_error() {
        let id = format!("{FN_3_0}string-substring");
        for (begin, end) in [(6, 106), (-2, 4), (0, -5), (4, 2), (11, -1)] {
            let err = invoke(&id, &[s("First test"), i(begin), i(end)]).unwrap_err();
            assert_eq!(err.code(), aegis_core::StatusCode::ProcessingError, "{begin}..{end}");
        }
    }

    #[test]
    fn containment_takes_needle_first() {
        let id = format!("{FN_3_0}string-starts-with");
        assert_eq!(invoke(&id, &[s("First"), s("First test")]).unwrap(), Value::boolean(true));
        assert_eq!(invoke(&id, &[s("First test"), s("First")]).unwrap(), Value::boolean(false));
        let id = format!("{FN_3_0}string-contains");
        assert_eq!(invoke(&id, &[s("st te"), s("First test")]).unwrap(), Value::boolean(true));
    }

    #[test]
    fn concatenate_is_variadic() {
        let id = format!("{FN_2_0}string-concatenate");
        assert_eq!(invoke(&id, &[s("a"), s("b"), s("c")]).unwrap(), s("abc"));
    }

    #[test]
    fn normalize() {
        let id = format!("{FN_1_0}string-normalize-space");
        assert_eq!(invoke(&id, &[s("  x y  ")]).unwrap(), s("x y"));
        let id = format!("{FN_1_0}string-normalize-to-lower-case");
        assert_eq!(invoke(&id, &[s("MiXeD")]).unwrap(), s("mixed"));
    }
}
