//! Per-datatype equality functions.

use aegis_core::Datatype;

use crate::function::{FirstOrderFn, FunctionError, FunctionRegistry, Signature, FN_3_0};
use crate::stdlib::{boolean, family_prefix, prim, prim_arg, str_arg};

/// Datatypes with a standard `-equal` function. ipAddress and dnsName have
/// no equality function in the standard set; their bags still compare
/// internally through value equality.
const EQUAL_TYPES: [Datatype; 14] = [
    Datatype::String,
    Datatype::Boolean,
    Datatype::Integer,
    Datatype::Double,
    Datatype::Date,
    Datatype::Time,
    Datatype::DateTime,
    Datatype::DayTimeDuration,
    Datatype::YearMonthDuration,
    Datatype::AnyUri,
    Datatype::X500Name,
    Datatype::Rfc822Name,
    Datatype::HexBinary,
    Datatype::Base64Binary,
];

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), FunctionError> {
    for dt in EQUAL_TYPES {
        let id = format!("{}{}-equal", family_prefix(dt), dt.short_name());
        registry.register_first_order(FirstOrderFn::eager(
            id,
            Signature::fixed(vec![prim(dt), prim(dt)]),
            prim(Datatype::Boolean),
            |args, _| Ok(boolean(prim_arg(args, 0)? == prim_arg(args, 1)?)),
        ))?;
    }

    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_3_0}string-equal-ignore-case"),
        Signature::fixed(vec![prim(Datatype::String), prim(Datatype::String)]),
        prim(Datatype::Boolean),
        |args, _| {
            let a = str_arg(args, 0)?;
            let b = str_arg(args, 1)?;
            Ok(boolean(a.eq_ignore_ascii_case(b)))
        },
    ))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use aegis_core::AttributeValue;

    use crate::context::EvaluationContext;
    use crate::expr::Value;
    use crate::function::{FunctionRegistry, FN_1_0, FN_3_0};

    fn invoke(id: &str, args: &[Value]) -> crate::expr::Value {
        let registry = FunctionRegistry::standard();
        let func = registry.get_first_order(id).expect(id);
        let ctx = EvaluationContext::constant_folding();
        func.invoke_values(args, &ctx).expect(id)
    }

    #[test]
    fn string_equal() {
        let a = Value::Primitive(AttributeValue::String("test".into()));
        let b = Value::Primitive(AttributeValue::String("Test".into()));
        let id = format!("{FN_1_0}string-equal");
        assert_eq!(invoke(&id, &[a.clone(), a.clone()]), Value::boolean(true));
        assert_eq!(invoke(&id, &[a.clone(), b.clone()]), Value::boolean(false));
        let ci = format!("{FN_3_0}string-equal-ignore-case");
        assert_eq!(invoke(&ci, &[a, b]), Value::boolean(true));
    }

    #[test]
    fn duration_equal_lives_in_3_0() {
        let registry = FunctionRegistry::standard();
        assert!(registry.get(&format!("{FN_3_0}dayTimeDuration-equal")).is_some());
        assert!(registry.get(&format!("{FN_1_0}dayTimeDuration-equal")).is_none());
    }
}
