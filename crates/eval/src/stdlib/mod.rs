//! The standard XACML 3.0 function library.
//!
//! Functions are grouped by family; [`register_standard`] installs the full
//! set into a registry. Identifier prefixes follow the namespace each
//! function was introduced in (1.0, 2.0, or 3.0).

use aegis_core::{AttributeValue, Bag, Datatype, EvalResult, IndeterminateError, ValueType};

use crate::expr::Value;
use crate::function::{FunctionError, FunctionRegistry, FN_1_0, FN_2_0, FN_3_0};

mod bags;
mod conversion;
mod datetime;
mod equality;
pub mod higher_order;
mod logical;
mod matchers;
mod numeric;
mod sets;
mod strings;

/// Installs every standard function into `registry`.
pub fn register_standard(registry: &mut FunctionRegistry) -> Result<(), FunctionError> {
    equality::register(registry)?;
    numeric::register(registry)?;
    logical::register(registry)?;
    strings::register(registry)?;
    datetime::register(registry)?;
    conversion::register(registry)?;
    bags::register(registry)?;
    sets::register(registry)?;
    matchers::register(registry)?;
    higher_order::register(registry)?;
    Ok(())
}

/// The namespace prefix under which a datatype's bag, set, and equality
/// functions live: durations joined in 3.0, ipAddress/dnsName in 2.0,
/// everything else in 1.0.
pub(crate) fn family_prefix(dt: Datatype) -> &'static str {
    match dt {
        Datatype::DayTimeDuration | Datatype::YearMonthDuration => FN_3_0,
        Datatype::IpAddress | Datatype::DnsName => FN_2_0,
        _ => FN_1_0,
    }
}

pub(crate) fn prim(dt: Datatype) -> ValueType {
    ValueType::Primitive(dt)
}

pub(crate) fn bag_of(dt: Datatype) -> ValueType {
    ValueType::Bag(dt)
}

pub(crate) fn boolean(b: bool) -> Value {
    Value::boolean(b)
}

fn type_slip(expected: &str, found: &Value) -> IndeterminateError {
    IndeterminateError::processing(format!(
        "expected a {expected} argument, got {}",
        found.value_type()
    ))
}

pub(crate) fn prim_arg<'a>(args: &'a [Value], i: usize) -> EvalResult<&'a AttributeValue> {
    args[i].expect_primitive()
}

pub(crate) fn bag_arg<'a>(args: &'a [Value], i: usize) -> EvalResult<&'a Bag> {
    args[i].expect_bag()
}

pub(crate) fn str_arg<'a>(args: &'a [Value], i: usize) -> EvalResult<&'a str> {
    match prim_arg(args, i)? {
        AttributeValue::String(s) => Ok(s),
        _ => Err(type_slip("string", &args[i])),
    }
}

pub(crate) fn uri_arg<'a>(args: &'a [Value], i: usize) -> EvalResult<&'a str> {
    match prim_arg(args, i)? {
        AttributeValue::AnyUri(s) => Ok(s),
        _ => Err(type_slip("anyURI", &args[i])),
    }
}

pub(crate) fn bool_arg(args: &[Value], i: usize) -> EvalResult<bool> {
    match prim_arg(args, i)? {
        AttributeValue::Boolean(b) => Ok(*b),
        _ => Err(type_slip("boolean", &args[i])),
    }
}

pub(crate) fn int_arg(args: &[Value], i: usize) -> EvalResult<i64> {
    match prim_arg(args, i)? {
        AttributeValue::Integer(n) => Ok(*n),
        _ => Err(type_slip("integer", &args[i])),
    }
}

pub(crate) fn double_arg(args: &[Value], i: usize) -> EvalResult<f64> {
    match prim_arg(args, i)? {
        AttributeValue::Double(d) => Ok(*d),
        _ => Err(type_slip("double", &args[i])),
    }
}
