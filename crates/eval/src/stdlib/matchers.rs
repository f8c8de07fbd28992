//! Special matchers: X.500 and RFC 822 name matching plus the regular
//! expression family.

use regex::Regex;

use aegis_core::{AttributeValue, Datatype, EvalResult, IndeterminateError};

use crate::expr::Value;
use crate::function::{FirstOrderFn, FunctionError, FunctionRegistry, Signature, FN_1_0, FN_2_0};
use crate::stdlib::{boolean, prim, prim_arg, str_arg};

fn regex_match(pattern: &str, subject: &str) -> EvalResult<bool> {
    let re = Regex::new(pattern).map_err(|e| {
        IndeterminateError::processing(format!("invalid regular expression `{pattern}`: {e}"))
    })?;
    Ok(re.is_match(subject))
}

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), FunctionError> {
    let bool_t = prim(Datatype::Boolean);
    let string = prim(Datatype::String);

    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}x500Name-match"),
        Signature::fixed(vec![prim(Datatype::X500Name), prim(Datatype::X500Name)]),
        bool_t,
        |args, _| {
            let (a, b) = match (prim_arg(args, 0)?, prim_arg(args, 1)?) {
                (AttributeValue::X500Name(a), AttributeValue::X500Name(b)) => (a, b),
                _ => {
                    return Err(IndeterminateError::processing(
                        "x500Name-match expects two x500Name arguments",
                    ))
                }
            };
            Ok(boolean(a.is_suffix_of(b)))
        },
    ))?;

    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}rfc822Name-match"),
        Signature::fixed(vec![string, prim(Datatype::Rfc822Name)]),
        bool_t,
        |args, _| {
            let pattern = str_arg(args, 0)?;
            let name = match prim_arg(args, 1)? {
                AttributeValue::Rfc822Name(n) => n,
                _ => {
                    return Err(IndeterminateError::processing(
                        "rfc822Name-match expects an rfc822Name second argument",
                    ))
                }
            };
            Ok(boolean(name.matches(pattern)))
        },
    ))?;

    // string-regexp-match is 1.0; the typed variants arrived in 2.0. All of
    // them match the pattern anywhere in the canonical form of the value.
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}string-regexp-match"),
        Signature::fixed(vec![string, string]),
        bool_t,
        |args, _| Ok(boolean(regex_match(str_arg(args, 0)?, str_arg(args, 1)?)?)),
    ))?;

    for dt in [
        Datatype::AnyUri,
        Datatype::IpAddress,
        Datatype::DnsName,
        Datatype::Rfc822Name,
        Datatype::X500Name,
    ] {
        registry.register_first_order(FirstOrderFn::eager(
            format!("{FN_2_0}{}-regexp-match", dt.short_name()),
            Signature::fixed(vec![string, prim(dt)]),
            bool_t,
            |args, _| {
                let subject = prim_arg(args, 1)?.canonical();
                Ok(boolean(regex_match(str_arg(args, 0)?, &subject)?))
            },
        ))?;
    }

    Ok(())
}
