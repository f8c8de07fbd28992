//! Boolean connectives. `and`, `or`, and `n-of` evaluate their arguments
//! lazily: an argument that can no longer change the outcome is never
//! evaluated, and an error is only surfaced when no decisive value was
//! found first.

use aegis_core::{Datatype, IndeterminateError};

use crate::function::{FirstOrderFn, FunctionError, FunctionRegistry, Signature, FN_1_0};
use crate::stdlib::{bool_arg, boolean, prim};

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), FunctionError> {
    let bool_t = prim(Datatype::Boolean);
    let int = prim(Datatype::Integer);

    registry.register_first_order(FirstOrderFn::lazy(
        format!("{FN_1_0}or"),
        Signature::variadic(Vec::new(), bool_t),
        bool_t,
        |args, ctx| {
            let mut first_error = None;
            for arg in args {
                match arg.evaluate(ctx).and_then(|v| v.expect_boolean()) {
                    Ok(true) => return Ok(boolean(true)),
                    Ok(false) => {}
                    Err(e) => first_error = first_error.or(Some(e)),
                }
            }
            match first_error {
                Some(e) => Err(e),
                None => Ok(boolean(false)),
            }
        },
    ))?;

    registry.register_first_order(FirstOrderFn::lazy(
        format!("{FN_1_0}and"),
        Signature::variadic(Vec::new(), bool_t),
        bool_t,
        |args, ctx| {
            let mut first_error = None;
            for arg in args {
                match arg.evaluate(ctx).and_then(|v| v.expect_boolean()) {
                    Ok(false) => return Ok(boolean(false)),
                    Ok(true) => {}
                    Err(e) => first_error = first_error.or(Some(e)),
                }
            }
            match first_error {
                Some(e) => Err(e),
                None => Ok(boolean(true)),
            }
        },
    ))?;

    registry.register_first_order(FirstOrderFn::lazy(
        format!("{FN_1_0}n-of"),
        Signature::variadic(vec![int], bool_t),
        bool_t,
        |args, ctx| {
            let n = match args[0].evaluate(ctx)?.expect_primitive()? {
                aegis_core::AttributeValue::Integer(n) => *n,
                other => {
                    return Err(IndeterminateError::processing(format!(
                        "n-of threshold must be an integer, got {}",
                        other.datatype()
                    )))
                }
            };
            if n <= 0 {
                return Ok(boolean(true));
            }
            let needed = usize::try_from(n)
                .map_err(|_| IndeterminateError::processing("n-of threshold out of range"))?;
            let rest = &args[1..];
            if needed > rest.len() {
                return Err(IndeterminateError::processing(format!(
                    "n-of asks for {needed} true arguments but only {} remain",
                    rest.len()
                )));
            }
            let mut trues = 0usize;
            let mut first_error = None;
            for arg in rest {
                match arg.evaluate(ctx).and_then(|v| v.expect_boolean()) {
                    Ok(true) => {
                        trues += 1;
                        if trues >= needed {
                            return Ok(boolean(true));
                        }
                    }
                    Ok(false) => {}
                    Err(e) => first_error = first_error.or(Some(e)),
                }
            }
            match first_error {
                Some(e) => Err(e),
                None => Ok(boolean(false)),
            }
        },
    ))?;

    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_1_0}not"),
        Signature::fixed(vec![bool_t]),
        bool_t,
        |args, _| Ok(boolean(!bool_arg(args, 0)?)),
    ))?;

    Ok(())
}
