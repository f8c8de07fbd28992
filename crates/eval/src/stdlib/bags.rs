//! Bag constructors and accessors: `<T>-one-and-only`, `<T>-bag-size`,
//! `<T>-is-in`, `<T>-bag`.

use aegis_core::{AttributeValue, Bag, Datatype, IndeterminateError};

use crate::expr::Value;
use crate::function::{FirstOrderFn, FunctionError, FunctionRegistry, Signature};
use crate::stdlib::{bag_arg, bag_of, boolean, family_prefix, prim, prim_arg};

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), FunctionError> {
    let int = prim(Datatype::Integer);
    let bool_t = prim(Datatype::Boolean);

    for dt in Datatype::ALL {
        let prefix = family_prefix(dt);
        let short = dt.short_name();

        registry.register_first_order(FirstOrderFn::eager(
            format!("{prefix}{short}-one-and-only"),
            Signature::fixed(vec![bag_of(dt)]),
            prim(dt),
            |args, _| {
                let bag = bag_arg(args, 0)?;
                bag.single().cloned().map(Value::Primitive).ok_or_else(|| {
                    IndeterminateError::processing(format!(
                        "one-and-only applied to a bag of {} elements",
                        bag.len()
                    ))
                })
            },
        ))?;

        registry.register_first_order(FirstOrderFn::eager(
            format!("{prefix}{short}-bag-size"),
            Signature::fixed(vec![bag_of(dt)]),
            int,
            |args, _| {
                let len = i64::try_from(bag_arg(args, 0)?.len())
                    .map_err(|_| IndeterminateError::processing("bag size out of range"))?;
                Ok(Value::Primitive(AttributeValue::Integer(len)))
            },
        ))?;

        registry.register_first_order(FirstOrderFn::eager(
            format!("{prefix}{short}-is-in"),
            Signature::fixed(vec![prim(dt), bag_of(dt)]),
            bool_t,
            |args, _| Ok(boolean(bag_arg(args, 1)?.contains(prim_arg(args, 0)?))),
        ))?;

        registry.register_first_order(FirstOrderFn::eager(
            format!("{prefix}{short}-bag"),
            Signature::variadic(Vec::new(), prim(dt)),
            bag_of(dt),
            move |args, ctx| {
                if let Some(max) = ctx.limits().max_bag_size {
                    if args.len() > max {
                        return Err(IndeterminateError::processing(format!(
                            "bag of {} elements exceeds the configured maximum of {max}",
                            args.len()
                        )));
                    }
                }
                let mut values = Vec::with_capacity(args.len());
                for i in 0..args.len() {
                    values.push(prim_arg(args, i)?.clone());
                }
                let bag = Bag::new(dt, values)
                    .map_err(|e| IndeterminateError::processing(e.to_string()))?;
                Ok(Value::Bag(bag))
            },
        ))?;
    }

    Ok(())
}
