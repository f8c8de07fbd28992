//! Set operations over bags: intersection, union, membership overlap,
//! subset, and set equality.

use aegis_core::Datatype;

use crate::expr::Value;
use crate::function::{FirstOrderFn, FunctionError, FunctionRegistry, Signature};
use crate::stdlib::{bag_arg, bag_of, boolean, family_prefix, prim};

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), FunctionError> {
    let bool_t = prim(Datatype::Boolean);

    for dt in Datatype::ALL {
        let prefix = family_prefix(dt);
        let short = dt.short_name();
        let two_bags = || Signature::fixed(vec![bag_of(dt), bag_of(dt)]);

        registry.register_first_order(FirstOrderFn::eager(
            format!("{prefix}{short}-intersection"),
            two_bags(),
            bag_of(dt),
            |args, _| Ok(Value::Bag(bag_arg(args, 0)?.intersection(bag_arg(args, 1)?))),
        ))?;

        registry.register_first_order(FirstOrderFn::eager(
            format!("{prefix}{short}-union"),
            two_bags(),
            bag_of(dt),
            |args, _| Ok(Value::Bag(bag_arg(args, 0)?.union(bag_arg(args, 1)?))),
        ))?;

        registry.register_first_order(FirstOrderFn::eager(
            format!("{prefix}{short}-at-least-one-member-of"),
            two_bags(),
            bool_t,
            |args, _| {
                let a = bag_arg(args, 0)?;
                let b = bag_arg(args, 1)?;
                Ok(boolean(a.iter().any(|v| b.contains(v))))
            },
        ))?;

        registry.register_first_order(FirstOrderFn::eager(
            format!("{prefix}{short}-subset"),
            two_bags(),
            bool_t,
            |args, _| Ok(boolean(bag_arg(args, 0)?.is_subset_of(bag_arg(args, 1)?))),
        ))?;

        registry.register_first_order(FirstOrderFn::eager(
            format!("{prefix}{short}-set-equals"),
            two_bags(),
            bool_t,
            |args, _| Ok(boolean(bag_arg(args, 0)?.set_equals(bag_arg(args, 1)?))),
        ))?;
    }

    Ok(())
}
