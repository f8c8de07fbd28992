//! Temporal comparisons and duration arithmetic.

use chrono::{DateTime, Duration, FixedOffset, Months, NaiveDate};

use aegis_core::temporal::{DayTimeDuration, YearMonthDuration};
use aegis_core::{AttributeValue, Datatype, EvalResult, IndeterminateError};

use crate::expr::Value;
use crate::function::{FirstOrderFn, FunctionError, FunctionRegistry, Signature, FN_1_0, FN_2_0, FN_3_0};
use crate::stdlib::{boolean, prim, prim_arg};

fn time_arg(args: &[Value], i: usize) -> EvalResult<chrono::NaiveTime> {
    match prim_arg(args, i)? {
        AttributeValue::Time(t) => Ok(*t),
        other => Err(IndeterminateError::processing(format!(
            "expected a time argument, got {}",
            other.datatype()
        ))),
    }
}

fn date_arg(args: &[Value], i: usize) -> EvalResult<NaiveDate> {
    match prim_arg(args, i)? {
        AttributeValue::Date(d) => Ok(*d),
        other => Err(IndeterminateError::processing(format!(
            "expected a date argument, got {}",
            other.datatype()
        ))),
    }
}

fn date_time_arg(args: &[Value], i: usize) -> EvalResult<DateTime<FixedOffset>> {
    match prim_arg(args, i)? {
        AttributeValue::DateTime(dt) => Ok(*dt),
        other => Err(IndeterminateError::processing(format!(
            "expected a dateTime argument, got {}",
            other.datatype()
        ))),
    }
}

fn day_time_arg(args: &[Value], i: usize) -> EvalResult<DayTimeDuration> {
    match prim_arg(args, i)? {
        AttributeValue::DayTimeDuration(d) => Ok(*d),
        other => Err(IndeterminateError::processing(format!(
            "expected a dayTimeDuration argument, got {}",
            other.datatype()
        ))),
    }
}

fn year_month_arg(args: &[Value], i: usize) -> EvalResult<YearMonthDuration> {
    match prim_arg(args, i)? {
        AttributeValue::YearMonthDuration(d) => Ok(*d),
        other => Err(IndeterminateError::processing(format!(
            "expected a yearMonthDuration argument, got {}",
            other.datatype()
        ))),
    }
}

fn add_months<T>(value: T, months: i32, add: impl Fn(T, Months) -> Option<T>) -> EvalResult<T> {
    let unsigned = Months::new(months.unsigned_abs());
    add(value, unsigned)
        .ok_or_else(|| IndeterminateError::processing("yearMonthDuration arithmetic out of range"))
}

fn shift_date(date: NaiveDate, duration: YearMonthDuration, negate: bool) -> EvalResult<NaiveDate> {
    let months = if negate { -duration.as_months() } else { duration.as_months() };
    if months >= 0 {
        add_months(date, months, NaiveDate::checked_add_months)
    } else {
        add_months(date, months, NaiveDate::checked_sub_months)
    }
}

fn shift_date_time_months(
    dt: DateTime<FixedOffset>,
    duration: YearMonthDuration,
    negate: bool,
) -> EvalResult<DateTime<FixedOffset>> {
    let months = if negate { -duration.as_months() } else { duration.as_months() };
    if months >= 0 {
        add_months(dt, months, DateTime::checked_add_months)
    } else {
        add_months(dt, months, DateTime::checked_sub_months)
    }
}

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), FunctionError> {
    let bool_t = prim(Datatype::Boolean);
    let time_t = prim(Datatype::Time);
    let date_t = prim(Datatype::Date);
    let date_time_t = prim(Datatype::DateTime);
    let day_time_t = prim(Datatype::DayTimeDuration);
    let year_month_t = prim(Datatype::YearMonthDuration);

    // Ordering comparisons for time, date, and dateTime.
    for (suffix, ord) in [
        ("greater-than", (|o: std::cmp::Ordering| o.is_gt()) as fn(std::cmp::Ordering) -> bool),
        ("greater-than-or-equal", |o| o.is_ge()),
        ("less-than", |o| o.is_lt()),
        ("less-than-or-equal", |o| o.is_le()),
    ] {
        registry.register_first_order(FirstOrderFn::eager(
            format!("{FN_1_0}time-{suffix}"),
            Signature::fixed(vec![time_t, time_t]),
            bool_t,
            move |args, _| Ok(boolean(ord(time_arg(args, 0)?.cmp(&time_arg(args, 1)?)))),
        ))?;
        registry.register_first_order(FirstOrderFn::eager(
            format!("{FN_1_0}date-{suffix}"),
            Signature::fixed(vec![date_t, date_t]),
            bool_t,
            move |args, _| Ok(boolean(ord(date_arg(args, 0)?.cmp(&date_arg(args, 1)?)))),
        ))?;
        registry.register_first_order(FirstOrderFn::eager(
            format!("{FN_1_0}dateTime-{suffix}"),
            Signature::fixed(vec![date_time_t, date_time_t]),
            bool_t,
            move |args, _| {
                Ok(boolean(ord(date_time_arg(args, 0)?.cmp(&date_time_arg(args, 1)?))))
            },
        ))?;
    }

    // time-in-range wraps across midnight when the bounds are inverted.
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_2_0}time-in-range"),
        Signature::fixed(vec![time_t, time_t, time_t]),
        bool_t,
        |args, _| {
            let t = time_arg(args, 0)?;
            let low = time_arg(args, 1)?;
            let high = time_arg(args, 2)?;
            let in_range =
                if low <= high { low <= t && t <= high } else { t >= low || t <= high };
            Ok(boolean(in_range))
        },
    ))?;

    // dayTimeDuration arithmetic on dateTime.
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_3_0}dateTime-add-dayTimeDuration"),
        Signature::fixed(vec![date_time_t, day_time_t]),
        date_time_t,
        |args, _| {
            let dt = date_time_arg(args, 0)? + Duration::milliseconds(day_time_arg(args, 1)?.as_millis());
            Ok(Value::Primitive(AttributeValue::DateTime(dt)))
        },
    ))?;
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_3_0}dateTime-subtract-dayTimeDuration"),
        Signature::fixed(vec![date_time_t, day_time_t]),
        date_time_t,
        |args, _| {
            let dt = date_time_arg(args, 0)? - Duration::milliseconds(day_time_arg(args, 1)?.as_millis());
            Ok(Value::Primitive(AttributeValue::DateTime(dt)))
        },
    ))?;

    // yearMonthDuration arithmetic on dateTime and date.
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_3_0}dateTime-add-yearMonthDuration"),
        Signature::fixed(vec![date_time_t, year_month_t]),
        date_time_t,
        |args, _| {
            let dt = shift_date_time_months(date_time_arg(args, 0)?, year_month_arg(args, 1)?, false)?;
            Ok(Value::Primitive(AttributeValue::DateTime(dt)))
        },
    ))?;
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_3_0}dateTime-subtract-yearMonthDuration"),
        Signature::fixed(vec![date_time_t, year_month_t]),
        date_time_t,
        |args, _| {
            let dt = shift_date_time_months(date_time_arg(args, 0)?, year_month_arg(args, 1)?, true)?;
            Ok(Value::Primitive(AttributeValue::DateTime(dt)))
        },
    ))?;
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_3_0}date-add-yearMonthDuration"),
        Signature::fixed(vec![date_t, year_month_t]),
        date_t,
        |args, _| {
            let d = shift_date(date_arg(args, 0)?, year_month_arg(args, 1)?, false)?;
            Ok(Value::Primitive(AttributeValue::Date(d)))
        },
    ))?;
    registry.register_first_order(FirstOrderFn::eager(
        format!("{FN_3_0}date-subtract-yearMonthDuration"),
        Signature::fixed(vec![date_t, year_month_t]),
        date_t,
        |args, _| {
            let d = shift_date(date_arg(args, 0)?, year_month_arg(args, 1)?, true)?;
            Ok(Value::Primitive(AttributeValue::Date(d)))
        },
    ))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;

    fn invoke(id: &str, args: &[Value]) -> aegis_core::EvalResult<Value> {
        let registry = FunctionRegistry::standard();
        let func = registry.get_first_order(id).expect(id);
        let ctx = EvaluationContext::constant_folding();
        func.invoke_values(args, &ctx)
    }

    fn lex(dt: Datatype, s: &str) -> Value {
        Value::Primitive(AttributeValue::parse_lexical(dt, s).expect(s))
    }

    #[test]
    fn date_time_ordering() {
        let a = lex(Datatype::DateTime, "2002-09-24T09:30:00Z");
        let b = lex(Datatype::DateTime, "2002-09-24T10:30:00Z");
        let id = format!("{FN_1_0}dateTime-less-than");
        assert_eq!(invoke(&id, &[a, b]).unwrap(), Value::boolean(true));
    }

    #[test]
    fn time_in_range_wraps_midnight() {
        let id = format!("{FN_2_0}time-in-range");
        let t = |s| lex(Datatype::Time, s);
        assert_eq!(
            invoke(&id, &[t("23:30:00"), t("22:00:00"), t("06:00:00")]).unwrap(),
            Value::boolean(true)
        );
        assert_eq!(
            invoke(&id, &[t("12:00:00"), t("22:00:00"), t("06:00:00")]).unwrap(),
            Value::boolean(false)
        );
        assert_eq!(
            invoke(&id, &[t("13:00:00"), t("09:00:00"), t("17:00:00")]).unwrap(),
            Value::boolean(true)
        );
    }

    #[test]
    fn duration_arithmetic() {
        let dt = lex(Datatype::DateTime, "2002-01-31T12:00:00Z");
        let one_day = lex(Datatype::DayTimeDuration, "P1D");
        let id = format!("{FN_3_0}dateTime-add-dayTimeDuration");
        assert_eq!(
            invoke(&id, &[dt.clone(), one_day]).unwrap(),
            lex(Datatype::DateTime, "2002-02-01T12:00:00Z")
        );

        let one_month = lex(Datatype::YearMonthDuration, "P1M");
        let id = format!("{FN_3_0}dateTime-add-yearMonthDuration");
        // Day-of-month clamps at the end of the shorter month.
        assert_eq!(
            invoke(&id, &[dt, one_month]).unwrap(),
            lex(Datatype::DateTime, "2002-02-28T12:00:00Z")
        );

        let d = lex(Datatype::Date, "2004-03-31");
        let back = lex(Datatype::YearMonthDuration, "P1M");
        let id = format!("{FN_3_0}date-subtract-yearMonthDuration");
        assert_eq!(invoke(&id, &[d, back]).unwrap(), lex(Datatype::Date, "2004-02-29"));
    }
}
