//! Duration types and lexical parsing for the temporal datatypes.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// Signed duration expressed in days, hours, minutes, and (fractional)
/// seconds, stored as total milliseconds.
///
/// Lexical form is the XML Schema `dayTimeDuration` subset of ISO 8601,
/// e.g. `P1DT2H30M`, `-PT15.5S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayTimeDuration {
    millis: i64,
}

impl DayTimeDuration {
    /// Builds a duration from total signed milliseconds.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    /// Total signed milliseconds.
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.millis
    }

    /// Parses the `dayTimeDuration` lexical form.
    pub fn parse(input: &str) -> Result<Self, String> {
        let (negative, rest) = match input.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, input),
        };
        let rest = rest
            .strip_prefix('P')
            .ok_or_else(|| format!("duration `{input}` is missing the leading P"))?;

        let (date_part, time_part) = match rest.split_once('T') {
            Some((d, t)) => (d, Some(t)),
            None => (rest, None),
        };
        if date_part.is_empty() && time_part.is_none() {
            return Err(format!("duration `{input}` has no components"));
        }

        let mut millis: i64 = 0;
        if !date_part.is_empty() {
            let days = date_part
                .strip_suffix('D')
                .and_then(|d| d.parse::<i64>().ok())
                .ok_or_else(|| format!("invalid day component in `{input}`"))?;
            millis += days * 86_400_000;
        }
        if let Some(time_part) = time_part {
            if time_part.is_empty() {
                return Err(format!("duration `{input}` has an empty time part"));
            }
            let mut rest = time_part;
            for (marker, scale) in [('H', 3_600_000i64), ('M', 60_000)] {
                if let Some((num, tail)) = rest.split_once(marker) {
                    let n = num
                        .parse::<i64>()
                        .map_err(|_| format!("invalid component before {marker} in `{input}`"))?;
                    millis += n * scale;
                    rest = tail;
                }
            }
            if let Some(sec) = rest.strip_suffix('S') {
                let s = sec
                    .parse::<f64>()
                    .map_err(|_| format!("invalid seconds component in `{input}`"))?;
                if !s.is_finite() || s < 0.0 {
                    return Err(format!("invalid seconds component in `{input}`"));
                }
                #[allow(clippy::cast_possible_truncation)]
                {
                    millis += (s * 1000.0).round() as i64;
                }
            } else if !rest.is_empty() {
                return Err(format!("trailing garbage `{rest}` in duration `{input}`"));
            }
        }
        Ok(Self { millis: if negative { -millis } else { millis } })
    }
}

impl fmt::Display for DayTimeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ms = self.millis;
        if ms < 0 {
            f.write_str("-")?;
            ms = -ms;
        }
        let days = ms / 86_400_000;
        ms %= 86_400_000;
        let hours = ms / 3_600_000;
        ms %= 3_600_000;
        let minutes = ms / 60_000;
        ms %= 60_000;
        let seconds = ms / 1000;
        let frac = ms % 1000;

        f.write_str("P")?;
        if days > 0 {
            write!(f, "{days}D")?;
        }
        if hours > 0 || minutes > 0 || seconds > 0 || frac > 0 || days == 0 {
            f.write_str("T")?;
            if hours > 0 {
                write!(f, "{hours}H")?;
            }
            if minutes > 0 {
                write!(f, "{minutes}M")?;
            }
            if frac > 0 {
                write!(f, "{seconds}.{frac:03}S")?;
            } else if seconds > 0 || (hours == 0 && minutes == 0) {
                write!(f, "{seconds}S")?;
            }
        }
        Ok(())
    }
}

/// Signed duration expressed in years and months, stored as total months.
///
/// Lexical form is the XML Schema `yearMonthDuration` subset of ISO 8601,
/// e.g. `P1Y6M`, `-P4M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonthDuration {
    months: i32,
}

impl YearMonthDuration {
    /// Builds a duration from total signed months.
    #[must_use]
    pub const fn from_months(months: i32) -> Self {
        Self { months }
    }

    /// Total signed months.
    #[must_use]
    pub const fn as_months(self) -> i32 {
        self.months
    }

    /// Parses the `yearMonthDuration` lexical form.
    pub fn parse(input: &str) -> Result<Self, String> {
        let (negative, rest) = match input.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, input),
        };
        let mut rest = rest
            .strip_prefix('P')
            .ok_or_else(|| format!("duration `{input}` is missing the leading P"))?;
        if rest.is_empty() {
            return Err(format!("duration `{input}` has no components"));
        }

        let mut months: i64 = 0;
        if let Some((num, tail)) = rest.split_once('Y') {
            let y = num
                .parse::<i64>()
                .map_err(|_| format!("invalid year component in `{input}`"))?;
            months += y * 12;
            rest = tail;
        }
        if let Some(num) = rest.strip_suffix('M') {
            let m = num
                .parse::<i64>()
                .map_err(|_| format!("invalid month component in `{input}`"))?;
            months += m;
        } else if !rest.is_empty() {
            return Err(format!("trailing garbage `{rest}` in duration `{input}`"));
        }
        let months =
            i32::try_from(months).map_err(|_| format!("duration `{input}` out of range"))?;
        Ok(Self { months: if negative { -months } else { months } })
    }
}

impl fmt::Display for YearMonthDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut m = self.months;
        if m < 0 {
            f.write_str("-")?;
            m = -m;
        }
        let years = m / 12;
        let months = m % 12;
        f.write_str("P")?;
        if years > 0 {
            write!(f, "{years}Y")?;
        }
        if months > 0 || years == 0 {
            write!(f, "{months}M")?;
        }
        Ok(())
    }
}

/// Parses an `xs:time` lexical value. A trailing zone offset (`Z` or
/// `±HH:MM`) is normalized onto the UTC timeline, wrapping within the day.
pub fn parse_time(input: &str) -> Result<NaiveTime, String> {
    let (body, offset) = split_zone(input);
    let time = NaiveTime::parse_from_str(body, "%H:%M:%S%.f")
        .map_err(|e| format!("invalid time `{input}`: {e}"))?;
    match offset {
        None => Ok(time),
        Some(off) => {
            let shifted = time - chrono::Duration::seconds(i64::from(off.local_minus_utc()));
            Ok(shifted)
        }
    }
}

/// Parses an `xs:date` lexical value. A trailing zone offset is accepted and
/// discarded; dates compare by their calendar value.
pub fn parse_date(input: &str) -> Result<NaiveDate, String> {
    let (body, _) = split_zone(input);
    NaiveDate::parse_from_str(body, "%Y-%m-%d").map_err(|e| format!("invalid date `{input}`: {e}"))
}

/// Parses an `xs:dateTime` lexical value. Values without a zone offset are
/// interpreted as UTC so that all stored instants are totally ordered.
pub fn parse_date_time(input: &str) -> Result<DateTime<FixedOffset>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt);
    }
    let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| format!("invalid dateTime `{input}`: {e}"))?;
    Ok(Utc.from_utc_datetime(&naive).fixed_offset())
}

fn split_zone(input: &str) -> (&str, Option<FixedOffset>) {
    if let Some(body) = input.strip_suffix('Z') {
        return (body, FixedOffset::east_opt(0));
    }
    // An offset is the final "+HH:MM"/"-HH:MM"; the leading date dashes never
    // contain a colon two characters from the end.
    if input.len() > 6 {
        let (body, tail) = input.split_at(input.len() - 6);
        let bytes = tail.as_bytes();
        if (bytes[0] == b'+' || bytes[0] == b'-') && bytes[3] == b':' {
            let sign = if bytes[0] == b'+' { 1 } else { -1 };
            let hours: i32 = tail[1..3].parse().unwrap_or(0);
            let minutes: i32 = tail[4..6].parse().unwrap_or(0);
            let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60));
            if let Some(offset) = offset {
                return (body, Some(offset));
            }
        }
    }
    (input, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_time_duration_round_trip() {
        for (lexical, millis) in [
            ("P1DT2H", 93_600_000),
            ("PT15M", 900_000),
            ("-PT1.5S", -1500),
            ("P2D", 172_800_000),
            ("PT0S", 0),
        ] {
            let d = DayTimeDuration::parse(lexical).expect(lexical);
            assert_eq!(d.as_millis(), millis, "{lexical}");
            let reparsed = DayTimeDuration::parse(&d.to_string()).expect("canonical form");
            assert_eq!(reparsed, d, "{lexical} canonical {d}");
        }
    }

    #[test]
    fn year_month_duration_round_trip() {
        for (lexical, months) in [("P1Y6M", 18), ("P4M", 4), ("-P2Y", -24), ("P0M", 0)] {
            let d = YearMonthDuration::parse(lexical).expect(lexical);
            assert_eq!(d.as_months(), months, "{lexical}");
            let reparsed = YearMonthDuration::parse(&d.to_string()).expect("canonical form");
            assert_eq!(reparsed, d, "{lexical} canonical {d}");
        }
    }

    #[test]
    fn rejects_malformed_durations() {
        for bad in ["P", "1D", "PT", "P1W", "-P1S", "PT1H30"] {
            assert!(DayTimeDuration::parse(bad).is_err(), "{bad}");
        }
        for bad in ["P", "12M", "P1D", "P1Y6"] {
            assert!(YearMonthDuration::parse(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn time_zone_offsets_normalize() {
        let plain = parse_time("13:20:00").unwrap();
        assert_eq!(plain, NaiveTime::from_hms_opt(13, 20, 0).unwrap());
        let shifted = parse_time("13:20:00-05:00").unwrap();
        assert_eq!(shifted, NaiveTime::from_hms_opt(18, 20, 0).unwrap());
    }

    #[test]
    fn date_time_defaults_to_utc() {
        let a = parse_date_time("2002-09-24T09:30:00").unwrap();
        let b = parse_date_time("2002-09-24T09:30:00Z").unwrap();
        assert_eq!(a, b);
        let c = parse_date_time("2002-09-24T09:30:00+02:00").unwrap();
        assert!(c < a);
    }
}
