//! Duration datatypes: xs:dayTimeDuration and xs:yearMonthDuration.

use std::cmp::Ordering;
use std::fmt;

use chrono::Duration;

use crate::error::IndeterminateError;

/// An xs:dayTimeDuration: a signed span of days, hours, minutes and
/// (fractional) seconds, held as an exact nanosecond count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DayTimeDuration {
    nanos: i128,
}

impl DayTimeDuration {
    pub fn parse(lexical: &str) -> Result<Self, IndeterminateError> {
        let bad =
            || IndeterminateError::syntax_error(format!("Invalid xs:dayTimeDuration '{lexical}'"));

        let (negative, rest) = match lexical.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, lexical),
        };
        let rest = rest.strip_prefix('P').ok_or_else(bad)?;
        let (date_part, time_part) = match rest.split_once('T') {
            Some((_, t)) if t.is_empty() => return Err(bad()),
            Some((d, t)) => (d, Some(t)),
            None => (rest, None),
        };

        let mut nanos: i128 = 0;
        let mut saw_component = false;

        if !date_part.is_empty() {
            let days = date_part.strip_suffix('D').ok_or_else(bad)?;
            let days: i128 = days.parse().map_err(|_| bad())?;
            nanos += days * 86_400 * 1_000_000_000;
            saw_component = true;
        }

        if let Some(time_part) = time_part {
            let mut rest = time_part;
            for (marker, scale) in [('H', 3_600i128), ('M', 60), ('S', 1)] {
                let Some(pos) = rest.find(marker) else { continue };
                let field = &rest[..pos];
                rest = &rest[pos + 1..];
                if marker == 'S' {
                    let (secs, frac_nanos) = parse_seconds_field(field).ok_or_else(bad)?;
                    nanos += secs * 1_000_000_000 + frac_nanos;
                } else {
                    let n: i128 = field.parse().map_err(|_| bad())?;
                    nanos += n * scale * 1_000_000_000;
                }
                saw_component = true;
            }
            if !rest.is_empty() {
                return Err(bad());
            }
        }

        if !saw_component {
            return Err(bad());
        }
        Ok(Self {
            nanos: if negative { -nanos } else { nanos },
        })
    }

    pub fn from_seconds(seconds: i64) -> Self {
        Self {
            nanos: i128::from(seconds) * 1_000_000_000,
        }
    }

    /// Chrono view for date arithmetic; saturates far outside any
    /// representable dateTime, where the subsequent add overflows anyway.
    pub fn as_chrono(&self) -> Duration {
        let secs = (self.nanos / 1_000_000_000) as i64;
        let frac = (self.nanos % 1_000_000_000) as i64;
        Duration::seconds(secs) + Duration::nanoseconds(frac)
    }

    pub fn negated(&self) -> Self {
        Self { nanos: -self.nanos }
    }
}

fn parse_seconds_field(field: &str) -> Option<(i128, i128)> {
    match field.split_once('.') {
        None => Some((field.parse().ok()?, 0)),
        Some((whole, frac)) => {
            if frac.is_empty() || frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let secs: i128 = whole.parse().ok()?;
            let frac_nanos: i128 =
                frac.parse::<i128>().ok()? * 10i128.pow(9 - frac.len() as u32);
            Some((secs, frac_nanos))
        }
    }
}

impl fmt::Display for DayTimeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut nanos = self.nanos;
        if nanos < 0 {
            f.write_str("-")?;
            nanos = -nanos;
        }
        if nanos == 0 {
            return f.write_str("PT0S");
        }
        let days = nanos / (86_400 * 1_000_000_000);
        let hours = nanos / (3_600 * 1_000_000_000) % 24;
        let minutes = nanos / (60 * 1_000_000_000) % 60;
        let seconds = nanos / 1_000_000_000 % 60;
        let frac = nanos % 1_000_000_000;

        f.write_str("P")?;
        if days > 0 {
            write!(f, "{days}D")?;
        }
        if hours > 0 || minutes > 0 || seconds > 0 || frac > 0 {
            f.write_str("T")?;
            if hours > 0 {
                write!(f, "{hours}H")?;
            }
            if minutes > 0 {
                write!(f, "{minutes}M")?;
            }
            if seconds > 0 || frac > 0 {
                if frac > 0 {
                    let frac_str = format!("{frac:09}");
                    write!(f, "{seconds}.{}S", frac_str.trim_end_matches('0'))?;
                } else {
                    write!(f, "{seconds}S")?;
                }
            }
        }
        Ok(())
    }
}

/// An xs:yearMonthDuration: a signed number of months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct YearMonthDuration {
    months: i64,
}

impl YearMonthDuration {
    pub fn parse(lexical: &str) -> Result<Self, IndeterminateError> {
        let bad = || {
            IndeterminateError::syntax_error(format!("Invalid xs:yearMonthDuration '{lexical}'"))
        };

        let (negative, rest) = match lexical.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, lexical),
        };
        let mut rest = rest.strip_prefix('P').ok_or_else(bad)?;

        let mut months: i64 = 0;
        let mut saw_component = false;
        if let Some(pos) = rest.find('Y') {
            let years: i64 = rest[..pos].parse().map_err(|_| bad())?;
            months = years.checked_mul(12).ok_or_else(bad)?;
            rest = &rest[pos + 1..];
            saw_component = true;
        }
        if let Some(pos) = rest.find('M') {
            let m: i64 = rest[..pos].parse().map_err(|_| bad())?;
            months = months.checked_add(m).ok_or_else(bad)?;
            rest = &rest[pos + 1..];
            saw_component = true;
        }
        if !rest.is_empty() || !saw_component {
            return Err(bad());
        }
        Ok(Self {
            months: if negative { -months } else { months },
        })
    }

    pub fn from_months(months: i64) -> Self {
        Self { months }
    }

    pub fn total_months(&self) -> i64 {
        self.months
    }

    pub fn negated(&self) -> Self {
        Self {
            months: -self.months,
        }
    }
}

impl PartialOrd for YearMonthDuration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for YearMonthDuration {
    fn cmp(&self, other: &Self) -> Ordering {
        self.months.cmp(&other.months)
    }
}

impl fmt::Display for YearMonthDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut months = self.months;
        if months < 0 {
            f.write_str("-")?;
            months = -months;
        }
        if months == 0 {
            return f.write_str("P0M");
        }
        f.write_str("P")?;
        if months / 12 > 0 {
            write!(f, "{}Y", months / 12)?;
        }
        if months % 12 > 0 {
            write!(f, "{}M", months % 12)?;
        }
        Ok(())
    }
}
