//! Temporal datatypes: xs:time, xs:date, xs:dateTime.
//!
//! Values retain the wall-clock fields and explicit offset exactly as
//! parsed so the lexical form round-trips, while equality and ordering work
//! on the normalised instant (a missing offset is treated as UTC).

use std::cmp::Ordering;
use std::fmt;

use chrono::{
    DateTime, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike as _, Utc,
};

use crate::error::IndeterminateError;

use super::duration::{DayTimeDuration, YearMonthDuration};

const NANOS_PER_DAY: i128 = 86_400_000_000_000;

/// Split a trailing timezone designator off a lexical temporal form.
fn split_offset(lexical: &str) -> Result<(&str, Option<FixedOffset>), IndeterminateError> {
    if let Some(rest) = lexical.strip_suffix('Z') {
        return Ok((rest, Some(FixedOffset::east_opt(0).unwrap())));
    }
    // An offset is always exactly "+HH:MM" / "-HH:MM"; a bare '-' may also
    // be a date separator, so only the last six characters are considered.
    if lexical.len() > 6 {
        let (head, tail) = lexical.split_at(lexical.len() - 6);
        let bytes = tail.as_bytes();
        if (bytes[0] == b'+' || bytes[0] == b'-') && bytes[3] == b':' {
            let hours: i32 = tail[1..3]
                .parse()
                .map_err(|_| bad_offset(lexical))?;
            let minutes: i32 = tail[4..6]
                .parse()
                .map_err(|_| bad_offset(lexical))?;
            if hours > 14 || minutes > 59 {
                return Err(bad_offset(lexical));
            }
            let mut seconds = hours * 3600 + minutes * 60;
            if bytes[0] == b'-' {
                seconds = -seconds;
            }
            let offset = FixedOffset::east_opt(seconds).ok_or_else(|| bad_offset(lexical))?;
            return Ok((head, Some(offset)));
        }
    }
    Ok((lexical, None))
}

fn bad_offset(lexical: &str) -> IndeterminateError {
    IndeterminateError::syntax_error(format!("Invalid timezone offset in '{lexical}'"))
}

fn format_offset(f: &mut fmt::Formatter<'_>, offset: Option<FixedOffset>) -> fmt::Result {
    match offset {
        None => Ok(()),
        Some(o) if o.local_minus_utc() == 0 => f.write_str("Z"),
        Some(o) => {
            let total = o.local_minus_utc();
            let sign = if total < 0 { '-' } else { '+' };
            let total = total.abs();
            write!(f, "{}{:02}:{:02}", sign, total / 3600, (total % 3600) / 60)
        }
    }
}

/// An xs:time value: wall-clock time of day with an optional UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct XacmlTime {
    pub time: NaiveTime,
    pub offset: Option<FixedOffset>,
}

impl XacmlTime {
    pub fn parse(lexical: &str) -> Result<Self, IndeterminateError> {
        let (head, offset) = split_offset(lexical)?;
        let time = NaiveTime::parse_from_str(head, "%H:%M:%S%.f").map_err(|_| {
            IndeterminateError::syntax_error(format!("Invalid xs:time value '{lexical}'"))
        })?;
        Ok(Self { time, offset })
    }

    /// Nanoseconds since midnight UTC, wrapped into one day.
    fn normalized_nanos(&self) -> i128 {
        let nanos = i128::from(self.time.num_seconds_from_midnight()) * 1_000_000_000
            + i128::from(self.time.nanosecond());
        let shift = i128::from(self.offset.map_or(0, |o| o.local_minus_utc())) * 1_000_000_000;
        (nanos - shift).rem_euclid(NANOS_PER_DAY)
    }
}

impl PartialEq for XacmlTime {
    fn eq(&self, other: &Self) -> bool {
        self.normalized_nanos() == other.normalized_nanos()
    }
}
impl Eq for XacmlTime {}

impl PartialOrd for XacmlTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for XacmlTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized_nanos().cmp(&other.normalized_nanos())
    }
}

impl fmt::Display for XacmlTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.time.format("%H:%M:%S%.f"))?;
        format_offset(f, self.offset)
    }
}

/// An xs:date value: calendar date with an optional UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct XacmlDate {
    pub date: NaiveDate,
    pub offset: Option<FixedOffset>,
}

impl XacmlDate {
    pub fn parse(lexical: &str) -> Result<Self, IndeterminateError> {
        let (head, offset) = split_offset(lexical)?;
        let date = NaiveDate::parse_from_str(head, "%Y-%m-%d").map_err(|_| {
            IndeterminateError::syntax_error(format!("Invalid xs:date value '{lexical}'"))
        })?;
        Ok(Self { date, offset })
    }

    /// Seconds at which this calendar day starts, on the UTC timeline.
    fn starting_instant(&self) -> i64 {
        let midnight = self.date.and_time(NaiveTime::MIN);
        midnight.and_utc().timestamp() - i64::from(self.offset.map_or(0, |o| o.local_minus_utc()))
    }

    pub fn add_year_month(&self, d: &YearMonthDuration) -> Result<Self, IndeterminateError> {
        let date = add_months_naive_date(self.date, d.total_months())?;
        Ok(Self {
            date,
            offset: self.offset,
        })
    }
}

impl PartialEq for XacmlDate {
    fn eq(&self, other: &Self) -> bool {
        self.starting_instant() == other.starting_instant()
    }
}
impl Eq for XacmlDate {}

impl PartialOrd for XacmlDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for XacmlDate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.starting_instant().cmp(&other.starting_instant())
    }
}

impl fmt::Display for XacmlDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date.format("%Y-%m-%d"))?;
        format_offset(f, self.offset)
    }
}

/// An xs:dateTime value: wall-clock date and time with an optional UTC
/// offset, compared on the instant it denotes.
#[derive(Debug, Clone, Copy)]
pub struct XacmlDateTime {
    pub datetime: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

impl XacmlDateTime {
    pub fn parse(lexical: &str) -> Result<Self, IndeterminateError> {
        let (head, offset) = split_offset(lexical)?;
        let datetime = NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S%.f").map_err(
            |_| {
                IndeterminateError::syntax_error(format!(
                    "Invalid xs:dateTime value '{lexical}'"
                ))
            },
        )?;
        Ok(Self { datetime, offset })
    }

    /// The current instant, as an offset-aware dateTime in UTC.
    pub fn now_utc(now: DateTime<Utc>) -> Self {
        Self {
            datetime: now.naive_utc(),
            offset: Some(FixedOffset::east_opt(0).unwrap()),
        }
    }

    /// Projection onto the time-of-day component.
    pub fn time_part(&self) -> XacmlTime {
        XacmlTime {
            time: self.datetime.time(),
            offset: self.offset,
        }
    }

    /// Projection onto the date component.
    pub fn date_part(&self) -> XacmlDate {
        XacmlDate {
            date: self.datetime.date(),
            offset: self.offset,
        }
    }

    fn instant_nanos(&self) -> i128 {
        let shift = i128::from(self.offset.map_or(0, |o| o.local_minus_utc())) * 1_000_000_000;
        i128::from(self.datetime.and_utc().timestamp()) * 1_000_000_000
            + i128::from(self.datetime.and_utc().timestamp_subsec_nanos())
            - shift
    }

    pub fn add_day_time(&self, d: &DayTimeDuration) -> Result<Self, IndeterminateError> {
        let datetime = self
            .datetime
            .checked_add_signed(d.as_chrono())
            .ok_or_else(|| {
                IndeterminateError::processing_error("dateTime arithmetic overflow")
            })?;
        Ok(Self {
            datetime,
            offset: self.offset,
        })
    }

    pub fn add_year_month(&self, d: &YearMonthDuration) -> Result<Self, IndeterminateError> {
        let date = add_months_naive_date(self.datetime.date(), d.total_months())?;
        Ok(Self {
            datetime: date.and_time(self.datetime.time()),
            offset: self.offset,
        })
    }
}

fn add_months_naive_date(date: NaiveDate, months: i64) -> Result<NaiveDate, IndeterminateError> {
    let overflow = || IndeterminateError::processing_error("date arithmetic overflow");
    let magnitude = u32::try_from(months.unsigned_abs()).map_err(|_| overflow())?;
    if months >= 0 {
        date.checked_add_months(Months::new(magnitude)).ok_or_else(overflow)
    } else {
        date.checked_sub_months(Months::new(magnitude)).ok_or_else(overflow)
    }
}

impl PartialEq for XacmlDateTime {
    fn eq(&self, other: &Self) -> bool {
        self.instant_nanos() == other.instant_nanos()
    }
}
impl Eq for XacmlDateTime {}

impl PartialOrd for XacmlDateTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for XacmlDateTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant_nanos().cmp(&other.instant_nanos())
    }
}

impl fmt::Display for XacmlDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.datetime.format("%Y-%m-%dT%H:%M:%S%.f"))?;
        format_offset(f, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_round_trip() {
        for lex in ["08:30:00", "08:30:00.250", "23:59:59Z", "10:00:00+05:30"] {
            let t = XacmlTime::parse(lex).unwrap();
            assert_eq!(XacmlTime::parse(&t.to_string()).unwrap(), t);
        }
    }

    #[test]
    fn time_offset_equality() {
        // 10:00+02:00 denotes the same instant-of-day as 08:00Z.
        let a = XacmlTime::parse("10:00:00+02:00").unwrap();
        let b = XacmlTime::parse("08:00:00Z").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn date_ordering() {
        let a = XacmlDate::parse("2024-03-01").unwrap();
        let b = XacmlDate::parse("2024-03-02").unwrap();
        assert!(a < b);
    }

    #[test]
    fn date_time_instant_equality() {
        let a = XacmlDateTime::parse("2024-06-01T12:00:00+02:00").unwrap();
        let b = XacmlDateTime::parse("2024-06-01T10:00:00Z").unwrap();
        assert_eq!(a, b);
        // Round trip keeps the original wall clock.
        assert_eq!(a.to_string(), "2024-06-01T12:00:00+02:00");
    }

    #[test]
    fn date_time_duration_arithmetic() {
        let base = XacmlDateTime::parse("2024-01-31T10:00:00Z").unwrap();
        let month = YearMonthDuration::parse("P1M").unwrap();
        // Month addition clamps to the end of the shorter month.
        let shifted = base.add_year_month(&month).unwrap();
        assert_eq!(shifted.to_string(), "2024-02-29T10:00:00Z");

        let day = DayTimeDuration::parse("P1DT2H").unwrap();
        let shifted = base.add_day_time(&day).unwrap();
        assert_eq!(shifted.to_string(), "2024-02-01T12:00:00Z");
    }

    #[test]
    fn invalid_forms_are_syntax_errors() {
        assert!(XacmlTime::parse("25:00:00").is_err());
        assert!(XacmlDate::parse("2024-13-01").is_err());
        assert!(XacmlDateTime::parse("2024-06-01 10:00:00").is_err());
        assert!(XacmlTime::parse("10:00:00+15:00").is_err());
    }
}
