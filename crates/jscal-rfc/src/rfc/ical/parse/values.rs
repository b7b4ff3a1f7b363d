//! Value type parsers for iCalendar (RFC 5545 §3.3).
//!
//! Error sources from the numeric parsers carry no more detail than the
//! offending input, which is kept in the returned `ParseError`.
#![expect(
    clippy::map_err_ignore,
    reason = "Numeric parse errors are replaced by a ParseError holding the full input"
)]

use chrono::{NaiveDate, NaiveTime};

use super::error::{ParseError, ParseErrorKind, ParseResult};
use crate::rfc::ical::core::{
    Date, DateTime, DateTimeForm, Duration, Frequency, MonthNum, Period, RRule, RRuleUntil, Skip,
    Weekday, WeekdayNum,
};

/// Parses a DATE value (RFC 5545 §3.3.4).
///
/// Format: YYYYMMDD (e.g., "19970714")
///
/// ## Errors
/// Returns an error if the string is not a valid 8-digit calendar date.
pub fn parse_date(s: &str) -> ParseResult<Date> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::new(ParseErrorKind::InvalidDate, s));
    }
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .map(Date)
        .map_err(|_e| ParseError::new(ParseErrorKind::InvalidDate, s))
}

/// Parses a DATE-TIME value (RFC 5545 §3.3.5).
///
/// Format: YYYYMMDD"T"HHMMSS[Z]. The TZID comes from the property's
/// parameters and only applies to non-UTC values.
///
/// ## Errors
/// Returns an error if the string is not a valid date-time.
pub fn parse_datetime(s: &str, tzid: Option<&str>) -> ParseResult<DateTime> {
    let err = || ParseError::new(ParseErrorKind::InvalidDateTime, s);

    let (date_str, time_str) = s.split_once('T').ok_or_else(err)?;
    let (time_str, is_utc) = match time_str.strip_suffix('Z') {
        Some(stripped) => (stripped, true),
        None => (time_str, false),
    };
    if time_str.len() != 6 || !time_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }

    let date = parse_date(date_str).map_err(|_e| err())?;
    // Leap seconds are clamped to :59.
    let hour = time_str[0..2].parse::<u32>().map_err(|_e| err())?;
    let minute = time_str[2..4].parse::<u32>().map_err(|_e| err())?;
    let second = time_str[4..6].parse::<u32>().map_err(|_e| err())?.min(59);
    let time = NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(err)?;

    let form = if is_utc {
        DateTimeForm::Utc
    } else if let Some(tz) = tzid {
        DateTimeForm::Zoned {
            tzid: tz.to_string(),
        }
    } else {
        DateTimeForm::Floating
    };

    Ok(DateTime {
        local: date.0.and_time(time),
        form,
    })
}

/// Parses a DURATION value (RFC 5545 §3.3.6).
///
/// Format: [+|-]P[nW] or [+|-]P[nD][T[nH][nM][nS]]
///
/// ## Errors
/// Returns an error if the string is not a valid duration.
pub fn parse_duration(s: &str) -> ParseResult<Duration> {
    let err = || ParseError::new(ParseErrorKind::InvalidDuration, s);

    let (negative, rest) = if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else {
        (false, s.strip_prefix('+').unwrap_or(s))
    };
    let rest = rest.strip_prefix('P').ok_or_else(err)?;

    let mut dur = Duration {
        negative,
        ..Duration::zero()
    };
    let mut digits = String::new();
    let mut in_time = false;
    let mut date_parts = 0;
    let mut time_parts = 0;

    for c in rest.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        if c == 'T' && !in_time && digits.is_empty() {
            in_time = true;
            continue;
        }

        let n = digits.parse::<u32>().map_err(|_e| err())?;
        digits.clear();
        match (c, in_time) {
            ('W', false) => dur.weeks = n,
            ('D', false) => dur.days = n,
            ('H', true) => dur.hours = n,
            ('M', true) => dur.minutes = n,
            ('S', true) => dur.seconds = n,
            _ => return Err(err()),
        }
        if in_time {
            time_parts += 1;
        } else {
            date_parts += 1;
        }
    }

    let dangling = !digits.is_empty() || (in_time && time_parts == 0);
    let mixed_weeks = dur.weeks > 0 && (dur.days > 0 || time_parts > 0);
    if dangling || mixed_weeks || date_parts + time_parts == 0 {
        return Err(err());
    }
    Ok(dur)
}

/// Parses a PERIOD value (RFC 5545 §3.3.9).
///
/// Format: start"/"end or start"/"duration
///
/// ## Errors
/// Returns an error if the string is not a valid period.
pub fn parse_period(s: &str, tzid: Option<&str>) -> ParseResult<Period> {
    let err = || ParseError::new(ParseErrorKind::InvalidPeriod, s);
    let (start_str, end_str) = s.split_once('/').ok_or_else(err)?;

    let start = parse_datetime(start_str, tzid).map_err(|_e| err())?;
    if end_str.starts_with(['P', '+', '-']) {
        let duration = parse_duration(end_str).map_err(|_e| err())?;
        Ok(Period::Duration { start, duration })
    } else {
        let end = parse_datetime(end_str, tzid).map_err(|_e| err())?;
        Ok(Period::Explicit { start, end })
    }
}

/// Parses a BOOLEAN value (RFC 5545 §3.3.2).
///
/// ## Errors
/// Returns an error if the string is not "TRUE" or "FALSE".
pub fn parse_boolean(s: &str) -> ParseResult<bool> {
    match s.to_ascii_uppercase().as_str() {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        _ => Err(ParseError::new(ParseErrorKind::InvalidBoolean, s)),
    }
}

/// Parses a RECUR (RRULE) value (RFC 5545 §3.3.10, RFC 7529).
///
/// ## Errors
/// Returns an error if the string is not a valid recurrence rule, has no
/// FREQ, or carries both COUNT and UNTIL.
pub fn parse_rrule(s: &str) -> ParseResult<RRule> {
    let mut rrule = RRule::default();

    for part in s.split(';').filter(|p| !p.is_empty()) {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidRRule, s))?;
        parse_rrule_part(&mut rrule, key, value)
            .map_err(|e| ParseError::new(e.kind, s))?;
    }

    if rrule.freq.is_none() {
        return Err(ParseError::new(ParseErrorKind::InvalidFrequency, s));
    }
    if rrule.count.is_some() && rrule.until.is_some() {
        return Err(ParseError::new(ParseErrorKind::UntilCountConflict, s));
    }

    Ok(rrule)
}

/// Parses a single RRULE key-value pair.
fn parse_rrule_part(rrule: &mut RRule, key: &str, value: &str) -> ParseResult<()> {
    let invalid = || ParseError::new(ParseErrorKind::InvalidRRule, value);

    match key.to_ascii_uppercase().as_str() {
        "FREQ" => {
            rrule.freq = Some(
                Frequency::parse(value)
                    .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidFrequency, value))?,
            );
        }
        "INTERVAL" => rrule.interval = Some(value.parse().map_err(|_e| invalid())?),
        "COUNT" => rrule.count = Some(value.parse().map_err(|_e| invalid())?),
        "UNTIL" => {
            rrule.until = Some(if value.contains('T') {
                RRuleUntil::DateTime(parse_datetime(value, None)?)
            } else {
                RRuleUntil::Date(parse_date(value)?)
            });
        }
        "WKST" => {
            rrule.wkst = Some(
                Weekday::parse(value)
                    .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidWeekday, value))?,
            );
        }
        "RSCALE" => rrule.rscale = Some(value.to_ascii_lowercase()),
        "SKIP" => rrule.skip = Some(Skip::parse(value).ok_or_else(invalid)?),
        "BYSECOND" => rrule.by_second = parse_list(value)?,
        "BYMINUTE" => rrule.by_minute = parse_list(value)?,
        "BYHOUR" => rrule.by_hour = parse_list(value)?,
        "BYDAY" => {
            rrule.by_day = value
                .split(',')
                .map(|v| parse_weekday_num(v.trim()))
                .collect::<ParseResult<_>>()?;
        }
        "BYMONTHDAY" => rrule.by_monthday = parse_list(value)?,
        "BYYEARDAY" => rrule.by_yearday = parse_list(value)?,
        "BYWEEKNO" => rrule.by_weekno = parse_list(value)?,
        "BYMONTH" => {
            rrule.by_month = value
                .split(',')
                .map(|v| parse_month_num(v.trim()))
                .collect::<ParseResult<_>>()?;
        }
        "BYSETPOS" => rrule.by_setpos = parse_list(value)?,
        other => tracing::trace!(part = %other, "Ignoring unknown RRULE part"),
    }
    Ok(())
}

/// Parses a comma-separated list of integers.
fn parse_list<T: std::str::FromStr>(s: &str) -> ParseResult<Vec<T>> {
    s.split(',')
        .map(|v| {
            v.trim()
                .trim_start_matches('+')
                .parse()
                .map_err(|_e| ParseError::new(ParseErrorKind::InvalidRRule, s))
        })
        .collect()
}

/// Parses a single weekday with optional ordinal (e.g., "MO", "1MO", "-1FR").
fn parse_weekday_num(s: &str) -> ParseResult<WeekdayNum> {
    let split = s
        .len()
        .checked_sub(2)
        .filter(|&i| s.is_char_boundary(i))
        .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidWeekday, s))?;
    let (ordinal_str, weekday_str) = s.split_at(split);

    let weekday = Weekday::parse(weekday_str)
        .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidWeekday, s))?;

    let ordinal = if ordinal_str.is_empty() {
        None
    } else {
        let n = ordinal_str
            .trim_start_matches('+')
            .parse::<i16>()
            .map_err(|_e| ParseError::new(ParseErrorKind::InvalidRRule, s))?;
        if n == 0 {
            return Err(ParseError::new(ParseErrorKind::InvalidRRule, s));
        }
        Some(n)
    };

    Ok(WeekdayNum { ordinal, weekday })
}

/// Parses a BYMONTH entry with optional leap suffix (e.g., "3", "5L").
fn parse_month_num(s: &str) -> ParseResult<MonthNum> {
    let (digits, leap) = match s.strip_suffix(['L', 'l']) {
        Some(stripped) => (stripped, true),
        None => (s, false),
    };
    let month = digits
        .parse::<u8>()
        .map_err(|_e| ParseError::new(ParseErrorKind::InvalidRRule, s))?;
    Ok(MonthNum { month, leap })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn parse_date_basic() {
        let date = parse_date("20260123").unwrap();
        assert_eq!(date.to_string(), "20260123");
        assert!(parse_date("2026012").is_err());
        assert!(parse_date("20261301").is_err());
        assert!(parse_date("20260230").is_err());
    }

    #[test_log::test]
    fn parse_datetime_forms() {
        let dt = parse_datetime("20260123T120000Z", Some("Ignored/Zone")).unwrap();
        assert!(dt.is_utc());

        let dt = parse_datetime("20260123T120000", None).unwrap();
        assert!(dt.is_floating());

        let dt = parse_datetime("20260123T120000", Some("America/New_York")).unwrap();
        assert_eq!(dt.tzid(), Some("America/New_York"));

        assert!(parse_datetime("20260123T1200", None).is_err());
        assert!(parse_datetime("20260123T250000", None).is_err());
    }

    #[test_log::test]
    fn parse_duration_variants() {
        assert_eq!(parse_duration("P2W").unwrap(), Duration::weeks(2));
        let dur = parse_duration("P1DT2H30M").unwrap();
        assert_eq!((dur.days, dur.hours, dur.minutes), (1, 2, 30));
        let dur = parse_duration("-PT15M").unwrap();
        assert!(dur.negative);
        assert_eq!(dur.minutes, 15);
        assert_eq!(parse_duration("P0D").unwrap().as_seconds(), 0);
    }

    #[test_log::test]
    fn parse_duration_rejects_garbage() {
        for bad in ["", "P", "PT", "1D", "P1H", "PT1D", "P1W2D", "P1DT", "P1.5D", "PTxM"] {
            assert!(parse_duration(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test_log::test]
    fn parse_period_variants() {
        match parse_period("20260123T090000Z/20260123T170000Z", None).unwrap() {
            Period::Explicit { start, end } => assert!(start.local < end.local),
            Period::Duration { .. } => panic!("Expected explicit period"),
        }
        match parse_period("20260123T090000Z/PT8H", None).unwrap() {
            Period::Duration { duration, .. } => assert_eq!(duration.hours, 8),
            Period::Explicit { .. } => panic!("Expected duration period"),
        }
    }

    #[test_log::test]
    fn parse_rrule_basic() {
        let rrule = parse_rrule("FREQ=DAILY;COUNT=10").unwrap();
        assert_eq!(rrule.freq, Some(Frequency::Daily));
        assert_eq!(rrule.count, Some(10));
    }

    #[test_log::test]
    fn parse_rrule_byday_and_leap_month() {
        let rrule = parse_rrule("RSCALE=CHINESE;FREQ=YEARLY;SKIP=FORWARD;BYMONTH=5L;BYDAY=-1FR,MO")
            .unwrap();
        assert_eq!(rrule.rscale.as_deref(), Some("chinese"));
        assert_eq!(rrule.skip, Some(Skip::Forward));
        assert_eq!(rrule.by_month, vec![MonthNum { month: 5, leap: true }]);
        assert_eq!(rrule.by_day[0], WeekdayNum::nth(-1, Weekday::Friday));
        assert_eq!(rrule.by_day[1], WeekdayNum::every(Weekday::Monday));
    }

    #[test_log::test]
    fn parse_rrule_rejects_conflicts_and_missing_freq() {
        let conflict = parse_rrule("FREQ=DAILY;COUNT=10;UNTIL=20260131").unwrap_err();
        assert_eq!(conflict.kind, ParseErrorKind::UntilCountConflict);

        let missing = parse_rrule("COUNT=10").unwrap_err();
        assert_eq!(missing.kind, ParseErrorKind::InvalidFrequency);

        assert!(parse_rrule("FREQ=WEEKLY;BYDAY=0MO").is_err());
    }

    #[test_log::test]
    fn display_then_parse_is_stable() {
        let source = "FREQ=MONTHLY;INTERVAL=2;UNTIL=20261231T235959Z;BYDAY=2TU;BYSETPOS=-1";
        assert_eq!(parse_rrule(source).unwrap().to_string(), source);
    }
}
