//! Date-time helpers shared by the field converters.
//!
//! Event objects carry wall-clock readings as `YYYY-MM-DDTHH:MM:SS` and UTC
//! instants with a trailing `Z`. Component values carry their own form
//! (floating, UTC or zoned), which these helpers translate.

use chrono::{NaiveDateTime, Timelike};
use chrono_tz::Tz;
use jscal_rfc::rfc::ical::core::{
    Component, Date, DateTime, DateTimeForm, Duration, Property, Value, prop,
};
use jscal_rfc::rfc::ical::expand::{TimeZoneResolver, localize};

const LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Formats a wall-clock reading as a local date-time.
#[must_use]
pub fn format_local(local: NaiveDateTime) -> String {
    local.format(LOCAL_FORMAT).to_string()
}

/// Formats a UTC instant with the `Z` suffix.
#[must_use]
pub fn format_utc(utc: NaiveDateTime) -> String {
    format!("{}Z", format_local(utc))
}

/// Parses a local date-time. No offset or suffix is accepted.
#[must_use]
pub fn parse_local(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, LOCAL_FORMAT).ok()
}

/// Parses a UTC date-time, which must end in `Z`.
#[must_use]
pub fn parse_utc(s: &str) -> Option<NaiveDateTime> {
    parse_local(s.strip_suffix('Z')?)
}

/// Returns whether a reading falls exactly on midnight.
#[must_use]
pub fn is_midnight(local: NaiveDateTime) -> bool {
    local.time().num_seconds_from_midnight() == 0 && local.nanosecond() == 0
}

/// ## Summary
/// Returns the timezone identifier of a date or date-time property.
///
/// An explicit TZID wins; otherwise the value's own form is used, so UTC
/// values report `"UTC"` and floating values and dates report nothing.
pub fn prop_tzid(resolver: &mut TimeZoneResolver, prop: &Property) -> Option<String> {
    if let Some(tzid) = prop.tzid() {
        return Some(tzid.to_string());
    }
    match &prop.value {
        Value::DateTime(dt) => resolver.guess(dt),
        Value::Period(period) => resolver.guess(period.start()),
        _ => None,
    }
}

/// ## Summary
/// Converts a component date-time into a UTC reading.
///
/// Floating values and zones that do not resolve are taken as-is.
pub fn to_utc(resolver: &mut TimeZoneResolver, dt: &DateTime) -> NaiveDateTime {
    match &dt.form {
        DateTimeForm::Utc | DateTimeForm::Floating => dt.local,
        DateTimeForm::Zoned { tzid } => match resolver.resolve(tzid) {
            Ok(tz) => localize(dt.local, tz).naive_utc(),
            Err(e) => {
                tracing::debug!(error = %e, "Treating unresolvable zone as floating");
                dt.local
            }
        },
    }
}

/// Converts a value to UTC, reading dates as midnight in `tzid`.
pub fn value_to_utc(
    resolver: &mut TimeZoneResolver,
    value: &Value,
    tzid: Option<&str>,
) -> Option<NaiveDateTime> {
    match value {
        Value::DateTime(dt) => Some(to_utc(resolver, dt)),
        Value::Period(period) => Some(to_utc(resolver, period.start())),
        Value::Date(d) => {
            let local = d.at_midnight();
            Some(local_to_utc(resolver, local, tzid))
        }
        _ => None,
    }
}

/// Converts a wall-clock reading in `tzid` into UTC.
pub fn local_to_utc(
    resolver: &mut TimeZoneResolver,
    local: NaiveDateTime,
    tzid: Option<&str>,
) -> NaiveDateTime {
    match tzid.map(|id| resolver.resolve(id)) {
        Some(Ok(tz)) => localize(local, tz).naive_utc(),
        _ => local,
    }
}

/// Converts a UTC reading into wall-clock time in `tz` (floating if `None`).
#[must_use]
pub fn utc_to_local(utc: NaiveDateTime, tz: Option<Tz>) -> NaiveDateTime {
    tz.map_or(utc, |tz| utc.and_utc().with_timezone(&tz).naive_local())
}

/// Converts a wall-clock reading between two zones.
#[must_use]
pub fn convert_zone(local: NaiveDateTime, from: Option<Tz>, to: Option<Tz>) -> NaiveDateTime {
    match from {
        Some(from) if Some(from) != to => utc_to_local(localize(local, from).naive_utc(), to),
        _ => local,
    }
}

/// Builds a component date-time for `local` in `tz`.
#[must_use]
pub fn zoned_datetime(local: NaiveDateTime, tz: Option<Tz>) -> DateTime {
    match tz {
        None => DateTime::floating(local),
        Some(Tz::UTC) => DateTime::utc(local),
        Some(tz) => DateTime::zoned(local, tz.name()),
    }
}

/// ## Summary
/// Builds a start-like property (DTSTART, RECURRENCE-ID, EXDATE, ...).
///
/// All-day events get a DATE value; everything else a date-time in `tz`.
#[must_use]
pub fn occurrence_property(name: &str, local: NaiveDateTime, tz: Option<Tz>, all_day: bool) -> Property {
    if all_day {
        Property::date(name, Date(local.date()))
    } else {
        Property::datetime(name, zoned_datetime(local, tz))
    }
}

/// ## Summary
/// Returns the end of an event as a component value.
///
/// Uses DTEND when present, else DTSTART plus DURATION. Without either, a
/// date start ends one day later and a date-time start ends when it starts.
/// Returns `None` without a DTSTART or if the end is out of range.
#[must_use]
pub fn event_end(comp: &Component) -> Option<Value> {
    if let Some(dtend) = comp.get_property(prop::DTEND) {
        return Some(dtend.value.clone());
    }
    let dtstart = comp.get_property(prop::DTSTART)?;
    let delta = match comp.get_property(prop::DURATION).and_then(Property::as_duration) {
        Some(duration) => duration.to_delta()?,
        None if dtstart.value.is_date() => chrono::TimeDelta::days(1),
        None => chrono::TimeDelta::zero(),
    };
    Some(match &dtstart.value {
        Value::DateTime(dt) => Value::DateTime(DateTime {
            local: dt.local.checked_add_signed(delta)?,
            form: dt.form.clone(),
        }),
        Value::Date(d) => Value::Date(Date(d.at_midnight().checked_add_signed(delta)?.date())),
        other => other.clone(),
    })
}

/// ## Summary
/// Returns the time between DTSTART and the event end.
///
/// An explicit DURATION is returned as written. Otherwise the difference is
/// taken between absolute instants, so an event ending in another zone
/// reports its real length. Negative spans clamp to zero.
pub fn event_duration(resolver: &mut TimeZoneResolver, comp: &Component) -> Duration {
    let Some(dtstart) = comp.get_property(prop::DTSTART) else {
        return Duration::zero();
    };
    if comp.get_property(prop::DTEND).is_none()
        && let Some(duration) = comp.get_property(prop::DURATION).and_then(Property::as_duration)
    {
        return if duration.negative {
            Duration::zero()
        } else {
            *duration
        };
    }
    let Some(end) = event_end(comp) else {
        return Duration::zero();
    };
    let tzid_start = prop_tzid(resolver, dtstart);
    let tzid_end = comp
        .get_property(prop::DTEND)
        .and_then(|p| prop_tzid(resolver, p))
        .or_else(|| tzid_start.clone());

    let start = value_to_utc(resolver, &dtstart.value, tzid_start.as_deref());
    let end = value_to_utc(resolver, &end, tzid_end.as_deref());
    match (start, end) {
        (Some(start), Some(end)) => Duration::from_seconds((end - start).num_seconds().max(0)),
        _ => Duration::zero(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, 0))
            .unwrap()
    }

    #[test_log::test]
    fn local_and_utc_strings() {
        let dt = at(2024, 3, 9, 7, 5);
        assert_eq!(format_local(dt), "2024-03-09T07:05:00");
        assert_eq!(format_utc(dt), "2024-03-09T07:05:00Z");
        assert_eq!(parse_local("2024-03-09T07:05:00"), Some(dt));
        assert_eq!(parse_utc("2024-03-09T07:05:00Z"), Some(dt));
        assert_eq!(parse_local("2024-03-09T07:05:00Z"), None);
        assert_eq!(parse_utc("2024-03-09T07:05:00"), None);
        assert_eq!(parse_local("2024-03-09"), None);
    }

    #[test_log::test]
    fn duration_spans_zones() {
        let mut event = Component::event();
        event.add_property(Property::datetime(
            prop::DTSTART,
            DateTime::zoned(at(2024, 6, 1, 9, 0), "America/New_York"),
        ));
        event.add_property(Property::datetime(
            prop::DTEND,
            DateTime::zoned(at(2024, 6, 1, 16, 0), "Europe/London"),
        ));
        let mut resolver = TimeZoneResolver::new();
        assert_eq!(event_duration(&mut resolver, &event), Duration::hours(2));
    }

    #[test_log::test]
    fn missing_end_defaults() {
        let mut resolver = TimeZoneResolver::new();

        let mut all_day = Component::event();
        all_day.add_property(Property::date(
            prop::DTSTART,
            Date::from_ymd(2024, 5, 1).unwrap(),
        ));
        assert_eq!(event_duration(&mut resolver, &all_day), Duration::days(1));

        let mut timed = Component::event();
        timed.add_property(Property::datetime(
            prop::DTSTART,
            DateTime::floating(at(2024, 5, 1, 9, 0)),
        ));
        assert_eq!(event_duration(&mut resolver, &timed), Duration::zero());

        timed.add_property(Property::duration(prop::DURATION, Duration::minutes(45)));
        assert_eq!(event_duration(&mut resolver, &timed), Duration::minutes(45));
    }

    #[test_log::test]
    fn out_of_range_end_is_none() {
        let mut event = Component::event();
        event.add_property(Property::datetime(
            prop::DTSTART,
            DateTime::utc(at(2024, 5, 1, 9, 0)),
        ));
        event.add_property(Property::duration(prop::DURATION, Duration::days(4_000_000_000)));
        assert_eq!(event_end(&event), None);

        let mut all_day = Component::event();
        all_day.add_property(Property::date(
            prop::DTSTART,
            Date::from_ymd(2024, 5, 1).unwrap(),
        ));
        all_day.add_property(Property::duration(prop::DURATION, Duration::days(4_000_000_000)));
        assert_eq!(event_end(&all_day), None);
    }

    #[test_log::test]
    fn zone_conversion() {
        let berlin: Tz = "Europe/Berlin".parse().unwrap();
        let tokyo: Tz = "Asia/Tokyo".parse().unwrap();
        let local = at(2024, 1, 10, 9, 0);
        assert_eq!(convert_zone(local, Some(berlin), Some(tokyo)), at(2024, 1, 10, 17, 0));
        assert_eq!(convert_zone(local, None, Some(tokyo)), local);
        assert_eq!(utc_to_local(at(2024, 1, 10, 8, 0), Some(berlin)), local);
        assert_eq!(zoned_datetime(local, Some(Tz::UTC)), DateTime::utc(local));
        assert_eq!(
            zoned_datetime(local, Some(berlin)),
            DateTime::zoned(local, "Europe/Berlin")
        );
    }
}
