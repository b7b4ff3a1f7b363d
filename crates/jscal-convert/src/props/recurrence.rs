//! `recurrenceRule`.

use std::ops::RangeInclusive;

use jscal_rfc::rfc::ical::core::{
    Component, DateTime, Frequency, Property, RRuleUntil, Skip, Value as IcalValue, Weekday, prop,
};
use jscal_rfc::rfc::ical::expand::localize;
use jscal_rfc::rfc::ical::parse::parse_rrule;
use serde_json::{Value, json};

use super::{JsonObject, opt_str};
use crate::context::Context;
use crate::error::{ConvertError, ConvertResult};
use crate::time::{format_local, is_midnight, parse_local, to_utc, utc_to_local};

fn sorted<T: Ord + Copy + Into<i64>>(values: &[T]) -> Value {
    let mut values: Vec<i64> = values.iter().map(|v| (*v).into()).collect();
    values.sort_unstable();
    json!(values)
}

/// ## Summary
/// Reads the first RRULE of `comp`.
///
/// `until` is expressed in the wall-clock time of the start timezone, so
/// the context's start timezone must already be known.
pub fn recurrence_from_ical(ctx: &mut Context<'_>, comp: &Component) -> Value {
    let Some(rrule) = comp.get_property(prop::RRULE).and_then(|p| p.value.as_recur()) else {
        return Value::Null;
    };
    let Some(freq) = rrule.freq else {
        return Value::Null;
    };

    let mut recur = JsonObject::new();
    recur.insert("frequency".into(), json!(freq.as_str().to_lowercase()));
    if let Some(interval) = rrule.interval.filter(|i| *i > 1) {
        recur.insert("interval".into(), json!(interval));
    }
    if let Some(rscale) = &rrule.rscale {
        recur.insert("rscale".into(), json!(rscale.to_lowercase()));
    }
    match rrule.skip {
        Some(Skip::Backward) => {
            recur.insert("skip".into(), json!("backward"));
        }
        Some(Skip::Forward) => {
            recur.insert("skip".into(), json!("forward"));
        }
        Some(Skip::Omit) | None => {}
    }
    if let Some(wkst) = rrule.wkst.filter(|w| *w != Weekday::Monday) {
        recur.insert("firstDayOfWeek".into(), json!(wkst.as_str().to_lowercase()));
    }

    if !rrule.by_day.is_empty() {
        let by_day: Vec<Value> = rrule
            .by_day
            .iter()
            .map(|d| {
                let mut day = JsonObject::new();
                day.insert("day".into(), json!(d.weekday.as_str().to_lowercase()));
                if let Some(nth) = d.ordinal {
                    day.insert("nthOfPeriod".into(), json!(nth));
                }
                Value::Object(day)
            })
            .collect();
        recur.insert("byDay".into(), Value::Array(by_day));
    }
    if !rrule.by_month.is_empty() {
        let mut months = rrule.by_month.clone();
        months.sort_unstable();
        let months: Vec<String> = months.iter().map(ToString::to_string).collect();
        recur.insert("byMonth".into(), json!(months));
    }
    if !rrule.by_monthday.is_empty() {
        recur.insert("byDate".into(), sorted(&rrule.by_monthday));
    }
    if !rrule.by_yearday.is_empty() {
        recur.insert("byYearDay".into(), sorted(&rrule.by_yearday));
    }
    if !rrule.by_weekno.is_empty() {
        recur.insert("byWeekNo".into(), sorted(&rrule.by_weekno));
    }
    if !rrule.by_hour.is_empty() {
        recur.insert("byHour".into(), sorted(&rrule.by_hour));
    }
    if !rrule.by_minute.is_empty() {
        recur.insert("byMinute".into(), sorted(&rrule.by_minute));
    }
    if !rrule.by_second.is_empty() {
        recur.insert("bySecond".into(), sorted(&rrule.by_second));
    }
    if !rrule.by_setpos.is_empty() {
        recur.insert("bySetPosition".into(), sorted(&rrule.by_setpos));
    }

    match (rrule.count, &rrule.until) {
        (Some(count), _) => {
            recur.insert("count".into(), json!(count));
        }
        (None, Some(until)) => {
            let local = match until {
                RRuleUntil::Date(d) => d.at_midnight(),
                RRuleUntil::DateTime(dt) if dt.is_floating() => dt.local,
                RRuleUntil::DateTime(dt) => {
                    let utc = to_utc(&mut ctx.resolver, dt);
                    let tz = ctx
                        .tzid_start
                        .clone()
                        .and_then(|tzid| ctx.resolver.resolve(&tzid).ok());
                    utc_to_local(utc, tz)
                }
            };
            recur.insert("until".into(), json!(format_local(local)));
        }
        (None, None) => {}
    }

    Value::Object(recur)
}

/// ## Summary
/// Replaces RRULE from a `recurrenceRule` object.
///
/// The rule is rendered as RRULE text and parsed back, so what ends up on
/// the component is exactly what a reader of the text would see.
///
/// ## Errors
/// Returns `ConvertError::Structural` if the rendered rule does not parse.
pub fn recurrence_to_ical(
    ctx: &mut Context<'_>,
    comp: &mut Component,
    recur: &Value,
) -> ConvertResult<()> {
    comp.remove_properties(prop::RRULE);
    let recur = match recur {
        Value::Null => return Ok(()),
        Value::Object(map) => map,
        _ => {
            ctx.invalid("recurrenceRule");
            return Ok(());
        }
    };

    let mut ctx = ctx.enter("recurrenceRule");
    let before = ctx.invalid_count();
    let mut parts: Vec<String> = Vec::new();

    match recur.get("frequency").and_then(Value::as_str) {
        Some(freq) if Frequency::parse(freq).is_some() => {
            parts.push(format!("FREQ={}", freq.to_ascii_uppercase()));
        }
        _ => ctx.invalid("frequency"),
    }

    match recur.get("interval") {
        None | Some(Value::Null) => {}
        Some(value) => match value.as_u64() {
            Some(1) => {}
            Some(interval) if interval > 1 => parts.push(format!("INTERVAL={interval}")),
            _ => ctx.invalid("interval"),
        },
    }

    let skip = opt_str(&mut ctx, recur, "skip");
    if let Some(skip) = skip {
        if Skip::parse(skip).is_some() {
            parts.push(format!("SKIP={}", skip.to_ascii_uppercase()));
        } else {
            ctx.invalid("skip");
        }
    }
    match opt_str(&mut ctx, recur, "rscale") {
        Some(rscale) if !rscale.is_empty() => {
            parts.push(format!("RSCALE={}", rscale.to_ascii_uppercase()));
        }
        Some(_) => ctx.invalid("rscale"),
        None if skip.is_some() => ctx.invalid("rscale"),
        None => {}
    }

    if let Some(first_day) = opt_str(&mut ctx, recur, "firstDayOfWeek") {
        match Weekday::parse(first_day) {
            Some(wkst) => parts.push(format!("WKST={wkst}")),
            None => ctx.invalid("firstDayOfWeek"),
        }
    }

    by_day_to_ical(&mut ctx, recur, &mut parts);
    by_month_to_ical(&mut ctx, recur, &mut parts);
    for (field, tag, range, allow_zero) in [
        ("byDate", "BYMONTHDAY", -31..=31, false),
        ("byYearDay", "BYYEARDAY", -366..=366, false),
        ("byWeekNo", "BYWEEKNO", -53..=53, false),
        ("byHour", "BYHOUR", 0..=23, true),
        ("byMinute", "BYMINUTE", 0..=59, true),
        ("bySecond", "BYSECOND", 0..=59, true),
        ("bySetPosition", "BYSETPOS", -366..=366, false),
    ] {
        by_x_to_ical(&mut ctx, recur, field, tag, &range, allow_zero, &mut parts);
    }

    let has_count = recur.get("count").is_some_and(|v| !v.is_null());
    let has_until = recur.get("until").is_some_and(|v| !v.is_null());
    match (has_count, has_until) {
        (true, true) => {
            ctx.invalid("count");
            ctx.invalid("until");
        }
        (true, false) => match recur.get("count").and_then(Value::as_u64) {
            Some(count) if count > 0 => parts.push(format!("COUNT={count}")),
            _ => ctx.invalid("count"),
        },
        (false, true) => match recur.get("until").and_then(Value::as_str).and_then(parse_local) {
            Some(local) if ctx.is_all_day && !is_midnight(local) => ctx.invalid("until"),
            Some(local) => parts.push(format!("UNTIL={}", until_to_ical(&ctx, local))),
            None => ctx.invalid("until"),
        },
        (false, false) => {}
    }

    if ctx.invalid_count() != before {
        return Ok(());
    }

    let text = parts.join(";");
    let rrule = parse_rrule(&text)
        .map_err(|e| ConvertError::Structural(format!("Generated RRULE {text:?} is invalid: {e}")))?;
    comp.add_property(Property::new(prop::RRULE, IcalValue::Recur(Box::new(rrule))));
    Ok(())
}

fn until_to_ical(ctx: &Context<'_>, local: chrono::NaiveDateTime) -> String {
    if ctx.is_all_day {
        return local.format("%Y%m%d").to_string();
    }
    match ctx.tz_start {
        None => DateTime::floating(local).to_string(),
        Some(tz) => DateTime::utc(localize(local, tz).naive_utc()).to_string(),
    }
}

fn by_day_to_ical(ctx: &mut Context<'_>, recur: &JsonObject, parts: &mut Vec<String>) {
    let days = match recur.get("byDay") {
        None | Some(Value::Null) => return,
        Some(Value::Array(days)) if !days.is_empty() => days,
        Some(_) => {
            ctx.invalid("byDay");
            return;
        }
    };

    let mut entries = Vec::with_capacity(days.len());
    for (i, day) in days.iter().enumerate() {
        let mut ctx = ctx.enter_index("byDay", i);
        let Value::Object(day) = day else {
            ctx.invalid_here();
            continue;
        };
        let weekday = day.get("day").and_then(Value::as_str).and_then(Weekday::parse);
        if weekday.is_none() {
            ctx.invalid("day");
        }
        let nth = match day.get("nthOfPeriod") {
            None | Some(Value::Null) => Some(None),
            Some(value) => match value.as_i64().filter(|n| *n != 0) {
                Some(n) => Some(Some(n)),
                None => {
                    ctx.invalid("nthOfPeriod");
                    None
                }
            },
        };
        if let (Some(weekday), Some(nth)) = (weekday, nth) {
            entries.push(match nth {
                Some(n) => format!("{n:+}{weekday}"),
                None => weekday.to_string(),
            });
        }
    }
    parts.push(format!("BYDAY={}", entries.join(",")));
}

fn by_month_to_ical(ctx: &mut Context<'_>, recur: &JsonObject, parts: &mut Vec<String>) {
    let months = match recur.get("byMonth") {
        None | Some(Value::Null) => return,
        Some(Value::Array(months)) if !months.is_empty() => months,
        Some(_) => {
            ctx.invalid("byMonth");
            return;
        }
    };

    let mut entries = Vec::with_capacity(months.len());
    for (i, month) in months.iter().enumerate() {
        let parsed = month.as_str().and_then(|s| {
            let (digits, leap) = s.strip_suffix('L').map_or((s, false), |d| (d, true));
            let n = digits.parse::<u8>().ok().filter(|n| (1..=13).contains(n))?;
            Some(if leap { format!("{n}L") } else { n.to_string() })
        });
        match parsed {
            Some(entry) => entries.push(entry),
            None => ctx.enter_index("byMonth", i).invalid_here(),
        }
    }
    parts.push(format!("BYMONTH={}", entries.join(",")));
}

fn by_x_to_ical(
    ctx: &mut Context<'_>,
    recur: &JsonObject,
    field: &str,
    tag: &str,
    range: &RangeInclusive<i64>,
    allow_zero: bool,
    parts: &mut Vec<String>,
) {
    let values = match recur.get(field) {
        None | Some(Value::Null) => return,
        Some(Value::Array(values)) if !values.is_empty() => values,
        Some(_) => {
            ctx.invalid(field);
            return;
        }
    };

    let mut entries = Vec::with_capacity(values.len());
    for (i, value) in values.iter().enumerate() {
        match value
            .as_i64()
            .filter(|n| range.contains(n) && (allow_zero || *n != 0))
        {
            Some(n) => entries.push(n.to_string()),
            None => ctx.enter_index(field, i).invalid_here(),
        }
    }
    parts.push(format!("{tag}={}", entries.join(",")));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Mode;
    use chrono_tz::Tz;
    use std::collections::BTreeSet;

    fn write(recur: &Value, tz: Option<Tz>, all_day: bool) -> (Component, Vec<String>) {
        let mut sink = BTreeSet::new();
        let mut ctx = Context::writer(&mut sink, Mode::Create, "u", "p");
        ctx.tz_start = tz;
        ctx.is_all_day = all_day;
        let mut event = Component::event();
        recurrence_to_ical(&mut ctx, &mut event, recur).unwrap();
        drop(ctx);
        (event, sink.into_iter().collect())
    }

    fn read(event: &Component, tzid: Option<&str>) -> Value {
        let mut sink = BTreeSet::new();
        let mut ctx = Context::reader(&mut sink, None);
        ctx.tzid_start = tzid.map(ToString::to_string);
        recurrence_from_ical(&mut ctx, event)
    }

    #[test_log::test]
    fn rule_round_trips_with_sorted_lists() {
        let recur = json!({
            "frequency": "monthly",
            "interval": 2,
            "firstDayOfWeek": "su",
            "byDay": [{"day": "fr", "nthOfPeriod": -1}, {"day": "mo"}],
            "byDate": [15, 1],
            "byMonth": ["3", "1"],
            "bySetPosition": [1],
            "count": 6
        });
        let (event, invalid) = write(&recur, None, false);
        assert!(invalid.is_empty(), "{invalid:?}");

        let rrule = event.get_property(prop::RRULE).unwrap();
        assert_eq!(
            rrule.to_string(),
            "RRULE:FREQ=MONTHLY;INTERVAL=2;COUNT=6;WKST=SU;BYDAY=-1FR,MO;BYMONTHDAY=15,1;BYMONTH=3,1;BYSETPOS=1"
        );

        let mut expected = recur;
        expected["byDate"] = json!([1, 15]);
        expected["byMonth"] = json!(["1", "3"]);
        assert_eq!(read(&event, None), expected);
    }

    #[test_log::test]
    fn until_is_local_to_the_start_zone() {
        let berlin: Tz = "Europe/Berlin".parse().unwrap();
        let recur = json!({"frequency": "daily", "until": "2024-07-01T09:00:00"});
        let (event, invalid) = write(&recur, Some(berlin), false);
        assert!(invalid.is_empty());
        assert_eq!(
            event.get_property(prop::RRULE).unwrap().to_string(),
            "RRULE:FREQ=DAILY;UNTIL=20240701T070000Z"
        );
        assert_eq!(read(&event, Some("Europe/Berlin")), recur);

        let (all_day, _) = write(
            &json!({"frequency": "yearly", "until": "2030-01-01T00:00:00"}),
            None,
            true,
        );
        assert_eq!(
            all_day.get_property(prop::RRULE).unwrap().to_string(),
            "RRULE:FREQ=YEARLY;UNTIL=20300101"
        );
    }

    #[test_log::test]
    fn count_with_until_invalidates_both() {
        let (event, invalid) = write(
            &json!({"frequency": "weekly", "count": 3, "until": "2024-02-01T00:00:00"}),
            None,
            false,
        );
        assert!(event.get_property(prop::RRULE).is_none());
        assert_eq!(invalid, ["recurrenceRule/count", "recurrenceRule/until"]);
    }

    #[test_log::test]
    fn bounds_are_checked() {
        let (_, invalid) = write(
            &json!({
                "frequency": "yearly",
                "interval": 0,
                "skip": "forward",
                "byDay": [{"day": "xx"}, {"day": "mo", "nthOfPeriod": 0}],
                "byDate": [0, 32],
                "byMonth": ["14", "2L"],
                "byHour": [24],
                "byWeekNo": []
            }),
            None,
            false,
        );
        assert_eq!(
            invalid,
            [
                "recurrenceRule/byDate/0",
                "recurrenceRule/byDate/1",
                "recurrenceRule/byDay/0/day",
                "recurrenceRule/byDay/1/nthOfPeriod",
                "recurrenceRule/byHour/0",
                "recurrenceRule/byMonth/0",
                "recurrenceRule/byWeekNo",
                "recurrenceRule/interval",
                "recurrenceRule/rscale",
            ]
        );
    }
}
