//! Event object to component.

use chrono::NaiveDateTime;
use chrono_tz::Tz;
use jscal_core::constants::EVENT_TYPE;
use jscal_rfc::rfc::ical::core::{
    Component, DateTime, Duration, Parameter, Property, Value as IcalValue, param, prop,
};
use jscal_rfc::rfc::ical::parse::parse_duration;
use serde_json::Value;

use super::overrides::overrides_to_ical;
use crate::context::Context;
use crate::error::ConvertResult;
use crate::props::alerts::alerts_to_ical;
use crate::props::keywords::{keywords_to_ical, related_to_to_ical};
use crate::props::links::links_to_ical;
use crate::props::locations::{is_end_timezone, locations_to_ical};
use crate::props::participants::{participants_to_ical, reply_to_to_ical};
use crate::props::recurrence::recurrence_to_ical;
use crate::props::{JsonObject, html_description_to_ical, nullable_object};
use crate::time::{convert_zone, is_midnight, occurrence_property, parse_local};
use crate::xparam::{self, X_JMAP_ATTACH, X_JMAP_USEDEFAULTALERTS};

/// Replaces the value of the first `name` property, keeping its parameters.
fn set_text(comp: &mut Component, name: &str, text: &str) {
    match comp.get_property_mut(name) {
        Some(existing) => existing.value = IcalValue::Text(text.to_string()),
        None => comp.add_property(Property::text(name, text)),
    }
}

/// ## Summary
/// Writes an event object into `comp`.
///
/// Only the members present in `event` are written; `null` clears a
/// member. Start and end are resolved first; if they are invalid DTSTART and
/// the end are left alone and the remaining members are still checked. `calendar` is the VCALENDAR the master lives in:
/// it receives PRODID and the exception VEVENTs. Pass `None` for an
/// exception, which also skips the members an exception inherits.
///
/// Invalid members are reported through `ctx`; callers must discard the
/// component if any were reported.
///
/// ## Errors
/// Returns fatal errors from the recurrence rule and override writers.
pub fn event_to_ical(
    ctx: &mut Context<'_>,
    comp: &mut Component,
    mut calendar: Option<&mut Component>,
    event: &JsonObject,
) -> ConvertResult<()> {
    let before = ctx.invalid_count();
    let is_exception = ctx.is_exception();

    match event.get("excluded") {
        None | Some(Value::Bool(false)) => {}
        Some(_) => ctx.invalid("excluded"),
    }
    match event.get("@type") {
        None => {}
        Some(Value::String(kind)) if kind == EVENT_TYPE => {}
        Some(_) => ctx.invalid("@type"),
    }
    comp.set_property(Property::text(prop::UID, ctx.uid.clone()));

    startend_to_ical(ctx, comp, event);

    if !is_exception {
        if let Some(related) = event.get("relatedTo") {
            related_to_to_ical(ctx, comp, related);
        }
        if let Some(calendar) = calendar.as_deref_mut() {
            prod_id_to_ical(ctx, calendar, event.get("prodId"));
        }
    }
    comp.remove_properties(prop::PRODID);

    if ctx.is_create() {
        comp.set_property(Property::datetime(prop::CREATED, DateTime::utc(ctx.now)));
    }
    comp.set_property(Property::datetime(prop::DTSTAMP, DateTime::utc(ctx.now)));

    scalars_to_ical(ctx, comp, event);

    if let Some(keywords) = event.get("keywords") {
        keywords_to_ical(ctx, comp, keywords);
    }
    if let Some(links) = event.get("links") {
        comp.remove_properties(X_JMAP_ATTACH);
        match nullable_object(ctx, links, "links") {
            Ok(Some(links)) => links_to_ical(ctx, comp, links, "links", prop::ATTACH),
            Ok(None) => {
                comp.remove_properties(prop::ATTACH);
            }
            Err(()) => {}
        }
    }
    if let Some(locale) = event.get("locale") {
        locale_to_ical(ctx, comp, locale);
    }
    if let Some(locations) = event.get("locations") {
        locations_to_ical(ctx, comp, locations);
    }
    if !is_exception && let Some(recurrence) = event.get("recurrenceRule") {
        recurrence_to_ical(ctx, comp, recurrence)?;
    }

    status_to_ical(ctx, comp, event);

    if !is_exception && let Some(reply_to) = event.get("replyTo") {
        reply_to_to_ical(ctx, comp, reply_to);
    }
    if let Some(participants) = event.get("participants") {
        participants_to_ical(ctx, comp, participants);
    }
    if let Some(use_default) = event.get("useDefaultAlerts") {
        xparam::remove_all(comp, X_JMAP_USEDEFAULTALERTS);
        match use_default {
            Value::Bool(true) => comp.add_property(Property::new(
                X_JMAP_USEDEFAULTALERTS,
                IcalValue::Boolean(true),
            )),
            Value::Bool(false) | Value::Null => {}
            _ => ctx.invalid("useDefaultAlerts"),
        }
    }
    if let Some(alerts) = event.get("alerts") {
        alerts_to_ical(ctx, comp, alerts);
    }

    if !is_exception && let Some(overrides) = event.get("recurrenceOverrides") {
        match calendar {
            Some(_) if comp.get_property(prop::DTSTART).is_none() => {
                tracing::trace!(uid = %ctx.uid, "No start to key overrides on");
            }
            Some(calendar) => overrides_to_ical(ctx, comp, calendar, overrides)?,
            None => tracing::debug!(uid = %ctx.uid, "No calendar to hold overrides"),
        }
    }

    if ctx.invalid_count() == before {
        let has_organizer = comp.get_property(prop::ORGANIZER).is_some();
        let has_attendees = comp.get_property(prop::ATTENDEE).is_some();
        if has_organizer != has_attendees {
            ctx.invalid("replyTo");
            ctx.invalid("participants");
        }
    }
    Ok(())
}

/// ## Summary
/// Resolves `isAllDay`, `start`, `timeZone`, `duration` and the end zone,
/// then writes DTSTART and either DTEND or DURATION.
///
/// The end zone comes from the first location with `rel: "end"`. DTEND is
/// only written when the event ends in another zone than it starts.
/// If anything is invalid `comp` is left untouched.
fn startend_to_ical(ctx: &mut Context<'_>, comp: &mut Component, event: &JsonObject) {
    let before = ctx.invalid_count();

    ctx.is_all_day = match event.get("isAllDay") {
        Some(Value::Bool(all_day)) => *all_day,
        None if !ctx.is_create() => comp
            .get_property(prop::DTSTART)
            .is_some_and(|p| p.value.is_date()),
        _ => {
            ctx.invalid("isAllDay");
            false
        }
    };
    let all_day = ctx.is_all_day;

    ctx.tz_start = match event.get("timeZone") {
        None | Some(Value::Null) => None,
        Some(Value::String(tzid)) => match ctx.resolver.resolve(tzid) {
            Ok(tz) => Some(tz),
            Err(e) => {
                tracing::debug!(tzid = %tzid, error = %e, "Unknown timeZone");
                ctx.invalid("timeZone");
                None
            }
        },
        Some(_) => {
            ctx.invalid("timeZone");
            None
        }
    };
    if all_day && ctx.tz_start.is_some() {
        ctx.invalid("timeZone");
    }

    let end_zone = end_timezone(ctx, event);
    ctx.tz_end = match &end_zone {
        Some((id, tz)) => {
            if all_day || ctx.tz_start.is_none() {
                ctx.enter_key("locations", id).invalid("timeZone");
            }
            Some(*tz)
        }
        None => ctx.tz_start,
    };

    let duration = match event.get("duration") {
        None | Some(Value::Null) => Some(Duration::zero()),
        Some(Value::String(s)) => parse_duration(s).ok().filter(|d| !d.negative),
        Some(_) => None,
    };
    let duration = match duration {
        Some(d) if !(all_day && d.has_time()) => d,
        _ => {
            ctx.invalid("duration");
            Duration::zero()
        }
    };

    let start = event
        .get("start")
        .and_then(Value::as_str)
        .and_then(parse_local)
        .filter(|start| !all_day || is_midnight(*start));
    let Some(start) = start else {
        ctx.invalid("start");
        return;
    };

    let end = match end_zone {
        Some((id, tz_end)) if Some(tz_end) != ctx.tz_start => {
            let Some(end) = end_local(start, duration, ctx.tz_start, tz_end) else {
                ctx.invalid("duration");
                return;
            };
            let mut dtend = occurrence_property(prop::DTEND, end, Some(tz_end), false);
            xparam::set_id(&mut dtend, &id);
            dtend
        }
        _ => Property::duration(prop::DURATION, duration),
    };

    if ctx.invalid_count() > before {
        return;
    }

    comp.remove_properties(prop::DTSTART);
    comp.remove_properties(prop::DTEND);
    comp.remove_properties(prop::DURATION);
    comp.add_property(occurrence_property(prop::DTSTART, start, ctx.tz_start, all_day));
    comp.add_property(end);
}

fn end_local(
    start: NaiveDateTime,
    duration: Duration,
    from: Option<Tz>,
    to: Tz,
) -> Option<NaiveDateTime> {
    let end = start.checked_add_signed(duration.to_delta()?)?;
    Some(convert_zone(end, from, Some(to)))
}

/// Returns the id and zone of the first end-timezone location.
fn end_timezone(ctx: &mut Context<'_>, event: &JsonObject) -> Option<(String, Tz)> {
    let Some(Value::Object(locations)) = event.get("locations") else {
        return None;
    };
    let (id, loc) = locations.iter().find_map(|(id, loc)| match loc {
        Value::Object(loc) if is_end_timezone(loc) => Some((id, loc)),
        _ => None,
    })?;
    let tzid = loc.get("timeZone").and_then(Value::as_str);
    match tzid.map(|tzid| ctx.resolver.resolve(tzid)) {
        Some(Ok(tz)) => Some((id.clone(), tz)),
        _ => {
            ctx.enter_key("locations", id).invalid("timeZone");
            None
        }
    }
}

fn prod_id_to_ical(ctx: &mut Context<'_>, calendar: &mut Component, prod_id: Option<&Value>) {
    match prod_id {
        Some(Value::String(prod_id)) => {
            calendar.set_property(Property::text(prop::PRODID, prod_id.as_str()));
        }
        None | Some(Value::Null) => {
            if ctx.is_create() {
                calendar.set_property(Property::text(prop::PRODID, ctx.product_id.as_str()));
            }
        }
        Some(_) => ctx.invalid("prodId"),
    }
}

fn scalars_to_ical(ctx: &mut Context<'_>, comp: &mut Component, event: &JsonObject) {
    match event.get("sequence") {
        None | Some(Value::Null) => {
            if ctx.is_create() {
                comp.set_property(Property::integer(prop::SEQUENCE, 0));
            }
        }
        Some(value) => match value.as_u64().and_then(|n| i32::try_from(n).ok()) {
            Some(sequence) => comp.set_property(Property::integer(prop::SEQUENCE, sequence)),
            None => ctx.invalid("sequence"),
        },
    }

    match event.get("priority") {
        None => {}
        Some(Value::Null) => {
            comp.remove_properties(prop::PRIORITY);
        }
        Some(value) => match value
            .as_u64()
            .filter(|p| *p <= 9)
            .and_then(|p| i32::try_from(p).ok())
        {
            Some(priority) => comp.set_property(Property::integer(prop::PRIORITY, priority)),
            None => ctx.invalid("priority"),
        },
    }

    match event.get("title") {
        Some(Value::String(title)) => set_text(comp, prop::SUMMARY, title),
        None | Some(Value::Null) if ctx.is_create() => ctx.invalid("title"),
        None => {}
        Some(Value::Null) => {
            comp.remove_properties(prop::SUMMARY);
        }
        Some(_) => ctx.invalid("title"),
    }

    match event.get("description") {
        None => {}
        Some(Value::String(description)) if !description.is_empty() => {
            set_text(comp, prop::DESCRIPTION, description);
        }
        Some(Value::String(_) | Value::Null) => {
            comp.remove_properties(prop::DESCRIPTION);
        }
        Some(_) => ctx.invalid("description"),
    }

    match event.get("htmlDescription") {
        None => {}
        Some(Value::String(html)) => html_description_to_ical(comp, Some(html)),
        Some(Value::Null) => html_description_to_ical(comp, None),
        Some(_) => ctx.invalid("htmlDescription"),
    }

    match event.get("color") {
        None => {}
        Some(Value::String(color)) if !color.is_empty() => set_text(comp, prop::COLOR, color),
        Some(Value::Null) => {
            comp.remove_properties(prop::COLOR);
        }
        Some(_) => ctx.invalid("color"),
    }
}

fn locale_to_ical(ctx: &mut Context<'_>, comp: &mut Component, locale: &Value) {
    for name in [prop::SUMMARY, prop::DESCRIPTION] {
        if let Some(property) = comp.get_property_mut(name) {
            property.remove_params(param::LANGUAGE);
        }
    }
    match locale {
        Value::Null => {}
        Value::String(locale) if !locale.is_empty() => {
            if let Some(summary) = comp.get_property_mut(prop::SUMMARY) {
                summary.add_param(Parameter::new(param::LANGUAGE, locale.as_str()));
            } else {
                tracing::trace!(locale = %locale, "No SUMMARY to carry the locale");
            }
        }
        _ => ctx.invalid("locale"),
    }
}

fn status_to_ical(ctx: &mut Context<'_>, comp: &mut Component, event: &JsonObject) {
    match event.get("status") {
        None => {}
        Some(Value::Null) => {
            comp.remove_properties(prop::STATUS);
        }
        Some(Value::String(status))
            if matches!(status.as_str(), "tentative" | "confirmed" | "cancelled") =>
        {
            set_text(comp, prop::STATUS, &status.to_ascii_uppercase());
        }
        Some(_) => ctx.invalid("status"),
    }

    match event.get("freeBusyStatus").map(|v| (v, v.as_str())) {
        None => {}
        Some((_, Some("free"))) => set_text(comp, prop::TRANSP, "TRANSPARENT"),
        Some((_, Some("busy"))) => {
            if comp.get_property(prop::TRANSP).is_some() {
                set_text(comp, prop::TRANSP, "OPAQUE");
            }
        }
        Some((Value::Null, _)) => {
            comp.remove_properties(prop::TRANSP);
        }
        Some(_) => ctx.invalid("freeBusyStatus"),
    }

    let class = match event.get("privacy").map(|v| (v, v.as_str())) {
        None => return,
        Some((_, Some("public"))) => {
            if comp.get_property(prop::CLASS).is_none() {
                return;
            }
            "PUBLIC"
        }
        Some((_, Some("private"))) => "PRIVATE",
        Some((_, Some("secret"))) => "CONFIDENTIAL",
        Some((Value::Null, _)) => {
            comp.remove_properties(prop::CLASS);
            return;
        }
        Some(_) => {
            ctx.invalid("privacy");
            return;
        }
    };
    set_text(comp, prop::CLASS, class);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Mode;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn object(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn create(event: Value) -> (Component, Component, Vec<String>) {
        let mut sink = BTreeSet::new();
        let mut ctx = Context::writer(&mut sink, Mode::Create, "uid-1", "-//test//EN");
        let mut calendar = Component::calendar();
        let mut comp = Component::event();
        event_to_ical(&mut ctx, &mut comp, Some(&mut calendar), &object(event)).unwrap();
        drop(ctx);
        (comp, calendar, sink.into_iter().collect())
    }

    fn line(comp: &Component, name: &str) -> Option<String> {
        comp.get_property(name).map(ToString::to_string)
    }

    #[test_log::test]
    fn minimal_event_is_written() {
        let (comp, calendar, invalid) = create(json!({
            "@type": "jsevent",
            "isAllDay": false,
            "start": "2024-03-01T10:00:00",
            "timeZone": "Europe/Paris",
            "duration": "PT45M",
            "title": "Review",
            "freeBusyStatus": "free",
            "privacy": "private",
            "status": "confirmed",
            "priority": 5,
            "locale": "fr",
        }));
        assert!(invalid.is_empty(), "{invalid:?}");
        assert_eq!(line(&comp, prop::UID).as_deref(), Some("UID:uid-1"));
        assert_eq!(
            line(&comp, prop::DTSTART).as_deref(),
            Some("DTSTART;TZID=Europe/Paris:20240301T100000")
        );
        assert_eq!(line(&comp, prop::DURATION).as_deref(), Some("DURATION:PT45M"));
        assert_eq!(line(&comp, prop::SUMMARY).as_deref(), Some("SUMMARY;LANGUAGE=fr:Review"));
        assert_eq!(line(&comp, prop::TRANSP).as_deref(), Some("TRANSP:TRANSPARENT"));
        assert_eq!(line(&comp, prop::CLASS).as_deref(), Some("CLASS:PRIVATE"));
        assert_eq!(line(&comp, prop::STATUS).as_deref(), Some("STATUS:CONFIRMED"));
        assert_eq!(line(&comp, prop::PRIORITY).as_deref(), Some("PRIORITY:5"));
        assert_eq!(line(&comp, prop::SEQUENCE).as_deref(), Some("SEQUENCE:0"));
        assert!(comp.get_property(prop::CREATED).is_some());
        assert!(comp.get_property(prop::DTSTAMP).is_some());
        assert_eq!(line(&calendar, prop::PRODID).as_deref(), Some("PRODID:-//test//EN"));
    }

    #[test_log::test]
    fn end_zone_writes_dtend() {
        let (comp, _, invalid) = create(json!({
            "@type": "jsevent",
            "isAllDay": false,
            "start": "2024-03-01T10:00:00",
            "timeZone": "Europe/Paris",
            "duration": "PT2H",
            "title": "Flight",
            "locations": {
                "arrival": {"timeZone": "Europe/London", "rel": "end"},
            },
        }));
        assert!(invalid.is_empty(), "{invalid:?}");
        assert!(comp.get_property(prop::DURATION).is_none());
        assert_eq!(
            line(&comp, prop::DTEND).as_deref(),
            Some("DTEND;TZID=Europe/London;X-JMAP-ID=arrival:20240301T110000")
        );
    }

    #[test_log::test]
    fn all_day_rules_are_enforced() {
        let (_, _, invalid) = create(json!({
            "@type": "jsevent",
            "isAllDay": true,
            "start": "2024-03-01T10:00:00",
            "timeZone": "Europe/Paris",
            "duration": "PT1H",
            "title": "Holiday",
        }));
        assert_eq!(invalid, ["duration", "start", "timeZone"]);

        let (comp, _, invalid) = create(json!({
            "@type": "jsevent",
            "isAllDay": true,
            "start": "2024-03-01T00:00:00",
            "duration": "P1D",
            "title": "Holiday",
        }));
        assert!(invalid.is_empty(), "{invalid:?}");
        assert_eq!(
            line(&comp, prop::DTSTART).as_deref(),
            Some("DTSTART;VALUE=DATE:20240301")
        );
    }

    #[test_log::test]
    fn create_requires_mandatory_members() {
        let (_, _, invalid) = create(json!({"@type": "jsevent", "start": "2024-03-01T10:00:00"}));
        assert_eq!(invalid, ["isAllDay", "title"]);

        let (_, _, invalid) = create(json!({
            "@type": "jsevent",
            "isAllDay": false,
            "start": "2024-03-01T10:00:00",
            "priority": 12,
            "excluded": true,
        }));
        assert_eq!(invalid, ["excluded", "priority", "title"]);
    }

    #[test_log::test]
    fn organizer_and_attendees_go_together() {
        let (_, _, invalid) = create(json!({
            "@type": "jsevent",
            "isAllDay": false,
            "start": "2024-03-01T10:00:00",
            "title": "Lunch",
            "replyTo": {"imip": "mailto:boss@example.com"},
        }));
        assert_eq!(invalid, ["participants", "replyTo"]);
    }

    #[test_log::test]
    fn type_may_be_omitted_but_not_wrong() {
        let (comp, _, invalid) = create(json!({
            "isAllDay": false,
            "start": "2024-03-01T10:00:00",
            "title": "Untyped",
        }));
        assert!(invalid.is_empty(), "{invalid:?}");
        assert!(comp.get_property(prop::DTSTART).is_some());

        let (_, _, invalid) = create(json!({
            "@type": "jstask",
            "isAllDay": false,
            "start": "2024-03-01T10:00:00",
            "title": "Typed",
        }));
        assert_eq!(invalid, ["@type"]);
    }

    #[test_log::test]
    fn bad_start_still_checks_later_members() {
        let (comp, _, invalid) = create(json!({
            "@type": "jsevent",
            "isAllDay": false,
            "start": "not-a-date",
            "title": "Broken",
            "priority": 12,
            "keywords": {"a": true},
            "recurrenceRule": {"frequency": "daily", "interval": 0},
            "recurrenceOverrides": {"2024-03-02T10:00:00": {"excluded": true}},
        }));
        assert_eq!(
            invalid,
            ["keywords", "priority", "recurrenceRule/interval", "start"]
        );
        assert!(comp.get_property(prop::DTSTART).is_none());
    }

    #[test_log::test]
    fn overflowing_end_is_invalid_duration() {
        let (comp, _, invalid) = create(json!({
            "@type": "jsevent",
            "isAllDay": false,
            "start": "2024-03-01T10:00:00",
            "timeZone": "Europe/Paris",
            "duration": "P4000000000D",
            "title": "Forever",
            "locations": {
                "arrival": {"timeZone": "Europe/London", "rel": "end"},
            },
        }));
        assert_eq!(invalid, ["duration"]);
        assert!(comp.get_property(prop::DTEND).is_none());
    }
}
