//! Component to event object.

use jscal_core::constants::EVENT_TYPE;
use jscal_rfc::rfc::ical::core::{Component, Property, Value as IcalValue, param, prop};
use serde_json::{Value, json};

use super::overrides::overrides_from_ical;
use crate::context::Context;
use crate::error::{ConvertError, ConvertResult};
use crate::fields::{EventField, WantedFields};
use crate::props::alerts::alerts_from_ical;
use crate::props::keywords::{keywords_from_ical, related_to_from_ical};
use crate::props::links::links_from_ical;
use crate::props::locations::locations_from_ical;
use crate::props::participants::{participants_from_ical, reply_to_from_ical};
use crate::props::recurrence::recurrence_from_ical;
use crate::props::{JsonObject, html_description_from_ical};
use crate::time::{event_duration, format_local, format_utc, prop_tzid, to_utc};
use crate::xparam::{self, X_JMAP_USEDEFAULTALERTS};

fn put(event: &mut JsonObject, field: EventField, value: Value) {
    event.insert(field.as_str().to_string(), value);
}

/// ## Summary
/// Converts one VEVENT into an event object.
///
/// `calendar` is the enclosing VCALENDAR, used for `prodId` and to find
/// the per-instance exceptions of a master event. Exceptions (contexts made
/// with [`Context::exception`]) never carry master-only fields.
///
/// When `recurrenceOverrides` is requested the field filter is lifted for
/// the whole conversion so override patches are computed against the full
/// event; the result is projected onto the requested fields at the end.
///
/// ## Errors
/// Returns `ConvertError::Structural` if the VEVENT has no DTSTART.
pub fn event_from_ical(
    ctx: &mut Context<'_>,
    comp: &Component,
    calendar: Option<&Component>,
) -> ConvertResult<JsonObject> {
    let is_exception = ctx.is_exception();
    let suspended = if !is_exception && ctx.wants(EventField::RecurrenceOverrides) {
        ctx.suspend_filter()
    } else {
        None
    };

    let dtstart = comp
        .get_property(prop::DTSTART)
        .ok_or_else(|| ConvertError::Structural("VEVENT has no DTSTART".to_string()))?;
    let is_all_day = dtstart.value.is_date();
    ctx.tzid_start = if is_all_day {
        None
    } else {
        prop_tzid(&mut ctx.resolver, dtstart).map(|tzid| match ctx.resolver.resolve(&tzid) {
            Ok(tz) => tz.name().to_string(),
            Err(_e) => tzid,
        })
    };

    let mut event = JsonObject::new();
    put(&mut event, EventField::Type, json!(EVENT_TYPE));

    if !is_exception {
        if ctx.wants(EventField::IsAllDay) {
            put(&mut event, EventField::IsAllDay, json!(is_all_day));
        }
        if let Some(uid) = comp.uid() {
            put(&mut event, EventField::Uid, json!(uid));
        }
        if ctx.wants(EventField::RelatedTo) {
            put(&mut event, EventField::RelatedTo, related_to_from_ical(comp));
        }
        if ctx.wants(EventField::ProdId) {
            let prodid = calendar.and_then(|cal| xparam::get_prop_value(cal, prop::PRODID));
            put(&mut event, EventField::ProdId, json!(prodid));
        }
    }

    if ctx.wants(EventField::Created) {
        let created = utc_timestamp(ctx, comp.get_property(prop::CREATED));
        put(&mut event, EventField::Created, created);
    }
    if ctx.wants(EventField::Updated) {
        let updated = utc_timestamp(ctx, comp.get_property(prop::DTSTAMP));
        put(&mut event, EventField::Updated, updated);
    }
    if ctx.wants(EventField::Sequence) {
        let sequence = comp
            .get_property(prop::SEQUENCE)
            .and_then(Property::as_integer)
            .unwrap_or(0);
        put(&mut event, EventField::Sequence, json!(sequence));
    }
    if ctx.wants(EventField::Priority)
        && let Some(priority) = comp.get_property(prop::PRIORITY).and_then(Property::as_integer)
    {
        put(&mut event, EventField::Priority, json!(priority));
    }
    if ctx.wants(EventField::Title) {
        let title = xparam::get_prop_value(comp, prop::SUMMARY).unwrap_or_default();
        put(&mut event, EventField::Title, json!(title));
    }
    if ctx.wants(EventField::Description) {
        let description = xparam::get_prop_value(comp, prop::DESCRIPTION).unwrap_or_default();
        put(&mut event, EventField::Description, json!(description));
    }
    if ctx.wants(EventField::HtmlDescription) {
        put(&mut event, EventField::HtmlDescription, json!(html_description_from_ical(comp)));
    }
    if ctx.wants(EventField::Color)
        && let Some(color) = xparam::get_prop_value(comp, prop::COLOR)
    {
        put(&mut event, EventField::Color, json!(color));
    }
    if ctx.wants(EventField::Keywords) {
        put(&mut event, EventField::Keywords, keywords_from_ical(comp));
    }
    if ctx.wants(EventField::Links) {
        put(&mut event, EventField::Links, links_from_ical(comp, "link"));
    }
    if ctx.wants(EventField::Locale) {
        put(&mut event, EventField::Locale, json!(locale_from_ical(comp)));
    }
    if ctx.wants(EventField::Locations) {
        let locations = locations_from_ical(ctx, comp);
        put(&mut event, EventField::Locations, locations);
    }

    if ctx.wants(EventField::Start) {
        let start = dtstart.value.local_datetime().map(format_local);
        put(&mut event, EventField::Start, json!(start));
    }
    if ctx.wants(EventField::TimeZone) {
        put(&mut event, EventField::TimeZone, json!(ctx.tzid_start));
    }
    if ctx.wants(EventField::Duration) {
        let duration = event_duration(&mut ctx.resolver, comp);
        put(&mut event, EventField::Duration, json!(duration.to_string()));
    }
    if !is_exception && ctx.wants(EventField::RecurrenceRule) {
        let recurrence = recurrence_from_ical(ctx, comp);
        put(&mut event, EventField::RecurrenceRule, recurrence);
    }

    if ctx.wants(EventField::Status)
        && let Some(status) = status_from_ical(comp)
    {
        put(&mut event, EventField::Status, json!(status));
    }
    if ctx.wants(EventField::FreeBusyStatus) {
        let transparent = xparam::get_prop_value(comp, prop::TRANSP)
            .is_some_and(|transp| transp.eq_ignore_ascii_case("TRANSPARENT"));
        let status = if transparent { "free" } else { "busy" };
        put(&mut event, EventField::FreeBusyStatus, json!(status));
    }
    if ctx.wants(EventField::Privacy) {
        let privacy = match xparam::get_prop_value(comp, prop::CLASS)
            .map(str::to_ascii_uppercase)
            .as_deref()
        {
            Some("CONFIDENTIAL") => "secret",
            Some("PRIVATE") => "private",
            _ => "public",
        };
        put(&mut event, EventField::Privacy, json!(privacy));
    }

    if !is_exception && ctx.wants(EventField::ReplyTo) {
        put(&mut event, EventField::ReplyTo, reply_to_from_ical(comp));
    }
    if ctx.wants(EventField::Participants) {
        put(&mut event, EventField::Participants, participants_from_ical(comp));
    }
    if ctx.wants(EventField::UseDefaultAlerts) && uses_default_alerts(comp) {
        put(&mut event, EventField::UseDefaultAlerts, json!(true));
    }
    if ctx.wants(EventField::Alerts) {
        let alerts = alerts_from_ical(ctx, comp);
        put(&mut event, EventField::Alerts, alerts);
    }

    if !is_exception && ctx.wants(EventField::RecurrenceOverrides) {
        let overrides = overrides_from_ical(ctx, comp, calendar, &event)?;
        put(&mut event, EventField::RecurrenceOverrides, overrides);
    }

    let filter = suspended.or_else(|| ctx.wanted().cloned());
    Ok(match filter {
        Some(wanted) => project(event, &wanted),
        None => event,
    })
}

/// Keeps only the requested fields; requested fields without a value are `null`.
fn project(mut event: JsonObject, wanted: &WantedFields) -> JsonObject {
    wanted
        .fields()
        .map(|field| {
            let value = event.remove(field.as_str()).unwrap_or(Value::Null);
            (field.as_str().to_string(), value)
        })
        .collect()
}

fn utc_timestamp(ctx: &mut Context<'_>, property: Option<&Property>) -> Value {
    match property.and_then(Property::as_datetime) {
        Some(dt) => json!(format_utc(to_utc(&mut ctx.resolver, dt))),
        None => Value::Null,
    }
}

/// LANGUAGE of SUMMARY, else of DESCRIPTION.
fn locale_from_ical(comp: &Component) -> Option<&str> {
    [prop::SUMMARY, prop::DESCRIPTION]
        .into_iter()
        .filter_map(|name| comp.get_property(name))
        .find_map(|p| p.get_param_value(param::LANGUAGE))
}

fn status_from_ical(comp: &Component) -> Option<&'static str> {
    let status = xparam::get_prop_value(comp, prop::STATUS)?.to_ascii_uppercase();
    match status.as_str() {
        "TENTATIVE" => Some("tentative"),
        "CONFIRMED" => Some("confirmed"),
        "CANCELLED" => Some("cancelled"),
        _ => None,
    }
}

fn uses_default_alerts(comp: &Component) -> bool {
    comp.get_property(X_JMAP_USEDEFAULTALERTS)
        .is_some_and(|p| match &p.value {
            IcalValue::Boolean(flag) => *flag,
            other => other.as_text().is_some_and(|s| s.eq_ignore_ascii_case("TRUE")),
        })
}
