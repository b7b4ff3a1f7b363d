//! `recurrenceOverrides`.
//!
//! Overrides are keyed by the local start of the occurrence they change,
//! read in the zone of the master start. An empty patch is an extra
//! occurrence (RDATE), `{"excluded": true}` removes one (EXDATE), and any
//! other patch becomes a VEVENT with a RECURRENCE-ID next to the master.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDateTime;
use chrono_tz::Tz;
use jscal_rfc::rfc::ical::core::{
    Component, ComponentKind, DateTime, Property, Value as IcalValue, prop,
};
use jscal_rfc::rfc::ical::expand::TimeZoneResolver;
use serde_json::{Value, json};

use super::read::event_from_ical;
use super::write::event_to_ical;
use crate::context::{Context, decode_pointer};
use crate::error::ConvertResult;
use crate::fields::EventField;
use crate::patch;
use crate::props::JsonObject;
use crate::time::{format_local, is_midnight, occurrence_property, parse_local, to_utc, utc_to_local};

/// Top-level members an override may not patch.
const FORBIDDEN_KEYS: [&str; 8] = [
    "uid",
    "relatedTo",
    "prodId",
    "isAllDay",
    "recurrenceRule",
    "recurrenceOverrides",
    "replyTo",
    "participantId",
];

/// ## Summary
/// Returns the override key of an occurrence value.
///
/// Dates are read as midnight and floating times as written. Zoned and UTC
/// times are moved into `tz`, the zone of the master start.
fn occurrence_key(
    resolver: &mut TimeZoneResolver,
    value: &IcalValue,
    tz: Option<Tz>,
) -> Option<NaiveDateTime> {
    let dt = match value {
        IcalValue::Date(d) => return Some(d.at_midnight()),
        IcalValue::DateTime(dt) => dt,
        IcalValue::Period(period) => period.start(),
        _ => return None,
    };
    Some(datetime_key(resolver, dt, tz))
}

fn datetime_key(resolver: &mut TimeZoneResolver, dt: &DateTime, tz: Option<Tz>) -> NaiveDateTime {
    if dt.is_floating() {
        return dt.local;
    }
    let same_zone = match tz {
        Some(Tz::UTC) => dt.is_utc(),
        Some(tz) => dt.tzid().is_some_and(|id| id == tz.name()),
        None => false,
    };
    if same_zone {
        dt.local
    } else {
        utc_to_local(to_utc(resolver, dt), tz)
    }
}

fn start_zone(ctx: &mut Context<'_>) -> Option<Tz> {
    let tzid = ctx.tzid_start.clone()?;
    ctx.resolver.resolve(&tzid).ok()
}

/// ## Summary
/// Reads RDATE, EXDATE and the exceptions of `master` into override patches.
///
/// `event` is the master as read so far; each exception is read on its own
/// and stored as the difference from it. Returns `null` when the event has
/// no overrides.
///
/// ## Errors
/// Propagates conversion errors other than a malformed exception, which is
/// skipped.
pub fn overrides_from_ical(
    ctx: &mut Context<'_>,
    master: &Component,
    calendar: Option<&Component>,
    event: &JsonObject,
) -> ConvertResult<Value> {
    let tz = start_zone(ctx);
    let mut overrides = JsonObject::new();

    for rdate in master.get_properties(prop::RDATE) {
        for member in rdate.value.members() {
            let Some(key) = occurrence_key(&mut ctx.resolver, member, tz) else {
                continue;
            };
            let patch = match member {
                IcalValue::Period(period) => json!({"duration": period.duration().to_string()}),
                _ => json!({}),
            };
            overrides.insert(format_local(key), patch);
        }
    }

    for exdate in master.get_properties(prop::EXDATE) {
        for member in exdate.value.members() {
            if let Some(key) = occurrence_key(&mut ctx.resolver, member, tz) {
                overrides.insert(format_local(key), json!({"excluded": true}));
            }
        }
    }

    if let Some(calendar) = calendar {
        let mut base = event.clone();
        for field in EventField::ALL {
            if field.is_master_only() {
                base.remove(field.as_str());
            }
        }
        base.remove(EventField::Created.as_str());
        base.remove(EventField::Updated.as_str());

        let master_uid = master.uid();
        for exception in calendar.events() {
            if !exception.is_exception() || exception.uid() != master_uid {
                continue;
            }
            let Some(key) = exception
                .get_property(prop::RECURRENCE_ID)
                .and_then(|rid| occurrence_key(&mut ctx.resolver, &rid.value, tz))
            else {
                continue;
            };
            let key = format_local(key);

            let mut instance = {
                let mut ex_ctx = ctx.exception();
                match event_from_ical(&mut ex_ctx, exception, None) {
                    Ok(instance) => instance,
                    Err(e) => {
                        tracing::warn!(recurrence_id = %key, error = %e, "Skipping unreadable exception");
                        continue;
                    }
                }
            };
            instance.remove(EventField::Created.as_str());
            instance.remove(EventField::Updated.as_str());
            if instance.get("start").and_then(Value::as_str) == Some(key.as_str())
                && let Some(start) = base.get("start")
            {
                instance.insert("start".to_string(), start.clone());
            }

            let patch = patch::diff(&base, &instance);
            overrides.insert(key, Value::Object(patch));
        }
    }

    Ok(if overrides.is_empty() {
        Value::Null
    } else {
        Value::Object(overrides)
    })
}

/// Returns the first forbidden top-level member a patch touches.
fn forbidden_member(patch: &JsonObject) -> Option<String> {
    patch.keys().find_map(|path| {
        let first = decode_pointer(path.split('/').next().unwrap_or_default());
        FORBIDDEN_KEYS.contains(&first.as_str()).then_some(first)
    })
}

/// ## Summary
/// Writes `recurrenceOverrides` onto `master` and its `calendar`.
///
/// RDATE and EXDATE of the master are rebuilt and every exception VEVENT
/// with the master's UID is replaced. Existing exceptions are reused for
/// keys that are still overridden, so properties the event object does not
/// describe survive. `master` must already hold its final start and zone, and must
/// not be a child of `calendar` while this runs.
///
/// ## Errors
/// Propagates errors from reading the master or writing an exception.
pub fn overrides_to_ical(
    ctx: &mut Context<'_>,
    master: &mut Component,
    calendar: &mut Component,
    overrides: &Value,
) -> ConvertResult<()> {
    master.remove_properties(prop::RDATE);
    master.remove_properties(prop::EXDATE);

    let tz = ctx.tz_start;
    let mut existing: HashMap<NaiveDateTime, Component> = HashMap::new();
    for child in calendar.take_children(ComponentKind::Event) {
        if child.uid() != Some(ctx.uid.as_str()) {
            calendar.add_child(child);
            continue;
        }
        let key = child
            .get_property(prop::RECURRENCE_ID)
            .and_then(|rid| occurrence_key(&mut ctx.resolver, &rid.value, tz));
        match key {
            Some(key) => {
                existing.insert(key, child);
            }
            None => calendar.add_child(child),
        }
    }

    let overrides = match overrides {
        Value::Null => return Ok(()),
        Value::Object(map) => map,
        _ => {
            ctx.invalid("recurrenceOverrides");
            return Ok(());
        }
    };
    if overrides.is_empty() {
        return Ok(());
    }

    let base = {
        let mut sink = BTreeSet::new();
        let mut reader = Context::reader(&mut sink, None);
        let mut base = event_from_ical(&mut reader, master, None)?;
        base.remove(EventField::RecurrenceRule.as_str());
        base.remove(EventField::RecurrenceOverrides.as_str());
        base
    };

    for (key, patch) in overrides {
        let mut entry = ctx.enter_key("recurrenceOverrides", key);
        let all_day = entry.is_all_day;

        let Some(local) = parse_local(key).filter(|local| !all_day || is_midnight(*local)) else {
            entry.invalid_here();
            continue;
        };
        let Value::Object(patch) = patch else {
            entry.invalid_here();
            continue;
        };

        match patch.get("excluded") {
            Some(Value::Bool(true)) if patch.len() == 1 => {
                master.add_property(occurrence_property(prop::EXDATE, local, tz, all_day));
                continue;
            }
            Some(Value::Bool(true)) => {
                entry.invalid_here();
                continue;
            }
            _ => {}
        }
        if patch.is_empty() {
            master.add_property(occurrence_property(prop::RDATE, local, tz, all_day));
            continue;
        }
        if let Some(member) = forbidden_member(patch) {
            tracing::trace!(recurrence_id = %key, member = %member, "Skipping override of a master-only member");
            continue;
        }

        let mut patch = patch.clone();
        patch
            .entry("start")
            .or_insert_with(|| Value::String(format_local(local)));
        let instance_event = match patch::apply(&base, &patch) {
            Ok(instance_event) => instance_event,
            Err(e) => {
                tracing::debug!(recurrence_id = %key, error = %e, "Override patch does not apply");
                entry.invalid_here();
                continue;
            }
        };

        let mut instance = existing.remove(&local).unwrap_or_else(|| {
            let mut instance = master.clone();
            instance.remove_properties(prop::RRULE);
            instance.remove_properties(prop::RDATE);
            instance.remove_properties(prop::EXDATE);
            instance
        });
        instance.set_property(occurrence_property(prop::RECURRENCE_ID, local, tz, all_day));

        {
            let mut ex_ctx = entry.exception();
            event_to_ical(&mut ex_ctx, &mut instance, None, &instance_event)?;
        }
        calendar.add_child(instance);
    }

    Ok(())
}
