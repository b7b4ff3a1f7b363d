//! Public entry points.

use std::collections::BTreeSet;

use jscal_core::constants::{ICALENDAR_CALSCALE, ICALENDAR_VERSION};
use jscal_rfc::rfc::ical::core::{Component, ComponentKind, Property, prop};
use serde_json::Value;

use crate::context::{Context, Mode};
use crate::error::{ConvertError, ConvertResult};
use crate::event::{event_from_ical, event_to_ical};
use crate::fields::WantedFields;
use crate::props::JsonObject;

/// Options for the conversion entry points.
pub type ConvertOptions = jscal_core::config::ConvertConfig;

/// A JSCalendar event object.
pub type EventObject = JsonObject;

/// Index of the master VEVENT: the first without RECURRENCE-ID, else the first.
fn master_index(calendar: &Component) -> Option<usize> {
    let events = || {
        calendar
            .children
            .iter()
            .enumerate()
            .filter(|(_, child)| child.kind == ComponentKind::Event)
    };
    events()
        .find(|(_, event)| !event.is_exception())
        .or_else(|| events().next())
        .map(|(index, _)| index)
}

/// ## Summary
/// Converts a VCALENDAR (or a bare VEVENT) into an event object.
///
/// Inside a calendar the master VEVENT is converted and the other VEVENTs
/// are folded into `recurrenceOverrides`. With `wanted`, the result holds
/// exactly those members; unknown names are ignored.
///
/// ## Errors
/// Returns `ConvertError::Structural` if there is no VEVENT to convert or it
/// has no start.
pub fn to_event_object(
    component: &Component,
    wanted: Option<&[&str]>,
) -> ConvertResult<EventObject> {
    let (master, calendar) = match component.kind {
        ComponentKind::Calendar => {
            let index = master_index(component)
                .ok_or_else(|| ConvertError::Structural("Calendar has no VEVENT".to_string()))?;
            (&component.children[index], Some(component))
        }
        ComponentKind::Event => (component, None),
        other => {
            return Err(ConvertError::Structural(format!(
                "Cannot convert a {other} component"
            )));
        }
    };

    let wanted = wanted.map(|names| WantedFields::from_names(names.iter().copied()));
    let mut invalid = BTreeSet::new();
    let mut ctx = Context::reader(&mut invalid, wanted);
    let event = event_from_ical(&mut ctx, master, calendar)?;

    tracing::debug!(uid = ?master.uid(), fields = event.len(), "Converted component to event object");
    Ok(event)
}

/// ## Summary
/// Converts an event object into a VCALENDAR.
///
/// Without `existing` a new calendar is created and `event` must be
/// complete. With `existing` (a VCALENDAR or a bare VEVENT) `event` is an
/// update: its members replace the current ones, `null` clears a member and
/// everything else is kept.
///
/// ## Errors
/// Returns `ConvertError::InvalidProperties` with every invalid member,
/// `ConvertError::MissingUid` if no UID is known, `ConvertError::Structural`
/// for unusable input trees and `ConvertError::CoreError` for bad options.
pub fn to_component(
    event: &EventObject,
    existing: Option<&Component>,
    options: &ConvertOptions,
) -> ConvertResult<Component> {
    options.validate()?;

    let event_uid = event
        .get("uid")
        .and_then(Value::as_str)
        .filter(|uid| !uid.is_empty());

    let (mut calendar, mode, uid, merged) = match existing {
        Some(existing) => {
            let calendar = match existing.kind {
                ComponentKind::Calendar => existing.clone(),
                ComponentKind::Event => {
                    let mut calendar = Component::calendar();
                    calendar.add_child(existing.clone());
                    calendar
                }
                other => {
                    return Err(ConvertError::Structural(format!(
                        "Cannot update a {other} component"
                    )));
                }
            };
            let mut merged = to_event_object(&calendar, None)?;
            let uid = event_uid
                .or_else(|| merged.get("uid").and_then(Value::as_str))
                .ok_or(ConvertError::MissingUid)?
                .to_string();
            for (key, value) in event {
                merged.insert(key.clone(), value.clone());
            }
            (calendar, Mode::Update, uid, merged)
        }
        None => {
            let uid = event_uid.ok_or(ConvertError::MissingUid)?.to_string();
            let mut calendar = Component::calendar();
            calendar.add_property(Property::text(prop::VERSION, ICALENDAR_VERSION));
            calendar.add_property(Property::text(prop::CALSCALE, ICALENDAR_CALSCALE));
            (calendar, Mode::Create, uid, event.clone())
        }
    };

    let index = master_index(&calendar);
    let mut master = match index {
        Some(index) => calendar.children.remove(index),
        None => Component::event(),
    };

    let mut invalid = BTreeSet::new();
    {
        let mut ctx =
            Context::writer(&mut invalid, mode, uid.as_str(), options.product_id.as_str());
        event_to_ical(&mut ctx, &mut master, Some(&mut calendar), &merged)?;
    }
    if !invalid.is_empty() {
        tracing::debug!(uid = %uid, count = invalid.len(), "Rejecting event with invalid properties");
        return Err(ConvertError::InvalidProperties(invalid.into_iter().collect()));
    }

    let at = index.unwrap_or(0).min(calendar.children.len());
    calendar.children.insert(at, master);

    tracing::debug!(uid = %uid, mode = ?mode, "Converted event object to component");
    Ok(calendar)
}

/// ## Summary
/// Converts a component into JSON text.
///
/// ## Errors
/// Returns the errors of [`to_event_object`] and `ConvertError::JsonError`
/// if serialization fails.
pub fn event_to_json_string(
    component: &Component,
    wanted: Option<&[&str]>,
    options: &ConvertOptions,
) -> ConvertResult<String> {
    let event = to_event_object(component, wanted)?;
    let json = if options.pretty_json {
        serde_json::to_string_pretty(&event)?
    } else {
        serde_json::to_string(&event)?
    };
    Ok(json)
}

/// ## Summary
/// Converts JSON text holding an event object into a VCALENDAR.
///
/// ## Errors
/// Returns `ConvertError::JsonError` for malformed JSON,
/// `ConvertError::Structural` if it is not an object, and the errors of
/// [`to_component`].
pub fn event_from_json_str(
    json: &str,
    existing: Option<&Component>,
    options: &ConvertOptions,
) -> ConvertResult<Component> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(event) => to_component(&event, existing, options),
        _ => Err(ConvertError::Structural(
            "Event object must be a JSON object".to_string(),
        )),
    }
}
