//! `alerts`.
//!
//! Every alert is one VALARM. Snoozing adds a second VALARM that points at
//! the snoozed one through `RELATED-TO;RELTYPE=SNOOZE` and fires at an
//! absolute time; on read it only contributes `snoozed` to its primary.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use jscal_rfc::rfc::ical::core::{
    Component, ComponentKind, DateTime, Duration, Parameter, Property, TriggerRelated, Value as IcalValue,
    param, prop,
};
use jscal_rfc::rfc::ical::parse::parse_duration;
use serde_json::{Value, json};

use super::links::{links_from_ical, links_to_ical};
use super::{
    JsonObject, html_description_from_ical, html_description_to_ical, nullable_object, opt_str,
    req_str,
};
use crate::context::Context;
use crate::time::{event_end, format_utc, parse_utc, prop_tzid, to_utc, value_to_utc};
use crate::xparam::{self, X_JMAP_ATTACH};

const SNOOZE: &str = "SNOOZE";

/// ## Summary
/// Reads the VALARMs of `comp` into an `alerts` map.
///
/// Alarms without a TRIGGER, or whose action is neither EMAIL, DISPLAY nor
/// AUDIO, are skipped. So are email alarms without a single `mailto:`
/// recipient.
pub fn alerts_from_ical(ctx: &mut Context<'_>, comp: &Component) -> Value {
    let mut snoozes: HashMap<&str, &Component> = HashMap::new();
    let mut primaries = Vec::new();
    for alarm in comp.alarms() {
        match snoozed_uid(alarm) {
            Some(uid) => {
                snoozes.insert(uid, alarm);
            }
            None => primaries.push(alarm),
        }
    }

    let mut alerts = JsonObject::new();
    for alarm in primaries {
        let id = alarm
            .uid()
            .map_or_else(|| xparam::hex_key(&alarm.to_string()), ToString::to_string);
        let Some(alert) = alert_from_ical(ctx, comp, alarm, &snoozes) else {
            tracing::trace!(alert = %id, "Skipping alarm without usable trigger or action");
            continue;
        };
        alerts.insert(id, Value::Object(alert));
    }

    if alerts.is_empty() {
        Value::Null
    } else {
        Value::Object(alerts)
    }
}

/// Returns the UID a snooze alarm points at, or `None` for a primary alarm.
fn snoozed_uid(alarm: &Component) -> Option<&str> {
    let related = alarm.get_property(prop::RELATED_TO)?;
    let uid = related.as_text().filter(|uid| !uid.is_empty())?;
    related
        .get_param_value(param::RELTYPE)
        .is_some_and(|reltype| reltype.eq_ignore_ascii_case(SNOOZE))
        .then_some(uid)
}

fn alert_from_ical(
    ctx: &mut Context<'_>,
    comp: &Component,
    alarm: &Component,
    snoozes: &HashMap<&str, &Component>,
) -> Option<JsonObject> {
    let trigger = alarm.get_property(prop::TRIGGER)?;
    let mut related = trigger
        .get_param_value(param::RELATED)
        .map_or(TriggerRelated::Start, TriggerRelated::parse);

    let offset = match &trigger.value {
        IcalValue::Duration(duration) => *duration,
        IcalValue::DateTime(at) => {
            let at = to_utc(&mut ctx.resolver, at);
            let (anchor, anchored_to) = anchor_utc(ctx, comp, related)?;
            related = anchored_to;
            Duration::from_seconds((at - anchor).num_seconds())
        }
        _ => return None,
    };

    let mut action = action_from_ical(alarm)?;
    if let Some(at) = alarm
        .get_property(prop::ACKNOWLEDGED)
        .and_then(Property::as_datetime)
    {
        let at = to_utc(&mut ctx.resolver, at);
        action.insert("acknowledged".into(), json!(format_utc(at)));
    }
    let snoozed = alarm
        .uid()
        .and_then(|uid| snoozes.get(uid))
        .and_then(|snooze| snooze.get_property(prop::TRIGGER))
        .and_then(Property::as_datetime);
    if let Some(at) = snoozed {
        let at = to_utc(&mut ctx.resolver, at);
        action.insert("snoozed".into(), json!(format_utc(at)));
    }

    let relative_to = match (offset.negative, related) {
        (true, TriggerRelated::Start) => "before-start",
        (false, TriggerRelated::Start) => "after-start",
        (true, TriggerRelated::End) => "before-end",
        (false, TriggerRelated::End) => "after-end",
    };

    let mut alert = JsonObject::new();
    alert.insert("relativeTo".into(), json!(relative_to));
    alert.insert("offset".into(), json!(offset.unsigned().to_string()));
    alert.insert("action".into(), Value::Object(action));
    Some(alert)
}

/// UTC instant of the event start or end that a trigger is anchored to.
/// An end that is out of range falls back to the start.
fn anchor_utc(
    ctx: &mut Context<'_>,
    comp: &Component,
    related: TriggerRelated,
) -> Option<(NaiveDateTime, TriggerRelated)> {
    let dtstart = comp.get_property(prop::DTSTART)?;
    let tzid_start = prop_tzid(&mut ctx.resolver, dtstart);
    let end = match related {
        TriggerRelated::Start => None,
        TriggerRelated::End => {
            let end = event_end(comp);
            if end.is_none() {
                tracing::trace!("Event end out of range, anchoring alert at start");
            }
            end
        }
    };
    match end {
        Some(end) => {
            let tzid_end = comp
                .get_property(prop::DTEND)
                .and_then(|dtend| prop_tzid(&mut ctx.resolver, dtend))
                .or(tzid_start);
            value_to_utc(&mut ctx.resolver, &end, tzid_end.as_deref())
                .map(|at| (at, TriggerRelated::End))
        }
        None => value_to_utc(&mut ctx.resolver, &dtstart.value, tzid_start.as_deref())
            .map(|at| (at, TriggerRelated::Start)),
    }
}

fn action_from_ical(alarm: &Component) -> Option<JsonObject> {
    let kind = alarm.get_property(prop::ACTION)?.as_text()?.to_ascii_uppercase();
    match kind.as_str() {
        "EMAIL" => email_action_from_ical(alarm),
        "DISPLAY" | "AUDIO" => {
            let mut action = JsonObject::new();
            action.insert("type".into(), json!("display"));
            let media_links = links_from_ical(alarm, "alertMediaLink");
            if !media_links.is_null() {
                action.insert("mediaLinks".into(), media_links);
            }
            Some(action)
        }
        other => {
            tracing::trace!(action = %other, "Ignoring unknown alarm action");
            None
        }
    }
}

fn email_action_from_ical(alarm: &Component) -> Option<JsonObject> {
    let to: Vec<Value> = alarm
        .get_properties(prop::ATTENDEE)
        .into_iter()
        .filter_map(|attendee| {
            let email = xparam::mailaddr_from_uri(attendee.as_text()?)?;
            let name = attendee.get_param_value(param::CN).unwrap_or_default();
            Some(json!({"name": name, "email": email}))
        })
        .collect();
    if to.is_empty() {
        return None;
    }

    let mut action = JsonObject::new();
    action.insert("type".into(), json!("email"));
    action.insert("to".into(), Value::Array(to));
    if let Some(subject) = xparam::get_prop_value(alarm, prop::SUMMARY) {
        action.insert("subject".into(), json!(subject));
    }
    if let Some(text) = xparam::get_prop_value(alarm, prop::DESCRIPTION) {
        action.insert("textBody".into(), json!(text));
    }
    if let Some(html) = html_description_from_ical(alarm) {
        action.insert("htmlBody".into(), json!(html));
    }
    let attachments = links_from_ical(alarm, "alertAttachment");
    if !attachments.is_null() {
        action.insert("attachments".into(), attachments);
    }
    Some(action)
}

/// What writing an alert action produced.
enum ActionOutcome {
    /// The action type is not one we write; the alert is dropped.
    Unknown,
    /// The action was written, possibly with a snooze alarm to add.
    Written { snooze: Option<Component> },
}

/// ## Summary
/// Replaces the VALARMs of `comp` from an `alerts` map.
///
/// An alert with any invalid member is left out entirely; its members are
/// reported at `alerts/<id>/...`.
pub fn alerts_to_ical(ctx: &mut Context<'_>, comp: &mut Component, alerts: &Value) {
    comp.take_children(ComponentKind::Alarm);
    let Ok(Some(alerts)) = nullable_object(ctx, alerts, "alerts") else {
        return;
    };

    for (id, alert) in alerts {
        let mut ctx = ctx.enter_key("alerts", id);
        let Value::Object(alert) = alert else {
            ctx.invalid_here();
            continue;
        };
        let before = ctx.invalid_count();

        let mut alarm = Component::alarm();
        alarm.add_property(Property::text(prop::UID, id.as_str()));

        let offset = match alert.get("offset").and_then(Value::as_str).map(parse_duration) {
            Some(Ok(offset)) if !offset.negative => Some(offset),
            _ => {
                ctx.invalid("offset");
                None
            }
        };
        let anchor = match alert.get("relativeTo").and_then(Value::as_str) {
            Some("before-start") => Some((TriggerRelated::Start, true)),
            Some("after-start") => Some((TriggerRelated::Start, false)),
            Some("before-end") => Some((TriggerRelated::End, true)),
            Some("after-end") => Some((TriggerRelated::End, false)),
            _ => {
                ctx.invalid("relativeTo");
                None
            }
        };
        let outcome = match alert.get("action") {
            Some(Value::Object(action)) => {
                let mut ctx = ctx.enter("action");
                action_to_ical(&mut ctx, &mut alarm, action)
            }
            _ => {
                ctx.invalid("action");
                ActionOutcome::Unknown
            }
        };

        let (Some(offset), Some((related, negative)), ActionOutcome::Written { snooze }) =
            (offset, anchor, outcome)
        else {
            continue;
        };
        if ctx.invalid_count() != before {
            continue;
        }

        let offset = if negative { offset.negate() } else { offset };
        let mut trigger = Property::duration(prop::TRIGGER, offset);
        trigger.add_param(Parameter::related(related));
        alarm.add_property(trigger);

        comp.add_child(alarm);
        if let Some(snooze) = snooze {
            comp.add_child(snooze);
        }
    }
}

fn action_to_ical(
    ctx: &mut Context<'_>,
    alarm: &mut Component,
    action: &JsonObject,
) -> ActionOutcome {
    match action.get("type").and_then(Value::as_str) {
        Some("email") => {
            alarm.add_property(Property::text(prop::ACTION, "EMAIL"));
            email_action_to_ical(ctx, alarm, action);
        }
        Some("display") => {
            alarm.add_property(Property::text(prop::ACTION, "DISPLAY"));
            alarm.add_property(Property::text(prop::DESCRIPTION, ""));
            match action.get("mediaLinks") {
                None | Some(Value::Null) => {}
                Some(Value::Object(links)) => {
                    links_to_ical(ctx, alarm, links, "mediaLinks", X_JMAP_ATTACH);
                }
                Some(_) => ctx.invalid("mediaLinks"),
            }
        }
        Some(other) => {
            tracing::trace!(action = %other, "Dropping alert with unknown action type");
            return ActionOutcome::Unknown;
        }
        None => {
            ctx.invalid("type");
            return ActionOutcome::Unknown;
        }
    }

    let snooze = opt_str(ctx, action, "snoozed").and_then(|snoozed| match parse_utc(snoozed) {
        Some(at) => Some(snooze_alarm(alarm, at)),
        None => {
            ctx.invalid("snoozed");
            None
        }
    });

    if let Some(acknowledged) = opt_str(ctx, action, "acknowledged") {
        match parse_utc(acknowledged) {
            Some(at) => alarm.add_property(Property::datetime(prop::ACKNOWLEDGED, DateTime::utc(at))),
            None => ctx.invalid("acknowledged"),
        }
    }

    ActionOutcome::Written { snooze }
}

fn email_action_to_ical(ctx: &mut Context<'_>, alarm: &mut Component, action: &JsonObject) {
    match action.get("to") {
        Some(Value::Array(to)) if !to.is_empty() => {
            for (i, recipient) in to.iter().enumerate() {
                let mut ctx = ctx.enter_index("to", i);
                let Value::Object(recipient) = recipient else {
                    ctx.invalid_here();
                    continue;
                };
                let email = req_str(&mut ctx, recipient, "email");
                let name = opt_str(&mut ctx, recipient, "name");
                let Some(email) = email else { continue };

                let mut attendee =
                    Property::cal_address(prop::ATTENDEE, xparam::mailaddr_to_uri(email));
                if let Some(name) = name {
                    attendee.add_param(Parameter::new(param::CN, name));
                }
                alarm.add_property(attendee);
            }
        }
        _ => ctx.invalid("to"),
    }

    let subject = opt_str(ctx, action, "subject").unwrap_or_default();
    alarm.add_property(Property::text(prop::SUMMARY, subject));
    let text = opt_str(ctx, action, "textBody").unwrap_or_default();
    alarm.add_property(Property::text(prop::DESCRIPTION, text));

    if let Some(html) = opt_str(ctx, action, "htmlBody") {
        html_description_to_ical(alarm, Some(html));
    }

    match action.get("attachments") {
        None | Some(Value::Null) => {}
        Some(Value::Object(links)) => {
            links_to_ical(ctx, alarm, links, "attachments", prop::ATTACH);
        }
        Some(_) => ctx.invalid("attachments"),
    }
}

/// Builds the alarm that re-fires `alarm` at the UTC instant `at`.
fn snooze_alarm(alarm: &Component, at: NaiveDateTime) -> Component {
    let mut snooze = alarm.clone();
    let uid = snooze.uid().map(ToString::to_string).unwrap_or_default();
    snooze.remove_properties(prop::UID);

    let mut related = Property::text(prop::RELATED_TO, uid);
    related.add_param(Parameter::new(param::RELTYPE, SNOOZE));
    snooze.add_property(related);

    let mut trigger = Property::datetime(prop::TRIGGER, DateTime::utc(at));
    trigger.add_param(Parameter::value_type("DATE-TIME"));
    snooze.add_property(trigger);
    snooze
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Mode;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn event_at_nine() -> Component {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .unwrap();
        let mut event = Component::event();
        event.add_property(Property::datetime(prop::DTSTART, DateTime::utc(start)));
        event.add_property(Property::duration(prop::DURATION, Duration::hours(1)));
        event
    }

    fn write(alerts: &Value) -> (Component, Vec<String>) {
        let mut sink = BTreeSet::new();
        let mut ctx = Context::writer(&mut sink, Mode::Create, "u", "p");
        let mut event = event_at_nine();
        alerts_to_ical(&mut ctx, &mut event, alerts);
        drop(ctx);
        (event, sink.into_iter().collect())
    }

    fn read(event: &Component) -> Value {
        let mut sink = BTreeSet::new();
        let mut ctx = Context::reader(&mut sink, None);
        alerts_from_ical(&mut ctx, event)
    }

    #[test_log::test]
    fn display_and_email_alerts_round_trip() {
        let alerts = json!({
            "a1": {
                "relativeTo": "before-start",
                "offset": "PT15M",
                "action": {"type": "display", "acknowledged": "2024-01-01T08:46:00Z"}
            },
            "a2": {
                "relativeTo": "after-end",
                "offset": "P0D",
                "action": {
                    "type": "email",
                    "to": [{"name": "Jane", "email": "jane@example.com"}],
                    "subject": "Reminder",
                    "textBody": "Meeting is over"
                }
            }
        });
        let (event, invalid) = write(&alerts);
        assert!(invalid.is_empty(), "{invalid:?}");
        assert_eq!(event.alarms().len(), 2);

        let trigger = event.alarms()[0].get_property(prop::TRIGGER).unwrap();
        assert_eq!(trigger.to_string(), "TRIGGER;RELATED=START:-PT15M");
        assert_eq!(read(&event), alerts);
    }

    #[test_log::test]
    fn snooze_alarm_folds_into_primary() {
        let alerts = json!({
            "a1": {
                "relativeTo": "before-start",
                "offset": "PT5M",
                "action": {"type": "display", "snoozed": "2024-01-01T09:10:00Z"}
            }
        });
        let (event, invalid) = write(&alerts);
        assert!(invalid.is_empty());

        let alarms = event.alarms();
        assert_eq!(alarms.len(), 2);
        let snooze = alarms[1];
        assert!(snooze.uid().is_none());
        assert_eq!(snoozed_uid(snooze), Some("a1"));
        assert_eq!(read(&event), alerts);
    }

    #[test_log::test]
    fn absolute_trigger_is_relative_to_anchor() {
        let mut event = event_at_nine();
        let fire = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(10, 30, 0))
            .unwrap();
        let mut alarm = Component::alarm();
        alarm.add_property(Property::text(prop::UID, "abs"));
        alarm.add_property(Property::text(prop::ACTION, "AUDIO"));
        let mut trigger = Property::datetime(prop::TRIGGER, DateTime::utc(fire));
        trigger.add_param(Parameter::related(TriggerRelated::End));
        alarm.add_property(trigger);
        event.add_child(alarm);

        assert_eq!(
            read(&event),
            json!({"abs": {
                "relativeTo": "after-end",
                "offset": "PT30M",
                "action": {"type": "display"}
            }})
        );
    }

    #[test_log::test]
    fn unreachable_end_anchors_at_start() {
        let mut event = event_at_nine();
        event.set_property(Property::duration(prop::DURATION, Duration::days(4_000_000_000)));
        let fire = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(10, 30, 0))
            .unwrap();
        let mut alarm = Component::alarm();
        alarm.add_property(Property::text(prop::UID, "far"));
        alarm.add_property(Property::text(prop::ACTION, "DISPLAY"));
        let mut trigger = Property::datetime(prop::TRIGGER, DateTime::utc(fire));
        trigger.add_param(Parameter::related(TriggerRelated::End));
        alarm.add_property(trigger);
        event.add_child(alarm);

        assert_eq!(
            read(&event),
            json!({"far": {
                "relativeTo": "after-start",
                "offset": "PT1H30M",
                "action": {"type": "display"}
            }})
        );
    }

    #[test_log::test]
    fn invalid_alerts_are_dropped() {
        let alerts = json!({
            "bad-offset": {"relativeTo": "before-start", "offset": "-PT5M", "action": {"type": "display"}},
            "no-to": {"relativeTo": "after-start", "offset": "PT0S", "action": {"type": "email", "to": []}},
            "unknown": {"relativeTo": "after-start", "offset": "PT1M", "action": {"type": "procedure"}}
        });
        let (event, invalid) = write(&alerts);
        assert!(event.alarms().is_empty());
        assert_eq!(invalid, ["alerts/bad-offset/offset", "alerts/no-to/action/to"]);
    }
}
