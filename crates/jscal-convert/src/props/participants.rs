//! `participants` and `replyTo`.

use std::collections::HashMap;

use jscal_rfc::rfc::ical::core::{
    Component, DateTime, Parameter, Property, Value as IcalValue, param, prop,
};
use jscal_rfc::rfc::ical::parse::parse_datetime;
use serde_json::{Value, json};

use super::{JsonObject, opt_bool, opt_str, opt_str_array, req_str};
use crate::context::Context;
use crate::time::{format_utc, parse_utc};
use crate::xparam;

/// Delegation chains longer than this resolve to `needs-action`.
const MAX_DELEGATION_HOPS: usize = 64;

/// Reads ORGANIZER into `{imip, web}`; `null` without an organizer.
#[must_use]
pub fn reply_to_from_ical(comp: &Component) -> Value {
    let Some(organizer) = comp.get_property(prop::ORGANIZER) else {
        return Value::Null;
    };
    let mut reply_to = JsonObject::new();
    if let Some(imip) = organizer.as_text() {
        reply_to.insert("imip".into(), json!(imip));
    }
    if let Some(web) = xparam::get(organizer, xparam::X_JMAP_RSVP_URI) {
        reply_to.insert("web".into(), json!(web));
    }
    if reply_to.is_empty() {
        Value::Null
    } else {
        Value::Object(reply_to)
    }
}

/// ## Summary
/// Replaces ORGANIZER from a `replyTo` object.
///
/// `imip` becomes the ORGANIZER value and `web` its RSVP URI parameter.
/// Without `imip` no ORGANIZER is written.
pub fn reply_to_to_ical(ctx: &mut Context<'_>, comp: &mut Component, reply_to: &Value) {
    comp.remove_properties(prop::ORGANIZER);
    let reply_to = match reply_to {
        Value::Null => return,
        Value::Object(map) => map,
        _ => {
            ctx.invalid("replyTo");
            return;
        }
    };

    let Some(imip) = reply_to.get("imip") else {
        return;
    };
    let Some(imip) = imip.as_str().filter(|s| !s.is_empty()) else {
        ctx.enter_key("replyTo", "imip").invalid_here();
        return;
    };
    let mut organizer = Property::cal_address(prop::ORGANIZER, imip);

    if let Some(web) = reply_to.get("web") {
        match web.as_str() {
            Some(uri) if uri.starts_with("http:") || uri.starts_with("https:") => {
                xparam::set(&mut organizer, xparam::X_JMAP_RSVP_URI, uri, true);
            }
            _ => {
                ctx.enter_key("replyTo", "web").invalid_here();
                return;
            }
        }
    }
    comp.add_property(organizer);
}

/// ## Summary
/// Reads every ATTENDEE with a `mailto:` address.
///
/// Participants are keyed by their `X-JMAP-ID`, falling back to the email
/// address; `null` when there are none.
#[must_use]
pub fn participants_from_ical(comp: &Component) -> Value {
    let attendees = comp.get_properties(prop::ATTENDEE);
    let by_address: HashMap<String, &Property> = attendees
        .iter()
        .filter_map(|p| Some((p.as_text()?.to_lowercase(), *p)))
        .collect();
    let organizer = comp.get_property(prop::ORGANIZER);

    let mut participants = JsonObject::new();
    for attendee in &attendees {
        let Some(participant) = participant_from_ical(attendee, &by_address, organizer) else {
            tracing::trace!(attendee = %attendee.value, "Skipping non-mailto attendee");
            continue;
        };
        let id = match xparam::get(attendee, xparam::X_JMAP_ID) {
            Some(id) => id.to_string(),
            None => participant
                .get("email")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        };
        participants.insert(id, Value::Object(participant));
    }

    if participants.is_empty() {
        Value::Null
    } else {
        Value::Object(participants)
    }
}

fn participant_from_ical<'a>(
    attendee: &'a Property,
    by_address: &HashMap<String, &'a Property>,
    organizer: Option<&Property>,
) -> Option<JsonObject> {
    let address = attendee.as_text()?;
    let email = xparam::mailaddr_from_uri(address)?;

    let mut p = JsonObject::new();
    p.insert("email".into(), json!(email));
    p.insert(
        "name".into(),
        json!(attendee.get_param_value(param::CN).unwrap_or_default()),
    );

    if let Some(cutype) = attendee.get_param_value(param::CUTYPE) {
        let kind = match cutype.to_ascii_uppercase().as_str() {
            "INDIVIDUAL" => "individual",
            "GROUP" => "group",
            "RESOURCE" => "resource",
            "ROOM" => "location",
            _ => "unknown",
        };
        p.insert("kind".into(), json!(kind));
    }

    let role = attendee
        .get_param_value(param::ROLE)
        .map(str::to_ascii_uppercase);
    let participation = match role.as_deref() {
        Some("OPT-PARTICIPANT") => "optional",
        Some("NON-PARTICIPANT") => "non-participant",
        _ => "required",
    };
    p.insert("participation".into(), json!(participation));

    let mut roles: Vec<String> = Vec::new();
    if role.as_deref() == Some("CHAIR") {
        roles.push("chair".into());
    }
    roles.extend(
        attendee
            .param_values(xparam::X_JMAP_ROLE)
            .map(str::to_lowercase),
    );
    let is_owner = organizer
        .and_then(Property::as_text)
        .is_some_and(|org| org.eq_ignore_ascii_case(address));
    if is_owner && !roles.iter().any(|r| r == "owner") {
        roles.push("owner".into());
    }
    if roles.is_empty() {
        roles.push("attendee".into());
    }
    p.insert("roles".into(), json!(roles));

    if let Some(location_id) = xparam::get(attendee, xparam::X_JMAP_LOCATIONID) {
        p.insert("locationId".into(), json!(location_id));
    }

    p.insert(
        "rsvpResponse".into(),
        json!(rsvp_response(attendee, by_address)),
    );

    if let Some(rsvp) = attendee.get_param_value(param::RSVP) {
        p.insert("rsvpWanted".into(), json!(rsvp.eq_ignore_ascii_case("TRUE")));
    }

    for (key, name) in [
        ("delegatedTo", param::DELEGATED_TO),
        ("delegatedFrom", param::DELEGATED_FROM),
        ("memberOf", param::MEMBER),
    ] {
        let addresses: Vec<String> = attendee
            .param_values(name)
            .filter_map(xparam::mailaddr_from_uri)
            .collect();
        if !addresses.is_empty() {
            p.insert(key.into(), json!(addresses));
        }
    }

    let link_ids: Vec<&str> = attendee.param_values(xparam::X_JMAP_LINKID).collect();
    if !link_ids.is_empty() {
        p.insert("linkIds".into(), json!(link_ids));
    }

    if let Some(sequence) =
        xparam::get(attendee, xparam::X_JMAP_SEQUENCE).and_then(|s| s.parse::<u64>().ok())
    {
        p.insert("scheduleSequence".into(), json!(sequence));
    }

    if let Some(updated) = xparam::get(attendee, xparam::X_JMAP_DTSTAMP)
        .and_then(|s| parse_datetime(s, None).ok())
        .filter(|dt| dt.is_utc())
    {
        p.insert("scheduleUpdated".into(), json!(format_utc(updated.local)));
    }

    Some(p)
}

/// ## Summary
/// Resolves the participation status of `attendee`.
///
/// DELEGATED follows DELEGATED-TO through the other attendees until a
/// concrete status is found. A chain that leaves the attendee list or runs
/// past [`MAX_DELEGATION_HOPS`] (a loop always does) yields `needs-action`.
fn rsvp_response<'a>(
    attendee: &'a Property,
    by_address: &HashMap<String, &'a Property>,
) -> &'static str {
    let mut current = attendee;
    for _ in 0..=MAX_DELEGATION_HOPS {
        let partstat = current
            .get_param_value(param::PARTSTAT)
            .map(str::to_ascii_uppercase);
        match partstat.as_deref() {
            Some("ACCEPTED") => return "accepted",
            Some("DECLINED") => return "declined",
            Some("TENTATIVE") => return "tentative",
            Some("DELEGATED") => {
                let Some(next) = current
                    .get_param_value(param::DELEGATED_TO)
                    .and_then(|to| by_address.get(&to.to_lowercase()))
                else {
                    return "needs-action";
                };
                current = *next;
            }
            _ => return "needs-action",
        }
    }
    tracing::warn!(attendee = %attendee.value, "Delegation chain too long");
    "needs-action"
}

/// Replaces ATTENDEE properties from a `participants` map.
pub fn participants_to_ical(ctx: &mut Context<'_>, comp: &mut Component, participants: &Value) {
    comp.remove_properties(prop::ATTENDEE);
    let participants = match participants {
        Value::Null => return,
        Value::Object(map) if !map.is_empty() => map,
        _ => {
            ctx.invalid("participants");
            return;
        }
    };

    for (id, participant) in participants {
        if id.is_empty() {
            continue;
        }
        let mut ctx = ctx.enter_key("participants", id);
        let Value::Object(participant) = participant else {
            ctx.invalid_here();
            continue;
        };
        let Some(email) = req_str(&mut ctx, participant, "email") else {
            continue;
        };

        let mut attendee = Property::cal_address(prop::ATTENDEE, xparam::mailaddr_to_uri(email));
        participant_to_ical(&mut ctx, &mut attendee, participant);
        if id != email {
            xparam::set_id(&mut attendee, id);
        }
        comp.add_property(attendee);
    }
}

fn participant_to_ical(ctx: &mut Context<'_>, attendee: &mut Property, p: &JsonObject) {
    if let Some(name) = opt_str(ctx, p, "name") {
        attendee.add_param(Parameter::new(param::CN, name));
    }

    if let Some(kind) = opt_str(ctx, p, "kind") {
        let cutype = match kind.to_ascii_lowercase().as_str() {
            "individual" => Some("INDIVIDUAL"),
            "group" => Some("GROUP"),
            "resource" => Some("RESOURCE"),
            "location" => Some("ROOM"),
            _ => None,
        };
        if let Some(cutype) = cutype {
            attendee.add_param(Parameter::new(param::CUTYPE, cutype));
        }
    }

    let mut required = true;
    if let Some(participation) = opt_str(ctx, p, "participation") {
        let role = match participation.to_ascii_lowercase().as_str() {
            "optional" => Some("OPT-PARTICIPANT"),
            "non-participant" => Some("NON-PARTICIPANT"),
            _ => None,
        };
        if let Some(role) = role {
            required = false;
            attendee.add_param(Parameter::new(param::ROLE, role));
        }
    }

    match p.get("roles") {
        None | Some(Value::Null) => {}
        Some(Value::Array(roles)) if !roles.is_empty() => {
            for (i, role) in roles.iter().enumerate() {
                let role = match role.as_str().map(str::to_ascii_lowercase).as_deref() {
                    Some("attendee") => "ATTENDEE",
                    Some("chair") => "CHAIR",
                    Some("owner") => "OWNER",
                    _ => {
                        ctx.enter_index("roles", i).invalid_here();
                        continue;
                    }
                };
                if role == "CHAIR" && required {
                    attendee.add_param(Parameter::new(param::ROLE, "CHAIR"));
                } else {
                    xparam::set(attendee, xparam::X_JMAP_ROLE, role, false);
                }
            }
        }
        Some(_) => ctx.invalid("roles"),
    }

    if let Some(location_id) = opt_str(ctx, p, "locationId") {
        xparam::set(attendee, xparam::X_JMAP_LOCATIONID, location_id, true);
    }

    let partstat = match opt_str(ctx, p, "rsvpResponse") {
        None => Some("NEEDS-ACTION"),
        Some(response) => match response.to_ascii_lowercase().as_str() {
            "needs-action" => Some("NEEDS-ACTION"),
            "accepted" => Some("ACCEPTED"),
            "declined" => Some("DECLINED"),
            "tentative" => Some("TENTATIVE"),
            _ => {
                ctx.invalid("rsvpResponse");
                None
            }
        },
    };
    if let Some(partstat) = partstat {
        attendee.add_param(Parameter::new(param::PARTSTAT, partstat));
    }

    if let Some(wanted) = opt_bool(ctx, p, "rsvpWanted") {
        attendee.add_param(Parameter::new(param::RSVP, if wanted { "TRUE" } else { "FALSE" }));
    }

    for (key, name) in [
        ("delegatedTo", param::DELEGATED_TO),
        ("delegatedFrom", param::DELEGATED_FROM),
    ] {
        for addr in opt_str_array(ctx, p, key).unwrap_or_default() {
            attendee.add_param(Parameter::new(name, xparam::mailaddr_to_uri(addr)));
        }
    }

    let groups: Vec<String> = opt_str_array(ctx, p, "memberOf")
        .unwrap_or_default()
        .into_iter()
        .map(xparam::mailaddr_to_uri)
        .collect();
    if !groups.is_empty() {
        attendee.add_param(Parameter::with_values(param::MEMBER, groups));
    }

    for link_id in opt_str_array(ctx, p, "linkIds").unwrap_or_default() {
        xparam::set(attendee, xparam::X_JMAP_LINKID, link_id, false);
    }

    match p.get("scheduleSequence") {
        None | Some(Value::Null) => {}
        Some(value) => match value.as_u64() {
            Some(sequence) => {
                xparam::set(attendee, xparam::X_JMAP_SEQUENCE, sequence.to_string(), false);
            }
            None => ctx.invalid("scheduleSequence"),
        },
    }

    if let Some(updated) = opt_str(ctx, p, "scheduleUpdated") {
        match parse_utc(updated) {
            Some(utc) => {
                let stamp = DateTime::utc(utc).to_string();
                xparam::set(attendee, xparam::X_JMAP_DTSTAMP, stamp, false);
            }
            None => ctx.invalid("scheduleUpdated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Mode;
    use std::collections::BTreeSet;

    fn attendee(addr: &str, partstat: &str, delegated_to: Option<&str>) -> Property {
        let mut prop = Property::cal_address(prop::ATTENDEE, format!("mailto:{addr}"));
        prop.add_param(Parameter::new(param::PARTSTAT, partstat));
        if let Some(to) = delegated_to {
            prop.add_param(Parameter::new(param::DELEGATED_TO, format!("mailto:{to}")));
        }
        prop
    }

    #[test_log::test]
    fn participants_round_trip() {
        let participants = json!({
            "org": {
                "email": "boss@example.com",
                "name": "Boss",
                "kind": "individual",
                "participation": "required",
                "roles": ["chair", "owner"],
                "rsvpResponse": "accepted",
                "scheduleSequence": 2,
                "scheduleUpdated": "2024-01-01T10:00:00Z"
            },
            "room@example.com": {
                "email": "room@example.com",
                "name": "",
                "kind": "location",
                "participation": "non-participant",
                "roles": ["attendee"],
                "locationId": "loc1",
                "rsvpResponse": "needs-action",
                "rsvpWanted": false,
                "memberOf": ["staff@example.com"],
                "linkIds": ["Link1"]
            }
        });

        let mut sink = BTreeSet::new();
        let mut ctx = Context::writer(&mut sink, Mode::Create, "u", "p");
        let mut event = Component::event();
        reply_to_to_ical(&mut ctx, &mut event, &json!({"imip": "mailto:boss@example.com"}));
        participants_to_ical(&mut ctx, &mut event, &participants);
        drop(ctx);

        assert!(sink.is_empty(), "{sink:?}");
        let boss = event
            .get_properties(prop::ATTENDEE)
            .into_iter()
            .find(|p| p.as_text() == Some("mailto:boss@example.com"))
            .unwrap();
        assert_eq!(boss.get_param_value(param::ROLE), Some("CHAIR"));
        assert_eq!(participants_from_ical(&event), participants);
        assert_eq!(
            reply_to_from_ical(&event),
            json!({"imip": "mailto:boss@example.com"})
        );
    }

    #[test_log::test]
    fn delegation_follows_the_chain() {
        let mut event = Component::event();
        event.add_property(attendee("a@example.com", "DELEGATED", Some("B@example.com")));
        event.add_property(attendee("b@example.com", "DELEGATED", Some("c@example.com")));
        event.add_property(attendee("c@example.com", "TENTATIVE", None));

        let read = participants_from_ical(&event);
        assert_eq!(read["a@example.com"]["rsvpResponse"], "tentative");
        assert_eq!(read["a@example.com"]["delegatedTo"], json!(["B@example.com"]));
    }

    #[test_log::test]
    fn delegation_cycles_and_long_chains_need_action() {
        let mut cycle = Component::event();
        cycle.add_property(attendee("a@example.com", "DELEGATED", Some("b@example.com")));
        cycle.add_property(attendee("b@example.com", "DELEGATED", Some("a@example.com")));
        let read = participants_from_ical(&cycle);
        assert_eq!(read["a@example.com"]["rsvpResponse"], "needs-action");

        let mut chain = Component::event();
        for i in 0..70 {
            chain.add_property(attendee(
                &format!("p{i}@example.com"),
                "DELEGATED",
                Some(&format!("p{}@example.com", i + 1)),
            ));
        }
        chain.add_property(attendee("p70@example.com", "ACCEPTED", None));
        let read = participants_from_ical(&chain);
        assert_eq!(read["p0@example.com"]["rsvpResponse"], "needs-action");
        assert_eq!(read["p10@example.com"]["rsvpResponse"], "accepted");
    }

    #[test_log::test]
    fn invalid_participants_are_reported() {
        let mut sink = BTreeSet::new();
        let mut ctx = Context::writer(&mut sink, Mode::Create, "u", "p");
        let mut event = Component::event();
        participants_to_ical(
            &mut ctx,
            &mut event,
            &json!({
                "a": {"name": "No email"},
                "b": {"email": "b@example.com", "roles": ["attendee", "speaker"]},
                "c": {"email": "c@example.com", "rsvpResponse": "maybe"}
            }),
        );
        reply_to_to_ical(
            &mut ctx,
            &mut event,
            &json!({"imip": "mailto:x@example.com", "web": "ftp://example.com"}),
        );
        drop(ctx);
        let paths: Vec<_> = sink.into_iter().collect();
        assert_eq!(
            paths,
            [
                "participants/a/email",
                "participants/b/roles/1",
                "participants/c/rsvpResponse",
                "replyTo/web"
            ]
        );
    }
}
