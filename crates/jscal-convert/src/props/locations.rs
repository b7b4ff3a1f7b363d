//! `locations`.
//!
//! The first physical location goes into LOCATION so that clients unaware
//! of the extension properties still show something; virtual locations with
//! a URI become CONFERENCE and the rest X-JMAP-LOCATION. A location with
//! `rel: "end"` and a `timeZone` is not written here: it carries the zone
//! of DTEND and is handled with the start and end.

use jscal_rfc::rfc::ical::core::{Component, Parameter, Property, Value as IcalValue, param, prop};
use serde_json::{Value, json};

use super::{JsonObject, opt_str, opt_str_array};
use crate::context::Context;
use crate::time::prop_tzid;
use crate::xparam::{self, X_APPLE_STRUCTURED_LOCATION, X_JMAP_LOCATION};

/// Returns whether `loc` describes the end timezone rather than a place.
#[must_use]
pub fn is_end_timezone(loc: &JsonObject) -> bool {
    loc.get("rel").and_then(Value::as_str) == Some("end") && loc.contains_key("timeZone")
}

/// Reads every location-like property of `comp`.
pub fn locations_from_ical(ctx: &mut Context<'_>, comp: &Component) -> Value {
    let mut locations = JsonObject::new();

    let tzid_start = comp
        .get_property(prop::DTSTART)
        .and_then(|p| prop_tzid(&mut ctx.resolver, p));
    if let Some(dtend) = comp.get_property(prop::DTEND) {
        let tzid_end = prop_tzid(&mut ctx.resolver, dtend);
        if let (Some(start), Some(end)) = (tzid_start, tzid_end)
            && start != end
        {
            locations.insert(
                xparam::id_of(dtend),
                json!({"timeZone": end, "rel": "end"}),
            );
        }
    }

    if let Some(location) = comp.get_property(prop::LOCATION) {
        locations.insert(xparam::id_of(location), location_from_ical(location));
    }

    if let Some(geo) = comp.get_property(prop::GEO)
        && let Some(coordinates) = coordinates_from_ical(geo)
    {
        locations.insert(xparam::id_of(geo), json!({"coordinates": coordinates}));
    }

    for conference in comp.get_properties(prop::CONFERENCE) {
        locations.insert(xparam::id_of(conference), location_from_ical(conference));
    }

    for apple in comp.get_properties(X_APPLE_STRUCTURED_LOCATION) {
        let Some(uri) = apple.as_text().filter(|uri| uri.starts_with("geo:")) else {
            continue;
        };
        let mut loc = JsonObject::new();
        loc.insert("coordinates".into(), json!(uri));
        if let Some(title) = xparam::get(apple, xparam::X_TITLE) {
            loc.insert("name".into(), json!(title));
        }
        locations.insert(xparam::id_of(apple), Value::Object(loc));
    }

    for custom in comp.get_properties(X_JMAP_LOCATION) {
        locations.insert(xparam::id_of(custom), location_from_ical(custom));
    }

    if locations.is_empty() {
        Value::Null
    } else {
        Value::Object(locations)
    }
}

fn location_from_ical(prop: &Property) -> Value {
    let is_conference = prop.is(prop::CONFERENCE);
    let rel = xparam::get(prop, xparam::X_JMAP_REL);

    let (name, uri, rel, feature_param) = if is_conference {
        (
            prop.get_param_value(param::LABEL),
            prop.as_text(),
            rel.unwrap_or("virtual"),
            param::FEATURE,
        )
    } else {
        (
            prop.as_text(),
            prop.get_param_value(param::ALTREP),
            rel.unwrap_or("unknown"),
            xparam::X_JMAP_FEATURE,
        )
    };

    let mut loc = JsonObject::new();
    loc.insert("name".into(), json!(name.unwrap_or_default()));
    loc.insert("rel".into(), json!(rel));
    if let Some(uri) = uri {
        loc.insert("uri".into(), json!(uri));
    }

    let features: Vec<String> = prop
        .param_values(feature_param)
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
        .collect();
    if !features.is_empty() {
        loc.insert("features".into(), json!(features));
    }

    if let Some(description) = xparam::get(prop, xparam::X_JMAP_DESCRIPTION) {
        loc.insert("description".into(), json!(description));
    }
    let link_ids: Vec<&str> = prop.param_values(xparam::X_JMAP_LINKID).collect();
    if !link_ids.is_empty() {
        loc.insert("linkIds".into(), json!(link_ids));
    }
    if let Some(tzid) = xparam::get(prop, xparam::X_JMAP_TZID) {
        loc.insert("timeZone".into(), json!(tzid));
    }
    if let Some(coordinates) = xparam::get(prop, xparam::X_JMAP_GEO) {
        loc.insert("coordinates".into(), json!(coordinates));
    }
    Value::Object(loc)
}

/// Renders GEO as a `geo:` URI.
fn coordinates_from_ical(prop: &Property) -> Option<String> {
    match &prop.value {
        IcalValue::Geo(lat, lon) => Some(format!("geo:{lat},{lon}")),
        other => {
            let raw = other.as_text()?;
            let (lat, lon) = raw.split_once(';')?;
            Some(format!("geo:{lat},{lon}"))
        }
    }
}

/// Replaces the location properties of `comp` with `locations`.
pub fn locations_to_ical(ctx: &mut Context<'_>, comp: &mut Component, locations: &Value) {
    for name in [
        prop::LOCATION,
        prop::GEO,
        prop::CONFERENCE,
        X_JMAP_LOCATION,
        X_APPLE_STRUCTURED_LOCATION,
    ] {
        comp.remove_properties(name);
    }

    let locations = match locations {
        Value::Null => return,
        Value::Object(map) if !map.is_empty() => map,
        _ => {
            ctx.invalid("locations");
            return;
        }
    };

    for (id, loc) in locations {
        let mut ctx = ctx.enter_key("locations", id);
        if id.is_empty() {
            ctx.invalid_here();
            continue;
        }
        let loc = match loc {
            Value::Object(loc) if !loc.is_empty() => loc,
            _ => {
                ctx.invalid_here();
                continue;
            }
        };
        if is_end_timezone(loc) {
            continue;
        }
        if let Some(prop) = location_to_ical(&mut ctx, comp, id, loc) {
            comp.add_property(prop);
        }
    }
}

fn location_to_ical(
    ctx: &mut Context<'_>,
    comp: &Component,
    id: &str,
    loc: &JsonObject,
) -> Option<Property> {
    let before = ctx.invalid_count();

    let name = opt_str(ctx, loc, "name");
    let description = opt_str(ctx, loc, "description");
    let rel = opt_str(ctx, loc, "rel");
    let coordinates = opt_str(ctx, loc, "coordinates");
    let uri = opt_str(ctx, loc, "uri");
    let tzid = opt_str(ctx, loc, "timeZone");
    if let Some(tzid) = tzid
        && ctx.resolver.resolve(tzid).is_err()
    {
        ctx.invalid("timeZone");
    }
    let link_ids = opt_str_array(ctx, loc, "linkIds");
    let features = opt_str_array(ctx, loc, "features");

    if ctx.invalid_count() != before {
        return None;
    }

    let rel = rel.filter(|r| *r != "unknown");
    let mut prop = if comp.get_property(prop::LOCATION).is_none() {
        Property::text(prop::LOCATION, name.unwrap_or_default())
    } else if let Some(uri) = uri.filter(|_| rel == Some("virtual")) {
        let mut prop = Property::uri(prop::CONFERENCE, uri);
        if let Some(name) = name {
            prop.add_param(Parameter::new(param::LABEL, name));
        }
        prop
    } else {
        Property::text(X_JMAP_LOCATION, name.unwrap_or_default())
    };
    let is_conference = prop.is(prop::CONFERENCE);

    if !is_conference {
        if let Some(uri) = uri {
            prop.add_param(Parameter::new(param::ALTREP, uri));
        }
        if let Some(rel) = rel {
            xparam::set(&mut prop, xparam::X_JMAP_REL, rel, false);
        }
    }
    if let Some(description) = description {
        xparam::set(&mut prop, xparam::X_JMAP_DESCRIPTION, description, false);
    }
    if let Some(tzid) = tzid {
        xparam::set(&mut prop, xparam::X_JMAP_TZID, tzid, false);
    }
    if let Some(coordinates) = coordinates {
        xparam::set(&mut prop, xparam::X_JMAP_GEO, coordinates, false);
    }
    for link_id in link_ids.unwrap_or_default() {
        xparam::set(&mut prop, xparam::X_JMAP_LINKID, link_id, false);
    }
    let features: Vec<String> = features
        .unwrap_or_default()
        .into_iter()
        .map(str::to_uppercase)
        .collect();
    if !features.is_empty() {
        let name = if is_conference {
            param::FEATURE
        } else {
            xparam::X_JMAP_FEATURE
        };
        prop.add_param(Parameter::with_values(name, features));
    }
    xparam::set_id(&mut prop, id);
    Some(prop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Mode;
    use chrono::NaiveDate;
    use jscal_rfc::rfc::ical::core::DateTime;
    use std::collections::BTreeSet;

    #[test_log::test]
    fn first_location_becomes_location_then_conference() {
        let locations = json!({
            "a": {"name": "HQ", "rel": "unknown", "description": "Floor 3", "linkIds": ["l1"]},
            "b": {
                "name": "Video",
                "rel": "virtual",
                "uri": "https://meet.example.com/x",
                "features": ["video", "chat"]
            },
            "c": {"name": "Parking", "rel": "parking", "coordinates": "geo:1,2"}
        });

        let mut sink = BTreeSet::new();
        let mut ctx = Context::writer(&mut sink, Mode::Create, "u", "p");
        let mut event = Component::event();
        locations_to_ical(&mut ctx, &mut event, &locations);

        let conference = event.get_property(prop::CONFERENCE).unwrap();
        assert_eq!(conference.get_param_value(param::LABEL), Some("Video"));
        assert_eq!(
            conference.param_values(param::FEATURE).collect::<Vec<_>>(),
            ["VIDEO", "CHAT"]
        );
        assert_eq!(event.get_property(prop::LOCATION).unwrap().as_text(), Some("HQ"));
        assert!(event.get_property(X_JMAP_LOCATION).is_some());

        let read = locations_from_ical(&mut ctx, &event);
        drop(ctx);
        assert!(sink.is_empty());
        assert_eq!(read, locations);
    }

    #[test_log::test]
    fn end_timezone_location_is_read_from_dtend() {
        let local = NaiveDate::from_ymd_opt(2024, 6, 1)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .unwrap();
        let mut event = Component::event();
        event.add_property(Property::datetime(
            prop::DTSTART,
            DateTime::zoned(local, "America/New_York"),
        ));
        let mut dtend = Property::datetime(prop::DTEND, DateTime::zoned(local, "Europe/London"));
        xparam::set_id(&mut dtend, "endtz");
        event.add_property(dtend);

        let mut sink = BTreeSet::new();
        let mut ctx = Context::reader(&mut sink, None);
        assert_eq!(
            locations_from_ical(&mut ctx, &event),
            json!({"endtz": {"timeZone": "Europe/London", "rel": "end"}})
        );
    }

    #[test_log::test]
    fn geo_and_apple_locations() {
        let mut event = Component::event();
        event.add_property(Property::new(prop::GEO, IcalValue::Geo(37.5, -122.25)));
        let mut apple = Property::uri(X_APPLE_STRUCTURED_LOCATION, "geo:37.5,-122.25");
        xparam::set(&mut apple, xparam::X_TITLE, "Office", true);
        xparam::set_id(&mut apple, "apple");
        event.add_property(apple);

        let mut sink = BTreeSet::new();
        let mut ctx = Context::reader(&mut sink, None);
        let read = locations_from_ical(&mut ctx, &event);
        assert_eq!(
            read.get("apple"),
            Some(&json!({"coordinates": "geo:37.5,-122.25", "name": "Office"}))
        );
        let geo_id = xparam::id_of(event.get_property(prop::GEO).unwrap());
        assert_eq!(
            read.get(geo_id.as_str()),
            Some(&json!({"coordinates": "geo:37.5,-122.25"}))
        );
    }

    #[test_log::test]
    fn invalid_locations_are_reported() {
        let mut sink = BTreeSet::new();
        let mut ctx = Context::writer(&mut sink, Mode::Create, "u", "p");
        let mut event = Component::event();
        locations_to_ical(
            &mut ctx,
            &mut event,
            &json!({
                "a": {"name": "X", "timeZone": "Mars/Olympus"},
                "b": {},
                "c": {"name": 1, "features": ["ok", 2]}
            }),
        );
        drop(ctx);
        let paths: Vec<_> = sink.into_iter().collect();
        assert_eq!(
            paths,
            [
                "locations/a/timeZone",
                "locations/b",
                "locations/c/features/1",
                "locations/c/name"
            ]
        );
        assert!(event.get_property(prop::LOCATION).is_none());
    }
}
