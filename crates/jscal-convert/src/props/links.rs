//! `links`, `attachments` and `mediaLinks`.
//!
//! Links live in ATTACH properties, or in X-JMAP-ATTACH where ATTACH is
//! restricted (display alarms, for instance).

use jscal_rfc::rfc::ical::core::{Component, Parameter, Property, Value as IcalValue, param, prop};
use serde_json::{Value, json};

use super::{JsonObject, opt_str, opt_uint};
use crate::context::Context;
use crate::xparam::{self, X_JMAP_ATTACH};

/// ## Summary
/// Reads the links of `comp`.
///
/// Links without an `X-JMAP-ID` get `<id_prefix><n>`, with `n` counting
/// from one and skipping ids already taken. Inline binary attachments have
/// no href and are skipped.
#[must_use]
pub fn links_from_ical(comp: &Component, id_prefix: &str) -> Value {
    let mut links = JsonObject::new();
    let attach = comp.get_properties(prop::ATTACH);
    let x_attach = comp.get_properties(X_JMAP_ATTACH);

    let mut unnamed = Vec::new();
    for prop in attach.into_iter().chain(x_attach) {
        let Some(link) = link_from_ical(prop) else {
            continue;
        };
        match xparam::get(prop, xparam::X_JMAP_ID) {
            Some(id) => {
                links.insert(id.to_string(), Value::Object(link));
            }
            None => unnamed.push(link),
        }
    }

    let mut ordinal = 0;
    for link in unnamed {
        let id = loop {
            ordinal += 1;
            let id = format!("{id_prefix}{ordinal}");
            if !links.contains_key(&id) {
                break id;
            }
        };
        links.insert(id, Value::Object(link));
    }

    if links.is_empty() {
        Value::Null
    } else {
        Value::Object(links)
    }
}

fn link_from_ical(prop: &Property) -> Option<JsonObject> {
    if prop
        .get_param_value(param::VALUE)
        .is_some_and(|v| v.eq_ignore_ascii_case("BINARY"))
    {
        tracing::trace!("Skipping inline binary attachment");
        return None;
    }
    let href = prop.as_text().filter(|s| !s.is_empty())?;

    let mut link = JsonObject::new();
    link.insert("href".into(), json!(href));
    if let Some(cid) = xparam::get(prop, xparam::X_JMAP_CID) {
        link.insert("cid".into(), json!(cid));
    }
    if let Some(fmttype) = prop.get_param_value(param::FMTTYPE) {
        link.insert("type".into(), json!(fmttype));
    }
    if let Some(title) = xparam::get(prop, xparam::X_TITLE) {
        link.insert("title".into(), json!(title));
    }
    if let Some(blob) = xparam::get(prop, xparam::X_JMAP_PROPERTIES) {
        let properties = xparam::decode_base64_json(blob).unwrap_or(Value::Null);
        link.insert("properties".into(), properties);
    }
    if let Some(size) = prop.get_param_value(param::SIZE) {
        let size = size.parse::<u64>().map_or(Value::Null, Value::from);
        link.insert("size".into(), size);
    }
    if let Some(rel) = xparam::get(prop, xparam::X_JMAP_REL) {
        link.insert("rel".into(), json!(rel));
    }
    Some(link)
}

/// ## Summary
/// Replaces the `prop_name` properties of `comp` with `links`.
///
/// `field` names the JSON member being written so invalid entries are
/// reported at `<field>/<id>/<member>`.
pub fn links_to_ical(
    ctx: &mut Context<'_>,
    comp: &mut Component,
    links: &JsonObject,
    field: &str,
    prop_name: &str,
) {
    comp.remove_properties(prop_name);

    for (id, link) in links {
        let mut ctx = ctx.enter_key(field, id);
        let Value::Object(link) = link else {
            ctx.invalid_here();
            continue;
        };
        if let Some(prop) = link_to_ical(&mut ctx, id, link, prop_name) {
            comp.add_property(prop);
        }
    }
}

fn link_to_ical(
    ctx: &mut Context<'_>,
    id: &str,
    link: &JsonObject,
    prop_name: &str,
) -> Option<Property> {
    let before = ctx.invalid_count();

    let href = match link.get("href") {
        Some(Value::String(href)) if !href.is_empty() => Some(href.as_str()),
        _ => {
            ctx.invalid("href");
            None
        }
    };
    let fmttype = opt_str(ctx, link, "type");
    let title = opt_str(ctx, link, "title");
    let cid = opt_str(ctx, link, "cid");
    let size = opt_uint(ctx, link, "size");
    let properties = match link.get("properties") {
        None | Some(Value::Null) => None,
        Some(value @ Value::Object(map)) if !map.is_empty() => Some(value),
        Some(_) => {
            ctx.invalid("properties");
            None
        }
    };
    let rel = opt_str(ctx, link, "rel");

    let href = href?;
    if ctx.invalid_count() != before {
        return None;
    }

    let mut prop = Property::uri(prop_name, href);
    if let Some(fmttype) = fmttype {
        prop.add_param(Parameter::new(param::FMTTYPE, fmttype));
    }
    if let Some(title) = title {
        xparam::set(&mut prop, xparam::X_TITLE, title, true);
    }
    if let Some(cid) = cid {
        xparam::set(&mut prop, xparam::X_JMAP_CID, cid, true);
    }
    if let Some(size) = size {
        prop.add_param(Parameter::new(param::SIZE, size.to_string()));
    }
    if let Some(rel) = rel {
        xparam::set(&mut prop, xparam::X_JMAP_REL, rel, true);
    }
    if let Some(properties) = properties {
        let blob = xparam::encode_base64_json(properties);
        xparam::set(&mut prop, xparam::X_JMAP_PROPERTIES, blob, true);
    }
    xparam::set_id(&mut prop, id);
    Some(prop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Mode;
    use std::collections::BTreeSet;

    fn object(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test_log::test]
    fn links_round_trip_with_parameters() {
        let links = object(json!({
            "spec": {
                "href": "https://example.com/agenda.pdf",
                "type": "application/pdf",
                "title": "Agenda",
                "size": 2048,
                "rel": "describedby",
                "properties": {"x-pages": 3}
            },
            "img": {"href": "cid:logo@example.com", "cid": "logo@example.com"}
        }));

        let mut sink = BTreeSet::new();
        let mut ctx = Context::writer(&mut sink, Mode::Create, "u", "p");
        let mut event = Component::event();
        links_to_ical(&mut ctx, &mut event, &links, "links", prop::ATTACH);
        drop(ctx);

        assert!(sink.is_empty());
        assert_eq!(event.get_properties(prop::ATTACH).len(), 2);
        assert_eq!(links_from_ical(&event, "link"), Value::Object(links));
    }

    #[test_log::test]
    fn generated_ids_count_from_one() {
        let mut event = Component::event();
        event.add_property(Property::uri(prop::ATTACH, "https://example.com/a"));
        let mut binary = Property::new(prop::ATTACH, IcalValue::Unknown("AAAA".into()));
        binary.add_param(Parameter::value_type("BINARY"));
        event.add_property(binary);
        event.add_property(Property::uri(X_JMAP_ATTACH, "https://example.com/b"));

        let links = links_from_ical(&event, "link");
        assert_eq!(
            links,
            json!({
                "link1": {"href": "https://example.com/a"},
                "link2": {"href": "https://example.com/b"}
            })
        );
    }

    #[test_log::test]
    fn generated_ids_skip_explicit_ones() {
        let mut event = Component::event();
        event.add_property(Property::uri(prop::ATTACH, "https://example.com/a"));
        let mut named = Property::uri(prop::ATTACH, "https://example.com/named");
        xparam::set_id(&mut named, "link1");
        event.add_property(named);

        let links = links_from_ical(&event, "link");
        assert_eq!(
            links,
            json!({
                "link1": {"href": "https://example.com/named"},
                "link2": {"href": "https://example.com/a"}
            })
        );
    }

    #[test_log::test]
    fn invalid_links_are_reported_and_skipped() {
        let links = object(json!({
            "a": {"href": ""},
            "b": {"href": "https://example.com", "size": -4},
            "c": {"href": "https://example.com", "properties": {}}
        }));
        let mut sink = BTreeSet::new();
        let mut ctx = Context::writer(&mut sink, Mode::Create, "u", "p");
        let mut event = Component::event();
        links_to_ical(&mut ctx, &mut event, &links, "links", prop::ATTACH);
        drop(ctx);

        assert!(event.get_property(prop::ATTACH).is_none());
        let paths: Vec<_> = sink.into_iter().collect();
        assert_eq!(paths, ["links/a/href", "links/b/size", "links/c/properties"]);
    }
}
