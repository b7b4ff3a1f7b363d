//! `keywords` and `relatedTo`.

use jscal_rfc::rfc::ical::core::{Component, Parameter, Property, Value as IcalValue, param, prop};
use serde_json::Value;

use crate::context::Context;

/// Collects every CATEGORIES value; `null` when there are none.
#[must_use]
pub fn keywords_from_ical(comp: &Component) -> Value {
    let mut keywords: Vec<Value> = Vec::new();
    for categories in comp.get_properties(prop::CATEGORIES) {
        let words: Vec<&str> = match &categories.value {
            IcalValue::TextList(list) => list.iter().map(String::as_str).collect(),
            IcalValue::Text(text) => text.split(',').collect(),
            _ => continue,
        };
        for word in words {
            let word = Value::String(word.to_string());
            if !keywords.contains(&word) {
                keywords.push(word);
            }
        }
    }
    if keywords.is_empty() {
        Value::Null
    } else {
        Value::Array(keywords)
    }
}

/// Replaces CATEGORIES with one property per keyword.
pub fn keywords_to_ical(ctx: &mut Context<'_>, comp: &mut Component, keywords: &Value) {
    comp.remove_properties(prop::CATEGORIES);
    let items = match keywords {
        Value::Null => return,
        Value::Array(items) if !items.is_empty() => items,
        _ => {
            ctx.invalid("keywords");
            return;
        }
    };
    for (i, item) in items.iter().enumerate() {
        match item.as_str() {
            Some(word) if !word.is_empty() => comp.add_property(Property::new(
                prop::CATEGORIES,
                IcalValue::TextList(vec![word.to_string()]),
            )),
            _ => ctx.enter_index("keywords", i).invalid_here(),
        }
    }
}

/// ## Summary
/// Maps each RELATED-TO by its lower-cased RELTYPE to the related UID.
///
/// Entries without RELTYPE are skipped; a repeated RELTYPE keeps the last.
#[must_use]
pub fn related_to_from_ical(comp: &Component) -> Value {
    let mut related = serde_json::Map::new();
    for prop in comp.get_properties(prop::RELATED_TO) {
        let Some(reltype) = prop.get_param_value(param::RELTYPE) else {
            tracing::trace!(value = %prop.value, "Skipping RELATED-TO without RELTYPE");
            continue;
        };
        let Some(uid) = prop.as_text() else { continue };
        related.insert(reltype.to_lowercase(), Value::String(uid.to_string()));
    }
    if related.is_empty() {
        Value::Null
    } else {
        Value::Object(related)
    }
}

/// Replaces RELATED-TO from a `relatedTo` map.
pub fn related_to_to_ical(ctx: &mut Context<'_>, comp: &mut Component, related: &Value) {
    comp.remove_properties(prop::RELATED_TO);
    let map = match related {
        Value::Null => return,
        Value::Object(map) if !map.is_empty() => map,
        _ => {
            ctx.invalid("relatedTo");
            return;
        }
    };
    for (tag, uid) in map {
        match uid.as_str() {
            Some(uid) if !uid.is_empty() && !tag.is_empty() => {
                let mut prop = Property::text(prop::RELATED_TO, uid);
                prop.add_param(Parameter::new(param::RELTYPE, tag.to_uppercase()));
                comp.add_property(prop);
            }
            _ => ctx.enter_key("relatedTo", tag).invalid_here(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Mode;
    use serde_json::json;
    use std::collections::BTreeSet;

    #[test_log::test]
    fn keywords_flatten_and_dedupe() {
        let mut event = Component::event();
        event.add_property(Property::new(
            prop::CATEGORIES,
            IcalValue::TextList(vec!["work".into(), "travel".into()]),
        ));
        event.add_property(Property::text(prop::CATEGORIES, "travel,home"));
        assert_eq!(keywords_from_ical(&event), json!(["work", "travel", "home"]));
        assert_eq!(keywords_from_ical(&Component::event()), Value::Null);
    }

    #[test_log::test]
    fn keywords_write_one_property_each() {
        let mut sink = BTreeSet::new();
        let mut ctx = Context::writer(&mut sink, Mode::Create, "u", "p");
        let mut event = Component::event();
        keywords_to_ical(&mut ctx, &mut event, &json!(["a,b", 7, "c"]));
        drop(ctx);

        assert_eq!(event.get_properties(prop::CATEGORIES).len(), 2);
        assert_eq!(keywords_from_ical(&event), json!(["a,b", "c"]));
        assert!(sink.contains("keywords/1"));
    }

    #[test_log::test]
    fn related_to_round_trip() {
        let mut sink = BTreeSet::new();
        let mut ctx = Context::writer(&mut sink, Mode::Create, "u", "p");
        let mut event = Component::event();
        related_to_to_ical(
            &mut ctx,
            &mut event,
            &json!({"parent": "uid-1", "sibling": "uid-2", "child": ""}),
        );
        drop(ctx);

        assert!(sink.contains("relatedTo/child"));
        assert_eq!(
            related_to_from_ical(&event),
            json!({"parent": "uid-1", "sibling": "uid-2"})
        );
        let parent = event.get_property(prop::RELATED_TO).unwrap();
        assert_eq!(parent.get_param_value(param::RELTYPE), Some("PARENT"));
    }
}
