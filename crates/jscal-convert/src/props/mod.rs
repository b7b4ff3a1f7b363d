//! Converters for the structured sub-objects of an event.
//!
//! Each submodule reads one group of component properties into JSON and
//! writes JSON back into properties, reporting invalid members through the
//! conversion context.

pub mod alerts;
pub mod keywords;
pub mod links;
pub mod locations;
pub mod participants;
pub mod recurrence;

use jscal_rfc::rfc::ical::core::{Component, Parameter, Property, param, prop};
use serde_json::{Map, Value};

use crate::context::Context;

pub type JsonObject = Map<String, Value>;

const HTML_DATA_URI: &str = "data:text/html,";

/// ## Summary
/// Reads an optional string member.
///
/// Absent and `null` members yield `None`; anything else that is not a
/// string is reported as invalid and also yields `None`.
pub(crate) fn opt_str<'a>(ctx: &mut Context<'_>, obj: &'a JsonObject, key: &str) -> Option<&'a str> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(_) => {
            ctx.invalid(key);
            None
        }
    }
}

/// Reads a mandatory non-empty string member, reporting it if missing.
pub(crate) fn req_str<'a>(ctx: &mut Context<'_>, obj: &'a JsonObject, key: &str) -> Option<&'a str> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => {
            ctx.invalid(key);
            None
        }
    }
}

/// Reads an optional boolean member.
pub(crate) fn opt_bool(ctx: &mut Context<'_>, obj: &JsonObject, key: &str) -> Option<bool> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => {
            ctx.invalid(key);
            None
        }
    }
}

/// Reads an optional non-negative integer member.
pub(crate) fn opt_uint(ctx: &mut Context<'_>, obj: &JsonObject, key: &str) -> Option<u64> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => {
            let n = value.as_u64();
            if n.is_none() {
                ctx.invalid(key);
            }
            n
        }
    }
}

/// ## Summary
/// Reads an optional array of strings.
///
/// Non-string elements are reported at `key/<index>`.
pub(crate) fn opt_str_array<'a>(
    ctx: &mut Context<'_>,
    obj: &'a JsonObject,
    key: &str,
) -> Option<Vec<&'a str>> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item.as_str() {
                    Some(s) => out.push(s),
                    None => ctx.enter_index(key, i).invalid_here(),
                }
            }
            Some(out)
        }
        Some(_) => {
            ctx.invalid(key);
            None
        }
    }
}

/// Returns the member as a non-empty object, or reports it.
///
/// `Ok(None)` means the member is `null`.
pub(crate) fn nullable_object<'a>(
    ctx: &mut Context<'_>,
    value: &'a Value,
    name: &str,
) -> Result<Option<&'a JsonObject>, ()> {
    match value {
        Value::Null => Ok(None),
        Value::Object(map) if !map.is_empty() => Ok(Some(map)),
        _ => {
            ctx.invalid(name);
            Err(())
        }
    }
}

/// Reads the HTML alternative of DESCRIPTION from its `ALTREP` data URI.
pub(crate) fn html_description_from_ical(comp: &Component) -> Option<&str> {
    let altrep = comp
        .get_property(prop::DESCRIPTION)?
        .get_param_value(param::ALTREP)?;
    let prefix = altrep.get(..HTML_DATA_URI.len())?;
    if prefix.eq_ignore_ascii_case(HTML_DATA_URI) {
        altrep.get(HTML_DATA_URI.len()..)
    } else {
        None
    }
}

/// ## Summary
/// Stores `html` as the `ALTREP` of DESCRIPTION.
///
/// Any existing `ALTREP` is dropped first. An empty DESCRIPTION is added
/// when the component has none; `None` only clears the parameter.
pub(crate) fn html_description_to_ical(comp: &mut Component, html: Option<&str>) {
    if let Some(description) = comp.get_property_mut(prop::DESCRIPTION) {
        description.remove_params(param::ALTREP);
    }
    let Some(html) = html else { return };
    if comp.get_property(prop::DESCRIPTION).is_none() {
        comp.add_property(Property::text(prop::DESCRIPTION, ""));
    }
    if let Some(description) = comp.get_property_mut(prop::DESCRIPTION) {
        description.add_param(Parameter::new(param::ALTREP, format!("{HTML_DATA_URI}{html}")));
    }
}
