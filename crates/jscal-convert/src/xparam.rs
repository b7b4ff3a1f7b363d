//! Vendor extension parameters and properties.
//!
//! Event-object concepts without a native iCalendar slot are carried in
//! `X-` parameters and properties so they survive a round trip.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use jscal_rfc::rfc::ical::core::{Component, Parameter, Property};
use sha2::{Digest, Sha256};

pub const X_JMAP_ID: &str = "X-JMAP-ID";
pub const X_JMAP_CID: &str = "X-JMAP-CID";
pub const X_JMAP_DESCRIPTION: &str = "X-JMAP-DESCRIPTION";
pub const X_JMAP_DTSTAMP: &str = "X-JMAP-DTSTAMP";
pub const X_JMAP_FEATURE: &str = "X-JMAP-FEATURE";
pub const X_JMAP_GEO: &str = "X-JMAP-GEO";
pub const X_JMAP_LINKID: &str = "X-JMAP-LINKID";
pub const X_JMAP_LOCATIONID: &str = "X-JMAP-LOCATIONID";
pub const X_JMAP_PROPERTIES: &str = "X-JMAP-PROPERTIES";
pub const X_JMAP_REL: &str = "X-JMAP-REL";
pub const X_JMAP_ROLE: &str = "X-JMAP-ROLE";
pub const X_JMAP_RSVP_URI: &str = "X-JMAP-RSVP-URI";
pub const X_JMAP_SEQUENCE: &str = "X-JMAP-SEQUENCE";
pub const X_JMAP_TZID: &str = "X-JMAP-TZID";
pub const X_TITLE: &str = "X-TITLE";

pub const X_JMAP_ATTACH: &str = "X-JMAP-ATTACH";
pub const X_JMAP_LOCATION: &str = "X-JMAP-LOCATION";
pub const X_JMAP_USEDEFAULTALERTS: &str = "X-JMAP-USEDEFAULTALERTS";
pub const X_APPLE_STRUCTURED_LOCATION: &str = "X-APPLE-STRUCTURED-LOCATION";

const JSON_DATA_URI: &str = "data:application/json;base64,";

/// Returns the first value of the parameter `name`.
#[must_use]
pub fn get<'a>(prop: &'a Property, name: &str) -> Option<&'a str> {
    prop.get_param_value(name)
}

/// Adds the parameter `name=value`, first removing existing ones if `purge`.
pub fn set(prop: &mut Property, name: &str, value: impl Into<String>, purge: bool) {
    if purge {
        prop.remove_params(name);
    }
    prop.add_param(Parameter::new(name, value));
}

/// Removes every extension property named `name` from `comp`.
pub fn remove_all(comp: &mut Component, name: &str) {
    let removed = comp.remove_properties(name);
    if removed > 0 {
        tracing::trace!(name, removed, "Removed extension properties");
    }
}

/// Returns the text value of the first property named `name`.
#[must_use]
pub fn get_prop_value<'a>(comp: &'a Component, name: &str) -> Option<&'a str> {
    comp.get_property(name)?.as_text()
}

/// Returns the sub-object id stored on `prop`.
///
/// Properties without an `X-JMAP-ID` get the hex SHA-256 of their rendered
/// content line, so the id stays stable as long as the property does.
#[must_use]
pub fn id_of(prop: &Property) -> String {
    get(prop, X_JMAP_ID).map_or_else(|| hex_key(&prop.to_string()), ToString::to_string)
}

/// Stores `id` as the sub-object id of `prop`.
pub fn set_id(prop: &mut Property, id: &str) {
    set(prop, X_JMAP_ID, id, true);
}

/// Lower-case hex SHA-256 of `value`.
#[must_use]
pub fn hex_key(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Encodes a JSON value as a `data:application/json;base64,` URI.
#[must_use]
pub fn encode_base64_json(value: &serde_json::Value) -> String {
    format!("{JSON_DATA_URI}{}", STANDARD.encode(value.to_string()))
}

/// Decodes a `data:...;base64,` URI holding JSON.
#[must_use]
pub fn decode_base64_json(uri: &str) -> Option<serde_json::Value> {
    let (_, data) = uri.split_once(";base64,")?;
    let raw = STANDARD
        .decode(data.trim())
        .inspect_err(|e| tracing::trace!(error = %e, "Undecodable base64 payload"))
        .ok()?;
    serde_json::from_slice(&raw)
        .inspect_err(|e| tracing::trace!(error = %e, "Base64 payload is not JSON"))
        .ok()
}

/// Extracts the address of a `mailto:` URI.
#[must_use]
pub fn mailaddr_from_uri(uri: &str) -> Option<String> {
    let prefix = uri.get(..7)?;
    if !prefix.eq_ignore_ascii_case("mailto:") {
        return None;
    }
    let addr = uri[7..].trim();
    (!addr.is_empty()).then(|| addr.to_string())
}

/// Builds a `mailto:` URI for `addr`.
#[must_use]
pub fn mailaddr_to_uri(addr: &str) -> String {
    format!("mailto:{addr}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test_log::test]
    fn json_blobs_round_trip() {
        let value = json!({"x-custom": {"n": 1}, "flag": true});
        let uri = encode_base64_json(&value);
        assert!(uri.starts_with("data:application/json;base64,"));
        assert_eq!(decode_base64_json(&uri), Some(value));
        assert_eq!(decode_base64_json("data:text/plain,hello"), None);
    }

    #[test_log::test]
    fn ids_fall_back_to_content_hash() {
        let mut prop = Property::uri("ATTACH", "https://example.com/a.pdf");
        let hashed = id_of(&prop);
        assert_eq!(hashed.len(), 64);
        assert_eq!(hashed, hex_key("ATTACH:https://example.com/a.pdf"));

        set_id(&mut prop, "att1");
        set_id(&mut prop, "att2");
        assert_eq!(id_of(&prop), "att2");
        assert_eq!(prop.params_named(X_JMAP_ID).count(), 1);
    }

    #[test_log::test]
    fn set_without_purge_appends() {
        let mut prop = Property::text("LOCATION", "Office");
        set(&mut prop, X_JMAP_LINKID, "l1", false);
        set(&mut prop, X_JMAP_LINKID, "l2", false);
        assert_eq!(prop.param_values(X_JMAP_LINKID).collect::<Vec<_>>(), ["l1", "l2"]);
        set(&mut prop, X_JMAP_LINKID, "l3", true);
        assert_eq!(prop.param_values(X_JMAP_LINKID).collect::<Vec<_>>(), ["l3"]);
    }

    #[test_log::test]
    fn mailto_addresses() {
        assert_eq!(
            mailaddr_from_uri("MAILTO:jane@example.com").as_deref(),
            Some("jane@example.com")
        );
        assert_eq!(mailaddr_from_uri("https://example.com"), None);
        assert_eq!(mailaddr_from_uri("mailto:"), None);
        assert_eq!(mailaddr_to_uri("jane@example.com"), "mailto:jane@example.com");
    }
}
