//! iCalendar property type (RFC 5545 §3.1, §3.8).

use std::fmt;

use super::{Date, DateTime, DateTimeForm, Duration, Parameter, Value};

/// A parsed iCalendar property: name, parameters and a typed value.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Property name (normalized to uppercase).
    pub name: String,
    /// Parameters in order of appearance.
    pub params: Vec<Parameter>,
    /// Parsed value.
    pub value: Value,
}

impl Property {
    /// Creates a property with an arbitrary value.
    #[must_use]
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            params: Vec::new(),
            value,
        }
    }

    /// Creates a property with a text value.
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, Value::Text(value.into()))
    }

    /// Creates a property with a URI value.
    #[must_use]
    pub fn uri(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, Value::Uri(value.into()))
    }

    /// Creates a property with a calendar user address value.
    #[must_use]
    pub fn cal_address(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, Value::CalAddress(value.into()))
    }

    /// Creates a property with an integer value.
    #[must_use]
    pub fn integer(name: impl Into<String>, value: i32) -> Self {
        Self::new(name, Value::Integer(value))
    }

    /// Creates a property with a datetime value.
    ///
    /// Zoned date-times also get their TZID parameter.
    #[must_use]
    pub fn datetime(name: impl Into<String>, dt: DateTime) -> Self {
        let tzid = match &dt.form {
            DateTimeForm::Zoned { tzid } => Some(Parameter::tzid(tzid.clone())),
            DateTimeForm::Floating | DateTimeForm::Utc => None,
        };
        let mut prop = Self::new(name, Value::DateTime(dt));
        prop.params.extend(tzid);
        prop
    }

    /// Creates a property with a date value.
    #[must_use]
    pub fn date(name: impl Into<String>, d: Date) -> Self {
        let mut prop = Self::new(name, Value::Date(d));
        prop.params.push(Parameter::value_type("DATE"));
        prop
    }

    /// Creates a property with a duration value.
    #[must_use]
    pub fn duration(name: impl Into<String>, d: Duration) -> Self {
        Self::new(name, Value::Duration(d))
    }

    /// Returns whether this property is named `name` (case-insensitive).
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Returns the first parameter with the given name.
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.is(name))
    }

    /// Returns all parameters with the given name.
    pub fn params_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Parameter> {
        self.params.iter().filter(move |p| p.is(name))
    }

    /// Returns the first value of a parameter.
    #[must_use]
    pub fn get_param_value(&self, name: &str) -> Option<&str> {
        self.get_param(name)?.value()
    }

    /// Returns every value of every parameter with the given name, in order.
    pub fn param_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.params_named(name)
            .flat_map(|p| p.values.iter().map(String::as_str))
    }

    /// Adds a parameter to this property.
    pub fn add_param(&mut self, param: Parameter) {
        self.params.push(param);
    }

    /// Sets a parameter, replacing any existing parameter with the same name.
    pub fn set_param(&mut self, param: Parameter) {
        self.params.retain(|p| !p.is(&param.name));
        self.params.push(param);
    }

    /// Removes all parameters with the given name, returning how many were removed.
    pub fn remove_params(&mut self, name: &str) -> usize {
        let before = self.params.len();
        self.params.retain(|p| !p.is(name));
        before - self.params.len()
    }

    /// Returns the TZID parameter if present.
    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        self.get_param_value(super::param::TZID)
    }

    /// Returns the value as text if it is a string-like value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        self.value.as_text()
    }

    /// Returns the value as an integer if it is an integer value.
    #[must_use]
    pub fn as_integer(&self) -> Option<i32> {
        self.value.as_integer()
    }

    /// Returns the value as a datetime if it is a datetime value.
    #[must_use]
    pub fn as_datetime(&self) -> Option<&DateTime> {
        self.value.as_datetime()
    }

    /// Returns the value as a duration if it is a duration value.
    #[must_use]
    pub fn as_duration(&self) -> Option<&Duration> {
        self.value.as_duration()
    }
}

/// Renders the property as an unfolded content line, e.g.
/// `ATTENDEE;CN=Jane:mailto:jane@example.com`.
impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for param in &self.params {
            write!(f, ";{param}")?;
        }
        write!(f, ":{}", self.value)
    }
}

/// Property names used by the conversion layer.
pub mod names {
    // Calendar properties
    pub const CALSCALE: &str = "CALSCALE";
    pub const PRODID: &str = "PRODID";
    pub const VERSION: &str = "VERSION";

    // Descriptive properties
    pub const ATTACH: &str = "ATTACH";
    pub const CATEGORIES: &str = "CATEGORIES";
    pub const CLASS: &str = "CLASS";
    pub const DESCRIPTION: &str = "DESCRIPTION";
    pub const GEO: &str = "GEO";
    pub const LOCATION: &str = "LOCATION";
    pub const PRIORITY: &str = "PRIORITY";
    pub const STATUS: &str = "STATUS";
    pub const SUMMARY: &str = "SUMMARY";

    // Date and time properties
    pub const DTEND: &str = "DTEND";
    pub const DTSTART: &str = "DTSTART";
    pub const DURATION: &str = "DURATION";
    pub const TRANSP: &str = "TRANSP";

    // Relationship properties
    pub const ATTENDEE: &str = "ATTENDEE";
    pub const ORGANIZER: &str = "ORGANIZER";
    pub const RECURRENCE_ID: &str = "RECURRENCE-ID";
    pub const RELATED_TO: &str = "RELATED-TO";
    pub const UID: &str = "UID";

    // Recurrence properties
    pub const EXDATE: &str = "EXDATE";
    pub const RDATE: &str = "RDATE";
    pub const RRULE: &str = "RRULE";

    // Alarm properties
    pub const ACTION: &str = "ACTION";
    pub const ACKNOWLEDGED: &str = "ACKNOWLEDGED";
    pub const TRIGGER: &str = "TRIGGER";

    // Change management properties
    pub const CREATED: &str = "CREATED";
    pub const DTSTAMP: &str = "DTSTAMP";
    pub const SEQUENCE: &str = "SEQUENCE";

    // RFC 7986 extensions
    pub const COLOR: &str = "COLOR";
    pub const CONFERENCE: &str = "CONFERENCE";
}
