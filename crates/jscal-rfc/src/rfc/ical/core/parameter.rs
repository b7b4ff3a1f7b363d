//! iCalendar parameter types (RFC 5545 §3.2).

use std::fmt;

use crate::rfc::ical::build::escape_param_value;

/// A single iCalendar property parameter.
///
/// `DTSTART;TZID=America/New_York:20260123T120000` carries a parameter named
/// `TZID` with the single value `America/New_York`. Multi-valued parameters
/// such as `MEMBER` or `DELEGATED-TO` keep each value separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter name (normalized to uppercase).
    pub name: String,
    /// Parameter values in order of appearance.
    pub values: Vec<String>,
}

impl Parameter {
    /// Creates a new parameter with a single value.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            values: vec![value.into()],
        }
    }

    /// Creates a new parameter with multiple values.
    #[must_use]
    pub fn with_values(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            values,
        }
    }

    /// Returns the first (and usually only) value.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// Returns whether this parameter is named `name` (case-insensitive).
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Creates a TZID parameter.
    #[must_use]
    pub fn tzid(tzid: impl Into<String>) -> Self {
        Self::new(names::TZID, tzid)
    }

    /// Creates a VALUE parameter.
    #[must_use]
    pub fn value_type(value_type: impl Into<String>) -> Self {
        Self::new(names::VALUE, value_type)
    }

    /// Creates a RELATED parameter (for triggers).
    #[must_use]
    pub fn related(related: TriggerRelated) -> Self {
        Self::new(names::RELATED, related.as_str())
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.values.is_empty() {
            write!(f, "=")?;
            for (i, value) in self.values.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", escape_param_value(value))?;
            }
        }
        Ok(())
    }
}

/// RELATED parameter values for TRIGGER (RFC 5545 §3.2.14).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerRelated {
    /// Relative to component start (default).
    #[default]
    Start,
    /// Relative to component end.
    End,
}

impl TriggerRelated {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::End => "END",
        }
    }

    /// Parses a RELATED value (case-insensitive), defaulting to `Start`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("END") {
            Self::End
        } else {
            Self::Start
        }
    }
}

impl fmt::Display for TriggerRelated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameter names used by the conversion layer.
pub mod names {
    pub const ALTREP: &str = "ALTREP";
    pub const CN: &str = "CN";
    pub const CUTYPE: &str = "CUTYPE";
    pub const DELEGATED_FROM: &str = "DELEGATED-FROM";
    pub const DELEGATED_TO: &str = "DELEGATED-TO";
    pub const FEATURE: &str = "FEATURE";
    pub const FMTTYPE: &str = "FMTTYPE";
    pub const LABEL: &str = "LABEL";
    pub const LANGUAGE: &str = "LANGUAGE";
    pub const MEMBER: &str = "MEMBER";
    pub const PARTSTAT: &str = "PARTSTAT";
    pub const RELATED: &str = "RELATED";
    pub const RELTYPE: &str = "RELTYPE";
    pub const ROLE: &str = "ROLE";
    pub const RSVP: &str = "RSVP";
    pub const SIZE: &str = "SIZE";
    pub const TZID: &str = "TZID";
    pub const VALUE: &str = "VALUE";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn parameter_display_simple() {
        let param = Parameter::new("TZID", "America/New_York");
        assert_eq!(param.to_string(), "TZID=America/New_York");
    }

    #[test_log::test]
    fn parameter_display_quoted() {
        let param = Parameter::new("CN", "Doe; Jane");
        assert_eq!(param.to_string(), "CN=\"Doe; Jane\"");
    }

    #[test_log::test]
    fn parameter_display_multiple_values() {
        let param = Parameter::with_values(
            "MEMBER",
            vec![
                "mailto:a@example.com".to_string(),
                "mailto:b@example.com".to_string(),
            ],
        );
        assert_eq!(
            param.to_string(),
            "MEMBER=\"mailto:a@example.com\",\"mailto:b@example.com\""
        );
    }

    #[test_log::test]
    fn trigger_related_parse() {
        assert_eq!(TriggerRelated::parse("end"), TriggerRelated::End);
        assert_eq!(TriggerRelated::parse("START"), TriggerRelated::Start);
        assert_eq!(TriggerRelated::parse("bogus"), TriggerRelated::Start);
    }
}
