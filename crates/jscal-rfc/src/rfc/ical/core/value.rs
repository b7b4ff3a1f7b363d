//! iCalendar property value types (RFC 5545 §3.3).

use std::fmt;

use chrono::NaiveDateTime;

use super::{Date, DateTime, Duration, RRule};
use crate::rfc::ical::build::escape_text;

/// PERIOD value (RFC 5545 §3.3.9).
///
/// A precise period of time, defined by either:
/// - An explicit start and end (both DATE-TIME)
/// - A start DATE-TIME and a DURATION
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Period {
    /// Explicit start and end times.
    Explicit {
        /// Start of the period.
        start: DateTime,
        /// End of the period.
        end: DateTime,
    },
    /// Start time and duration.
    Duration {
        /// Start of the period.
        start: DateTime,
        /// Duration of the period.
        duration: Duration,
    },
}

impl Period {
    /// Returns the start of the period.
    #[must_use]
    pub fn start(&self) -> &DateTime {
        match self {
            Self::Explicit { start, .. } | Self::Duration { start, .. } => start,
        }
    }

    /// Returns the length of the period.
    ///
    /// For explicit periods the wall-clock difference is used; both ends
    /// share the same TZID by construction.
    #[must_use]
    pub fn duration(&self) -> Duration {
        match self {
            Self::Explicit { start, end } => {
                Duration::from_seconds((end.local - start.local).num_seconds())
            }
            Self::Duration { duration, .. } => *duration,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit { start, end } => write!(f, "{start}/{end}"),
            Self::Duration { start, duration } => write!(f, "{start}/{duration}"),
        }
    }
}

/// Value types (RFC 5545 §3.3).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// BOOLEAN value.
    Boolean(bool),
    /// CAL-ADDRESS value (typically mailto: URI).
    CalAddress(String),
    /// DATE value.
    Date(Date),
    /// DATE-TIME value.
    DateTime(DateTime),
    /// DURATION value.
    Duration(Duration),
    /// GEO value: latitude and longitude.
    Geo(f64, f64),
    /// INTEGER value.
    Integer(i32),
    /// PERIOD value.
    Period(Period),
    /// RECUR value (recurrence rule).
    Recur(Box<RRule>),
    /// TEXT value (unescaped).
    Text(String),
    /// TEXT-LIST value (multiple comma-separated texts).
    TextList(Vec<String>),
    /// URI value.
    Uri(String),
    /// Multiple values of one property (e.g. several EXDATEs on one line).
    List(Vec<Value>),
    /// Unknown or unparsed value, kept verbatim.
    Unknown(String),
}

impl Value {
    /// Returns this value as text.
    ///
    /// Address, URI and unknown values are also returned, since all of them
    /// are plain strings on the wire.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::CalAddress(s) | Self::Uri(s) | Self::Unknown(s) => Some(s),
            _ => None,
        }
    }

    /// Returns this value as an integer, if it is an integer value.
    #[must_use]
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Unknown(s) | Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns this value as a date-time, if it is a date-time value.
    #[must_use]
    pub fn as_datetime(&self) -> Option<&DateTime> {
        match self {
            Self::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// Returns this value as a duration, if it is a duration value.
    #[must_use]
    pub fn as_duration(&self) -> Option<&Duration> {
        match self {
            Self::Duration(d) => Some(d),
            _ => None,
        }
    }

    /// Returns this value as a recurrence rule, if it is a recur value.
    #[must_use]
    pub fn as_recur(&self) -> Option<&RRule> {
        match self {
            Self::Recur(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the wall-clock reading of a DATE or DATE-TIME value.
    ///
    /// Dates are read as midnight.
    #[must_use]
    pub fn local_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(dt) => Some(dt.local),
            Self::Date(d) => Some(d.at_midnight()),
            Self::Period(p) => Some(p.start().local),
            _ => None,
        }
    }

    /// Returns whether this is a DATE (no time of day).
    #[must_use]
    pub fn is_date(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// Iterates over the individual values of a possibly multi-valued property.
    pub fn members(&self) -> impl Iterator<Item = &Value> {
        let slice = match self {
            Self::List(values) => values.as_slice(),
            single => std::slice::from_ref(single),
        };
        slice.iter()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Self::CalAddress(s) | Self::Uri(s) | Self::Unknown(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{d}"),
            Self::DateTime(dt) => write!(f, "{dt}"),
            Self::Duration(d) => write!(f, "{d}"),
            Self::Geo(lat, lon) => write!(f, "{lat};{lon}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Period(p) => write!(f, "{p}"),
            Self::Recur(r) => write!(f, "{r}"),
            Self::Text(s) => write!(f, "{}", escape_text(s)),
            Self::TextList(list) => {
                let escaped: Vec<String> = list.iter().map(|s| escape_text(s)).collect();
                write!(f, "{}", escaped.join(","))
            }
            Self::List(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{value}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, d)
            .and_then(|date| date.and_hms_opt(h, 0, 0))
            .unwrap()
    }

    #[test_log::test]
    fn period_display() {
        let explicit = Period::Explicit {
            start: DateTime::utc(at(23, 9)),
            end: DateTime::utc(at(23, 17)),
        };
        assert_eq!(explicit.to_string(), "20260123T090000Z/20260123T170000Z");
        assert_eq!(explicit.duration(), Duration::hours(8));

        let with_duration = Period::Duration {
            start: DateTime::utc(at(23, 9)),
            duration: Duration::hours(8),
        };
        assert_eq!(with_duration.to_string(), "20260123T090000Z/PT8H");
    }

    #[test_log::test]
    fn list_iterates_members() {
        let single = Value::Date(Date(at(1, 0).date()));
        assert_eq!(single.members().count(), 1);

        let many = Value::List(vec![
            Value::DateTime(DateTime::floating(at(1, 9))),
            Value::DateTime(DateTime::floating(at(8, 9))),
        ]);
        assert_eq!(many.members().count(), 2);
        assert_eq!(many.to_string(), "20260101T090000,20260108T090000");
    }

    #[test_log::test]
    fn text_values_are_escaped() {
        let list = Value::TextList(vec!["a,b".to_string(), "c".to_string()]);
        assert_eq!(list.to_string(), "a\\,b,c");
        assert_eq!(Value::Geo(37.5, -122.25).to_string(), "37.5;-122.25");
    }
}
