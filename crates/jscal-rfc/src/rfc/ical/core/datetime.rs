//! iCalendar DATE and DATE-TIME value types (RFC 5545 §3.3.4, §3.3.5).

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// DATE value (RFC 5545 §3.3.4).
///
/// A calendar date without time component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Date(pub NaiveDate);

impl Date {
    /// Creates a date, returning `None` for an impossible calendar day.
    #[must_use]
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Returns the start of this day as a local date-time.
    #[must_use]
    pub fn at_midnight(self) -> NaiveDateTime {
        self.0.and_time(NaiveTime::MIN)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y%m%d"))
    }
}

/// Form of DATE-TIME value (RFC 5545 §3.3.5).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DateTimeForm {
    /// Floating time - same wall-clock time in any timezone.
    ///
    /// Example: `19980118T230000`
    Floating,

    /// UTC time - absolute instant, indicated by 'Z' suffix.
    ///
    /// Example: `19980119T070000Z`
    Utc,

    /// Zoned time - local time with TZID reference.
    ///
    /// Example: `TZID=America/New_York:19980119T020000`
    Zoned {
        /// The timezone identifier as written in the TZID parameter.
        tzid: String,
    },
}

/// DATE-TIME value (RFC 5545 §3.3.5).
///
/// The wall-clock reading is kept as a naive date-time; `form` says how to
/// interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateTime {
    /// Wall-clock date and time.
    pub local: NaiveDateTime,
    /// The form of this DATE-TIME (floating, UTC, or zoned).
    pub form: DateTimeForm,
}

impl DateTime {
    /// Creates a floating DATE-TIME.
    #[must_use]
    pub const fn floating(local: NaiveDateTime) -> Self {
        Self {
            local,
            form: DateTimeForm::Floating,
        }
    }

    /// Creates a UTC DATE-TIME.
    #[must_use]
    pub const fn utc(local: NaiveDateTime) -> Self {
        Self {
            local,
            form: DateTimeForm::Utc,
        }
    }

    /// Creates a zoned DATE-TIME.
    #[must_use]
    pub fn zoned(local: NaiveDateTime, tzid: impl Into<String>) -> Self {
        Self {
            local,
            form: DateTimeForm::Zoned { tzid: tzid.into() },
        }
    }

    /// Returns whether this is a UTC time.
    #[must_use]
    pub fn is_utc(&self) -> bool {
        matches!(self.form, DateTimeForm::Utc)
    }

    /// Returns whether this is a floating time.
    #[must_use]
    pub fn is_floating(&self) -> bool {
        matches!(self.form, DateTimeForm::Floating)
    }

    /// Returns the timezone ID if this is a zoned time.
    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        match &self.form {
            DateTimeForm::Zoned { tzid } => Some(tzid),
            _ => None,
        }
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.local.format("%Y%m%dT%H%M%S"))?;
        if self.is_utc() {
            write!(f, "Z")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, s))
            .unwrap()
    }

    #[test_log::test]
    fn date_display() {
        assert_eq!(Date::from_ymd(2026, 1, 23).unwrap().to_string(), "20260123");
        assert!(Date::from_ymd(2026, 2, 30).is_none());
    }

    #[test_log::test]
    fn datetime_display() {
        let dt = DateTime::utc(local(2026, 1, 23, 12, 0, 0));
        assert_eq!(dt.to_string(), "20260123T120000Z");

        let dt = DateTime::floating(local(2026, 1, 23, 12, 0, 0));
        assert_eq!(dt.to_string(), "20260123T120000");

        let dt = DateTime::zoned(local(2026, 1, 23, 12, 0, 0), "Europe/Vienna");
        assert_eq!(dt.to_string(), "20260123T120000");
        assert_eq!(dt.tzid(), Some("Europe/Vienna"));
    }
}
