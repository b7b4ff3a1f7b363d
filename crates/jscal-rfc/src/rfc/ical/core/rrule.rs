//! iCalendar RRULE value type (RFC 5545 §3.3.10, RFC 7529).

use std::fmt;

use super::{Date, DateTime};

/// Recurrence frequency (RFC 5545 §3.3.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Secondly => "SECONDLY",
            Self::Minutely => "MINUTELY",
            Self::Hourly => "HOURLY",
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }

    /// Parses a frequency from a string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            "SECONDLY" => Self::Secondly,
            "MINUTELY" => Self::Minutely,
            "HOURLY" => Self::Hourly,
            "DAILY" => Self::Daily,
            "WEEKLY" => Self::Weekly,
            "MONTHLY" => Self::Monthly,
            "YEARLY" => Self::Yearly,
            _ => return None,
        })
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// Returns the two-letter abbreviation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sunday => "SU",
            Self::Monday => "MO",
            Self::Tuesday => "TU",
            Self::Wednesday => "WE",
            Self::Thursday => "TH",
            Self::Friday => "FR",
            Self::Saturday => "SA",
        }
    }

    /// Parses a weekday from a two-letter abbreviation (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            "SU" => Self::Sunday,
            "MO" => Self::Monday,
            "TU" => Self::Tuesday,
            "WE" => Self::Wednesday,
            "TH" => Self::Thursday,
            "FR" => Self::Friday,
            "SA" => Self::Saturday,
            _ => return None,
        })
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Weekday with optional occurrence number.
///
/// Used in BYDAY rule part. Examples:
/// - `MO` - every Monday
/// - `1MO` - first Monday of the month/year
/// - `-1FR` - last Friday of the month/year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdayNum {
    /// Optional occurrence number (non-zero).
    pub ordinal: Option<i16>,
    /// The day of the week.
    pub weekday: Weekday,
}

impl WeekdayNum {
    /// Creates a weekday occurrence without an ordinal.
    #[must_use]
    pub const fn every(weekday: Weekday) -> Self {
        Self {
            ordinal: None,
            weekday,
        }
    }

    /// Creates a weekday occurrence with an ordinal.
    #[must_use]
    pub const fn nth(ordinal: i16, weekday: Weekday) -> Self {
        Self {
            ordinal: Some(ordinal),
            weekday,
        }
    }
}

impl fmt::Display for WeekdayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = self.ordinal {
            write!(f, "{n}")?;
        }
        write!(f, "{}", self.weekday)
    }
}

/// BYMONTH entry, optionally a leap month (RFC 7529 §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonthNum {
    /// Month number in the rule's calendar scale.
    pub month: u8,
    /// Whether the `L` leap-month suffix is present.
    pub leap: bool,
}

impl fmt::Display for MonthNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.month)?;
        if self.leap {
            write!(f, "L")?;
        }
        Ok(())
    }
}

/// SKIP rule part (RFC 7529 §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    Omit,
    Backward,
    Forward,
}

impl Skip {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Omit => "OMIT",
            Self::Backward => "BACKWARD",
            Self::Forward => "FORWARD",
        }
    }

    /// Parses a SKIP value (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            "OMIT" => Self::Omit,
            "BACKWARD" => Self::Backward,
            "FORWARD" => Self::Forward,
            _ => return None,
        })
    }
}

/// UNTIL value for RRULE - can be either DATE or DATE-TIME.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RRuleUntil {
    /// Date-only boundary (inclusive).
    Date(Date),
    /// Date-time boundary (inclusive, UTC when DTSTART is zoned or UTC).
    DateTime(DateTime),
}

impl fmt::Display for RRuleUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{d}"),
            Self::DateTime(dt) => write!(f, "{dt}"),
        }
    }
}

/// Recurrence rule (RFC 5545 §3.3.10, §3.8.5.3).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RRule {
    /// Recurrence frequency (required).
    pub freq: Option<Frequency>,
    /// Recurrence interval (default: 1).
    pub interval: Option<u32>,
    /// Calendar scale of the rule (RFC 7529).
    pub rscale: Option<String>,
    /// Handling of invalid dates in non-Gregorian scales (RFC 7529).
    pub skip: Option<Skip>,
    /// End date/time of the recurrence (mutually exclusive with count).
    pub until: Option<RRuleUntil>,
    /// Number of occurrences (mutually exclusive with until).
    pub count: Option<u32>,
    /// Week start day (default: Monday).
    pub wkst: Option<Weekday>,
    /// By-second list (0-60).
    pub by_second: Vec<u8>,
    /// By-minute list (0-59).
    pub by_minute: Vec<u8>,
    /// By-hour list (0-23).
    pub by_hour: Vec<u8>,
    /// By-day list with optional occurrence numbers.
    pub by_day: Vec<WeekdayNum>,
    /// By-monthday list (-31 to 31, excluding 0).
    pub by_monthday: Vec<i8>,
    /// By-yearday list (-366 to 366, excluding 0).
    pub by_yearday: Vec<i16>,
    /// By-weekno list (-53 to 53, excluding 0).
    pub by_weekno: Vec<i8>,
    /// By-month list with optional leap flags.
    pub by_month: Vec<MonthNum>,
    /// By-setpos list (-366 to 366, excluding 0).
    pub by_setpos: Vec<i16>,
}

impl RRule {
    /// Creates a rule with the given frequency and nothing else.
    #[must_use]
    pub fn with_freq(freq: Frequency) -> Self {
        Self {
            freq: Some(freq),
            ..Self::default()
        }
    }
}

fn push_list<T: fmt::Display>(parts: &mut Vec<String>, key: &str, values: &[T]) {
    if values.is_empty() {
        return;
    }
    let joined: Vec<String> = values.iter().map(ToString::to_string).collect();
    parts.push(format!("{key}={}", joined.join(",")));
}

impl fmt::Display for RRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if let Some(ref rscale) = self.rscale {
            parts.push(format!("RSCALE={}", rscale.to_ascii_uppercase()));
        }
        if let Some(ref freq) = self.freq {
            parts.push(format!("FREQ={freq}"));
        }
        if let Some(skip) = self.skip {
            parts.push(format!("SKIP={}", skip.as_str()));
        }
        if let Some(interval) = self.interval
            && interval != 1
        {
            parts.push(format!("INTERVAL={interval}"));
        }
        if let Some(ref until) = self.until {
            parts.push(format!("UNTIL={until}"));
        }
        if let Some(count) = self.count {
            parts.push(format!("COUNT={count}"));
        }
        if let Some(wkst) = self.wkst {
            parts.push(format!("WKST={wkst}"));
        }

        push_list(&mut parts, "BYSECOND", &self.by_second);
        push_list(&mut parts, "BYMINUTE", &self.by_minute);
        push_list(&mut parts, "BYHOUR", &self.by_hour);
        push_list(&mut parts, "BYDAY", &self.by_day);
        push_list(&mut parts, "BYMONTHDAY", &self.by_monthday);
        push_list(&mut parts, "BYYEARDAY", &self.by_yearday);
        push_list(&mut parts, "BYWEEKNO", &self.by_weekno);
        push_list(&mut parts, "BYMONTH", &self.by_month);
        push_list(&mut parts, "BYSETPOS", &self.by_setpos);

        write!(f, "{}", parts.join(";"))
    }
}
