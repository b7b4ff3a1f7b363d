//! iCalendar DURATION value type (RFC 5545 §3.3.6).

use std::fmt;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;

/// Duration value (RFC 5545 §3.3.6).
///
/// Either week-based (`P1W`) or day/time-based (`P1DT2H30M`). Year and month
/// designators do not exist because their length varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Duration {
    /// Whether this duration is negative.
    pub negative: bool,
    /// Number of weeks (mutually exclusive with days/hours/minutes/seconds).
    pub weeks: u32,
    /// Number of days.
    pub days: u32,
    /// Number of hours.
    pub hours: u32,
    /// Number of minutes.
    pub minutes: u32,
    /// Number of seconds.
    pub seconds: u32,
}

impl Duration {
    /// Creates a new zero duration.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            negative: false,
            weeks: 0,
            days: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }

    /// Creates a duration from weeks.
    #[must_use]
    pub const fn weeks(weeks: u32) -> Self {
        Self {
            weeks,
            ..Self::zero()
        }
    }

    /// Creates a duration from days.
    #[must_use]
    pub const fn days(days: u32) -> Self {
        Self {
            days,
            ..Self::zero()
        }
    }

    /// Creates a duration from hours.
    #[must_use]
    pub const fn hours(hours: u32) -> Self {
        Self {
            hours,
            ..Self::zero()
        }
    }

    /// Creates a duration from minutes.
    #[must_use]
    pub const fn minutes(minutes: u32) -> Self {
        Self {
            minutes,
            ..Self::zero()
        }
    }

    /// Builds the canonical duration for a signed number of seconds.
    ///
    /// Whole weeks collapse to the week form; anything else is split into
    /// days, hours, minutes and seconds.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "Each component is reduced modulo its unit before narrowing"
    )]
    pub fn from_seconds(total: i64) -> Self {
        let negative = total < 0;
        let magnitude = total.unsigned_abs();
        let unit = |secs: i64| secs.unsigned_abs();

        if magnitude != 0 && magnitude % unit(WEEK) == 0 {
            return Self {
                negative,
                weeks: (magnitude / unit(WEEK)).min(u64::from(u32::MAX)) as u32,
                ..Self::zero()
            };
        }

        Self {
            negative: negative && magnitude != 0,
            weeks: 0,
            days: (magnitude / unit(DAY)).min(u64::from(u32::MAX)) as u32,
            hours: ((magnitude % unit(DAY)) / unit(HOUR)) as u32,
            minutes: ((magnitude % unit(HOUR)) / unit(MINUTE)) as u32,
            seconds: (magnitude % unit(MINUTE)) as u32,
        }
    }

    /// Returns whether the duration carries any time-of-day component.
    #[must_use]
    pub const fn has_time(&self) -> bool {
        self.hours > 0 || self.minutes > 0 || self.seconds > 0
    }

    /// Negates this duration.
    #[must_use]
    pub const fn negate(mut self) -> Self {
        self.negative = !self.negative;
        self
    }

    /// Returns the same duration without its sign.
    #[must_use]
    pub const fn unsigned(mut self) -> Self {
        self.negative = false;
        self
    }

    /// Returns the total duration as seconds.
    #[must_use]
    pub const fn as_seconds(&self) -> i64 {
        let total = (self.weeks as i64 * WEEK)
            + (self.days as i64 * DAY)
            + (self.hours as i64 * HOUR)
            + (self.minutes as i64 * MINUTE)
            + (self.seconds as i64);

        if self.negative { -total } else { total }
    }

    /// Returns the duration as a `chrono::TimeDelta`, or `None` if it is out
    /// of range.
    #[must_use]
    pub fn to_delta(&self) -> Option<chrono::TimeDelta> {
        chrono::TimeDelta::try_seconds(self.as_seconds())
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-")?;
        }
        write!(f, "P")?;

        if self.weeks > 0 {
            return write!(f, "{}W", self.weeks);
        }
        if self.days > 0 {
            write!(f, "{}D", self.days)?;
        }
        if self.has_time() {
            write!(f, "T")?;
            if self.hours > 0 {
                write!(f, "{}H", self.hours)?;
            }
            if self.minutes > 0 {
                write!(f, "{}M", self.minutes)?;
            }
            if self.seconds > 0 {
                write!(f, "{}S", self.seconds)?;
            }
        } else if self.days == 0 {
            write!(f, "0D")?;
        } else {
            // days only, already written
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn duration_display_weeks() {
        assert_eq!(Duration::weeks(2).to_string(), "P2W");
    }

    #[test_log::test]
    fn duration_display_days_time() {
        let d = Duration {
            days: 1,
            hours: 2,
            minutes: 30,
            ..Duration::zero()
        };
        assert_eq!(d.to_string(), "P1DT2H30M");
    }

    #[test_log::test]
    fn duration_display_negative_and_zero() {
        assert_eq!(Duration::minutes(15).negate().to_string(), "-PT15M");
        assert_eq!(Duration::zero().to_string(), "P0D");
    }

    #[test_log::test]
    fn from_seconds_prefers_weeks_when_exact() {
        assert_eq!(Duration::from_seconds(14 * DAY).to_string(), "P2W");
        assert_eq!(Duration::from_seconds(8 * DAY + HOUR).to_string(), "P8DT1H");
        assert_eq!(Duration::from_seconds(-15 * MINUTE).to_string(), "-PT15M");
        assert_eq!(Duration::from_seconds(0).to_string(), "P0D");
    }

    #[test_log::test]
    fn to_delta_spans_the_largest_durations() {
        let delta = Duration::days(2).to_delta();
        assert_eq!(delta, Some(chrono::TimeDelta::days(2)));
        let huge = Duration {
            weeks: u32::MAX,
            ..Duration::zero()
        };
        assert_eq!(
            huge.to_delta().map(|d| d.num_weeks()),
            Some(i64::from(u32::MAX))
        );
    }

    #[test_log::test]
    fn as_seconds_round_trips() {
        for secs in [0, 59, HOUR + 1, DAY + 90, 3 * WEEK, -DAY] {
            assert_eq!(Duration::from_seconds(secs).as_seconds(), secs);
        }
    }
}
