//! Timezone resolution and local/UTC conversion for iCalendar date-times.
//!
//! Uses ICU4X for Windows timezone ID to IANA mapping and timezone canonicalization.

use chrono::{LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use icu::time::zone::WindowsParser;
use icu::time::zone::iana::IanaParserExtended;
use std::collections::HashMap;
use std::str::FromStr;

use crate::rfc::ical::core::{DateTime, DateTimeForm};

/// Error during timezone resolution.
#[derive(Debug, thiserror::Error)]
pub enum TimezoneError {
    /// Unknown or invalid timezone identifier.
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// Resolver for timezone identifiers.
///
/// Memoizes resolved zones by the identifier as written, so repeated TZIDs
/// within one conversion only go through normalization once.
#[derive(Debug, Default)]
pub struct TimeZoneResolver {
    cache: HashMap<String, Tz>,
}

impl TimeZoneResolver {
    /// Creates a new timezone resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// Resolves a timezone identifier to a `chrono_tz::Tz`.
    ///
    /// `UTC` and `Etc/UTC` always resolve to the UTC zone. Windows zone names,
    /// vendor-prefixed identifiers and IANA aliases are normalized first.
    ///
    /// ## Errors
    ///
    /// Returns `TimezoneError::UnknownTimezone` if the TZID cannot be resolved.
    pub fn resolve(&mut self, tzid: &str) -> Result<Tz, TimezoneError> {
        if let Some(tz) = self.cache.get(tzid) {
            return Ok(*tz);
        }

        let tz = if is_utc_alias(tzid) {
            Tz::UTC
        } else {
            let normalized = normalize_tzid(tzid);
            Tz::from_str(&normalized)
                .map_err(|_e| TimezoneError::UnknownTimezone(tzid.to_string()))?
        };

        tracing::trace!(tzid = %tzid, resolved = %tz.name(), "Resolved timezone");
        self.cache.insert(tzid.to_string(), tz);

        Ok(tz)
    }

    /// ## Summary
    /// Guesses the timezone identifier of a date-time that came without a
    /// TZID parameter.
    ///
    /// UTC values yield `"UTC"`; zoned values yield their own identifier if it
    /// resolves; floating values yield nothing.
    pub fn guess(&mut self, dt: &DateTime) -> Option<String> {
        match &dt.form {
            DateTimeForm::Utc => Some("UTC".to_string()),
            DateTimeForm::Zoned { tzid } => self.resolve(tzid).ok().map(|_| tzid.clone()),
            DateTimeForm::Floating => None,
        }
    }
}

fn is_utc_alias(tzid: &str) -> bool {
    tzid.eq_ignore_ascii_case("UTC") || tzid.eq_ignore_ascii_case("Etc/UTC")
}

/// Normalizes common CalDAV/iCalendar timezone identifiers to IANA names.
///
/// Many calendar clients use non-standard TZID values (Windows names,
/// vendor prefixes, retired aliases) that need to be mapped to standard
/// IANA timezone names.
#[must_use]
pub fn normalize_tzid(tzid: &str) -> String {
    let stripped = tzid
        .strip_prefix("/mozilla.org/")
        .or_else(|| tzid.strip_prefix("/softwarestudio.org/"))
        .or_else(|| tzid.strip_prefix("/citadel.org/"))
        .unwrap_or(tzid);
    // Some clients append an Olson version suffix, e.g. "20070129_1/Europe/Paris".
    let stripped = stripped
        .split_once('/')
        .filter(|(head, _)| head.bytes().next().is_some_and(|b| b.is_ascii_digit()))
        .map_or(stripped, |(_, tail)| tail);

    let iana_parser = IanaParserExtended::new();

    if let Some(tz) = WindowsParser::new().parse(stripped, None) {
        for entry in iana_parser.iter() {
            if entry.time_zone == tz {
                return entry.canonical.to_string();
            }
        }
    }

    let parsed = iana_parser.parse(stripped);
    if parsed.time_zone != icu::time::TimeZone::UNKNOWN {
        return parsed.canonical.to_string();
    }

    stripped.to_string()
}

/// ## Summary
/// Attaches a zone to a wall-clock reading.
///
/// A reading inside a DST fold takes the earlier instant; a reading inside a
/// DST gap is shifted forward by one hour.
#[must_use]
pub fn localize(local: NaiveDateTime, tz: Tz) -> chrono::DateTime<Tz> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt,
        LocalResult::None => {
            let shifted = local + chrono::TimeDelta::hours(1);
            match tz.from_local_datetime(&shifted) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt,
                LocalResult::None => tz.from_utc_datetime(&local),
            }
        }
    }
}
