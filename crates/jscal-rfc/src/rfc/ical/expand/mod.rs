//! Timezone resolution for iCalendar date-times.

mod timezone;

pub use timezone::{TimeZoneResolver, TimezoneError, localize, normalize_tzid};
