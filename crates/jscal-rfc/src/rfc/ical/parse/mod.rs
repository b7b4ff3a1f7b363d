//! Parsers for individual iCalendar property values.

mod error;
mod values;

pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use values::{
    parse_boolean, parse_date, parse_datetime, parse_duration, parse_period, parse_rrule,
};
