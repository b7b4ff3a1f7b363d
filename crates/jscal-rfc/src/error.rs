use thiserror::Error;

use crate::rfc::ical::expand::TimezoneError;
use crate::rfc::ical::parse::ParseError;

/// Errors raised by the iCalendar model layer
#[derive(Error, Debug)]
pub enum RfcError {
    #[error(transparent)]
    ParseError(#[from] ParseError),

    #[error(transparent)]
    TimezoneError(#[from] TimezoneError),
}

pub type RfcResult<T> = std::result::Result<T, RfcError>;
