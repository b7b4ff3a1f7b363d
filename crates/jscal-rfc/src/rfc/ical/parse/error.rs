//! iCalendar value parsing error types.

use std::fmt;

/// Result type for value parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Error type for value parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Kind of error.
    pub kind: ParseErrorKind,
    /// The offending input.
    pub input: String,
}

impl ParseError {
    /// Creates a new parse error for `input`.
    #[must_use]
    pub fn new(kind: ParseErrorKind, input: impl Into<String>) -> Self {
        Self {
            kind,
            input: input.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?}", self.kind, self.input)
    }
}

impl std::error::Error for ParseError {}

/// Kinds of parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Invalid date format.
    InvalidDate,
    /// Invalid date-time format.
    InvalidDateTime,
    /// Invalid duration format.
    InvalidDuration,
    /// Invalid period format.
    InvalidPeriod,
    /// Invalid recurrence rule.
    InvalidRRule,
    /// Invalid frequency value.
    InvalidFrequency,
    /// Invalid weekday value.
    InvalidWeekday,
    /// Both UNTIL and COUNT in one rule.
    UntilCountConflict,
    /// Invalid boolean value.
    InvalidBoolean,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::InvalidDate => "invalid date",
            Self::InvalidDateTime => "invalid date-time",
            Self::InvalidDuration => "invalid duration",
            Self::InvalidPeriod => "invalid period",
            Self::InvalidRRule => "invalid recurrence rule",
            Self::InvalidFrequency => "invalid frequency",
            Self::InvalidWeekday => "invalid weekday",
            Self::UntilCountConflict => "UNTIL and COUNT are mutually exclusive",
            Self::InvalidBoolean => "invalid boolean",
        };
        f.write_str(msg)
    }
}
