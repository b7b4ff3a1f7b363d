//! The event assembler.
//!
//! `read` turns one VEVENT (plus its exceptions) into an event object,
//! `write` applies an event object to a VEVENT, and `overrides` maps
//! `recurrenceOverrides` to RDATE, EXDATE and exception VEVENTs.

pub mod overrides;
pub mod read;
pub mod write;

pub use read::event_from_ical;
pub use write::event_to_ical;
