//! Conversion between JSCalendar event objects and iCalendar components.
//!
//! - `api`: public entry points (tree and string based)
//! - `event`: the event assembler (read and write) and the override engine
//! - `props`: leaf converters for individual event fields
//! - `context`, `fields`, `xparam`, `patch`, `time`: shared plumbing

pub mod api;
pub mod context;
pub mod error;
pub mod event;
pub mod fields;
pub mod patch;
pub mod props;
pub mod time;
pub mod xparam;

pub use api::{
    ConvertOptions, EventObject, event_from_json_str, event_to_json_string, to_component,
    to_event_object,
};
pub use error::{ConvertError, ConvertResult};
pub use fields::{EventField, WantedFields};
