//! iCalendar (RFC 5545) component model.
//!
//! - `core`: component, property, parameter and value types
//! - `parse`: parsers for individual property values
//! - `build`: text escaping used when rendering content lines
//! - `expand`: timezone resolution and local/UTC conversion
//!
//! Reading and writing whole calendar documents is left to callers; this
//! module only deals with already-parsed component trees.

pub mod build;
pub mod core;
pub mod expand;
pub mod parse;

pub use core::{Component, ComponentKind, Parameter, Property, Value};
