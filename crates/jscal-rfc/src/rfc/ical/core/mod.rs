//! iCalendar core models (RFC 5545).
//!
//! Component trees are plain owned values: cloning a component deep-copies
//! its properties and children, so a clone can be mutated freely without
//! touching the source tree.

mod component;
mod datetime;
mod duration;
mod parameter;
mod property;
mod rrule;
mod value;

pub use component::{Component, ComponentKind};
pub use datetime::{Date, DateTime, DateTimeForm};
pub use duration::Duration;
pub use parameter::{Parameter, TriggerRelated};
pub use property::Property;
pub use rrule::{Frequency, MonthNum, RRule, RRuleUntil, Skip, Weekday, WeekdayNum};
pub use value::{Period, Value};

/// Well-known parameter names.
pub use parameter::names as param;
/// Well-known property names.
pub use property::names as prop;
