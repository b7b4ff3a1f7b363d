//! Per-conversion state.
//!
//! A `Context` lives for exactly one conversion call. It tracks the JSON
//! pointer of the field being converted, collects the pointers of invalid
//! fields into a caller-owned sink, and carries scratch state shared between
//! the leaf converters (timezones, UID, the requested-fields filter).

use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};

use chrono::{NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;
use jscal_rfc::rfc::ical::expand::TimeZoneResolver;

use crate::fields::{EventField, WantedFields};

/// Direction of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Component to event object.
    Read,
    /// Event object to a new component.
    Create,
    /// Event object applied to an existing component.
    Update,
}

/// Escapes a key for use as a JSON pointer segment (RFC 6901).
#[must_use]
pub fn encode_pointer(segment: &str) -> String {
    if segment.contains(['~', '/']) {
        segment.replace('~', "~0").replace('/', "~1")
    } else {
        segment.to_string()
    }
}

/// Reverses [`encode_pointer`].
#[must_use]
pub fn decode_pointer(segment: &str) -> String {
    if segment.contains('~') {
        segment.replace("~1", "/").replace("~0", "~")
    } else {
        segment.to_string()
    }
}

pub struct Context<'s> {
    invalid: &'s mut BTreeSet<String>,
    path: Vec<String>,
    wanted: Option<WantedFields>,
    mode: Mode,
    exception: bool,
    pub(crate) resolver: TimeZoneResolver,
    /// Read: timezone identifier of DTSTART (`None` for floating and all-day).
    pub(crate) tzid_start: Option<String>,
    /// Write: whether the event being written is all-day.
    pub(crate) is_all_day: bool,
    /// Write: zone of the start (`None` for floating).
    pub(crate) tz_start: Option<Tz>,
    /// Write: zone of the end (`None` for floating).
    pub(crate) tz_end: Option<Tz>,
    /// Write: UID stamped on the master and every exception.
    pub(crate) uid: String,
    /// Write: PRODID used when a new calendar gets no `prodId`.
    pub(crate) product_id: String,
    /// Write: timestamp used for DTSTAMP and CREATED.
    pub(crate) now: NaiveDateTime,
}

impl<'s> Context<'s> {
    /// Creates a read-mode context.
    #[must_use]
    pub fn reader(invalid: &'s mut BTreeSet<String>, wanted: Option<WantedFields>) -> Self {
        Self::new(invalid, Mode::Read, wanted)
    }

    /// Creates a write-mode context for the event `uid`.
    #[must_use]
    pub fn writer(
        invalid: &'s mut BTreeSet<String>,
        mode: Mode,
        uid: impl Into<String>,
        product_id: impl Into<String>,
    ) -> Self {
        let mut ctx = Self::new(invalid, mode, None);
        ctx.uid = uid.into();
        ctx.product_id = product_id.into();
        ctx
    }

    fn new(invalid: &'s mut BTreeSet<String>, mode: Mode, wanted: Option<WantedFields>) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            invalid,
            path: Vec::new(),
            wanted,
            mode,
            exception: false,
            resolver: TimeZoneResolver::new(),
            tzid_start: None,
            is_all_day: false,
            tz_start: None,
            tz_end: None,
            uid: String::new(),
            product_id: String::new(),
            now: now.with_nanosecond(0).unwrap_or(now),
        }
    }

    /// ## Summary
    /// Creates the context for converting one per-instance exception.
    ///
    /// The child shares this context's invalid sink and uses the current
    /// path as its prefix, so failures inside the exception are reported
    /// below `recurrenceOverrides/<recurrence-id>`.
    pub fn exception(&mut self) -> Context<'_> {
        Context {
            invalid: &mut *self.invalid,
            path: self.path.clone(),
            wanted: None,
            mode: self.mode,
            exception: true,
            resolver: TimeZoneResolver::new(),
            tzid_start: None,
            is_all_day: false,
            tz_start: None,
            tz_end: None,
            uid: self.uid.clone(),
            product_id: self.product_id.clone(),
            now: self.now,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub const fn is_create(&self) -> bool {
        matches!(self.mode, Mode::Create)
    }

    #[must_use]
    pub const fn is_exception(&self) -> bool {
        self.exception
    }

    /// Returns whether the caller asked for `field`.
    #[must_use]
    pub fn wants(&self, field: EventField) -> bool {
        self.wanted.as_ref().is_none_or(|w| w.contains(field))
    }

    /// Returns the requested-fields filter, if any.
    #[must_use]
    pub const fn wanted(&self) -> Option<&WantedFields> {
        self.wanted.as_ref()
    }

    /// Removes the requested-fields filter, returning it.
    pub fn suspend_filter(&mut self) -> Option<WantedFields> {
        self.wanted.take()
    }

    /// Pushes a path segment; the returned guard pops it when dropped.
    pub fn enter(&mut self, name: &str) -> PathGuard<'_, 's> {
        self.path.push(encode_pointer(name));
        PathGuard { ctx: self }
    }

    /// Pushes `name/key` as a single path entry.
    pub fn enter_key(&mut self, name: &str, key: &str) -> PathGuard<'_, 's> {
        self.path
            .push(format!("{}/{}", encode_pointer(name), encode_pointer(key)));
        PathGuard { ctx: self }
    }

    /// Pushes `name/index` as a single path entry.
    pub fn enter_index(&mut self, name: &str, index: usize) -> PathGuard<'_, 's> {
        self.path.push(format!("{}/{index}", encode_pointer(name)));
        PathGuard { ctx: self }
    }

    /// Returns the JSON pointer of `name` below the current path.
    #[must_use]
    pub fn pointer(&self, name: Option<&str>) -> String {
        let mut segments: Vec<String> = self.path.clone();
        if let Some(name) = name {
            segments.push(encode_pointer(name));
        }
        segments.join("/")
    }

    /// Reports the field `name` below the current path as invalid.
    pub fn invalid(&mut self, name: &str) {
        let pointer = self.pointer(Some(name));
        self.record(pointer);
    }

    /// Reports the current path itself as invalid.
    pub fn invalid_here(&mut self) {
        let pointer = self.pointer(None);
        self.record(pointer);
    }

    fn record(&mut self, pointer: String) {
        if pointer.is_empty() {
            return;
        }
        tracing::debug!(path = %pointer, "Invalid property");
        self.invalid.insert(pointer);
    }

    /// Returns how many invalid paths have been collected so far.
    #[must_use]
    pub fn invalid_count(&self) -> usize {
        self.invalid.len()
    }
}

/// Scoped path entry; pops its segment exactly once when dropped.
pub struct PathGuard<'a, 's> {
    ctx: &'a mut Context<'s>,
}

impl<'s> Deref for PathGuard<'_, 's> {
    type Target = Context<'s>;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl DerefMut for PathGuard<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl Drop for PathGuard<'_, '_> {
    fn drop(&mut self) {
        self.ctx.path.pop();
    }
}
