//! Top-level event fields and the requested-fields filter.

use std::collections::BTreeSet;
use std::fmt;

/// A top-level field of an event object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventField {
    Type,
    Uid,
    RelatedTo,
    ProdId,
    Created,
    Updated,
    Sequence,
    Priority,
    Title,
    Description,
    HtmlDescription,
    Color,
    Keywords,
    Links,
    Locale,
    Locations,
    IsAllDay,
    Start,
    TimeZone,
    Duration,
    RecurrenceRule,
    RecurrenceOverrides,
    Status,
    FreeBusyStatus,
    Privacy,
    ReplyTo,
    Participants,
    UseDefaultAlerts,
    Alerts,
}

impl EventField {
    /// Every field, in the order the assembler reads them.
    pub const ALL: [Self; 29] = [
        Self::Type,
        Self::Uid,
        Self::RelatedTo,
        Self::ProdId,
        Self::Created,
        Self::Updated,
        Self::Sequence,
        Self::Priority,
        Self::Title,
        Self::Description,
        Self::HtmlDescription,
        Self::Color,
        Self::Keywords,
        Self::Links,
        Self::Locale,
        Self::Locations,
        Self::IsAllDay,
        Self::Start,
        Self::TimeZone,
        Self::Duration,
        Self::RecurrenceRule,
        Self::RecurrenceOverrides,
        Self::Status,
        Self::FreeBusyStatus,
        Self::Privacy,
        Self::ReplyTo,
        Self::Participants,
        Self::UseDefaultAlerts,
        Self::Alerts,
    ];

    /// Returns the JSON key of this field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Type => "@type",
            Self::Uid => "uid",
            Self::RelatedTo => "relatedTo",
            Self::ProdId => "prodId",
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Sequence => "sequence",
            Self::Priority => "priority",
            Self::Title => "title",
            Self::Description => "description",
            Self::HtmlDescription => "htmlDescription",
            Self::Color => "color",
            Self::Keywords => "keywords",
            Self::Links => "links",
            Self::Locale => "locale",
            Self::Locations => "locations",
            Self::IsAllDay => "isAllDay",
            Self::Start => "start",
            Self::TimeZone => "timeZone",
            Self::Duration => "duration",
            Self::RecurrenceRule => "recurrenceRule",
            Self::RecurrenceOverrides => "recurrenceOverrides",
            Self::Status => "status",
            Self::FreeBusyStatus => "freeBusyStatus",
            Self::Privacy => "privacy",
            Self::ReplyTo => "replyTo",
            Self::Participants => "participants",
            Self::UseDefaultAlerts => "useDefaultAlerts",
            Self::Alerts => "alerts",
        }
    }

    /// Looks up a field by its JSON key (case-sensitive).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    /// Returns whether this field only exists on the master event.
    ///
    /// Per-instance exceptions never carry these, and override patches
    /// touching them are ignored.
    #[must_use]
    pub const fn is_master_only(self) -> bool {
        matches!(
            self,
            Self::Uid
                | Self::RelatedTo
                | Self::ProdId
                | Self::IsAllDay
                | Self::RecurrenceRule
                | Self::RecurrenceOverrides
                | Self::ReplyTo
        )
    }
}

impl fmt::Display for EventField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of fields a caller asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WantedFields(BTreeSet<EventField>);

impl WantedFields {
    /// Builds a filter from JSON keys. Unknown keys are ignored.
    #[must_use]
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut fields = BTreeSet::new();
        for name in names {
            match EventField::parse(name) {
                Some(field) => {
                    fields.insert(field);
                }
                None => tracing::debug!(field = %name, "Ignoring unknown requested field"),
            }
        }
        Self(fields)
    }

    #[must_use]
    pub fn contains(&self, field: EventField) -> bool {
        self.0.contains(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = EventField> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<EventField> for WantedFields {
    fn from_iter<T: IntoIterator<Item = EventField>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
