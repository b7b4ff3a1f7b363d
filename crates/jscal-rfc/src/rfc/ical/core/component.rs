//! iCalendar component types (RFC 5545 §3.4-3.6).

use std::fmt;

use super::{Property, prop};

/// Component kind for iCalendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// VCALENDAR wrapper component.
    Calendar,
    /// VEVENT component.
    Event,
    /// VTODO component.
    Todo,
    /// VTIMEZONE component.
    Timezone,
    /// VALARM component (nested within VEVENT/VTODO).
    Alarm,
    /// Unknown/X-component.
    Unknown,
}

impl ComponentKind {
    /// Returns the string name for this component kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Calendar => "VCALENDAR",
            Self::Event => "VEVENT",
            Self::Todo => "VTODO",
            Self::Timezone => "VTIMEZONE",
            Self::Alarm => "VALARM",
            Self::Unknown => "X-UNKNOWN",
        }
    }

    /// Parses a component kind from a string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "VCALENDAR" => Self::Calendar,
            "VEVENT" => Self::Event,
            "VTODO" => Self::Todo,
            "VTIMEZONE" => Self::Timezone,
            "VALARM" => Self::Alarm,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An iCalendar component.
///
/// A VCALENDAR holds VEVENTs (the master occurrence and any per-instance
/// exceptions), which in turn may hold VALARMs.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Component type.
    pub kind: ComponentKind,
    /// Original component name (preserved for X-components).
    pub name: String,
    /// Properties in order of appearance.
    pub properties: Vec<Property>,
    /// Nested sub-components.
    pub children: Vec<Component>,
}

impl Component {
    /// Creates a new component with the given kind.
    #[must_use]
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            name: kind.as_str().to_string(),
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Creates a component with a custom name (for X-components).
    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        let name = name.into().to_ascii_uppercase();
        Self {
            kind: ComponentKind::parse(&name),
            name,
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Creates a VCALENDAR component.
    #[must_use]
    pub fn calendar() -> Self {
        Self::new(ComponentKind::Calendar)
    }

    /// Creates a VEVENT component.
    #[must_use]
    pub fn event() -> Self {
        Self::new(ComponentKind::Event)
    }

    /// Creates a VALARM component.
    #[must_use]
    pub fn alarm() -> Self {
        Self::new(ComponentKind::Alarm)
    }

    /// Adds a property to this component.
    pub fn add_property(&mut self, prop: Property) {
        self.properties.push(prop);
    }

    /// Replaces all properties named like `prop` with `prop`.
    pub fn set_property(&mut self, prop: Property) {
        self.remove_properties(&prop.name);
        self.properties.push(prop);
    }

    /// Adds a child component.
    pub fn add_child(&mut self, child: Component) {
        self.children.push(child);
    }

    /// Returns the first property with the given name.
    #[must_use]
    pub fn get_property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.is(name))
    }

    /// Returns the first property with the given name, mutably.
    pub fn get_property_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.is(name))
    }

    /// Returns all properties with the given name.
    #[must_use]
    pub fn get_properties(&self, name: &str) -> Vec<&Property> {
        self.properties.iter().filter(|p| p.is(name)).collect()
    }

    /// Removes all properties with the given name, returning how many were removed.
    pub fn remove_properties(&mut self, name: &str) -> usize {
        let before = self.properties.len();
        self.properties.retain(|p| !p.is(name));
        before - self.properties.len()
    }

    /// Returns the UID property value if present.
    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.get_property(prop::UID)?.as_text()
    }

    /// Returns the SUMMARY property value if present.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.get_property(prop::SUMMARY)?.as_text()
    }

    /// Returns whether this component is a per-instance exception.
    #[must_use]
    pub fn is_exception(&self) -> bool {
        self.get_property(prop::RECURRENCE_ID).is_some()
    }

    /// Returns children of a specific kind.
    #[must_use]
    pub fn children_of_kind(&self, kind: ComponentKind) -> Vec<&Component> {
        self.children.iter().filter(|c| c.kind == kind).collect()
    }

    /// Returns all VEVENT children.
    #[must_use]
    pub fn events(&self) -> Vec<&Component> {
        self.children_of_kind(ComponentKind::Event)
    }

    /// Returns all VALARM children.
    #[must_use]
    pub fn alarms(&self) -> Vec<&Component> {
        self.children_of_kind(ComponentKind::Alarm)
    }

    /// Removes all children of a kind, returning them in order.
    pub fn take_children(&mut self, kind: ComponentKind) -> Vec<Component> {
        let (taken, kept) = std::mem::take(&mut self.children)
            .into_iter()
            .partition(|c| c.kind == kind);
        self.children = kept;
        taken
    }
}

/// Renders the component as unfolded `BEGIN`/`END` delimited content lines.
impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BEGIN:{}\r\n", self.name)?;
        for prop in &self.properties {
            write!(f, "{prop}\r\n")?;
        }
        for child in &self.children {
            write!(f, "{child}")?;
        }
        write!(f, "END:{}\r\n", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn component_kind_parse() {
        assert_eq!(ComponentKind::parse("VEVENT"), ComponentKind::Event);
        assert_eq!(ComponentKind::parse("valarm"), ComponentKind::Alarm);
        assert_eq!(ComponentKind::parse("X-CUSTOM"), ComponentKind::Unknown);
    }

    #[test_log::test]
    fn component_properties() {
        let mut event = Component::event();
        event.add_property(Property::text("UID", "test-uid-123"));
        event.add_property(Property::text("SUMMARY", "Test Event"));
        event.set_property(Property::text("summary", "Renamed"));

        assert_eq!(event.uid(), Some("test-uid-123"));
        assert_eq!(event.summary(), Some("Renamed"));
        assert_eq!(event.get_properties("SUMMARY").len(), 1);
        assert!(!event.is_exception());
    }

    #[test_log::test]
    fn take_children_keeps_other_kinds() {
        let mut calendar = Component::calendar();
        calendar.add_child(Component::event());
        calendar.add_child(Component::custom("X-THING"));
        calendar.add_child(Component::event());

        let events = calendar.take_children(ComponentKind::Event);
        assert_eq!(events.len(), 2);
        assert_eq!(calendar.children.len(), 1);
        assert_eq!(calendar.children[0].name, "X-THING");
    }

    #[test_log::test]
    fn component_renders_content_lines() {
        let mut event = Component::event();
        event.add_property(Property::text("SUMMARY", "Lunch; then coffee"));
        let mut alarm = Component::alarm();
        alarm.add_property(Property::text("ACTION", "DISPLAY"));
        event.add_child(alarm);

        assert_eq!(
            event.to_string(),
            "BEGIN:VEVENT\r\nSUMMARY:Lunch\\; then coffee\r\nBEGIN:VALARM\r\nACTION:DISPLAY\r\nEND:VALARM\r\nEND:VEVENT\r\n"
        );
    }
}
