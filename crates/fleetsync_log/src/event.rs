//! Event records, type codes, and the ordered property map.

use std::fmt;

/// Numeric code classifying an audit event.
///
/// Codes group by the thousand: 1xxx framework lifecycle, 2xxx bundle
/// lifecycle, 3xxx deployment activity. Unknown codes round-trip through
/// storage and replication untouched, so fleets can carry site-specific
/// types without coordinating with this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventType(u32);

impl EventType {
    /// Device framework started.
    pub const FRAMEWORK_STARTED: EventType = EventType(1001);
    /// Device framework stopped.
    pub const FRAMEWORK_STOPPED: EventType = EventType(1002);
    /// A bundle was installed.
    pub const BUNDLE_INSTALLED: EventType = EventType(2001);
    /// A bundle was started.
    pub const BUNDLE_STARTED: EventType = EventType(2003);
    /// A bundle was stopped.
    pub const BUNDLE_STOPPED: EventType = EventType(2004);
    /// A bundle was updated in place.
    pub const BUNDLE_UPDATED: EventType = EventType(2006);
    /// A bundle was uninstalled.
    pub const BUNDLE_UNINSTALLED: EventType = EventType(2007);
    /// A deployment package installation began.
    pub const DEPLOYMENT_INSTALL: EventType = EventType(3001);
    /// A deployment package was uninstalled.
    pub const DEPLOYMENT_UNINSTALL: EventType = EventType(3002);
    /// A deployment package installation completed.
    pub const DEPLOYMENT_COMPLETE: EventType = EventType(3003);

    /// Wraps a raw type code.
    #[must_use]
    pub const fn new(code: u32) -> Self {
        Self(code)
    }

    /// The raw type code.
    #[must_use]
    pub const fn code(self) -> u32 {
        self.0
    }

    /// Human-readable name for the well-known codes.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::FRAMEWORK_STARTED => "framework-started",
            Self::FRAMEWORK_STOPPED => "framework-stopped",
            Self::BUNDLE_INSTALLED => "bundle-installed",
            Self::BUNDLE_STARTED => "bundle-started",
            Self::BUNDLE_STOPPED => "bundle-stopped",
            Self::BUNDLE_UPDATED => "bundle-updated",
            Self::BUNDLE_UNINSTALLED => "bundle-uninstalled",
            Self::DEPLOYMENT_INSTALL => "deployment-install",
            Self::DEPLOYMENT_UNINSTALL => "deployment-uninstall",
            Self::DEPLOYMENT_COMPLETE => "deployment-complete",
            _ => return None,
        })
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for EventType {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

/// Ordered string-to-string property map of an event.
///
/// Iteration order is insertion order — the line codec serializes
/// properties positionally, so the order must be defined and stable.
/// Inserting an existing key replaces its value in place, keeping the
/// original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventProperties {
    entries: Vec<(String, String)>,
}

impl EventProperties {
    /// Creates an empty property map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, for literal construction.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or replaces a property, preserving first-insertion position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Looks up a property value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EventProperties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Self::new();
        for (k, v) in iter {
            props.insert(k, v);
        }
        props
    }
}

/// One audit event in a log.
///
/// `event_id` is assigned by the owning store (strictly increasing per
/// `log_id`, never reused); replicated events keep the id their origin
/// assigned. `timestamp_ms` is wall-clock milliseconds since the Unix
/// epoch, stamped at `put` time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// Stream this event belongs to (one per device/subject).
    pub log_id: u64,
    /// Position in the stream, 1-based.
    pub event_id: u64,
    /// What happened.
    pub event_type: EventType,
    /// When it happened, Unix milliseconds.
    pub timestamp_ms: u64,
    /// Event details, ordered.
    pub properties: EventProperties,
}

impl LogEvent {
    /// Assembles an event from its parts.
    #[must_use]
    pub fn new(
        log_id: u64,
        event_id: u64,
        event_type: EventType,
        timestamp_ms: u64,
        properties: EventProperties,
    ) -> Self {
        Self {
            log_id,
            event_id,
            event_type,
            timestamp_ms,
            properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_codes() {
        assert_eq!(EventType::FRAMEWORK_STARTED.code(), 1001);
        assert_eq!(EventType::BUNDLE_INSTALLED.code(), 2001);
        assert_eq!(EventType::DEPLOYMENT_COMPLETE.code(), 3003);
        assert_eq!(EventType::new(9042), EventType::from(9042));
    }

    #[test]
    fn test_event_type_names() {
        assert_eq!(EventType::BUNDLE_STARTED.name(), Some("bundle-started"));
        assert_eq!(EventType::new(7777).name(), None);
    }

    #[test]
    fn test_properties_preserve_insertion_order() {
        let props = EventProperties::new()
            .with("zeta", "1")
            .with("alpha", "2")
            .with("mu", "3");
        let keys: Vec<&str> = props.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mu"]);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut props = EventProperties::new();
        props.insert("first", "a");
        props.insert("second", "b");
        props.insert("first", "updated");

        assert_eq!(props.get("first"), Some("updated"));
        assert_eq!(props.len(), 2);
        let keys: Vec<&str> = props.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["first", "second"]);
    }

    #[test]
    fn test_properties_from_iterator() {
        let props: EventProperties =
            [("a", "1"), ("b", "2"), ("a", "3")].into_iter().collect();
        assert_eq!(props.len(), 2);
        assert_eq!(props.get("a"), Some("3"));
    }
}
