//! Timer lifecycle events.
//!
//! Events are ephemeral: the timer creates them, the bus consumes them,
//! nothing persists them. Payload values are restricted to primitives so
//! every event stays representable across the Lua boundary.

use std::fmt;

use chrono::{DateTime, Utc};

/// The lifecycle transition an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Started,
    Paused,
    Resumed,
    Completed,
    Stopped,
}

impl EventType {
    pub const ALL: [EventType; 5] = [
        EventType::Started,
        EventType::Paused,
        EventType::Resumed,
        EventType::Completed,
        EventType::Stopped,
    ];

    /// Wire name, as seen by plugin hooks.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Started => "timer_started",
            EventType::Paused => "timer_paused",
            EventType::Resumed => "timer_resumed",
            EventType::Completed => "timer_completed",
            EventType::Stopped => "timer_stopped",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A primitive payload value.
#[derive(Debug, Clone, PartialEq)]
pub enum EventValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for EventValue {
    fn from(v: &str) -> Self {
        EventValue::Str(v.to_string())
    }
}

impl From<String> for EventValue {
    fn from(v: String) -> Self {
        EventValue::Str(v)
    }
}

impl From<i64> for EventValue {
    fn from(v: i64) -> Self {
        EventValue::Int(v)
    }
}

impl From<u64> for EventValue {
    fn from(v: u64) -> Self {
        EventValue::Int(v as i64)
    }
}

impl From<f64> for EventValue {
    fn from(v: f64) -> Self {
        EventValue::Float(v)
    }
}

impl From<bool> for EventValue {
    fn from(v: bool) -> Self {
        EventValue::Bool(v)
    }
}

/// One lifecycle event with its insertion-ordered payload.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub data: Vec<(String, EventValue)>,
}

impl Event {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            data: Vec::new(),
        }
    }

    /// Append a payload field, preserving insertion order.
    pub fn with(mut self, key: &str, value: impl Into<EventValue>) -> Self {
        self.data.push((key.to_string(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&EventValue> {
        self.data.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_hook_registrations() {
        assert_eq!(EventType::Started.as_str(), "timer_started");
        assert_eq!(EventType::Completed.as_str(), "timer_completed");
        assert_eq!(EventType::ALL.len(), 5);
    }

    #[test]
    fn payload_preserves_insertion_order() {
        let event = Event::new(EventType::Started)
            .with("session_type", "work")
            .with("duration_secs", 1500u64);
        assert_eq!(event.data[0].0, "session_type");
        assert_eq!(event.data[1].0, "duration_secs");
        assert_eq!(event.get("duration_secs"), Some(&EventValue::Int(1500)));
        assert!(event.get("missing").is_none());
    }
}
