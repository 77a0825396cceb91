//! Event structure carried through the bus.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::EventResult;

const ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ID_SUFFIX_LEN: usize = 8;

/// A generic event that can carry any JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Time-sortable, random-suffixed identifier
    pub id: String,
    /// Dotted event type, e.g. `email.received`
    #[serde(rename = "type")]
    pub event_type: String,
    /// Where the event originated
    #[serde(default)]
    pub source: String,
    /// Event payload
    #[serde(default)]
    pub data: serde_json::Value,
    /// Free-form string metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Higher is more important
    #[serde(default)]
    pub priority: i32,
}

impl Event {
    /// Create a new event with the given type and payload.
    #[must_use]
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: generate_event_id(),
            event_type: event_type.into(),
            source: String::new(),
            data,
            metadata: HashMap::new(),
            timestamp: Utc::now(),
            priority: 0,
        }
    }

    /// Create an event from any serializable payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized to JSON.
    pub fn from_payload<T: Serialize>(event_type: impl Into<String>, payload: &T) -> EventResult<Self> {
        Ok(Self::new(event_type, serde_json::to_value(payload)?))
    }

    /// Set the event source.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Set the event priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Convert the payload into a concrete type through JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload does not match `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> EventResult<T> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

/// `YYYYMMDDhhmmss.ffffff` followed by a random lowercase alphanumeric suffix.
fn generate_event_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| char::from(ID_CHARSET[rng.gen_range(0..ID_CHARSET.len())]))
        .collect();
    format!("{}{suffix}", Utc::now().format("%Y%m%d%H%M%S%.6f"))
}
