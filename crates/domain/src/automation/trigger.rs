//! Trigger — what fires an automation.

use serde::{Deserialize, Serialize};

use crate::id::TopicId;
use crate::solar::SolarPosition;
use crate::telemetry::ValueRelation;

/// Describes when an automation activates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Fires once per day at a wall-clock time (`HH:MM`).
    Time { at: String },
    /// Fires at a named solar event.
    Sun { position: SolarPosition },
    /// Fires when a message arrives on a topic.
    ///
    /// An empty `key` matches every message on the topic; otherwise the
    /// payload field named `key` must equal `value`.
    Topic {
        topic_id: TopicId,
        key: String,
        value: String,
    },
    /// Fires only when run manually through the surrounding API.
    User,
}

impl Trigger {
    /// The scheduler registry key for time and sun triggers.
    #[must_use]
    pub fn schedule_key(&self) -> Option<String> {
        match self {
            Self::Time { at } => Some(at.clone()),
            Self::Sun { position } => Some(position.to_string()),
            Self::Topic { .. } | Self::User => None,
        }
    }

    /// Whether a topic trigger matches an inbound payload.
    ///
    /// Equality is numeric when both sides parse as numbers, string
    /// equality otherwise. Non-topic triggers never match payloads.
    #[must_use]
    pub fn matches_payload(&self, payload: &serde_json::Map<String, serde_json::Value>) -> bool {
        let Self::Topic { key, value, .. } = self else {
            return false;
        };
        if key.is_empty() || value.is_empty() {
            return true;
        }
        payload
            .get(key)
            .is_some_and(|field| ValueRelation::Equal.matches(&scalar_text(field), value))
    }
}

/// Text form of a payload scalar, mirroring how points are stored.
fn scalar_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Bool(true) => "1".to_string(),
        serde_json::Value::Bool(false) => "0".to_string(),
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Time { at } => write!(f, "time({at})"),
            Self::Sun { position } => write!(f, "sun({position})"),
            Self::Topic { topic_id, key, .. } => write!(f, "topic({topic_id}, {key})"),
            Self::User => f.write_str("user"),
        }
    }
}
