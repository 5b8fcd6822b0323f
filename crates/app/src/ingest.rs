//! Telemetry ingestion with payload deduplication.
//!
//! Devices republish their full state on a timer, so most messages are
//! byte-identical to the previous one. Instead of writing every copy we
//! keep the last payload per topic in memory and count repeats. When the
//! payload finally changes, the last repeated copy is flushed with its
//! original timestamp so the history keeps the duration of the stable
//! window, then the new payload is written.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::debug;

use rainhub_domain::error::{RainHubError, ValidationError};
use rainhub_domain::id::TopicId;
use rainhub_domain::telemetry::{NewPoint, flatten};
use rainhub_domain::time::{self, Timestamp};

use crate::ports::TelemetryRepository;

struct CacheEntry {
    payload: Map<String, Value>,
    raw: String,
    repeat_count: u32,
    last_seen: Timestamp,
}

/// Ingests raw bus payloads into the telemetry store.
pub struct IngestService<T> {
    telemetry: T,
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl<T: TelemetryRepository> IngestService<T> {
    pub fn new(telemetry: T) -> Self {
        Self {
            telemetry,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Handle one inbound message and return the id of its topic.
    ///
    /// Non-object payloads are rejected; repeated payloads only bump the
    /// in-memory counter and never write any points.
    pub async fn ingest(&self, topic: &str, payload: &str) -> Result<TopicId, RainHubError> {
        let value: Value = serde_json::from_str(payload).map_err(RainHubError::Parse)?;
        let Value::Object(object) = value else {
            return Err(ValidationError::PayloadNotObject.into());
        };
        let now = time::now();

        let topic_id = self.telemetry.upsert_topic(topic).await?;
        let generations = match self.absorb(topic, object, payload, now) {
            Absorbed::Repeat => {
                debug!(topic, "repeated payload, skipping write");
                return Ok(topic_id);
            }
            Absorbed::Changed(generations) => generations,
        };

        self.telemetry.replace_latest(topic_id, generations).await?;
        Ok(topic_id)
    }

    /// Update the cache and decide what to write. Runs entirely under the
    /// cache lock; no I/O in here.
    fn absorb(
        &self,
        topic: &str,
        object: Map<String, Value>,
        raw: &str,
        now: Timestamp,
    ) -> Absorbed {
        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let mut generations = Vec::with_capacity(2);
        if let Some(entry) = cache.get_mut(topic) {
            if entry.raw == raw {
                entry.repeat_count += 1;
                entry.last_seen = now;
                return Absorbed::Repeat;
            }
            if entry.repeat_count > 1 {
                // close the stable window at the moment of its last repeat
                generations.push(flatten(&entry.payload, entry.last_seen));
            }
        }
        generations.push(flatten(&object, now));
        cache.insert(
            topic.to_string(),
            CacheEntry {
                payload: object,
                raw: raw.to_string(),
                repeat_count: 1,
                last_seen: now,
            },
        );
        Absorbed::Changed(generations)
    }
}

enum Absorbed {
    Repeat,
    Changed(Vec<Vec<NewPoint>>),
}
