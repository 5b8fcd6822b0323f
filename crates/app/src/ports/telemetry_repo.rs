//! Telemetry storage port — the topic registry and point time series.

use std::future::Future;

use rainhub_domain::error::RainHubError;
use rainhub_domain::id::TopicId;
use rainhub_domain::telemetry::{NewPoint, TelemetryPoint, ValueRelation};
use rainhub_domain::time::Timestamp;

/// Repository owning topics and their flattened point generations.
pub trait TelemetryRepository {
    /// Insert the topic if absent and return its id.
    fn upsert_topic(&self, name: &str)
    -> impl Future<Output = Result<TopicId, RainHubError>> + Send;

    /// Resolve a topic id back to its channel name.
    fn topic_name(
        &self,
        id: TopicId,
    ) -> impl Future<Output = Result<Option<String>, RainHubError>> + Send;

    /// Replace the topic's latest generation with the given batches.
    ///
    /// Runs as one atomic transaction. Each batch clears the `is_latest`
    /// marker for the topic and inserts its points as the new latest
    /// generation, so only the final batch remains marked. Parent indices
    /// inside a batch are resolved to the row ids assigned to earlier
    /// inserts of the same batch.
    fn replace_latest(
        &self,
        topic_id: TopicId,
        generations: Vec<Vec<NewPoint>>,
    ) -> impl Future<Output = Result<(), RainHubError>> + Send;

    /// Current scalar value of a root-level key, if any.
    fn latest_value(
        &self,
        topic_id: TopicId,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>, RainHubError>> + Send;

    /// Points of a key matching a value relation, most recent first.
    fn history(
        &self,
        topic_id: TopicId,
        name: &str,
        relation: ValueRelation,
        value: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<TelemetryPoint>, RainHubError>> + Send;

    /// Points of a key inside a time window, oldest first.
    fn points_between(
        &self,
        topic_id: TopicId,
        name: &str,
        from: Timestamp,
        to: Timestamp,
    ) -> impl Future<Output = Result<Vec<TelemetryPoint>, RainHubError>> + Send;
}

impl<T: TelemetryRepository + Send + Sync> TelemetryRepository for std::sync::Arc<T> {
    fn upsert_topic(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<TopicId, RainHubError>> + Send {
        (**self).upsert_topic(name)
    }

    fn topic_name(
        &self,
        id: TopicId,
    ) -> impl Future<Output = Result<Option<String>, RainHubError>> + Send {
        (**self).topic_name(id)
    }

    fn replace_latest(
        &self,
        topic_id: TopicId,
        generations: Vec<Vec<NewPoint>>,
    ) -> impl Future<Output = Result<(), RainHubError>> + Send {
        (**self).replace_latest(topic_id, generations)
    }

    fn latest_value(
        &self,
        topic_id: TopicId,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>, RainHubError>> + Send {
        (**self).latest_value(topic_id, name)
    }

    fn history(
        &self,
        topic_id: TopicId,
        name: &str,
        relation: ValueRelation,
        value: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<TelemetryPoint>, RainHubError>> + Send {
        (**self).history(topic_id, name, relation, value, limit)
    }

    fn points_between(
        &self,
        topic_id: TopicId,
        name: &str,
        from: Timestamp,
        to: Timestamp,
    ) -> impl Future<Output = Result<Vec<TelemetryPoint>, RainHubError>> + Send {
        (**self).points_between(topic_id, name, from, to)
    }
}
