//! In-memory port implementations shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use rainhub_domain::automation::{Automation, Condition, Step, Trigger};
use rainhub_domain::error::RainHubError;
use rainhub_domain::id::{AutomationId, PointId, StepId, TopicId};
use rainhub_domain::telemetry::{NewPoint, TelemetryPoint, Topic, ValueRelation};
use rainhub_domain::time::Timestamp;

use crate::ports::{AutomationRepository, CommandPublisher, TelemetryRepository};

/// Telemetry store backed by plain vectors.
#[derive(Default)]
pub struct InMemoryTelemetry {
    topics: Mutex<Vec<Topic>>,
    points: Mutex<Vec<TelemetryPoint>>,
    next_point_id: AtomicI64,
}

impl InMemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a topic and return its id, without going through ingest.
    pub fn add_topic(&self, name: &str) -> TopicId {
        let mut topics = self.topics.lock().unwrap();
        if let Some(topic) = topics.iter().find(|t| t.name == name) {
            return topic.id;
        }
        let id = TopicId::new(topics.len() as i64 + 1);
        topics.push(Topic {
            id,
            name: name.to_string(),
        });
        id
    }

    /// Append one root-level scalar point marked latest, demoting the
    /// previous latest point of the same key.
    pub fn add_point(&self, topic_id: TopicId, name: &str, value: &str, created_at: Timestamp) {
        let mut points = self.points.lock().unwrap();
        for point in points.iter_mut() {
            if point.topic_id == topic_id {
                point.is_latest = false;
            }
        }
        let id = PointId::new(self.next_point_id.fetch_add(1, Ordering::SeqCst) + 1);
        points.push(TelemetryPoint {
            id,
            topic_id,
            parent_id: None,
            name: name.to_string(),
            value: value.to_string(),
            is_object: false,
            is_latest: true,
            created_at,
        });
    }

    pub fn all_points(&self) -> Vec<TelemetryPoint> {
        self.points.lock().unwrap().clone()
    }
}

impl TelemetryRepository for InMemoryTelemetry {
    async fn upsert_topic(&self, name: &str) -> Result<TopicId, RainHubError> {
        Ok(self.add_topic(name))
    }

    async fn topic_name(&self, id: TopicId) -> Result<Option<String>, RainHubError> {
        let topics = self.topics.lock().unwrap();
        Ok(topics.iter().find(|t| t.id == id).map(|t| t.name.clone()))
    }

    async fn replace_latest(
        &self,
        topic_id: TopicId,
        generations: Vec<Vec<NewPoint>>,
    ) -> Result<(), RainHubError> {
        let mut points = self.points.lock().unwrap();
        for generation in generations {
            for point in points.iter_mut() {
                if point.topic_id == topic_id {
                    point.is_latest = false;
                }
            }
            let mut assigned = Vec::with_capacity(generation.len());
            for new_point in generation {
                let id = PointId::new(self.next_point_id.fetch_add(1, Ordering::SeqCst) + 1);
                assigned.push(id);
                points.push(TelemetryPoint {
                    id,
                    topic_id,
                    parent_id: new_point.parent.map(|index| assigned[index]),
                    name: new_point.name,
                    value: new_point.value,
                    is_object: new_point.is_object,
                    is_latest: true,
                    created_at: new_point.created_at,
                });
            }
        }
        Ok(())
    }

    async fn latest_value(
        &self,
        topic_id: TopicId,
        name: &str,
    ) -> Result<Option<String>, RainHubError> {
        let points = self.points.lock().unwrap();
        Ok(points
            .iter()
            .find(|p| {
                p.topic_id == topic_id
                    && p.is_latest
                    && !p.is_object
                    && p.parent_id.is_none()
                    && p.name == name
            })
            .map(|p| p.value.clone()))
    }

    async fn history(
        &self,
        topic_id: TopicId,
        name: &str,
        relation: ValueRelation,
        value: &str,
        limit: usize,
    ) -> Result<Vec<TelemetryPoint>, RainHubError> {
        let points = self.points.lock().unwrap();
        let mut matching: Vec<TelemetryPoint> = points
            .iter()
            .filter(|p| {
                p.topic_id == topic_id && p.name == name && relation.matches(&p.value, value)
            })
            .cloned()
            .collect();
        matching.sort_by_key(|p| std::cmp::Reverse((p.created_at, p.id)));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn points_between(
        &self,
        topic_id: TopicId,
        name: &str,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<TelemetryPoint>, RainHubError> {
        let points = self.points.lock().unwrap();
        let mut matching: Vec<TelemetryPoint> = points
            .iter()
            .filter(|p| {
                p.topic_id == topic_id
                    && p.name == name
                    && !p.is_object
                    && p.created_at >= from
                    && p.created_at <= to
            })
            .cloned()
            .collect();
        matching.sort_by_key(|p| (p.created_at, p.id));
        Ok(matching)
    }
}

/// Automation repository backed by plain vectors.
#[derive(Default)]
pub struct InMemoryAutomations {
    pub automations: Mutex<Vec<Automation>>,
    pub steps: Mutex<Vec<Step>>,
    pub conditions: Mutex<Vec<Condition>>,
    /// Topic names by id, for `topic_automations` lookups.
    pub topic_names: Mutex<HashMap<TopicId, String>>,
}

impl InMemoryAutomations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_automation(&self, automation: Automation) {
        if let Trigger::Topic { topic_id, .. } = &automation.trigger {
            // keep the name map usable even when the test never sets it
            self.topic_names
                .lock()
                .unwrap()
                .entry(*topic_id)
                .or_insert_with(|| format!("topic-{topic_id}"));
        }
        self.automations.lock().unwrap().push(automation);
    }

    pub fn set_topic_name(&self, topic_id: TopicId, name: &str) {
        self.topic_names
            .lock()
            .unwrap()
            .insert(topic_id, name.to_string());
    }

    pub fn add_step(&self, step: Step) {
        self.steps.lock().unwrap().push(step);
    }

    pub fn add_condition(&self, condition: Condition) {
        self.conditions.lock().unwrap().push(condition);
    }
}

impl AutomationRepository for InMemoryAutomations {
    async fn get_by_id(&self, id: AutomationId) -> Result<Option<Automation>, RainHubError> {
        let automations = self.automations.lock().unwrap();
        Ok(automations.iter().find(|a| a.id == id).cloned())
    }

    async fn saved_automations(&self) -> Result<Vec<Automation>, RainHubError> {
        let automations = self.automations.lock().unwrap();
        Ok(automations
            .iter()
            .filter(|a| matches!(a.trigger, Trigger::Time { .. } | Trigger::Sun { .. }))
            .cloned()
            .collect())
    }

    async fn topic_automations(&self, topic: &str) -> Result<Vec<Automation>, RainHubError> {
        let names = self.topic_names.lock().unwrap();
        let automations = self.automations.lock().unwrap();
        Ok(automations
            .iter()
            .filter(|a| match &a.trigger {
                Trigger::Topic { topic_id, .. } => {
                    names.get(topic_id).is_some_and(|name| name == topic)
                }
                _ => false,
            })
            .cloned()
            .collect())
    }

    async fn steps(&self, automation_id: AutomationId) -> Result<Vec<Step>, RainHubError> {
        let steps = self.steps.lock().unwrap();
        Ok(steps
            .iter()
            .filter(|s| s.automation_id == automation_id)
            .cloned()
            .collect())
    }

    async fn conditions(&self, step_id: StepId) -> Result<Vec<Condition>, RainHubError> {
        let conditions = self.conditions.lock().unwrap();
        Ok(conditions
            .iter()
            .filter(|c| c.step_id == step_id)
            .cloned()
            .collect())
    }
}

/// Publisher that records outbound messages instead of sending them.
#[derive(Default)]
pub struct SpyPublisher {
    pub published: Mutex<Vec<(String, String)>>,
}

impl SpyPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }
}

impl CommandPublisher for SpyPublisher {
    async fn publish(&self, topic: &str, message: &str) -> Result<(), RainHubError> {
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), message.to_string()));
        Ok(())
    }
}
