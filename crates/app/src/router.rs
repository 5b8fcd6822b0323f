//! Trigger routing: maps external events to the automations they fire.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use rainhub_domain::automation::{Automation, Trigger};
use rainhub_domain::error::RainHubError;
use rainhub_domain::solar::SolarPosition;

use crate::executor::AutomationExecutor;
use crate::ports::{
    AutomationRepository, AutomationTrigger, CommandPublisher, TelemetryRepository,
    TriggeredAutomation,
};

/// Routes topic updates, clock ticks, and solar events to matching
/// automations and runs them through the executor.
pub struct TriggerRouter<A, T, P> {
    automations: A,
    executor: AutomationExecutor<A, T, P>,
}

impl<A, T, P> TriggerRouter<A, T, P>
where
    A: AutomationRepository,
    T: TelemetryRepository,
    P: CommandPublisher,
{
    pub fn new(automations: A, executor: AutomationExecutor<A, T, P>) -> Self {
        Self {
            automations,
            executor,
        }
    }

    /// Run every topic-triggered automation matching an inbound message.
    pub async fn trigger_topic_automations(
        &self,
        topic: &str,
        payload: &Map<String, Value>,
    ) -> Result<Vec<TriggeredAutomation>, RainHubError> {
        let candidates = self.automations.topic_automations(topic).await?;
        let matching = candidates
            .into_iter()
            .filter(|automation| automation.trigger.matches_payload(payload));
        self.run_all(matching).await
    }

    async fn run_all(
        &self,
        automations: impl Iterator<Item = Automation>,
    ) -> Result<Vec<TriggeredAutomation>, RainHubError> {
        let mut triggered = Vec::new();
        for automation in automations {
            debug!(automation = %automation.name, trigger = %automation.trigger, "triggered");
            match self.executor.run(automation.id).await {
                Ok(result) => triggered.push(TriggeredAutomation {
                    automation_id: automation.id,
                    result,
                }),
                // one failing automation must not block the others
                Err(error) => {
                    warn!(automation = %automation.name, %error, "automation failed");
                }
            }
        }
        Ok(triggered)
    }
}

impl<A, T, P> AutomationTrigger for TriggerRouter<A, T, P>
where
    A: AutomationRepository + Send + Sync,
    T: TelemetryRepository + Send + Sync,
    P: CommandPublisher + Send + Sync,
{
    async fn trigger_time_automations(
        &self,
        time: &str,
    ) -> Result<Vec<TriggeredAutomation>, RainHubError> {
        let saved = self.automations.saved_automations().await?;
        let matching = saved.into_iter().filter(|automation| {
            matches!(&automation.trigger, Trigger::Time { at } if at == time)
        });
        self.run_all(matching).await
    }

    async fn trigger_sun_automations(
        &self,
        position: SolarPosition,
    ) -> Result<Vec<TriggeredAutomation>, RainHubError> {
        let saved = self.automations.saved_automations().await?;
        let matching = saved.into_iter().filter(|automation| {
            matches!(&automation.trigger, Trigger::Sun { position: at } if *at == position)
        });
        self.run_all(matching).await
    }

    async fn saved_automations(&self) -> Result<Vec<Automation>, RainHubError> {
        self.automations.saved_automations().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Map, Value};

    use rainhub_domain::automation::{Automation, Step, StepKind, Trigger};
    use rainhub_domain::id::{AutomationId, StepId, TopicId};
    use rainhub_domain::solar::{Coordinates, SolarPosition};

    use crate::evaluator::ConditionEvaluator;
    use crate::executor::AutomationExecutor;
    use crate::ports::AutomationTrigger;
    use crate::testing::{InMemoryAutomations, InMemoryTelemetry, SpyPublisher};

    use super::TriggerRouter;

    const COORDINATES: Coordinates = Coordinates {
        latitude: 50.5,
        longitude: 30.5,
    };

    fn payload(text: &str) -> Map<String, Value> {
        match serde_json::from_str(text).unwrap() {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn automation(id: i64, trigger: Trigger) -> Automation {
        Automation::builder()
            .id(AutomationId::new(id))
            .name(format!("automation {id}"))
            .trigger(trigger)
            .build()
            .unwrap()
    }

    fn notify_step(id: i64, automation_id: i64) -> Step {
        Step {
            id: StepId::new(id),
            automation_id: AutomationId::new(automation_id),
            kind: StepKind::Notify,
            conditional_step_id: None,
            is_else_step: false,
            topic_id: None,
            message: None,
        }
    }

    fn router(
        automations: Arc<InMemoryAutomations>,
    ) -> TriggerRouter<Arc<InMemoryAutomations>, Arc<InMemoryTelemetry>, Arc<SpyPublisher>> {
        let telemetry = Arc::new(InMemoryTelemetry::new());
        let evaluator = ConditionEvaluator::new(Arc::clone(&telemetry), COORDINATES);
        let executor = AutomationExecutor::new(
            Arc::clone(&automations),
            telemetry,
            evaluator,
            Arc::new(SpyPublisher::new()),
            false,
        );
        TriggerRouter::new(automations, executor)
    }

    #[tokio::test]
    async fn should_match_every_message_when_trigger_key_is_empty() {
        let automations = Arc::new(InMemoryAutomations::new());
        let topic_id = TopicId::new(1);
        automations.add_automation(automation(
            1,
            Trigger::Topic {
                topic_id,
                key: String::new(),
                value: String::new(),
            },
        ));
        automations.set_topic_name(topic_id, "zigbee2mqtt/button");
        automations.add_step(notify_step(1, 1));
        let router = router(automations);

        let triggered = router
            .trigger_topic_automations("zigbee2mqtt/button", &payload(r#"{"anything": true}"#))
            .await
            .unwrap();
        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].result.len(), 1);
    }

    #[tokio::test]
    async fn should_match_keyed_trigger_on_numeric_and_string_payloads() {
        let automations = Arc::new(InMemoryAutomations::new());
        let topic_id = TopicId::new(1);
        automations.add_automation(automation(
            1,
            Trigger::Topic {
                topic_id,
                key: "k".to_string(),
                value: "5".to_string(),
            },
        ));
        automations.set_topic_name(topic_id, "zigbee2mqtt/sensor");
        automations.add_step(notify_step(1, 1));
        let router = router(automations);

        let numeric = router
            .trigger_topic_automations("zigbee2mqtt/sensor", &payload(r#"{"k": 5}"#))
            .await
            .unwrap();
        assert_eq!(numeric.len(), 1);

        let string = router
            .trigger_topic_automations("zigbee2mqtt/sensor", &payload(r#"{"k": "5"}"#))
            .await
            .unwrap();
        assert_eq!(string.len(), 1);

        let other = router
            .trigger_topic_automations("zigbee2mqtt/sensor", &payload(r#"{"k": 6}"#))
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn should_ignore_messages_on_other_topics() {
        let automations = Arc::new(InMemoryAutomations::new());
        let topic_id = TopicId::new(1);
        automations.add_automation(automation(
            1,
            Trigger::Topic {
                topic_id,
                key: String::new(),
                value: String::new(),
            },
        ));
        automations.set_topic_name(topic_id, "zigbee2mqtt/button");
        let router = router(automations);

        let triggered = router
            .trigger_topic_automations("zigbee2mqtt/other", &payload("{}"))
            .await
            .unwrap();
        assert!(triggered.is_empty());
    }

    #[tokio::test]
    async fn should_fire_time_automations_matching_the_tick() {
        let automations = Arc::new(InMemoryAutomations::new());
        automations.add_automation(automation(
            1,
            Trigger::Time {
                at: "06:30".to_string(),
            },
        ));
        automations.add_automation(automation(
            2,
            Trigger::Time {
                at: "22:00".to_string(),
            },
        ));
        automations.add_step(notify_step(1, 1));
        let router = router(automations);

        let triggered = router.trigger_time_automations("06:30").await.unwrap();
        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].automation_id, AutomationId::new(1));
    }

    #[tokio::test]
    async fn should_fire_sun_automations_matching_the_position() {
        let automations = Arc::new(InMemoryAutomations::new());
        automations.add_automation(automation(
            1,
            Trigger::Sun {
                position: SolarPosition::Sunset,
            },
        ));
        automations.add_automation(automation(
            2,
            Trigger::Sun {
                position: SolarPosition::Dawn,
            },
        ));
        let router = router(automations);

        let triggered = router
            .trigger_sun_automations(SolarPosition::Sunset)
            .await
            .unwrap();
        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].automation_id, AutomationId::new(1));
    }

    #[tokio::test]
    async fn should_keep_running_when_one_automation_fails() {
        let automations = Arc::new(InMemoryAutomations::new());
        let topic_id = TopicId::new(1);
        let broken = Trigger::Topic {
            topic_id,
            key: String::new(),
            value: String::new(),
        };
        automations.add_automation(automation(1, broken.clone()));
        automations.add_automation(automation(2, broken));
        automations.set_topic_name(topic_id, "zigbee2mqtt/button");
        // automation 1 publishes to a topic the store has never seen
        automations.add_step(Step {
            kind: StepKind::Publish,
            topic_id: Some(TopicId::new(99)),
            message: Some("{}".to_string()),
            ..notify_step(1, 1)
        });
        automations.add_step(notify_step(2, 2));
        let router = router(automations);

        let triggered = router
            .trigger_topic_automations("zigbee2mqtt/button", &payload("{}"))
            .await
            .unwrap();
        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].automation_id, AutomationId::new(2));
    }
}
