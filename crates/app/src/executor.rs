//! Automation execution: branch selection over a flat step arena.

use std::collections::HashSet;

use tracing::debug;

use rainhub_domain::automation::{Step, StepKind};
use rainhub_domain::error::{NotFoundError, RainHubError};
use rainhub_domain::id::{AutomationId, StepId};

use crate::evaluator::ConditionEvaluator;
use crate::ports::{AutomationRepository, CommandPublisher, TelemetryRepository};

/// Runs one automation: evaluates its `if` steps, selects the surviving
/// branches, performs their side effects and returns the executed steps.
pub struct AutomationExecutor<A, T, P> {
    automations: A,
    telemetry: T,
    evaluator: ConditionEvaluator<T>,
    publisher: P,
    /// Suppresses side effects; the returned step list is unchanged.
    dry_run: bool,
}

impl<A, T, P> AutomationExecutor<A, T, P>
where
    A: AutomationRepository,
    T: TelemetryRepository,
    P: CommandPublisher,
{
    pub fn new(
        automations: A,
        telemetry: T,
        evaluator: ConditionEvaluator<T>,
        publisher: P,
        dry_run: bool,
    ) -> Self {
        Self {
            automations,
            telemetry,
            evaluator,
            publisher,
            dry_run,
        }
    }

    /// Execute an automation by id and return the steps that ran.
    pub async fn run(&self, automation_id: AutomationId) -> Result<Vec<Step>, RainHubError> {
        let automation = self
            .automations
            .get_by_id(automation_id)
            .await?
            .ok_or_else(|| NotFoundError::automation(automation_id))?;
        debug!(automation = %automation.name, "running automation");

        let steps = self.automations.steps(automation_id).await?;
        let satisfied = self.satisfied_guards(&steps).await?;

        let mut executed = Vec::new();
        for step in steps {
            if step.kind == StepKind::If {
                continue;
            }
            if let Some(guard) = step.conditional_step_id {
                let guard_held = satisfied.contains(&guard);
                // then-branches need the guard to hold, else-branches the
                // opposite
                if guard_held == step.is_else_step {
                    continue;
                }
            }
            self.perform(&step).await?;
            executed.push(step);
        }
        Ok(executed)
    }

    /// Evaluate every `if` step and collect the ids whose condition list
    /// held.
    async fn satisfied_guards(&self, steps: &[Step]) -> Result<HashSet<StepId>, RainHubError> {
        let mut satisfied = HashSet::new();
        for step in steps {
            if step.kind != StepKind::If {
                continue;
            }
            let conditions = self.automations.conditions(step.id).await?;
            if self.evaluator.evaluate_step(&conditions).await? {
                satisfied.insert(step.id);
            }
        }
        Ok(satisfied)
    }

    async fn perform(&self, step: &Step) -> Result<(), RainHubError> {
        match step.kind {
            StepKind::Publish => {
                let Some(topic_id) = step.topic_id else {
                    return Ok(());
                };
                let message = step.message.clone().unwrap_or_default();
                let topic = self
                    .telemetry
                    .topic_name(topic_id)
                    .await?
                    .ok_or_else(|| NotFoundError::topic(topic_id))?;
                if self.dry_run {
                    debug!(topic, "dry run, publish suppressed");
                } else {
                    self.publisher.publish(&topic, &message).await?;
                }
            }
            StepKind::Notify => debug!(step = %step.id, "notify step reached"),
            StepKind::Wait => debug!(step = %step.id, "wait step reached"),
            StepKind::If => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rainhub_domain::automation::{
        Automation, AutomationBuilder, Comparator, Condition, Operand, Step, StepKind, Trigger,
    };
    use rainhub_domain::id::{AutomationId, ConditionId, StepId, TopicId};
    use rainhub_domain::solar::Coordinates;
    use rainhub_domain::time;

    use crate::evaluator::ConditionEvaluator;
    use crate::testing::{InMemoryAutomations, InMemoryTelemetry, SpyPublisher};

    use super::AutomationExecutor;

    const COORDINATES: Coordinates = Coordinates {
        latitude: 50.5,
        longitude: 30.5,
    };

    fn automation(id: i64) -> Automation {
        AutomationBuilder::default()
            .id(AutomationId::new(id))
            .name("test automation")
            .trigger(Trigger::User)
            .build()
            .unwrap()
    }

    fn step(id: i64, automation_id: i64, kind: StepKind) -> Step {
        Step {
            id: StepId::new(id),
            automation_id: AutomationId::new(automation_id),
            kind,
            conditional_step_id: None,
            is_else_step: false,
            topic_id: None,
            message: None,
        }
    }

    fn executor(
        automations: Arc<InMemoryAutomations>,
        telemetry: Arc<InMemoryTelemetry>,
        publisher: Arc<SpyPublisher>,
        dry_run: bool,
    ) -> AutomationExecutor<Arc<InMemoryAutomations>, Arc<InMemoryTelemetry>, Arc<SpyPublisher>>
    {
        let evaluator = ConditionEvaluator::new(Arc::clone(&telemetry), COORDINATES);
        AutomationExecutor::new(automations, telemetry, evaluator, publisher, dry_run)
    }

    #[tokio::test]
    async fn should_fail_on_unknown_automation() {
        let executor = executor(
            Arc::new(InMemoryAutomations::new()),
            Arc::new(InMemoryTelemetry::new()),
            Arc::new(SpyPublisher::new()),
            false,
        );
        let result = executor.run(AutomationId::new(42)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn should_run_top_level_steps_unconditionally() {
        let automations = Arc::new(InMemoryAutomations::new());
        automations.add_automation(automation(1));
        automations.add_step(step(1, 1, StepKind::Notify));
        automations.add_step(step(2, 1, StepKind::Wait));

        let executor = executor(
            automations,
            Arc::new(InMemoryTelemetry::new()),
            Arc::new(SpyPublisher::new()),
            false,
        );
        let executed = executor.run(AutomationId::new(1)).await.unwrap();
        assert_eq!(executed.len(), 2);
    }

    #[tokio::test]
    async fn should_publish_through_the_command_bus() {
        let telemetry = Arc::new(InMemoryTelemetry::new());
        let topic_id = telemetry.add_topic("zigbee2mqtt/plug");
        let automations = Arc::new(InMemoryAutomations::new());
        automations.add_automation(automation(1));
        automations.add_step(Step {
            topic_id: Some(topic_id),
            message: Some(r#"{"state": "ON"}"#.to_string()),
            ..step(1, 1, StepKind::Publish)
        });
        let publisher = Arc::new(SpyPublisher::new());

        let executor = executor(automations, telemetry, Arc::clone(&publisher), false);
        executor.run(AutomationId::new(1)).await.unwrap();

        assert_eq!(
            publisher.messages(),
            vec![(
                "zigbee2mqtt/plug".to_string(),
                r#"{"state": "ON"}"#.to_string()
            )]
        );
    }

    #[tokio::test]
    async fn should_select_else_branch_when_guard_fails() {
        let telemetry = Arc::new(InMemoryTelemetry::new());
        let state_topic = telemetry.add_topic("zigbee2mqtt/switch");
        telemetry.add_point(state_topic, "state", "OFF", time::now());
        let command_topic = telemetry.add_topic("zigbee2mqtt/lamp");

        let automations = Arc::new(InMemoryAutomations::new());
        automations.add_automation(automation(1));
        automations.add_step(step(1, 1, StepKind::If));
        automations.add_condition(Condition {
            id: ConditionId::new(1),
            step_id: StepId::new(1),
            comparator: Comparator::Eq,
            left: Operand::Value {
                value: "ON".to_string(),
            },
            right: Operand::Topic {
                topic_id: state_topic,
                key: "state".to_string(),
            },
        });
        automations.add_step(Step {
            conditional_step_id: Some(StepId::new(1)),
            ..step(2, 1, StepKind::Notify)
        });
        automations.add_step(Step {
            conditional_step_id: Some(StepId::new(1)),
            is_else_step: true,
            topic_id: Some(command_topic),
            message: Some("{}".to_string()),
            ..step(3, 1, StepKind::Publish)
        });

        let publisher = Arc::new(SpyPublisher::new());
        let executor = executor(automations, telemetry, Arc::clone(&publisher), false);
        let executed = executor.run(AutomationId::new(1)).await.unwrap();

        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].kind, StepKind::Publish);
        assert_eq!(publisher.messages().len(), 1);
    }

    #[tokio::test]
    async fn should_select_then_branch_when_guard_holds() {
        let telemetry = Arc::new(InMemoryTelemetry::new());
        let state_topic = telemetry.add_topic("zigbee2mqtt/switch");
        telemetry.add_point(state_topic, "state", "ON", time::now());

        let automations = Arc::new(InMemoryAutomations::new());
        automations.add_automation(automation(1));
        automations.add_step(step(1, 1, StepKind::If));
        automations.add_condition(Condition {
            id: ConditionId::new(1),
            step_id: StepId::new(1),
            comparator: Comparator::Eq,
            left: Operand::Value {
                value: "ON".to_string(),
            },
            right: Operand::Topic {
                topic_id: state_topic,
                key: "state".to_string(),
            },
        });
        automations.add_step(Step {
            conditional_step_id: Some(StepId::new(1)),
            ..step(2, 1, StepKind::Notify)
        });
        automations.add_step(Step {
            conditional_step_id: Some(StepId::new(1)),
            is_else_step: true,
            ..step(3, 1, StepKind::Wait)
        });

        let executor = executor(
            automations,
            telemetry,
            Arc::new(SpyPublisher::new()),
            false,
        );
        let executed = executor.run(AutomationId::new(1)).await.unwrap();

        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].kind, StepKind::Notify);
    }

    #[tokio::test]
    async fn should_skip_branches_of_unconditioned_if_step() {
        // an `if` with no conditions never satisfies its guard
        let automations = Arc::new(InMemoryAutomations::new());
        automations.add_automation(automation(1));
        automations.add_step(step(1, 1, StepKind::If));
        automations.add_step(Step {
            conditional_step_id: Some(StepId::new(1)),
            ..step(2, 1, StepKind::Notify)
        });

        let executor = executor(
            automations,
            Arc::new(InMemoryTelemetry::new()),
            Arc::new(SpyPublisher::new()),
            false,
        );
        let executed = executor.run(AutomationId::new(1)).await.unwrap();
        assert!(executed.is_empty());
    }

    #[tokio::test]
    async fn should_suppress_side_effects_in_dry_run() {
        let telemetry = Arc::new(InMemoryTelemetry::new());
        let topic_id = telemetry.add_topic("zigbee2mqtt/plug");
        let automations = Arc::new(InMemoryAutomations::new());
        automations.add_automation(automation(1));
        automations.add_step(Step {
            topic_id: Some(topic_id),
            message: Some("{}".to_string()),
            ..step(1, 1, StepKind::Publish)
        });
        let publisher = Arc::new(SpyPublisher::new());

        let executor = executor(automations, telemetry, Arc::clone(&publisher), true);
        let executed = executor.run(AutomationId::new(1)).await.unwrap();

        assert_eq!(executed.len(), 1);
        assert!(publisher.messages().is_empty());
    }

    #[tokio::test]
    async fn should_fail_publish_to_unknown_topic() {
        let automations = Arc::new(InMemoryAutomations::new());
        automations.add_automation(automation(1));
        automations.add_step(Step {
            topic_id: Some(TopicId::new(99)),
            message: Some("{}".to_string()),
            ..step(1, 1, StepKind::Publish)
        });

        let executor = executor(
            automations,
            Arc::new(InMemoryTelemetry::new()),
            Arc::new(SpyPublisher::new()),
            false,
        );
        assert!(executor.run(AutomationId::new(1)).await.is_err());
    }
}
