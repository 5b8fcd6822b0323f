//! Automation repository port — read access to authored automations.
//!
//! Automations, steps, and conditions are written by the surrounding
//! system; this core only reads them.

use std::future::Future;

use rainhub_domain::automation::{Automation, Condition, Step};
use rainhub_domain::error::RainHubError;
use rainhub_domain::id::{AutomationId, StepId};

/// Repository for querying [`Automation`]s and their step trees.
pub trait AutomationRepository {
    /// Get an automation by its unique identifier.
    fn get_by_id(
        &self,
        id: AutomationId,
    ) -> impl Future<Output = Result<Option<Automation>, RainHubError>> + Send;

    /// All automations with a `time` or `sun` trigger, used to seed the
    /// scheduler.
    fn saved_automations(
        &self,
    ) -> impl Future<Output = Result<Vec<Automation>, RainHubError>> + Send;

    /// All topic-triggered automations listening on a channel name.
    fn topic_automations(
        &self,
        topic: &str,
    ) -> impl Future<Output = Result<Vec<Automation>, RainHubError>> + Send;

    /// Full step list of one automation, top-level and nested.
    fn steps(
        &self,
        automation_id: AutomationId,
    ) -> impl Future<Output = Result<Vec<Step>, RainHubError>> + Send;

    /// Conditions owned by an `if` step.
    fn conditions(
        &self,
        step_id: StepId,
    ) -> impl Future<Output = Result<Vec<Condition>, RainHubError>> + Send;
}

impl<T: AutomationRepository + Send + Sync> AutomationRepository for std::sync::Arc<T> {
    fn get_by_id(
        &self,
        id: AutomationId,
    ) -> impl Future<Output = Result<Option<Automation>, RainHubError>> + Send {
        (**self).get_by_id(id)
    }

    fn saved_automations(
        &self,
    ) -> impl Future<Output = Result<Vec<Automation>, RainHubError>> + Send {
        (**self).saved_automations()
    }

    fn topic_automations(
        &self,
        topic: &str,
    ) -> impl Future<Output = Result<Vec<Automation>, RainHubError>> + Send {
        (**self).topic_automations(topic)
    }

    fn steps(
        &self,
        automation_id: AutomationId,
    ) -> impl Future<Output = Result<Vec<Step>, RainHubError>> + Send {
        (**self).steps(automation_id)
    }

    fn conditions(
        &self,
        step_id: StepId,
    ) -> impl Future<Output = Result<Vec<Condition>, RainHubError>> + Send {
        (**self).conditions(step_id)
    }
}
