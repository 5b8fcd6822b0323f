//! Trigger port — the surface the scheduler fires automations through.

use std::future::Future;

use serde::Serialize;

use rainhub_domain::automation::{Automation, Step};
use rainhub_domain::error::RainHubError;
use rainhub_domain::id::AutomationId;
use rainhub_domain::solar::SolarPosition;

/// One automation that fired, with the steps that actually executed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggeredAutomation {
    pub automation_id: AutomationId,
    pub result: Vec<Step>,
}

/// Fires time- and sun-triggered automations.
///
/// Implemented by the trigger router; the scheduler only sees this trait
/// so its one-shot jobs stay decoupled from the execution pipeline.
pub trait AutomationTrigger {
    /// Run every automation registered for a clock time (`HH:MM`).
    fn trigger_time_automations(
        &self,
        time: &str,
    ) -> impl Future<Output = Result<Vec<TriggeredAutomation>, RainHubError>> + Send;

    /// Run every automation registered for a solar position.
    fn trigger_sun_automations(
        &self,
        position: SolarPosition,
    ) -> impl Future<Output = Result<Vec<TriggeredAutomation>, RainHubError>> + Send;

    /// The time/sun automations the schedule is derived from.
    fn saved_automations(
        &self,
    ) -> impl Future<Output = Result<Vec<Automation>, RainHubError>> + Send;
}

impl<T: AutomationTrigger + Send + Sync> AutomationTrigger for std::sync::Arc<T> {
    fn trigger_time_automations(
        &self,
        time: &str,
    ) -> impl Future<Output = Result<Vec<TriggeredAutomation>, RainHubError>> + Send {
        (**self).trigger_time_automations(time)
    }

    fn trigger_sun_automations(
        &self,
        position: SolarPosition,
    ) -> impl Future<Output = Result<Vec<TriggeredAutomation>, RainHubError>> + Send {
        (**self).trigger_sun_automations(position)
    }

    fn saved_automations(
        &self,
    ) -> impl Future<Output = Result<Vec<Automation>, RainHubError>> + Send {
        (**self).saved_automations()
    }
}
