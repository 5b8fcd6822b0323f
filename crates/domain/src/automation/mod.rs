//! Automation — trigger → condition tree → steps.
//!
//! An automation is a named rule with a single [`Trigger`] and a flat list
//! of [`Step`]s. `if` steps gate nested steps through their
//! `conditional_step_id` parent pointer; [`Condition`]s under one `if` step
//! are combined with an implicit AND. Automations are authored by the
//! surrounding system and consumed read-only by this core.

mod condition;
mod step;
mod trigger;

pub use condition::{Comparator, Condition, DeltaLiteral, Operand, sort_for_evaluation};
pub use step::{Step, StepKind};
pub use trigger::Trigger;

use serde::{Deserialize, Serialize};

use crate::error::{RainHubError, ValidationError};
use crate::id::AutomationId;

/// A rule reacting to a topic change, a clock time, or a solar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Automation {
    pub id: AutomationId,
    pub name: String,
    pub trigger: Trigger,
    /// Whether the surrounding dashboard offers a manual-run control.
    pub is_control_shown: bool,
}

impl Automation {
    /// Create a builder for constructing an [`Automation`].
    #[must_use]
    pub fn builder() -> AutomationBuilder {
        AutomationBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`RainHubError::Validation`] when `name` is empty.
    pub fn validate(&self) -> Result<(), RainHubError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }
}

/// Step-by-step builder for [`Automation`].
#[derive(Debug, Default)]
pub struct AutomationBuilder {
    id: Option<AutomationId>,
    name: Option<String>,
    trigger: Option<Trigger>,
    is_control_shown: bool,
}

impl AutomationBuilder {
    #[must_use]
    pub fn id(mut self, id: AutomationId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    #[must_use]
    pub fn control_shown(mut self, shown: bool) -> Self {
        self.is_control_shown = shown;
        self
    }

    /// Consume the builder, validate, and return an [`Automation`].
    ///
    /// # Errors
    ///
    /// Returns [`RainHubError::Validation`] if required fields are missing
    /// or empty.
    pub fn build(self) -> Result<Automation, RainHubError> {
        let automation = Automation {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            trigger: self.trigger.unwrap_or(Trigger::User),
            is_control_shown: self.is_control_shown,
        };
        automation.validate()?;
        Ok(automation)
    }
}
