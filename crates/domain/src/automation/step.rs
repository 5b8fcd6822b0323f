//! Step — one executable unit inside an automation.

use serde::{Deserialize, Serialize};

use crate::id::{AutomationId, StepId, TopicId};

/// What a step does when it executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Gates nested steps behind its condition list.
    If,
    /// Notification hook; carried in the result list, no side effect here.
    Notify,
    /// Publish `message` on the topic's outbound channel.
    Publish,
    /// Pause marker; carried in the result list, no side effect here.
    Wait,
}

/// One step of an automation.
///
/// Steps form a flat arena: `conditional_step_id` is `None` for top-level
/// steps and otherwise references the owning `if` step. Else-branch steps
/// run only when the owning `if` evaluated false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub automation_id: AutomationId,
    pub kind: StepKind,
    pub conditional_step_id: Option<StepId>,
    pub is_else_step: bool,
    /// Target topic for `publish` steps.
    pub topic_id: Option<TopicId>,
    /// Payload for `publish` steps.
    pub message: Option<String>,
}

impl Step {
    /// Whether this step sits under an `if` step.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.conditional_step_id.is_some()
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::If => "if",
            Self::Notify => "notify",
            Self::Publish => "publish",
            Self::Wait => "wait",
        };
        f.write_str(name)
    }
}
