//! Condition evaluation for `if` steps.
//!
//! Conditions under one step form an implicit AND list. They are sorted so
//! conditions resolvable in memory run before store-backed ones, and the
//! first false condition ends evaluation, which skips the expensive
//! historical lookups entirely when a cheap condition already fails.

use std::cmp::Ordering;

use chrono::Local;

use rainhub_domain::automation::{
    Comparator, Condition, DeltaLiteral, Operand, sort_for_evaluation,
};
use rainhub_domain::error::RainHubError;
use rainhub_domain::id::TopicId;
use rainhub_domain::solar::Coordinates;
use rainhub_domain::telemetry::{ValueRelation, compare_values};
use rainhub_domain::time;

use crate::ports::TelemetryRepository;

/// Evaluates the condition list of an `if` step against current telemetry.
pub struct ConditionEvaluator<T> {
    telemetry: T,
    coordinates: Coordinates,
}

impl<T: TelemetryRepository> ConditionEvaluator<T> {
    pub fn new(telemetry: T, coordinates: Coordinates) -> Self {
        Self {
            telemetry,
            coordinates,
        }
    }

    /// Evaluate a step's conditions as a conjunction.
    ///
    /// An empty list is false: an `if` step with no conditions guards
    /// nothing and must not fire its branch.
    pub async fn evaluate_step(&self, conditions: &[Condition]) -> Result<bool, RainHubError> {
        if conditions.is_empty() {
            return Ok(false);
        }
        let mut ordered = conditions.to_vec();
        sort_for_evaluation(&mut ordered);
        for condition in &ordered {
            if !self.evaluate(condition).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn evaluate(&self, condition: &Condition) -> Result<bool, RainHubError> {
        if condition.comparator.is_historical() {
            return self.evaluate_historical(condition).await;
        }
        let left = self.resolve(&condition.left).await?;
        let right = self.resolve(&condition.right).await?;
        let verdict = match condition.comparator {
            Comparator::And => !left.is_empty() && !right.is_empty(),
            Comparator::Or => !left.is_empty() || !right.is_empty(),
            Comparator::Eq => compare_values(&left, &right) == Ordering::Equal,
            Comparator::Neq => compare_values(&left, &right) != Ordering::Equal,
            Comparator::Gt => compare_values(&left, &right) == Ordering::Greater,
            Comparator::Gte => compare_values(&left, &right) != Ordering::Less,
            Comparator::Lt => compare_values(&left, &right) == Ordering::Less,
            Comparator::Lte => compare_values(&left, &right) != Ordering::Greater,
            _ => false,
        };
        Ok(verdict)
    }

    /// The historical comparators need a point history, so the left side
    /// must be topic-backed; anything else is false.
    async fn evaluate_historical(&self, condition: &Condition) -> Result<bool, RainHubError> {
        let Some((topic_id, key)) = condition.left.topic_ref() else {
            return Ok(false);
        };
        match condition.comparator {
            Comparator::Inc | Comparator::Dec => {
                let left = self.resolve(&condition.left).await?;
                let right = self.resolve(&condition.right).await?;
                self.evaluate_trend(condition.comparator, topic_id, key, &left, &right)
                    .await
            }
            comparator => {
                let right = self.resolve(&condition.right).await?;
                let Some(literal) = DeltaLiteral::parse(&right) else {
                    return Ok(false);
                };
                let relation = match comparator {
                    Comparator::Lgt => ValueRelation::Greater,
                    Comparator::Llt => ValueRelation::Less,
                    Comparator::Lneq => ValueRelation::NotEqual,
                    _ => ValueRelation::Equal,
                };
                let matched = self
                    .telemetry
                    .history(topic_id, key, relation, &literal.value, 1)
                    .await?;
                let Some(point) = matched.first() else {
                    return Ok(false);
                };
                let elapsed = (time::now() - point.created_at).num_seconds();
                Ok(literal.elapsed.check(elapsed))
            }
        }
    }

    /// `inc`/`dec`: the value crossed the threshold since its previous
    /// distinct reading.
    async fn evaluate_trend(
        &self,
        comparator: Comparator,
        topic_id: TopicId,
        key: &str,
        left: &str,
        right: &str,
    ) -> Result<bool, RainHubError> {
        let crossed_now = match comparator {
            Comparator::Inc => compare_values(left, right) == Ordering::Greater,
            _ => compare_values(left, right) == Ordering::Less,
        };
        if !crossed_now {
            return Ok(false);
        }
        let prior = self
            .telemetry
            .history(topic_id, key, ValueRelation::NotEqual, left, 1)
            .await?;
        let Some(prior) = prior.first() else {
            return Ok(false);
        };
        let verdict = match comparator {
            Comparator::Inc => {
                compare_values(&prior.value, left) == Ordering::Less
                    && compare_values(&prior.value, right) != Ordering::Greater
            }
            _ => {
                compare_values(&prior.value, left) == Ordering::Greater
                    && compare_values(&prior.value, right) != Ordering::Less
            }
        };
        Ok(verdict)
    }

    /// Resolve an operand to text. Missing topic values become the empty
    /// string so they participate as ordinary falsy values.
    async fn resolve(&self, operand: &Operand) -> Result<String, RainHubError> {
        match operand {
            Operand::Preset { preset } => Ok(preset.value(Local::now(), self.coordinates)),
            Operand::Value { value } => Ok(value.clone()),
            Operand::Topic { topic_id, key } => Ok(self
                .telemetry
                .latest_value(*topic_id, key)
                .await?
                .unwrap_or_default()),
        }
    }
}
