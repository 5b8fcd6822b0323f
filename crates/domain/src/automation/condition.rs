//! Condition — one comparison inside an `if` step's implicit AND list.

use serde::{Deserialize, Serialize};

use crate::id::{ConditionId, StepId, TopicId};
use crate::preset::Preset;

/// Comparison operator between the two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    And,
    Or,
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Most recent point equal to the value part of a [`DeltaLiteral`],
    /// tested against its elapsed-seconds part.
    Leq,
    /// Like `leq` with a greater-than value match.
    Lgt,
    /// Like `leq` with a less-than value match.
    Llt,
    /// Like `leq` with a not-equal value match.
    Lneq,
    /// Value just crossed upward through the right-hand threshold.
    Inc,
    /// Value just crossed downward through the right-hand threshold.
    Dec,
}

impl Comparator {
    /// Whether evaluation requires a historical point lookup.
    #[must_use]
    pub fn is_historical(self) -> bool {
        matches!(
            self,
            Self::Inc | Self::Dec | Self::Lgt | Self::Llt | Self::Leq | Self::Lneq
        )
    }
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operand {
    /// Computed from the wall clock or the sun.
    Preset { preset: Preset },
    /// Current value of a root-level key on a topic.
    Topic { topic_id: TopicId, key: String },
    /// Literal value.
    Value { value: String },
}

impl Operand {
    /// Presets and literals resolve without touching the store.
    #[must_use]
    pub fn is_cheap(&self) -> bool {
        !matches!(self, Self::Topic { .. })
    }

    /// The topic reference, when this operand is topic-backed.
    #[must_use]
    pub fn topic_ref(&self) -> Option<(TopicId, &str)> {
        match self {
            Self::Topic { topic_id, key } => Some((*topic_id, key)),
            Self::Preset { .. } | Self::Value { .. } => None,
        }
    }
}

/// One comparison owned by an `if` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: ConditionId,
    pub step_id: StepId,
    pub comparator: Comparator,
    pub left: Operand,
    pub right: Operand,
}

/// Order conditions so cheap ones are evaluated first.
///
/// Conditions with store-backed operands sort after those resolvable in
/// memory, and historical comparators sort last. Combined with
/// short-circuiting this skips expensive lookups when a cheap condition
/// already fails. The sort is stable, so declaration order breaks ties.
pub fn sort_for_evaluation(conditions: &mut [Condition]) {
    conditions.sort_by_key(|condition| {
        (
            !condition.left.is_cheap(),
            !condition.right.is_cheap(),
            condition.comparator.is_historical(),
        )
    });
}

/// Parsed right-hand literal of the historical comparators.
///
/// The stored form is `"<value>,<op><seconds>"`, e.g. `"0,>30"`: match the
/// value part against history, then compare the elapsed seconds since that
/// point with the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaLiteral {
    /// Value matched against the point history.
    pub value: String,
    /// Comparison applied to the elapsed seconds.
    pub elapsed: ElapsedTest,
}

/// Elapsed-seconds test of a [`DeltaLiteral`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElapsedTest {
    MoreThan(i64),
    LessThan(i64),
    Exactly(i64),
}

impl ElapsedTest {
    /// Apply the test to an elapsed duration in seconds.
    #[must_use]
    pub fn check(self, seconds: i64) -> bool {
        match self {
            Self::MoreThan(threshold) => seconds > threshold,
            Self::LessThan(threshold) => seconds < threshold,
            Self::Exactly(threshold) => seconds == threshold,
        }
    }
}

impl DeltaLiteral {
    /// Parse the compound literal. Returns `None` when malformed, which
    /// makes the owning condition evaluate false rather than erroring.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (value, time_part) = raw.split_once(',')?;
        let seconds: i64 = time_part
            .trim_start_matches(['>', '<', '='])
            .parse()
            .ok()?;
        let elapsed = if time_part.contains('>') {
            ElapsedTest::MoreThan(seconds)
        } else if time_part.contains('<') {
            ElapsedTest::LessThan(seconds)
        } else {
            ElapsedTest::Exactly(seconds)
        };
        Some(Self {
            value: value.to_string(),
            elapsed,
        })
    }
}
