//! Telemetry — topics and the flattened, append-only point time series.
//!
//! Every inbound message is flattened into a *generation* of points. The
//! most recent generation per topic carries the `is_latest` marker; history
//! is append-only and never deleted.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::id::{PointId, TopicId};
use crate::time::Timestamp;

/// A named channel on the messaging bus identifying a device or sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub name: String,
}

/// One flattened scalar or container reading stored against a topic.
///
/// `parent_id` is `None` for root-level points; nested object fields point
/// at their container row. Only root-level scalar points are addressed by
/// name for condition lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryPoint {
    pub id: PointId,
    pub topic_id: TopicId,
    pub parent_id: Option<PointId>,
    pub name: String,
    /// Scalar value as text; empty for container rows.
    pub value: String,
    pub is_object: bool,
    pub is_latest: bool,
    pub created_at: Timestamp,
}

/// A point about to be inserted, before the database assigns its id.
///
/// `parent` indexes into the batch produced by [`flatten`]; the storage
/// layer replaces it with the row id assigned to that earlier insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPoint {
    pub parent: Option<usize>,
    pub name: String,
    pub value: String,
    pub is_object: bool,
    pub created_at: Timestamp,
}

/// Flatten one JSON payload into a generation of new points.
///
/// Rules, applied recursively:
/// - `null` fields produce no row
/// - objects and arrays produce a container row (`is_object`, empty value)
///   and recurse with the container as parent
/// - booleans are stored as `1`/`0`
/// - everything else is stored as its text form
#[must_use]
pub fn flatten(
    payload: &serde_json::Map<String, serde_json::Value>,
    created_at: Timestamp,
) -> Vec<NewPoint> {
    let mut points = Vec::new();
    for (name, value) in payload {
        flatten_value(&mut points, None, name, value, created_at);
    }
    points
}

fn flatten_value(
    points: &mut Vec<NewPoint>,
    parent: Option<usize>,
    name: &str,
    value: &serde_json::Value,
    created_at: Timestamp,
) {
    let scalar = match value {
        serde_json::Value::Null => return,
        serde_json::Value::Object(fields) => {
            let index = push_container(points, parent, name, created_at);
            for (child_name, child) in fields {
                flatten_value(points, Some(index), child_name, child, created_at);
            }
            return;
        }
        serde_json::Value::Array(items) => {
            let index = push_container(points, parent, name, created_at);
            for (position, child) in items.iter().enumerate() {
                flatten_value(points, Some(index), &position.to_string(), child, created_at);
            }
            return;
        }
        serde_json::Value::Bool(true) => "1".to_string(),
        serde_json::Value::Bool(false) => "0".to_string(),
        serde_json::Value::Number(number) => number.to_string(),
        serde_json::Value::String(text) => text.clone(),
    };

    points.push(NewPoint {
        parent,
        name: name.to_string(),
        value: scalar,
        is_object: false,
        created_at,
    });
}

fn push_container(
    points: &mut Vec<NewPoint>,
    parent: Option<usize>,
    name: &str,
    created_at: Timestamp,
) -> usize {
    points.push(NewPoint {
        parent,
        name: name.to_string(),
        value: String::new(),
        is_object: true,
        created_at,
    });
    points.len() - 1
}

/// Relation used for historical point lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueRelation {
    Equal,
    Greater,
    Less,
    NotEqual,
}

impl ValueRelation {
    /// Whether `candidate` stands in this relation to `reference`.
    #[must_use]
    pub fn matches(self, candidate: &str, reference: &str) -> bool {
        let ordering = compare_values(candidate, reference);
        match self {
            Self::Equal => ordering == Ordering::Equal,
            Self::Greater => ordering == Ordering::Greater,
            Self::Less => ordering == Ordering::Less,
            Self::NotEqual => ordering != Ordering::Equal,
        }
    }
}

/// Compare two stored values: numeric when both parse as numbers,
/// lexicographic otherwise.
#[must_use]
pub fn compare_values(left: &str, right: &str) -> Ordering {
    match (left.parse::<f64>(), right.parse::<f64>()) {
        (Ok(l), Ok(r)) => l.total_cmp(&r),
        _ => left.cmp(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now;

    fn payload(text: &str) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::from_str(text).unwrap() {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn should_flatten_scalars_at_root_level() {
        let points = flatten(&payload(r#"{"linkquality":99,"state":"ON"}"#), now());
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].name, "linkquality");
        assert_eq!(points[0].value, "99");
        assert!(!points[0].is_object);
        assert_eq!(points[1].name, "state");
        assert_eq!(points[1].value, "ON");
        assert!(points.iter().all(|p| p.parent.is_none()));
    }

    #[test]
    fn should_store_booleans_as_zero_and_one() {
        let points = flatten(&payload(r#"{"occupied":true,"tampered":false}"#), now());
        assert_eq!(points[0].value, "1");
        assert_eq!(points[1].value, "0");
    }

    #[test]
    fn should_drop_null_fields() {
        let points = flatten(&payload(r#"{"a":null,"b":1}"#), now());
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].name, "b");
    }

    #[test]
    fn should_flatten_nested_objects_under_a_container_row() {
        let points = flatten(&payload(r#"{"update":{"state":"available"}}"#), now());
        assert_eq!(points.len(), 2);
        assert!(points[0].is_object);
        assert_eq!(points[0].value, "");
        assert_eq!(points[1].name, "state");
        assert_eq!(points[1].parent, Some(0));
    }

    #[test]
    fn should_flatten_arrays_with_index_names() {
        let points = flatten(&payload(r#"{"colors":["red","green"]}"#), now());
        assert_eq!(points.len(), 3);
        assert!(points[0].is_object);
        assert_eq!(points[1].name, "0");
        assert_eq!(points[2].name, "1");
        assert_eq!(points[2].parent, Some(0));
    }

    #[test]
    fn should_compare_numerically_when_both_sides_parse() {
        assert_eq!(compare_values("9", "10"), Ordering::Less);
        assert_eq!(compare_values("2.5", "2.50"), Ordering::Equal);
    }

    #[test]
    fn should_compare_lexicographically_when_either_side_is_text() {
        assert_eq!(compare_values("9", "ON"), Ordering::Less);
        assert_eq!(compare_values("OFF", "ON"), Ordering::Less);
    }

    #[test]
    fn should_match_relations_through_the_coercion_rule() {
        assert!(ValueRelation::Greater.matches("10", "9"));
        assert!(!ValueRelation::Greater.matches("9", "10"));
        assert!(ValueRelation::Equal.matches("5", "5.0"));
        assert!(ValueRelation::NotEqual.matches("ON", "OFF"));
    }
}
