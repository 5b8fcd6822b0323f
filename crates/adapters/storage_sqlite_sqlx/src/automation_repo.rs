//! `SQLite` implementation of [`AutomationRepository`].
//!
//! The automation tables are written by the surrounding system; this
//! adapter only reads them. Trigger and operand enums are spread over
//! nullable columns rather than JSON blobs, mirroring the authored
//! schema.

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use rainhub_app::ports::AutomationRepository;
use rainhub_domain::automation::{
    Automation, Comparator, Condition, Operand, Step, StepKind, Trigger,
};
use rainhub_domain::error::RainHubError;
use rainhub_domain::id::{AutomationId, ConditionId, StepId, TopicId};
use rainhub_domain::preset::Preset;
use rainhub_domain::solar::SolarPosition;

use crate::error::StorageError;

fn decode_err(err: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

fn missing_column(name: &'static str) -> sqlx::Error {
    sqlx::Error::Decode(format!("column {name} required but null").into())
}

/// Parse a snake_case enum from its stored tag via serde.
fn parse_tag<T: serde::de::DeserializeOwned>(tag: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(&format!("\"{tag}\"")).map_err(decode_err)
}

struct AutomationWrapper(Automation);

impl<'r> FromRow<'r, SqliteRow> for AutomationWrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: i64 = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let kind: String = row.try_get("trigger")?;
        let is_control_shown: bool = row.try_get("is_control_shown")?;

        let trigger = match kind.as_str() {
            "time" => Trigger::Time {
                at: row
                    .try_get::<Option<String>, _>("trigger_at")?
                    .ok_or_else(|| missing_column("trigger_at"))?,
            },
            "sun" => {
                let position: Option<String> = row.try_get("position")?;
                let position = position.ok_or_else(|| missing_column("position"))?;
                Trigger::Sun {
                    position: SolarPosition::from_str(&position).map_err(decode_err)?,
                }
            }
            "topic" => {
                let topic_id: Option<i64> = row.try_get("topic_id")?;
                let key: Option<String> = row.try_get("trigger_key")?;
                let value: Option<String> = row.try_get("trigger_value")?;
                Trigger::Topic {
                    topic_id: TopicId::new(topic_id.ok_or_else(|| missing_column("topic_id"))?),
                    key: key.unwrap_or_default(),
                    value: value.unwrap_or_default(),
                }
            }
            "user" => Trigger::User,
            other => {
                return Err(sqlx::Error::Decode(
                    format!("unknown trigger kind: {other}").into(),
                ));
            }
        };

        Ok(Self(Automation {
            id: AutomationId::new(id),
            name,
            trigger,
            is_control_shown,
        }))
    }
}

struct StepWrapper(Step);

impl<'r> FromRow<'r, SqliteRow> for StepWrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: i64 = row.try_get("id")?;
        let automation_id: i64 = row.try_get("automation_id")?;
        let kind: String = row.try_get("kind")?;
        let conditional_step_id: i64 = row.try_get("conditional_step_id")?;
        let is_else_step: bool = row.try_get("is_else_step")?;
        let topic_id: Option<i64> = row.try_get("topic_id")?;
        let message: Option<String> = row.try_get("message")?;

        let kind: StepKind = parse_tag(&kind)?;
        // zero marks a top-level step in the authored schema
        let conditional_step_id = (conditional_step_id != 0).then(|| StepId::new(conditional_step_id));

        Ok(Self(Step {
            id: StepId::new(id),
            automation_id: AutomationId::new(automation_id),
            kind,
            conditional_step_id,
            is_else_step,
            topic_id: topic_id.map(TopicId::new),
            message,
        }))
    }
}

struct ConditionWrapper(Condition);

impl<'r> FromRow<'r, SqliteRow> for ConditionWrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: i64 = row.try_get("id")?;
        let step_id: i64 = row.try_get("step_id")?;
        let comparator: String = row.try_get("comparator")?;
        let comparator: Comparator = parse_tag(&comparator)?;

        Ok(Self(Condition {
            id: ConditionId::new(id),
            step_id: StepId::new(step_id),
            comparator,
            left: operand_from_row(row, "left")?,
            right: operand_from_row(row, "right")?,
        }))
    }
}

fn operand_from_row(row: &SqliteRow, side: &str) -> Result<Operand, sqlx::Error> {
    let kind: String = row.try_get(format!("{side}_kind").as_str())?;
    match kind.as_str() {
        "preset" => {
            let preset: Option<String> = row.try_get(format!("{side}_preset").as_str())?;
            let preset = preset.ok_or_else(|| missing_column("preset"))?;
            let preset: Preset = parse_tag(&preset)?;
            Ok(Operand::Preset { preset })
        }
        "topic" => {
            let topic_id: Option<i64> = row.try_get(format!("{side}_topic_id").as_str())?;
            let key: Option<String> = row.try_get(format!("{side}_key").as_str())?;
            Ok(Operand::Topic {
                topic_id: TopicId::new(topic_id.ok_or_else(|| missing_column("topic_id"))?),
                key: key.unwrap_or_default(),
            })
        }
        "value" => {
            let value: Option<String> = row.try_get(format!("{side}_value").as_str())?;
            Ok(Operand::Value {
                value: value.unwrap_or_default(),
            })
        }
        other => Err(sqlx::Error::Decode(
            format!("unknown operand kind: {other}").into(),
        )),
    }
}

const SELECT_SAVED: &str = "SELECT * FROM automations WHERE trigger IN ('time', 'sun') ORDER BY id";

const SELECT_BY_TOPIC_NAME: &str = r"
    SELECT automations.* FROM automations
    JOIN topics ON topics.id = automations.topic_id
    WHERE automations.trigger = 'topic' AND topics.name = ?
    ORDER BY automations.id
";

/// `SQLite`-backed automation repository.
pub struct SqliteAutomationRepository {
    pool: SqlitePool,
}

impl SqliteAutomationRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl AutomationRepository for SqliteAutomationRepository {
    async fn get_by_id(&self, id: AutomationId) -> Result<Option<Automation>, RainHubError> {
        let row: Option<AutomationWrapper> =
            sqlx::query_as("SELECT * FROM automations WHERE id = ?")
                .bind(id.as_i64())
                .fetch_optional(&self.pool)
                .await
                .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn saved_automations(&self) -> Result<Vec<Automation>, RainHubError> {
        let rows: Vec<AutomationWrapper> = sqlx::query_as(SELECT_SAVED)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn topic_automations(&self, topic: &str) -> Result<Vec<Automation>, RainHubError> {
        let rows: Vec<AutomationWrapper> = sqlx::query_as(SELECT_BY_TOPIC_NAME)
            .bind(topic)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn steps(&self, automation_id: AutomationId) -> Result<Vec<Step>, RainHubError> {
        let rows: Vec<StepWrapper> =
            sqlx::query_as("SELECT * FROM steps WHERE automation_id = ? ORDER BY id")
                .bind(automation_id.as_i64())
                .fetch_all(&self.pool)
                .await
                .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn conditions(&self, step_id: StepId) -> Result<Vec<Condition>, RainHubError> {
        let rows: Vec<ConditionWrapper> =
            sqlx::query_as("SELECT * FROM conditions WHERE step_id = ? ORDER BY id")
                .bind(step_id.as_i64())
                .fetch_all(&self.pool)
                .await
                .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}
