//! `SQLite` implementation of [`TelemetryRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use rainhub_app::ports::TelemetryRepository;
use rainhub_domain::error::RainHubError;
use rainhub_domain::id::{PointId, TopicId};
use rainhub_domain::telemetry::{NewPoint, TelemetryPoint, ValueRelation};
use rainhub_domain::time::Timestamp;

use crate::error::StorageError;

struct Wrapper(TelemetryPoint);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: i64 = row.try_get("id")?;
        let topic_id: i64 = row.try_get("topic_id")?;
        let parent_point_id: Option<i64> = row.try_get("parent_point_id")?;
        let name: String = row.try_get("name")?;
        let value: String = row.try_get("value")?;
        let is_object: bool = row.try_get("is_object")?;
        let is_latest: bool = row.try_get("is_latest")?;
        let created_at: Timestamp = row.try_get("created_at")?;

        Ok(Self(TelemetryPoint {
            id: PointId::new(id),
            topic_id: TopicId::new(topic_id),
            parent_id: parent_point_id.map(PointId::new),
            name,
            value,
            is_object,
            is_latest,
            created_at,
        }))
    }
}

const INSERT_POINT: &str = r"
    INSERT INTO points (topic_id, parent_point_id, name, value, is_object, is_latest, created_at)
    VALUES (?, ?, ?, ?, ?, 1, ?)
";

const CLEAR_LATEST: &str = "UPDATE points SET is_latest = 0 WHERE topic_id = ? AND is_latest = 1";

const SELECT_ROOT_SCALARS_DESC: &str = r"
    SELECT * FROM points
    WHERE topic_id = ? AND name = ? AND parent_point_id IS NULL AND is_object = 0
    ORDER BY created_at DESC, id DESC
";

const SELECT_IN_RANGE: &str = r"
    SELECT * FROM points
    WHERE topic_id = ? AND name = ? AND parent_point_id IS NULL AND is_object = 0
        AND created_at >= ? AND created_at <= ?
    ORDER BY created_at ASC, id ASC
";

/// `SQLite`-backed telemetry repository.
pub struct SqliteTelemetryRepository {
    pool: SqlitePool,
}

impl SqliteTelemetryRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl TelemetryRepository for SqliteTelemetryRepository {
    async fn upsert_topic(&self, name: &str) -> Result<TopicId, RainHubError> {
        sqlx::query("INSERT INTO topics (name) VALUES (?) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        let (id,): (i64,) = sqlx::query_as("SELECT id FROM topics WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(TopicId::new(id))
    }

    async fn topic_name(&self, id: TopicId) -> Result<Option<String>, RainHubError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT name FROM topics WHERE id = ?")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|(name,)| name))
    }

    async fn replace_latest(
        &self,
        topic_id: TopicId,
        generations: Vec<Vec<NewPoint>>,
    ) -> Result<(), RainHubError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        for generation in generations {
            sqlx::query(CLEAR_LATEST)
                .bind(topic_id.as_i64())
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;

            // points arrive parents-first, so the parent rowid is always
            // already known when a child references it by batch index
            let mut inserted: Vec<i64> = Vec::with_capacity(generation.len());
            for point in generation {
                let parent_rowid = point.parent.and_then(|index| inserted.get(index).copied());
                let result = sqlx::query(INSERT_POINT)
                    .bind(topic_id.as_i64())
                    .bind(parent_rowid)
                    .bind(&point.name)
                    .bind(&point.value)
                    .bind(point.is_object)
                    .bind(point.created_at)
                    .execute(&mut *tx)
                    .await
                    .map_err(StorageError::from)?;
                inserted.push(result.last_insert_rowid());
            }
        }

        tx.commit().await.map_err(StorageError::from)?;
        Ok(())
    }

    async fn latest_value(
        &self,
        topic_id: TopicId,
        name: &str,
    ) -> Result<Option<String>, RainHubError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT value FROM points WHERE topic_id = ? AND name = ? AND is_latest = 1 AND parent_point_id IS NULL AND is_object = 0 LIMIT 1",
        )
        .bind(topic_id.as_i64())
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(row.map(|(value,)| value))
    }

    async fn history(
        &self,
        topic_id: TopicId,
        name: &str,
        relation: ValueRelation,
        value: &str,
        limit: usize,
    ) -> Result<Vec<TelemetryPoint>, RainHubError> {
        // the value relation is applied in memory so numeric text like
        // "36" and "36.0" compares numerically, which SQL text comparison
        // would get wrong
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ROOT_SCALARS_DESC)
            .bind(topic_id.as_i64())
            .bind(name)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows
            .into_iter()
            .map(|w| w.0)
            .filter(|point| relation.matches(&point.value, value))
            .take(limit)
            .collect())
    }

    async fn points_between(
        &self,
        topic_id: TopicId,
        name: &str,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<TelemetryPoint>, RainHubError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_IN_RANGE)
            .bind(topic_id.as_i64())
            .bind(name)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}
