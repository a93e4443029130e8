//! `SQLite` implementation of [`ActivityLog`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use mailflow_app::ports::ActivityLog;
use mailflow_domain::activity::ActivityEntry;
use mailflow_domain::error::MailflowError;
use mailflow_domain::id::ActivityId;

use crate::codec;
use crate::error::StorageError;

struct Wrapper(ActivityEntry);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let details: String = row.try_get("details")?;
        let timestamp: String = row.try_get("timestamp")?;

        Ok(Self(ActivityEntry {
            id: ActivityId::from_uuid(id),
            action: row.try_get("action")?,
            entity_type: row.try_get("entity_type")?,
            entity_id: row.try_get("entity_id")?,
            details: serde_json::from_str(&details).map_err(codec::decode)?,
            timestamp: codec::parse_timestamp(&timestamp)?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO activity_log (id, action, entity_type, entity_id, details, timestamp)
    VALUES (?, ?, ?, ?, ?, ?)
";
const SELECT_RECENT: &str = "SELECT * FROM activity_log ORDER BY timestamp DESC LIMIT ?";

/// `SQLite`-backed append-only activity log.
pub struct SqliteActivityLog {
    pool: SqlitePool,
}

impl SqliteActivityLog {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ActivityLog for SqliteActivityLog {
    async fn record(&self, entry: ActivityEntry) -> Result<(), MailflowError> {
        let details = serde_json::to_string(&entry.details).map_err(StorageError::from)?;

        sqlx::query(INSERT)
            .bind(entry.id.as_uuid())
            .bind(&entry.action)
            .bind(&entry.entity_type)
            .bind(&entry.entity_id)
            .bind(&details)
            .bind(codec::timestamp(entry.timestamp))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn get_recent(&self, limit: usize) -> Result<Vec<ActivityEntry>, MailflowError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_RECENT)
            .bind(codec::limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}
