//! `SQLite` implementation of [`EventStore`].

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use mailflow_app::ports::EventStore;
use mailflow_domain::error::MailflowError;
use mailflow_domain::event::{Event, EventType};
use mailflow_domain::id::{EventId, RunId};

use crate::codec;
use crate::error::StorageError;

struct Wrapper(Event);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Event> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let event_type: String = row.try_get("event_type")?;
        let run_id: Option<uuid::Uuid> = row.try_get("run_id")?;
        let timestamp: String = row.try_get("timestamp")?;
        let data_json: String = row.try_get("data")?;

        Ok(Self(Event {
            id: EventId::from_uuid(id),
            event_type: EventType::from_str(&event_type).map_err(codec::decode)?,
            run_id: run_id.map(RunId::from_uuid),
            timestamp: codec::parse_timestamp(&timestamp)?,
            data: serde_json::from_str(&data_json).map_err(codec::decode)?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO events (id, event_type, run_id, timestamp, data)
    VALUES (?, ?, ?, ?, ?)
";

const SELECT_BY_ID: &str = "SELECT * FROM events WHERE id = ?";
const SELECT_RECENT: &str = "SELECT * FROM events ORDER BY timestamp DESC LIMIT ?";
const SELECT_BY_RUN: &str =
    "SELECT * FROM events WHERE run_id = ? ORDER BY timestamp DESC LIMIT ?";

/// `SQLite`-backed event store.
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Create a new event store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl EventStore for SqliteEventStore {
    async fn store(&self, event: Event) -> Result<Event, MailflowError> {
        let data_json = serde_json::to_string(&event.data).map_err(StorageError::from)?;

        sqlx::query(INSERT)
            .bind(event.id.as_uuid())
            .bind(event.event_type.as_str())
            .bind(event.run_id.map(RunId::as_uuid))
            .bind(codec::timestamp(event.timestamp))
            .bind(&data_json)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(event)
    }

    async fn get_by_id(&self, id: EventId) -> Result<Option<Event>, MailflowError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(Wrapper::maybe(row))
    }

    async fn get_recent(&self, limit: usize) -> Result<Vec<Event>, MailflowError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_RECENT)
            .bind(codec::limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn find_by_run(&self, run_id: RunId, limit: usize) -> Result<Vec<Event>, MailflowError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_RUN)
            .bind(run_id.as_uuid())
            .bind(codec::limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}
