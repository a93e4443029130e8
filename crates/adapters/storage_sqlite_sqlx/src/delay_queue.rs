//! `SQLite` implementation of [`DelayQueue`].
//!
//! A claim deletes the ticket and flips the run back to `running` inside one
//! transaction. Only the transaction whose `DELETE` removes the row goes on
//! to resume the run; every other claimant sees zero affected rows.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use mailflow_app::ports::{Claim, DelayQueue};
use mailflow_domain::delay::DelayTicket;
use mailflow_domain::error::MailflowError;
use mailflow_domain::id::{RunId, TicketId};
use mailflow_domain::run::Run;
use mailflow_domain::time::Timestamp;

use crate::codec;
use crate::error::StorageError;
use crate::run_repo::{self, UPDATE_PROGRESS, Wrapper as RunRow};

struct Wrapper(DelayTicket);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let run_id: uuid::Uuid = row.try_get("run_id")?;
        let step_index: i64 = row.try_get("step_index")?;
        let execute_after: String = row.try_get("execute_after")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(Self(DelayTicket {
            id: TicketId::from_uuid(id),
            run_id: RunId::from_uuid(run_id),
            step_index: codec::index(step_index)?,
            execute_after: codec::parse_timestamp(&execute_after)?,
            created_at: codec::parse_timestamp(&created_at)?,
        }))
    }
}

const UPSERT: &str = r"
    INSERT INTO delay_tickets (id, run_id, step_index, execute_after, created_at)
    VALUES (?, ?, ?, ?, ?)
    ON CONFLICT (run_id) DO UPDATE SET
        id = excluded.id,
        step_index = excluded.step_index,
        execute_after = excluded.execute_after,
        created_at = excluded.created_at
";

const SELECT_DUE: &str = r"
    SELECT * FROM delay_tickets
    WHERE execute_after <= ?
    ORDER BY execute_after ASC
    LIMIT ?
";

const SELECT_BY_RUN: &str = "SELECT * FROM delay_tickets WHERE run_id = ?";
const DELETE_TICKET: &str = "DELETE FROM delay_tickets WHERE id = ?";
const RESUME_RUN: &str = r"
    UPDATE automation_runs
    SET status = 'running'
    WHERE id = ? AND status IN ('waiting', 'running')
    RETURNING *
";

/// `SQLite`-backed delay queue.
pub struct SqliteDelayQueue {
    pool: SqlitePool,
}

impl SqliteDelayQueue {
    /// Create a new queue backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl DelayQueue for SqliteDelayQueue {
    async fn suspend(&self, run: Run, ticket: DelayTicket) -> Result<Run, MailflowError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        let row: Option<RunRow> = sqlx::query_as(UPDATE_PROGRESS)
            .bind(i64::from(run.current_step))
            .bind(run.status.as_str())
            .bind(run.halted_at.map(i64::from))
            .bind(run.completed_at.map(codec::timestamp))
            .bind(&run.error_message)
            .bind(run.id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        let Some(RunRow(saved)) = row else {
            return Err(run_repo::not_found(run.id));
        };

        sqlx::query(UPSERT)
            .bind(ticket.id.as_uuid())
            .bind(ticket.run_id.as_uuid())
            .bind(i64::from(ticket.step_index))
            .bind(codec::timestamp(ticket.execute_after))
            .bind(codec::timestamp(ticket.created_at))
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        tx.commit().await.map_err(StorageError::from)?;
        Ok(saved)
    }

    async fn due(&self, now: Timestamp, limit: usize) -> Result<Vec<DelayTicket>, MailflowError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_DUE)
            .bind(codec::timestamp(now))
            .bind(codec::limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn claim(&self, ticket: &DelayTicket) -> Result<Claim, MailflowError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        let deleted = sqlx::query(DELETE_TICKET)
            .bind(ticket.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?
            .rows_affected();
        if deleted == 0 {
            tx.rollback().await.map_err(StorageError::from)?;
            return Ok(Claim::AlreadyClaimed);
        }

        let run: Option<RunRow> = sqlx::query_as(RESUME_RUN)
            .bind(ticket.run_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        tx.commit().await.map_err(StorageError::from)?;
        Ok(match run {
            Some(RunRow(run)) => Claim::Resumed(run),
            None => Claim::Orphaned,
        })
    }

    async fn find_by_run(&self, run_id: RunId) -> Result<Option<DelayTicket>, MailflowError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_RUN)
            .bind(run_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }
}
