//! `SQLite` implementation of [`RunRepository`].

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Row, Sqlite, SqlitePool};

use mailflow_app::ports::{RunFilter, RunRepository};
use mailflow_domain::error::{MailflowError, NotFoundError};
use mailflow_domain::id::{AutomationId, RunId, SubscriberId};
use mailflow_domain::run::{Run, RunStatus};

use crate::codec;
use crate::error::StorageError;

pub(crate) struct Wrapper(pub(crate) Run);

impl Wrapper {
    pub(crate) fn maybe(value: Option<Self>) -> Option<Run> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let automation_id: uuid::Uuid = row.try_get("automation_id")?;
        let subscriber_id: uuid::Uuid = row.try_get("subscriber_id")?;
        let current_step: i64 = row.try_get("current_step")?;
        let status: String = row.try_get("status")?;
        let paused: bool = row.try_get("paused")?;
        let halted_at: Option<i64> = row.try_get("halted_at")?;
        let started_at: String = row.try_get("started_at")?;
        let completed_at: Option<String> = row.try_get("completed_at")?;
        let error_message: Option<String> = row.try_get("error_message")?;

        Ok(Self(Run {
            id: RunId::from_uuid(id),
            automation_id: AutomationId::from_uuid(automation_id),
            subscriber_id: SubscriberId::from_uuid(subscriber_id),
            current_step: codec::index(current_step)?,
            status: RunStatus::from_str(&status).map_err(codec::decode)?,
            paused,
            halted_at: halted_at.map(codec::index).transpose()?,
            started_at: codec::parse_timestamp(&started_at)?,
            completed_at: completed_at
                .as_deref()
                .map(codec::parse_timestamp)
                .transpose()?,
            error_message,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO automation_runs (
        id, automation_id, subscriber_id, current_step, status, paused,
        halted_at, started_at, completed_at, error_message
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
";

/// Writes progress only. `paused` belongs to [`RunRepository::set_paused`].
pub(crate) const UPDATE_PROGRESS: &str = r"
    UPDATE automation_runs
    SET current_step = ?, status = ?, halted_at = ?, completed_at = ?, error_message = ?
    WHERE id = ?
    RETURNING *
";

const SELECT_BY_ID: &str = "SELECT * FROM automation_runs WHERE id = ?";
const SET_PAUSED: &str = "UPDATE automation_runs SET paused = ? WHERE id = ? RETURNING *";
const CLAIM_HALT: &str = r"
    UPDATE automation_runs
    SET halted_at = NULL
    WHERE id = ? AND status = 'running' AND halted_at = ?
    RETURNING *
";
const DELETE: &str = "DELETE FROM automation_runs WHERE id = ?";

pub(crate) fn not_found(id: RunId) -> MailflowError {
    NotFoundError {
        entity: "Run",
        id: id.to_string(),
    }
    .into()
}

/// `SQLite`-backed run repository.
pub struct SqliteRunRepository {
    pool: SqlitePool,
}

impl SqliteRunRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl RunRepository for SqliteRunRepository {
    async fn create(&self, run: Run) -> Result<Run, MailflowError> {
        sqlx::query(INSERT)
            .bind(run.id.as_uuid())
            .bind(run.automation_id.as_uuid())
            .bind(run.subscriber_id.as_uuid())
            .bind(i64::from(run.current_step))
            .bind(run.status.as_str())
            .bind(run.paused)
            .bind(run.halted_at.map(i64::from))
            .bind(codec::timestamp(run.started_at))
            .bind(run.completed_at.map(codec::timestamp))
            .bind(&run.error_message)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(run)
    }

    async fn get_by_id(&self, id: RunId) -> Result<Option<Run>, MailflowError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Wrapper::maybe(row))
    }

    async fn list(&self, filter: RunFilter) -> Result<Vec<Run>, MailflowError> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM automation_runs WHERE 1 = 1");
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(automation_id) = filter.automation_id {
            query
                .push(" AND automation_id = ")
                .push_bind(automation_id.as_uuid());
        }
        if let Some(subscriber_id) = filter.subscriber_id {
            query
                .push(" AND subscriber_id = ")
                .push_bind(subscriber_id.as_uuid());
        }
        query.push(" ORDER BY started_at DESC");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(codec::limit(limit));
        }

        let rows: Vec<Wrapper> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn update(&self, run: Run) -> Result<Run, MailflowError> {
        let row: Option<Wrapper> = sqlx::query_as(UPDATE_PROGRESS)
            .bind(i64::from(run.current_step))
            .bind(run.status.as_str())
            .bind(run.halted_at.map(i64::from))
            .bind(run.completed_at.map(codec::timestamp))
            .bind(&run.error_message)
            .bind(run.id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Wrapper::maybe(row).ok_or_else(|| not_found(run.id))
    }

    async fn set_paused(&self, id: RunId, paused: bool) -> Result<Option<Run>, MailflowError> {
        let row: Option<Wrapper> = sqlx::query_as(SET_PAUSED)
            .bind(paused)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Wrapper::maybe(row))
    }

    async fn claim_halt(&self, id: RunId, step: u32) -> Result<Option<Run>, MailflowError> {
        let row: Option<Wrapper> = sqlx::query_as(CLAIM_HALT)
            .bind(id.as_uuid())
            .bind(i64::from(step))
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Wrapper::maybe(row))
    }

    async fn delete(&self, id: RunId) -> Result<(), MailflowError> {
        sqlx::query(DELETE)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::memory;
    use crate::test_fixtures;
    use mailflow_domain::time::now;

    async fn setup() -> (SqliteRunRepository, AutomationId, SubscriberId) {
        let db = memory().await;
        let automation = test_fixtures::automation(db.pool()).await;
        let subscriber = test_fixtures::subscriber(db.pool(), "ada@example.com").await;
        (
            SqliteRunRepository::new(db.pool().clone()),
            automation.id,
            subscriber.id,
        )
    }

    #[tokio::test]
    async fn should_create_and_retrieve_run() {
        let (repo, automation_id, subscriber_id) = setup().await;
        let run = Run::start(automation_id, subscriber_id);

        repo.create(run.clone()).await.unwrap();
        let fetched = repo.get_by_id(run.id).await.unwrap().unwrap();

        assert_eq!(fetched, run);
    }

    #[tokio::test]
    async fn should_reject_run_for_unknown_subscriber() {
        let (repo, automation_id, _) = setup().await;
        let result = repo
            .create(Run::start(automation_id, SubscriberId::new()))
            .await;
        assert!(matches!(result, Err(MailflowError::Storage(_))));
    }

    #[tokio::test]
    async fn should_not_overwrite_paused_on_update() {
        let (repo, automation_id, subscriber_id) = setup().await;
        let mut run = Run::start(automation_id, subscriber_id);
        repo.create(run.clone()).await.unwrap();
        repo.set_paused(run.id, true).await.unwrap();

        run.enter_step(1);
        run.fail("boom", now());
        let saved = repo.update(run.clone()).await.unwrap();

        assert!(saved.paused);
        assert_eq!(saved.status, RunStatus::Failed);
        assert_eq!(saved.current_step, 1);
        assert_eq!(saved.error_message.as_deref(), Some("boom"));
        assert_eq!(saved.completed_at, run.completed_at);
    }

    #[tokio::test]
    async fn should_return_not_found_when_updating_missing_run() {
        let (repo, automation_id, subscriber_id) = setup().await;
        let result = repo.update(Run::start(automation_id, subscriber_id)).await;
        assert!(matches!(result, Err(MailflowError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_return_none_when_pausing_missing_run() {
        let (repo, _, _) = setup().await;
        assert!(repo.set_paused(RunId::new(), true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_grant_halt_to_a_single_claimant() {
        let (repo, automation_id, subscriber_id) = setup().await;
        let mut run = Run::start(automation_id, subscriber_id);
        run.halt(2);
        repo.create(run.clone()).await.unwrap();

        let (a, b) = tokio::join!(repo.claim_halt(run.id, 2), repo.claim_halt(run.id, 2));

        let winners: Vec<Run> = [a.unwrap(), b.unwrap()].into_iter().flatten().collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].halted_at, None);
        assert!(repo.claim_halt(run.id, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_not_claim_halt_of_finished_run() {
        let (repo, automation_id, subscriber_id) = setup().await;
        let mut run = Run::start(automation_id, subscriber_id);
        run.halt(1);
        run.status = RunStatus::Completed;
        repo.create(run.clone()).await.unwrap();

        assert!(repo.claim_halt(run.id, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_list_newest_first_with_filters() {
        let (repo, automation_id, subscriber_id) = setup().await;
        let older = Run::start(automation_id, subscriber_id);
        let mut newer = Run::start(automation_id, subscriber_id);
        newer.started_at = older.started_at + chrono::Duration::seconds(1);
        newer.suspend();
        repo.create(older.clone()).await.unwrap();
        repo.create(newer.clone()).await.unwrap();

        let all = repo.list(RunFilter::default()).await.unwrap();
        assert_eq!(all, vec![newer.clone(), older.clone()]);

        let waiting = repo
            .list(RunFilter {
                status: Some(RunStatus::Waiting),
                automation_id: Some(automation_id),
                ..RunFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(waiting, vec![newer.clone()]);

        let limited = repo
            .list(RunFilter {
                limit: Some(1),
                ..RunFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(limited, vec![newer]);

        let none = repo
            .list(RunFilter {
                subscriber_id: Some(SubscriberId::new()),
                ..RunFilter::default()
            })
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn should_delete_run() {
        let (repo, automation_id, subscriber_id) = setup().await;
        let run = Run::start(automation_id, subscriber_id);
        repo.create(run.clone()).await.unwrap();

        repo.delete(run.id).await.unwrap();

        assert!(repo.get_by_id(run.id).await.unwrap().is_none());
    }
}
