//! `SQLite` implementation of [`SubscriberRepository`].

use std::collections::BTreeMap;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use mailflow_app::ports::SubscriberRepository;
use mailflow_domain::error::{MailflowError, NotFoundError, ValidationError};
use mailflow_domain::id::SubscriberId;
use mailflow_domain::subscriber::Subscriber;

use crate::codec;
use crate::error::StorageError;

struct Wrapper(Subscriber);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Subscriber> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let email: String = row.try_get("email")?;
        let name: Option<String> = row.try_get("name")?;
        let fields_json: String = row.try_get("fields")?;
        let created_at: String = row.try_get("created_at")?;

        let fields: BTreeMap<String, Option<String>> =
            serde_json::from_str(&fields_json).map_err(codec::decode)?;

        Ok(Self(Subscriber {
            id: SubscriberId::from_uuid(id),
            email,
            name,
            fields,
            created_at: codec::parse_timestamp(&created_at)?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO subscribers (id, email, name, fields, created_at)
    VALUES (?, ?, ?, ?, ?)
";

const UPDATE: &str = "UPDATE subscribers SET email = ?, name = ?, fields = ? WHERE id = ?";
const SELECT_BY_ID: &str = "SELECT * FROM subscribers WHERE id = ?";
const SELECT_BY_EMAIL: &str = "SELECT * FROM subscribers WHERE email = ?";
const DELETE: &str = "DELETE FROM subscribers WHERE id = ?";

/// `SQLite`-backed subscriber repository. Deleting a subscriber cascades to
/// its memberships, runs and delay tickets.
pub struct SqliteSubscriberRepository {
    pool: SqlitePool,
}

impl SqliteSubscriberRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_unique_violation(err: sqlx::Error, email: &str) -> MailflowError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ValidationError::DuplicateAddress(email.to_string()).into()
        }
        _ => StorageError::from(err).into(),
    }
}

impl SubscriberRepository for SqliteSubscriberRepository {
    async fn create(&self, subscriber: Subscriber) -> Result<Subscriber, MailflowError> {
        let fields_json = serde_json::to_string(&subscriber.fields).map_err(StorageError::from)?;

        sqlx::query(INSERT)
            .bind(subscriber.id.as_uuid())
            .bind(&subscriber.email)
            .bind(&subscriber.name)
            .bind(&fields_json)
            .bind(codec::timestamp(subscriber.created_at))
            .execute(&self.pool)
            .await
            .map_err(|err| map_unique_violation(err, &subscriber.email))?;

        Ok(subscriber)
    }

    async fn get_by_id(&self, id: SubscriberId) -> Result<Option<Subscriber>, MailflowError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Wrapper::maybe(row))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Subscriber>, MailflowError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_EMAIL)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Wrapper::maybe(row))
    }

    async fn update(&self, subscriber: Subscriber) -> Result<Subscriber, MailflowError> {
        let fields_json = serde_json::to_string(&subscriber.fields).map_err(StorageError::from)?;

        let updated = sqlx::query(UPDATE)
            .bind(&subscriber.email)
            .bind(&subscriber.name)
            .bind(&fields_json)
            .bind(subscriber.id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|err| map_unique_violation(err, &subscriber.email))?
            .rows_affected();
        if updated == 0 {
            return Err(NotFoundError {
                entity: "Subscriber",
                id: subscriber.id.to_string(),
            }
            .into());
        }

        Ok(subscriber)
    }

    async fn delete(&self, id: SubscriberId) -> Result<(), MailflowError> {
        sqlx::query(DELETE)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}
