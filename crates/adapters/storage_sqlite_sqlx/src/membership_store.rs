//! `SQLite` implementation of [`MembershipStore`].

use sqlx::SqlitePool;

use mailflow_app::ports::MembershipStore;
use mailflow_domain::error::MailflowError;
use mailflow_domain::id::{GroupId, LabelId, SubscriberId};

use crate::error::StorageError;

const JOIN_GROUP: &str =
    "INSERT OR IGNORE INTO subscriber_groups (subscriber_id, group_id) VALUES (?, ?)";
const LEAVE_GROUP: &str = "DELETE FROM subscriber_groups WHERE subscriber_id = ? AND group_id = ?";
const ADD_LABEL: &str =
    "INSERT OR IGNORE INTO subscriber_labels (subscriber_id, label_id) VALUES (?, ?)";
const REMOVE_LABEL: &str =
    "DELETE FROM subscriber_labels WHERE subscriber_id = ? AND label_id = ?";
const GROUPS_OF: &str = "SELECT group_id FROM subscriber_groups WHERE subscriber_id = ?";
const LABELS_OF: &str = "SELECT label_id FROM subscriber_labels WHERE subscriber_id = ?";

/// `SQLite`-backed group and label membership.
pub struct SqliteMembershipStore {
    pool: SqlitePool,
}

impl SqliteMembershipStore {
    /// Create a new store backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn execute(
        &self,
        sql: &'static str,
        subscriber_id: SubscriberId,
        other: uuid::Uuid,
    ) -> Result<(), MailflowError> {
        sqlx::query(sql)
            .bind(subscriber_id.as_uuid())
            .bind(other)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn members(
        &self,
        sql: &'static str,
        subscriber_id: SubscriberId,
    ) -> Result<Vec<uuid::Uuid>, MailflowError> {
        let rows: Vec<(uuid::Uuid,)> = sqlx::query_as(sql)
            .bind(subscriber_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

impl MembershipStore for SqliteMembershipStore {
    async fn join_group(
        &self,
        subscriber_id: SubscriberId,
        group_id: GroupId,
    ) -> Result<(), MailflowError> {
        self.execute(JOIN_GROUP, subscriber_id, group_id.as_uuid())
            .await
    }

    async fn leave_group(
        &self,
        subscriber_id: SubscriberId,
        group_id: GroupId,
    ) -> Result<(), MailflowError> {
        self.execute(LEAVE_GROUP, subscriber_id, group_id.as_uuid())
            .await
    }

    async fn add_label(
        &self,
        subscriber_id: SubscriberId,
        label_id: LabelId,
    ) -> Result<(), MailflowError> {
        self.execute(ADD_LABEL, subscriber_id, label_id.as_uuid())
            .await
    }

    async fn remove_label(
        &self,
        subscriber_id: SubscriberId,
        label_id: LabelId,
    ) -> Result<(), MailflowError> {
        self.execute(REMOVE_LABEL, subscriber_id, label_id.as_uuid())
            .await
    }

    async fn groups_of(&self, subscriber_id: SubscriberId) -> Result<Vec<GroupId>, MailflowError> {
        let ids = self.members(GROUPS_OF, subscriber_id).await?;
        Ok(ids.into_iter().map(GroupId::from_uuid).collect())
    }

    async fn labels_of(&self, subscriber_id: SubscriberId) -> Result<Vec<LabelId>, MailflowError> {
        let ids = self.members(LABELS_OF, subscriber_id).await?;
        Ok(ids.into_iter().map(LabelId::from_uuid).collect())
    }
}
