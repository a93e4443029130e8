//! `SQLite` implementation of [`AutomationRepository`].
//!
//! Steps live in their own table keyed by `(automation_id, step_order)`. A
//! stored payload that no longer decodes is loaded as a skip step rather than
//! failing the whole definition.

use std::collections::HashMap;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, Sqlite, SqlitePool, Transaction};

use mailflow_app::ports::AutomationRepository;
use mailflow_domain::automation::{Automation, Step, TriggerCategory};
use mailflow_domain::error::MailflowError;
use mailflow_domain::id::AutomationId;

use crate::codec;
use crate::error::StorageError;

/// Definition row without its steps.
struct Wrapper(Automation);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let trigger: String = row.try_get("trigger_category")?;
        let active: bool = row.try_get("active")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(Self(Automation {
            id: AutomationId::from_uuid(id),
            name,
            trigger: TriggerCategory::from_str(&trigger).map_err(codec::decode)?,
            active,
            steps: Vec::new(),
            created_at: codec::parse_timestamp(&created_at)?,
            updated_at: codec::parse_timestamp(&updated_at)?,
        }))
    }
}

struct StepRow {
    automation_id: AutomationId,
    step: Step,
}

impl<'r> FromRow<'r, SqliteRow> for StepRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let automation_id: uuid::Uuid = row.try_get("automation_id")?;
        let order: i64 = row.try_get("step_order")?;
        let step_type: String = row.try_get("step_type")?;
        let payload: Option<String> = row.try_get("payload")?;

        let order = codec::index(order)?;
        let payload = payload.and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok());

        Ok(Self {
            automation_id: AutomationId::from_uuid(automation_id),
            step: Step::decode(order, &step_type, payload.as_ref()),
        })
    }
}

const INSERT: &str = r"
    INSERT INTO automations (id, name, trigger_category, active, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?)
";

const UPDATE: &str = r"
    UPDATE automations
    SET name = ?, trigger_category = ?, active = ?, updated_at = ?
    WHERE id = ?
";

const INSERT_STEP: &str = r"
    INSERT INTO automation_steps (automation_id, step_order, step_type, payload)
    VALUES (?, ?, ?, ?)
";

const SELECT_BY_ID: &str = "SELECT * FROM automations WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM automations ORDER BY created_at, name";
const SELECT_ACTIVE_BY_TRIGGER: &str = r"
    SELECT * FROM automations
    WHERE trigger_category = ? AND active = 1
    ORDER BY created_at, name
";

const SELECT_STEPS_OF: &str =
    "SELECT * FROM automation_steps WHERE automation_id = ? ORDER BY step_order";
const SELECT_ALL_STEPS: &str = "SELECT * FROM automation_steps ORDER BY step_order";
const SELECT_ACTIVE_STEPS_BY_TRIGGER: &str = r"
    SELECT s.* FROM automation_steps s
    JOIN automations a ON a.id = s.automation_id
    WHERE a.trigger_category = ? AND a.active = 1
    ORDER BY s.step_order
";

const DELETE_STEPS_OF: &str = "DELETE FROM automation_steps WHERE automation_id = ?";
const DELETE: &str = "DELETE FROM automations WHERE id = ?";

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

async fn write_header(
    tx: &mut Transaction<'_, Sqlite>,
    automation: &Automation,
) -> Result<(), StorageError> {
    sqlx::query(UPDATE)
        .bind(&automation.name)
        .bind(automation.trigger.as_str())
        .bind(automation.active)
        .bind(codec::timestamp(automation.updated_at))
        .bind(automation.id.as_uuid())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn write_steps(
    tx: &mut Transaction<'_, Sqlite>,
    automation: &Automation,
) -> Result<(), StorageError> {
    sqlx::query(DELETE_STEPS_OF)
        .bind(automation.id.as_uuid())
        .execute(&mut **tx)
        .await?;
    for step in &automation.steps {
        let payload = step
            .action
            .payload()
            .map(|value| serde_json::to_string(&value))
            .transpose()?;
        sqlx::query(INSERT_STEP)
            .bind(automation.id.as_uuid())
            .bind(i64::from(step.order))
            .bind(step.action.step_type())
            .bind(payload)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// Attach steps to their definitions, preserving the definitions' order.
fn assemble(headers: Vec<Wrapper>, steps: Vec<StepRow>) -> Vec<Automation> {
    let mut by_automation: HashMap<AutomationId, Vec<Step>> = HashMap::new();
    for row in steps {
        by_automation
            .entry(row.automation_id)
            .or_default()
            .push(row.step);
    }
    headers
        .into_iter()
        .map(|Wrapper(mut automation)| {
            automation.steps = by_automation.remove(&automation.id).unwrap_or_default();
            automation
        })
        .collect()
}

impl AutomationRepository for SqliteAutomationRepository {
    async fn create(&self, automation: Automation) -> Result<Automation, MailflowError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        sqlx::query(INSERT)
            .bind(automation.id.as_uuid())
            .bind(&automation.name)
            .bind(automation.trigger.as_str())
            .bind(automation.active)
            .bind(codec::timestamp(automation.created_at))
            .bind(codec::timestamp(automation.updated_at))
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        write_steps(&mut tx, &automation).await?;

        tx.commit().await.map_err(StorageError::from)?;
        Ok(automation)
    }

    async fn get_by_id(&self, id: AutomationId) -> Result<Option<Automation>, MailflowError> {
        let header: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        let Some(Wrapper(mut automation)) = header else {
            return Ok(None);
        };

        let steps: Vec<StepRow> = sqlx::query_as(SELECT_STEPS_OF)
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        automation.steps = steps.into_iter().map(|row| row.step).collect();
        Ok(Some(automation))
    }

    async fn get_all(&self) -> Result<Vec<Automation>, MailflowError> {
        let headers: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        let steps: Vec<StepRow> = sqlx::query_as(SELECT_ALL_STEPS)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(assemble(headers, steps))
    }

    async fn get_active_by_trigger(
        &self,
        trigger: TriggerCategory,
    ) -> Result<Vec<Automation>, MailflowError> {
        let headers: Vec<Wrapper> = sqlx::query_as(SELECT_ACTIVE_BY_TRIGGER)
            .bind(trigger.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        let steps: Vec<StepRow> = sqlx::query_as(SELECT_ACTIVE_STEPS_BY_TRIGGER)
            .bind(trigger.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(assemble(headers, steps))
    }

    async fn update(&self, automation: Automation) -> Result<Automation, MailflowError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        write_header(&mut tx, &automation).await?;
        tx.commit().await.map_err(StorageError::from)?;
        Ok(automation)
    }

    async fn replace_steps(&self, automation: Automation) -> Result<Automation, MailflowError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        write_header(&mut tx, &automation).await?;
        write_steps(&mut tx, &automation).await?;
        tx.commit().await.map_err(StorageError::from)?;
        Ok(automation)
    }

    async fn delete(&self, id: AutomationId) -> Result<(), MailflowError> {
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
    use mailflow_domain::automation::Action;
    use mailflow_domain::id::GroupId;

    async fn setup() -> SqliteAutomationRepository {
        SqliteAutomationRepository::new(memory().await.pool().clone())
    }

    fn valid_automation() -> Automation {
        Automation::builder()
            .name("Welcome series")
            .trigger(TriggerCategory::SubjectCreated)
            .step(Action::SendMessage {
                subject: "Welcome".to_string(),
                body: "<p>Hi</p>".to_string(),
            })
            .step(Action::Wait { minutes: 60 })
            .step(Action::JoinGroup {
                group_id: GroupId::new(),
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn should_create_and_retrieve_automation_with_steps() {
        let repo = setup().await;
        let auto = valid_automation();

        repo.create(auto.clone()).await.unwrap();
        let fetched = repo.get_by_id(auto.id).await.unwrap().unwrap();

        assert_eq!(fetched, auto);
    }

    #[tokio::test]
    async fn should_return_none_when_automation_not_found() {
        let repo = setup().await;
        let result = repo.get_by_id(AutomationId::new()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn should_list_only_active_definitions_for_trigger() {
        let repo = setup().await;
        let wanted = valid_automation();
        repo.create(wanted.clone()).await.unwrap();

        let mut inactive = valid_automation();
        inactive.active = false;
        repo.create(inactive).await.unwrap();

        let mut other = valid_automation();
        other.trigger = TriggerCategory::LeftGroup;
        repo.create(other).await.unwrap();

        let active = repo
            .get_active_by_trigger(TriggerCategory::SubjectCreated)
            .await
            .unwrap();
        assert_eq!(active, vec![wanted]);
        assert_eq!(repo.get_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn should_replace_steps_with_header() {
        let repo = setup().await;
        let mut auto = valid_automation();
        repo.create(auto.clone()).await.unwrap();

        auto.name = "Renamed".to_string();
        auto.replace_steps([Action::Wait { minutes: 5 }]);
        repo.replace_steps(auto.clone()).await.unwrap();

        let fetched = repo.get_by_id(auto.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Renamed");
        assert_eq!(fetched.steps, vec![Step::new(0, Action::Wait { minutes: 5 })]);
    }

    #[tokio::test]
    async fn should_keep_undecodable_payload_when_only_flags_change() {
        let repo = setup().await;
        let auto = valid_automation();
        repo.create(auto.clone()).await.unwrap();
        let legacy = r#"{"subject": 5, "html": "legacy body"}"#;
        sqlx::query("UPDATE automation_steps SET step_type = 'email', payload = ? WHERE step_order = 0")
            .bind(legacy)
            .execute(&repo.pool)
            .await
            .unwrap();

        let mut loaded = repo.get_by_id(auto.id).await.unwrap().unwrap();
        assert!(matches!(loaded.steps[0].action, Action::Skip { .. }));
        loaded.active = false;
        loaded.name = "Paused flow".to_string();
        repo.update(loaded).await.unwrap();

        let (step_type, payload): (String, Option<String>) = sqlx::query_as(
            "SELECT step_type, payload FROM automation_steps WHERE step_order = 0",
        )
        .fetch_one(&repo.pool)
        .await
        .unwrap();
        assert_eq!(step_type, "email");
        assert_eq!(payload.as_deref(), Some(legacy));
        let fetched = repo.get_by_id(auto.id).await.unwrap().unwrap();
        assert!(!fetched.active);
        assert_eq!(fetched.name, "Paused flow");
        assert_eq!(fetched.steps.len(), 2);
    }

    #[tokio::test]
    async fn should_load_undecodable_payload_as_skip() {
        let repo = setup().await;
        let auto = valid_automation();
        repo.create(auto.clone()).await.unwrap();

        sqlx::query("UPDATE automation_steps SET payload = 'not json' WHERE step_order = 0")
            .execute(&repo.pool)
            .await
            .unwrap();

        let fetched = repo.get_by_id(auto.id).await.unwrap().unwrap();
        assert_eq!(
            fetched.steps[0].action,
            Action::Skip {
                step_type: "send_message".to_string()
            }
        );
        assert_eq!(fetched.steps[1], auto.steps[1]);
    }

    #[tokio::test]
    async fn should_delete_automation_and_steps() {
        let repo = setup().await;
        let auto = valid_automation();
        repo.create(auto.clone()).await.unwrap();

        repo.delete(auto.id).await.unwrap();

        assert!(repo.get_by_id(auto.id).await.unwrap().is_none());
        let (remaining,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM automation_steps")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
