//! `SQLite` implementation of [`AutomationRepository`].
//!
//! Steps live in their own table and are always written together with
//! their automation inside one transaction.

use std::collections::HashMap;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqliteConnection, SqlitePool};

use hookflow_app::ports::AutomationRepository;
use hookflow_domain::automation::{Automation, Step, StepSequence, Trigger};
use hookflow_domain::error::{HookflowError, NotFoundError};
use hookflow_domain::id::{AutomationId, StepId, WebhookId};

use crate::error::StorageError;
use crate::pool::BEGIN_IMMEDIATE;
use crate::row::{from_i64, parse_json, parse_timestamp, timestamp, to_i64};

struct Wrapper(Automation);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let trigger: String = row.try_get("trigger_config")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(Self(Automation {
            id: AutomationId::from_uuid(id),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            is_active: row.try_get("is_active")?,
            trigger: parse_json::<Trigger>(&trigger)?,
            steps: StepSequence::new(),
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        }))
    }
}

struct StepWrapper(Step);

impl<'r> FromRow<'r, SqliteRow> for StepWrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let automation_id: uuid::Uuid = row.try_get("automation_id")?;
        let webhook_id: uuid::Uuid = row.try_get("webhook_id")?;
        let condition_config: Option<String> = row.try_get("condition_config")?;
        let delay_seconds: i64 = row.try_get("delay_seconds")?;

        Ok(Self(Step {
            id: StepId::from_uuid(id),
            automation_id: AutomationId::from_uuid(automation_id),
            webhook_id: WebhookId::from_uuid(webhook_id),
            step_order: row.try_get("step_order")?,
            is_conditional: row.try_get("is_conditional")?,
            condition_config: condition_config
                .as_deref()
                .map(parse_json::<serde_json::Value>)
                .transpose()?,
            delay_seconds: from_i64(delay_seconds)?,
            retry_on_failure: row.try_get("retry_on_failure")?,
            continue_on_failure: row.try_get("continue_on_failure")?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO automations (
        id, name, description, is_active, trigger_config, created_at, updated_at
    )
    VALUES (?, ?, ?, ?, ?, ?, ?)
";

const UPDATE: &str = r"
    UPDATE automations
    SET name = ?, description = ?, is_active = ?, trigger_config = ?, updated_at = ?
    WHERE id = ?
";

const INSERT_STEP: &str = r"
    INSERT INTO automation_steps (
        id, automation_id, webhook_id, step_order, is_conditional,
        condition_config, delay_seconds, retry_on_failure, continue_on_failure
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
";

const SELECT_BY_ID: &str = "SELECT * FROM automations WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM automations ORDER BY name";
const SELECT_ACTIVE: &str = "SELECT * FROM automations WHERE is_active = 1 ORDER BY name";
const SELECT_STEPS: &str =
    "SELECT * FROM automation_steps WHERE automation_id = ? ORDER BY step_order";
const SELECT_ALL_STEPS: &str = "SELECT * FROM automation_steps ORDER BY automation_id, step_order";
const DELETE_STEPS: &str = "DELETE FROM automation_steps WHERE automation_id = ?";
const DELETE: &str = "DELETE FROM automations WHERE id = ?";

/// `SQLite`-backed automation repository.
#[derive(Clone)]
pub struct SqliteAutomationRepository {
    pool: SqlitePool,
}

impl SqliteAutomationRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn list(&self, query: &'static str) -> Result<Vec<Automation>, HookflowError> {
        let rows: Vec<Wrapper> = sqlx::query_as(query)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        let steps: Vec<StepWrapper> = sqlx::query_as(SELECT_ALL_STEPS)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        let mut by_automation: HashMap<AutomationId, Vec<Step>> = HashMap::new();
        for StepWrapper(step) in steps {
            by_automation.entry(step.automation_id).or_default().push(step);
        }

        rows.into_iter()
            .map(|Wrapper(mut automation)| -> Result<Automation, HookflowError> {
                let steps = by_automation.remove(&automation.id).unwrap_or_default();
                automation.steps = StepSequence::try_from(steps)?;
                Ok(automation)
            })
            .collect()
    }
}

async fn insert_steps(
    conn: &mut SqliteConnection,
    automation: &Automation,
) -> Result<(), StorageError> {
    for step in automation.steps.iter() {
        let condition = step
            .condition_config
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        sqlx::query(INSERT_STEP)
            .bind(step.id.as_uuid())
            .bind(automation.id.as_uuid())
            .bind(step.webhook_id.as_uuid())
            .bind(step.step_order)
            .bind(step.is_conditional)
            .bind(condition)
            .bind(to_i64(step.delay_seconds))
            .bind(step.retry_on_failure)
            .bind(step.continue_on_failure)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

impl AutomationRepository for SqliteAutomationRepository {
    async fn create(&self, automation: Automation) -> Result<Automation, HookflowError> {
        let trigger = serde_json::to_string(&automation.trigger).map_err(StorageError::from)?;

        let mut tx = self
            .pool
            .begin_with(BEGIN_IMMEDIATE)
            .await
            .map_err(StorageError::from)?;
        sqlx::query(INSERT)
            .bind(automation.id.as_uuid())
            .bind(&automation.name)
            .bind(&automation.description)
            .bind(automation.is_active)
            .bind(&trigger)
            .bind(timestamp(automation.created_at))
            .bind(timestamp(automation.updated_at))
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        insert_steps(&mut tx, &automation).await?;
        tx.commit().await.map_err(StorageError::from)?;

        Ok(automation)
    }

    async fn get_by_id(&self, id: AutomationId) -> Result<Option<Automation>, HookflowError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        let Some(Wrapper(mut automation)) = row else {
            return Ok(None);
        };

        let steps: Vec<StepWrapper> = sqlx::query_as(SELECT_STEPS)
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        let steps: Vec<Step> = steps.into_iter().map(|s| s.0).collect();
        automation.steps = StepSequence::try_from(steps)?;
        Ok(Some(automation))
    }

    async fn get_all(&self) -> Result<Vec<Automation>, HookflowError> {
        self.list(SELECT_ALL).await
    }

    async fn get_active(&self) -> Result<Vec<Automation>, HookflowError> {
        self.list(SELECT_ACTIVE).await
    }

    async fn update(&self, automation: Automation) -> Result<Automation, HookflowError> {
        let trigger = serde_json::to_string(&automation.trigger).map_err(StorageError::from)?;

        let mut tx = self
            .pool
            .begin_with(BEGIN_IMMEDIATE)
            .await
            .map_err(StorageError::from)?;
        let result = sqlx::query(UPDATE)
            .bind(&automation.name)
            .bind(&automation.description)
            .bind(automation.is_active)
            .bind(&trigger)
            .bind(timestamp(automation.updated_at))
            .bind(automation.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        if result.rows_affected() == 0 {
            return Err(NotFoundError {
                entity: "Automation",
                id: automation.id.to_string(),
            }
            .into());
        }

        // replaced wholesale so renumbered orders never collide mid-update
        sqlx::query(DELETE_STEPS)
            .bind(automation.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        insert_steps(&mut tx, &automation).await?;
        tx.commit().await.map_err(StorageError::from)?;

        Ok(automation)
    }

    async fn delete(&self, id: AutomationId) -> Result<(), HookflowError> {
        sqlx::query(DELETE)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}
