//! `SQLite` implementation of [`ExecutionRecorder`].
//!
//! Every write runs in its own immediate transaction: the execution row is
//! loaded, the change is checked against the domain transition rules, then
//! written and committed before the call returns. Concurrent executions
//! queue on the write lock instead of failing.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqliteConnection, SqlitePool};

use hookflow_app::ports::ExecutionRecorder;
use hookflow_domain::context::TriggerData;
use hookflow_domain::error::{HookflowError, NotFoundError};
use hookflow_domain::execution::{
    AutomationExecution, ExecutionStatus, StepExecutionResult, StepStatus,
};
use hookflow_domain::id::{AutomationId, ExecutionId, StepId};
use hookflow_domain::time::now;

use crate::error::StorageError;
use crate::pool::BEGIN_IMMEDIATE;
use crate::row::{parse_enum, parse_json, parse_timestamp, timestamp};

struct Wrapper(AutomationExecution);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let automation_id: uuid::Uuid = row.try_get("automation_id")?;
        let status: String = row.try_get("status")?;
        let started_at: String = row.try_get("started_at")?;
        let completed_at: Option<String> = row.try_get("completed_at")?;
        let trigger_data: String = row.try_get("trigger_data")?;

        Ok(Self(AutomationExecution {
            id: ExecutionId::from_uuid(id),
            automation_id: AutomationId::from_uuid(automation_id),
            status: parse_enum::<ExecutionStatus>(&status)?,
            started_at: parse_timestamp(&started_at)?,
            completed_at: completed_at.as_deref().map(parse_timestamp).transpose()?,
            trigger_data: parse_json::<TriggerData>(&trigger_data)?,
            error_message: row.try_get("error_message")?,
            completed_steps: row.try_get("completed_steps")?,
            total_steps: row.try_get("total_steps")?,
            steps: Vec::new(),
        }))
    }
}

struct StepWrapper(StepExecutionResult);

impl<'r> FromRow<'r, SqliteRow> for StepWrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let execution_id: uuid::Uuid = row.try_get("execution_id")?;
        let step_id: uuid::Uuid = row.try_get("step_id")?;
        let status: String = row.try_get("status")?;
        let started_at: String = row.try_get("started_at")?;
        let completed_at: String = row.try_get("completed_at")?;

        Ok(Self(StepExecutionResult {
            execution_id: ExecutionId::from_uuid(execution_id),
            step_id: StepId::from_uuid(step_id),
            step_order: row.try_get("step_order")?,
            status: parse_enum::<StepStatus>(&status)?,
            http_status: row.try_get("http_status")?,
            response_body: row.try_get("response_body")?,
            error: row.try_get("error")?,
            attempt_count: row.try_get("attempt_count")?,
            started_at: parse_timestamp(&started_at)?,
            completed_at: parse_timestamp(&completed_at)?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO automation_executions (
        id, automation_id, status, started_at, completed_at, trigger_data,
        error_message, completed_steps, total_steps
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
";

const UPDATE: &str = r"
    UPDATE automation_executions
    SET status = ?, completed_at = ?, error_message = ?, completed_steps = ?
    WHERE id = ?
";

const INSERT_STEP: &str = r"
    INSERT INTO step_executions (
        execution_id, step_id, step_order, status, http_status, response_body,
        error, attempt_count, started_at, completed_at
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
";

const SELECT_BY_ID: &str = "SELECT * FROM automation_executions WHERE id = ?";
const SELECT_BY_AUTOMATION: &str = r"
    SELECT * FROM automation_executions
    WHERE automation_id = ?
    ORDER BY started_at DESC, rowid DESC
    LIMIT ?
";
const SELECT_STEPS: &str =
    "SELECT * FROM step_executions WHERE execution_id = ? ORDER BY step_order, completed_at";

/// `SQLite`-backed execution recorder.
#[derive(Clone)]
pub struct SqliteExecutionRecorder {
    pool: SqlitePool,
}

impl SqliteExecutionRecorder {
    /// Create a new recorder backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load, change and persist one execution inside a transaction.
    async fn transition(
        &self,
        id: ExecutionId,
        change: impl FnOnce(
            &mut AutomationExecution,
        ) -> Result<Option<StepExecutionResult>, HookflowError>,
    ) -> Result<AutomationExecution, HookflowError> {
        let mut tx = self
            .pool
            .begin_with(BEGIN_IMMEDIATE)
            .await
            .map_err(StorageError::from)?;
        let mut execution = load(&mut tx, id).await?.ok_or_else(|| NotFoundError {
            entity: "Execution",
            id: id.to_string(),
        })?;

        if let Some(step) = change(&mut execution)? {
            insert_step(&mut tx, &step).await?;
        }
        sqlx::query(UPDATE)
            .bind(execution.status.as_str())
            .bind(execution.completed_at.map(timestamp))
            .bind(&execution.error_message)
            .bind(execution.completed_steps)
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        tx.commit().await.map_err(StorageError::from)?;

        Ok(execution)
    }
}

async fn load(
    conn: &mut SqliteConnection,
    id: ExecutionId,
) -> Result<Option<AutomationExecution>, StorageError> {
    let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
        .bind(id.as_uuid())
        .fetch_optional(&mut *conn)
        .await?;
    let Some(Wrapper(mut execution)) = row else {
        return Ok(None);
    };
    execution.steps = load_steps(conn, id).await?;
    Ok(Some(execution))
}

async fn load_steps(
    conn: &mut SqliteConnection,
    id: ExecutionId,
) -> Result<Vec<StepExecutionResult>, StorageError> {
    let rows: Vec<StepWrapper> = sqlx::query_as(SELECT_STEPS)
        .bind(id.as_uuid())
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().map(|w| w.0).collect())
}

async fn insert_step(
    conn: &mut SqliteConnection,
    step: &StepExecutionResult,
) -> Result<(), StorageError> {
    sqlx::query(INSERT_STEP)
        .bind(step.execution_id.as_uuid())
        .bind(step.step_id.as_uuid())
        .bind(step.step_order)
        .bind(step.status.as_str())
        .bind(step.http_status)
        .bind(&step.response_body)
        .bind(&step.error)
        .bind(step.attempt_count)
        .bind(timestamp(step.started_at))
        .bind(timestamp(step.completed_at))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

impl ExecutionRecorder for SqliteExecutionRecorder {
    async fn start(
        &self,
        automation_id: AutomationId,
        trigger_data: TriggerData,
        total_steps: u32,
    ) -> Result<AutomationExecution, HookflowError> {
        let execution = AutomationExecution::new(automation_id, trigger_data, total_steps);
        let trigger_json =
            serde_json::to_string(&execution.trigger_data).map_err(StorageError::from)?;

        sqlx::query(INSERT)
            .bind(execution.id.as_uuid())
            .bind(automation_id.as_uuid())
            .bind(execution.status.as_str())
            .bind(timestamp(execution.started_at))
            .bind(execution.completed_at.map(timestamp))
            .bind(&trigger_json)
            .bind(&execution.error_message)
            .bind(execution.completed_steps)
            .bind(execution.total_steps)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(execution)
    }

    async fn mark_running(&self, id: ExecutionId) -> Result<AutomationExecution, HookflowError> {
        self.transition(id, |execution| {
            execution.mark_running()?;
            Ok(None)
        })
        .await
    }

    async fn record_step(
        &self,
        result: StepExecutionResult,
    ) -> Result<AutomationExecution, HookflowError> {
        self.transition(result.execution_id, |execution| {
            execution.apply_step(result.clone())?;
            Ok(Some(result))
        })
        .await
    }

    async fn finish(
        &self,
        id: ExecutionId,
        status: ExecutionStatus,
        error_message: Option<String>,
    ) -> Result<AutomationExecution, HookflowError> {
        self.transition(id, |execution| {
            execution.finish(status, error_message, now())?;
            Ok(None)
        })
        .await
    }

    async fn get_by_id(
        &self,
        id: ExecutionId,
    ) -> Result<Option<AutomationExecution>, HookflowError> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::from)?;
        Ok(load(&mut conn, id).await?)
    }

    async fn list(
        &self,
        automation_id: AutomationId,
        limit: u32,
    ) -> Result<Vec<AutomationExecution>, HookflowError> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::from)?;
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_AUTOMATION)
            .bind(automation_id.as_uuid())
            .bind(limit)
            .fetch_all(&mut *conn)
            .await
            .map_err(StorageError::from)?;

        let mut executions = Vec::with_capacity(rows.len());
        for Wrapper(mut execution) in rows {
            execution.steps = load_steps(&mut conn, execution.id).await?;
            executions.push(execution);
        }
        Ok(executions)
    }
}
