//! `SQLite` implementation of [`WebhookRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use hookflow_app::ports::WebhookRepository;
use hookflow_domain::error::{HookflowError, NotFoundError};
use hookflow_domain::id::WebhookId;
use hookflow_domain::webhook::{HttpMethod, PayloadType, Webhook};

use crate::error::StorageError;
use crate::row::{from_i64, parse_enum, parse_json, parse_timestamp, timestamp, to_i64};

struct Wrapper(Webhook);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Webhook> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let method: String = row.try_get("method")?;
        let headers: String = row.try_get("headers")?;
        let payload_type: String = row.try_get("payload_type")?;
        let retry_delay_seconds: i64 = row.try_get("retry_delay_seconds")?;
        let timeout_seconds: i64 = row.try_get("timeout_seconds")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(Self(Webhook {
            id: WebhookId::from_uuid(id),
            name: row.try_get("name")?,
            url: row.try_get("url")?,
            method: parse_enum::<HttpMethod>(&method)?,
            headers: parse_json(&headers)?,
            payload_type: parse_enum::<PayloadType>(&payload_type)?,
            payload_template: row.try_get("payload_template")?,
            retry_enabled: row.try_get("retry_enabled")?,
            retry_count: row.try_get("retry_count")?,
            retry_delay_seconds: from_i64(retry_delay_seconds)?,
            timeout_seconds: from_i64(timeout_seconds)?,
            is_active: row.try_get("is_active")?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO webhooks (
        id, name, url, method, headers, payload_type, payload_template,
        retry_enabled, retry_count, retry_delay_seconds, timeout_seconds,
        is_active, created_at, updated_at
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
";

const UPDATE: &str = r"
    UPDATE webhooks SET
        name = ?, url = ?, method = ?, headers = ?, payload_type = ?,
        payload_template = ?, retry_enabled = ?, retry_count = ?,
        retry_delay_seconds = ?, timeout_seconds = ?, is_active = ?,
        updated_at = ?
    WHERE id = ?
";

const SELECT_BY_ID: &str = "SELECT * FROM webhooks WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM webhooks ORDER BY name";
const DELETE: &str = "DELETE FROM webhooks WHERE id = ?";

/// `SQLite`-backed webhook repository.
#[derive(Clone)]
pub struct SqliteWebhookRepository {
    pool: SqlitePool,
}

impl SqliteWebhookRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl WebhookRepository for SqliteWebhookRepository {
    async fn create(&self, webhook: Webhook) -> Result<Webhook, HookflowError> {
        let headers = serde_json::to_string(&webhook.headers).map_err(StorageError::from)?;

        sqlx::query(INSERT)
            .bind(webhook.id.as_uuid())
            .bind(&webhook.name)
            .bind(&webhook.url)
            .bind(webhook.method.as_str())
            .bind(&headers)
            .bind(webhook.payload_type.as_str())
            .bind(&webhook.payload_template)
            .bind(webhook.retry_enabled)
            .bind(webhook.retry_count)
            .bind(to_i64(webhook.retry_delay_seconds))
            .bind(to_i64(webhook.timeout_seconds))
            .bind(webhook.is_active)
            .bind(timestamp(webhook.created_at))
            .bind(timestamp(webhook.updated_at))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(webhook)
    }

    async fn get_by_id(&self, id: WebhookId) -> Result<Option<Webhook>, HookflowError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Wrapper::maybe(row))
    }

    async fn get_all(&self) -> Result<Vec<Webhook>, HookflowError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn update(&self, webhook: Webhook) -> Result<Webhook, HookflowError> {
        let headers = serde_json::to_string(&webhook.headers).map_err(StorageError::from)?;

        let result = sqlx::query(UPDATE)
            .bind(&webhook.name)
            .bind(&webhook.url)
            .bind(webhook.method.as_str())
            .bind(&headers)
            .bind(webhook.payload_type.as_str())
            .bind(&webhook.payload_template)
            .bind(webhook.retry_enabled)
            .bind(webhook.retry_count)
            .bind(to_i64(webhook.retry_delay_seconds))
            .bind(to_i64(webhook.timeout_seconds))
            .bind(webhook.is_active)
            .bind(timestamp(webhook.updated_at))
            .bind(webhook.id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Err(NotFoundError {
                entity: "Webhook",
                id: webhook.id.to_string(),
            }
            .into());
        }
        Ok(webhook)
    }

    async fn delete(&self, id: WebhookId) -> Result<(), HookflowError> {
        sqlx::query(DELETE)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}
