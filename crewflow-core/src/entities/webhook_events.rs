use crate::entities::EventStatus;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use time::OffsetDateTime;
use uuid::Uuid;

const EVENT_COLUMNS: &str = "id, tenant_id, store_domain, topic, provider_event_id, payload, \
     headers, received_at, status, processing_ms, error_text, triggered_workflows, \
     triggered_actions";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WebhookEventRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub store_domain: String,
    pub topic: String,
    pub provider_event_id: Option<String>,
    pub payload: serde_json::Value,
    pub headers: serde_json::Value,
    pub received_at: OffsetDateTime,
    pub status: EventStatus,
    pub processing_ms: Option<i64>,
    pub error_text: Option<String>,
    pub triggered_workflows: Vec<String>,
    pub triggered_actions: Vec<String>,
}

#[derive(Debug, Clone)]
/// Record a freshly received event with status `pending`.
///
/// The partial unique index on (store_domain, provider_event_id) turns a
/// provider redelivery into a conflict; `None` output means the row
/// already existed and nothing was inserted.
pub struct InsertPendingEvent {
    pub tenant_id: Uuid,
    pub store_domain: String,
    pub topic: String,
    pub provider_event_id: Option<String>,
    pub payload: serde_json::Value,
    pub headers: serde_json::Value,
}

impl Processor<InsertPendingEvent> for DatabaseProcessor {
    type Output = Option<Uuid>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertPendingEvent")]
    async fn process(&self, insert: InsertPendingEvent) -> Result<Option<Uuid>, sqlx::Error> {
        let id: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO webhook_events
                (tenant_id, store_domain, topic, provider_event_id, payload, headers)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (store_domain, provider_event_id)
                WHERE provider_event_id IS NOT NULL
                DO NOTHING
            RETURNING id
            "#,
        )
        .bind(insert.tenant_id)
        .bind(&insert.store_domain)
        .bind(&insert.topic)
        .bind(&insert.provider_event_id)
        .bind(&insert.payload)
        .bind(&insert.headers)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }
}

#[derive(Debug, Clone)]
/// Move an event to its `processed` terminal status.
///
/// `expected_status` guards the transition; the normal pipeline passes
/// `Pending`, the admin replay path passes `Failed`.
pub struct MarkEventProcessed {
    pub id: Uuid,
    pub expected_status: EventStatus,
    pub processing_ms: i64,
    pub triggered_workflows: Vec<String>,
    pub triggered_actions: Vec<String>,
}

impl Processor<MarkEventProcessed> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:MarkEventProcessed")]
    async fn process(&self, mark: MarkEventProcessed) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_events
            SET status = 'processed',
                processing_ms = $3,
                error_text = NULL,
                triggered_workflows = $4,
                triggered_actions = $5
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(mark.id)
        .bind(mark.expected_status)
        .bind(mark.processing_ms)
        .bind(&mark.triggered_workflows)
        .bind(&mark.triggered_actions)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[derive(Debug, Clone)]
/// Move an event to its `failed` terminal status, recording the error
/// display text.
pub struct MarkEventFailed {
    pub id: Uuid,
    pub expected_status: EventStatus,
    pub processing_ms: i64,
    pub error_text: String,
}

impl Processor<MarkEventFailed> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:MarkEventFailed")]
    async fn process(&self, mark: MarkEventFailed) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_events
            SET status = 'failed', processing_ms = $3, error_text = $4
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(mark.id)
        .bind(mark.expected_status)
        .bind(mark.processing_ms)
        .bind(&mark.error_text)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[derive(Debug, Clone)]
/// Move an event to `ignored`, recording why it was not routed.
pub struct MarkEventIgnored {
    pub id: Uuid,
    pub reason: String,
}

impl Processor<MarkEventIgnored> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:MarkEventIgnored")]
    async fn process(&self, mark: MarkEventIgnored) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_events
            SET status = 'ignored', error_text = $2
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(mark.id)
        .bind(&mark.reason)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[derive(Debug, Clone)]
pub struct GetEventById {
    pub id: Uuid,
}

impl Processor<GetEventById> for DatabaseProcessor {
    type Output = Option<WebhookEventRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetEventById")]
    async fn process(&self, query: GetEventById) -> Result<Option<WebhookEventRecord>, sqlx::Error> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM webhook_events WHERE id = $1");
        sqlx::query_as::<_, WebhookEventRecord>(&sql)
            .bind(query.id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// List events newest-first, optionally filtered by status.
pub struct ListEvents {
    pub status: Option<EventStatus>,
    pub limit: i64,
    pub offset: i64,
}

impl Processor<ListEvents> for DatabaseProcessor {
    type Output = Vec<WebhookEventRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListEvents")]
    async fn process(&self, query: ListEvents) -> Result<Vec<WebhookEventRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM webhook_events \
             WHERE ($1::event_status IS NULL OR status = $1) \
             ORDER BY received_at DESC LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, WebhookEventRecord>(&sql)
            .bind(query.status)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// Storage reachability probe for the health checker.
pub struct ProbeStorage;

impl Processor<ProbeStorage> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ProbeStorage")]
    async fn process(&self, _probe: ProbeStorage) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
