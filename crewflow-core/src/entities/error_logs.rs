use crate::error::Severity;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use time::OffsetDateTime;
use uuid::Uuid;

const ERROR_LOG_COLUMNS: &str = "id, tenant_id, component, operation, error_kind, message, \
     context, severity, created_at, resolved, retry_count";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ErrorLogRecord {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub component: String,
    pub operation: String,
    pub error_kind: String,
    pub message: String,
    pub context: serde_json::Value,
    pub severity: Severity,
    pub created_at: OffsetDateTime,
    pub resolved: bool,
    pub retry_count: i32,
}

#[derive(Debug, Clone)]
pub struct InsertErrorLog {
    pub tenant_id: Option<Uuid>,
    pub component: String,
    pub operation: String,
    pub error_kind: String,
    pub severity: Severity,
    pub message: String,
    pub context: serde_json::Value,
    pub retry_count: i32,
}

impl Processor<InsertErrorLog> for DatabaseProcessor {
    type Output = Uuid;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertErrorLog")]
    async fn process(&self, insert: InsertErrorLog) -> Result<Uuid, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            INSERT INTO error_logs
                (tenant_id, component, operation, error_kind, severity, message, context, retry_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(insert.tenant_id)
        .bind(&insert.component)
        .bind(&insert.operation)
        .bind(&insert.error_kind)
        .bind(insert.severity)
        .bind(&insert.message)
        .bind(&insert.context)
        .bind(insert.retry_count)
        .fetch_one(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct ListUnresolvedErrorLogs {
    pub limit: i64,
}

impl Processor<ListUnresolvedErrorLogs> for DatabaseProcessor {
    type Output = Vec<ErrorLogRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListUnresolvedErrorLogs")]
    async fn process(
        &self,
        query: ListUnresolvedErrorLogs,
    ) -> Result<Vec<ErrorLogRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {ERROR_LOG_COLUMNS} FROM error_logs \
             WHERE NOT resolved ORDER BY created_at DESC LIMIT $1"
        );
        sqlx::query_as::<_, ErrorLogRecord>(&sql)
            .bind(query.limit)
            .fetch_all(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct ResolveErrorLog {
    pub id: Uuid,
}

impl Processor<ResolveErrorLog> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ResolveErrorLog")]
    async fn process(&self, resolve: ResolveErrorLog) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE error_logs SET resolved = TRUE WHERE id = $1")
            .bind(resolve.id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
